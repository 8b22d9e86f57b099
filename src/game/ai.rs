//! Single-ply greedy enemy behaviour. Nothing carries over between turns.

use crate::game::{catalog::Catalog, error::GameError, types::GameState};
use rand::Rng;

/// Chance that a given enemy unit acts in one turn.
pub const ACT_CHANCE: f64 = 0.3;

/// Movement bound used by the AI. Fixed at 20 regardless of the game's
/// configured map size.
pub const AI_BOUND: i32 = 20;

/// One step from `from` toward `to` on a single axis, kept inside
/// `[0, AI_BOUND - 1]` only on the side it moves toward.
fn step(from: i32, to: i32) -> i32 {
    match to.cmp(&from) {
        std::cmp::Ordering::Greater => (from + 1).min(AI_BOUND - 1),
        std::cmp::Ordering::Less => (from - 1).max(0),
        std::cmp::Ordering::Equal => from,
    }
}

/// Run one AI turn: each enemy unit independently rolls, walks one cell
/// toward the nearest player unit and strikes it when adjacent.
pub fn ai_turn<R: Rng>(
    state: &mut GameState,
    catalog: &Catalog,
    rng: &mut R,
) -> Result<(), GameError> {
    // Resolve every attack value up front so a bad catalog aborts before mutation.
    let attacks = state
        .enemy
        .units
        .iter()
        .map(|u| catalog.unit(u.kind).map(|s| s.attack))
        .collect::<Result<Vec<u32>, GameError>>()?;

    for (unit, damage) in state.enemy.units.iter_mut().zip(attacks) {
        if rng.random::<f64>() >= ACT_CHANCE {
            continue;
        }

        let (ux, uy) = (unit.x, unit.y);
        // min_by_key keeps the first of equal minimums.
        let Some(target) = state
            .player
            .units
            .iter_mut()
            .min_by_key(|p| (ux - p.x).abs() + (uy - p.y).abs())
        else {
            continue;
        };

        unit.x = step(unit.x, target.x);
        unit.y = step(unit.y, target.y);

        if (unit.x - target.x).abs() <= 1 && (unit.y - target.y).abs() <= 1 {
            target.health = target.health.saturating_sub(damage);
        }
    }

    state.player.units.retain(|u| u.health > 0);
    Ok(())
}
