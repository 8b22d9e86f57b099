//! Authoritative state transitions over one in-memory [`GameState`].
//!
//! Every function validates before it mutates, so an `Err` leaves the snapshot
//! untouched. Persistence and audit storage are the caller's job.

use crate::game::{
    catalog::Catalog,
    error::{Entity, GameError},
    types::*,
};
use chrono::{DateTime, TimeDelta, Utc};

/// Fresh game with the fixed opening layout for both sides.
pub fn new_game(player_name: &str, catalog: &Catalog, now: DateTime<Utc>) -> GameState {
    let unit = |id: &str, kind, x, y, health, owner| Unit {
        id: id.into(),
        kind,
        x,
        y,
        health,
        owner,
        selected: false,
    };
    let building = |id: &str, kind, x, y, health, owner| Building {
        id: id.into(),
        kind,
        x,
        y,
        health,
        owner,
        selected: false,
    };

    let player = Player {
        id: "player1".into(),
        name: player_name.into(),
        resources: catalog.initial_resources.clone(),
        units: vec![
            unit("unit1", UnitType::Peasant, 5, 5, 50, Owner::Player),
            unit("unit2", UnitType::Peasant, 6, 5, 50, Owner::Player),
            unit("unit3", UnitType::Soldier, 7, 5, 100, Owner::Player),
        ],
        buildings: vec![building("building1", BuildingType::TownHall, 5, 6, 500, Owner::Player)],
    };

    let enemy = Player {
        id: "enemy1".into(),
        name: "IA".into(),
        resources: catalog.initial_resources.clone(),
        units: vec![
            unit("enemy_unit1", UnitType::Soldier, 15, 15, 100, Owner::Enemy),
            unit("enemy_unit2", UnitType::Archer, 16, 15, 80, Owner::Enemy),
        ],
        buildings: vec![building(
            "enemy_building1",
            BuildingType::TownHall,
            15,
            16,
            500,
            Owner::Enemy,
        )],
    };

    GameState {
        id: new_id(),
        player,
        enemy,
        selected_units: Default::default(),
        selected_building: None,
        game_status: GameStatus::Playing,
        map_size: MapSize::default(),
        created_at: now,
        updated_at: now,
    }
}

/// Teleport every listed player unit onto (x, y). Unknown ids are skipped;
/// no collision or bounds check is applied.
pub fn move_units(
    state: &mut GameState,
    unit_ids: &[String],
    x: i32,
    y: i32,
    now: DateTime<Utc>,
) -> GameAction {
    for unit in state.player.units.iter_mut() {
        if unit_ids.contains(&unit.id) {
            unit.x = x;
            unit.y = y;
        }
    }

    let mut action = GameAction::new(&state.id, ActionKind::Move, now);
    action.unit_id = unit_ids.first().cloned();
    action.target_x = Some(x);
    action.target_y = Some(y);
    action
}

/// Flat catalog damage from a player unit to an enemy unit or building.
pub fn attack(
    state: &mut GameState,
    catalog: &Catalog,
    attacker_id: &str,
    target_id: &str,
    now: DateTime<Utc>,
) -> Result<GameAction, GameError> {
    let attacker = state
        .player
        .unit(attacker_id)
        .ok_or_else(|| GameError::not_found(Entity::Unit, attacker_id))?;
    let damage = catalog.unit(attacker.kind)?.attack;

    // Units first, then buildings.
    let health = if let Some(u) = state.enemy.units.iter_mut().find(|u| u.id == target_id) {
        &mut u.health
    } else if let Some(b) = state.enemy.buildings.iter_mut().find(|b| b.id == target_id) {
        &mut b.health
    } else {
        return Err(GameError::not_found(Entity::Target, target_id));
    };
    *health = health.saturating_sub(damage);

    // Sweep the whole enemy side, not only the target.
    state.enemy.purge_destroyed();

    let mut action = GameAction::new(&state.id, ActionKind::Attack, now);
    action.unit_id = Some(attacker_id.to_owned());
    action.target_id = Some(target_id.to_owned());
    Ok(action)
}

/// Add one round of building income to the player's pool. Uncapped.
pub fn update_resources(state: &mut GameState, catalog: &Catalog) {
    let income: Vec<&ResourcePool> = state
        .player
        .buildings
        .iter()
        .filter_map(|b| catalog.generation(b.kind))
        .collect();
    for amount in income {
        state.player.resources.add(amount);
    }
}

/// Place a new player building. Affordability is checked before occupancy.
pub fn build(
    state: &mut GameState,
    catalog: &Catalog,
    kind: BuildingType,
    x: i32,
    y: i32,
    now: DateTime<Utc>,
) -> Result<GameAction, GameError> {
    let stats = catalog.building(kind)?;

    // 1️⃣  Funds
    state
        .player
        .resources
        .can_pay(&stats.cost)
        .map_err(GameError::InsufficientResources)?;

    // 2️⃣  Free cell
    if state.occupied(x, y) {
        return Err(GameError::PositionOccupied { x, y });
    }

    // 3️⃣  Commit
    state.player.resources.pay(&stats.cost);
    state.player.buildings.push(Building {
        id: new_id(),
        kind,
        x,
        y,
        health: stats.health,
        owner: Owner::Player,
        selected: false,
    });

    let mut action = GameAction::new(&state.id, ActionKind::Build, now);
    action.build_type = Some(kind);
    action.target_x = Some(x);
    action.target_y = Some(y);
    Ok(action)
}

/// Validate and pay for a unit, returning the production order to persist.
pub fn start_production(
    state: &mut GameState,
    catalog: &Catalog,
    building_id: &str,
    unit_type: UnitType,
    now: DateTime<Utc>,
) -> Result<(UnitProduction, GameAction), GameError> {
    let building = state
        .player
        .building(building_id)
        .ok_or_else(|| GameError::not_found(Entity::Building, building_id))?;

    if !catalog.building(building.kind)?.produces.contains(&unit_type) {
        return Err(GameError::CannotProduce);
    }

    let stats = catalog.unit(unit_type)?;
    let build_time = TimeDelta::from_std(stats.build_time)
        .map_err(|_| GameError::InvalidCatalogEntry(format!("build time of {unit_type:?}")))?;

    state
        .player
        .resources
        .can_pay(&stats.cost)
        .map_err(GameError::InsufficientResources)?;
    state.player.resources.pay(&stats.cost);

    let production = UnitProduction {
        id: new_id(),
        game_id: state.id.clone(),
        building_id: building_id.to_owned(),
        unit_type,
        start_time: now,
        end_time: now + build_time,
        completed: false,
    };

    let mut action = GameAction::new(&state.id, ActionKind::Produce, now);
    action.building_id = Some(building_id.to_owned());
    Ok((production, action))
}

/// Spawn the produced unit next to its building and mark the order done.
/// Fails if the order was already applied or the building is gone.
pub fn finish_production(
    state: &mut GameState,
    catalog: &Catalog,
    production: &mut UnitProduction,
) -> Result<(), GameError> {
    if production.completed {
        return Err(GameError::AlreadyCompleted);
    }

    let building = state
        .player
        .building(&production.building_id)
        .ok_or_else(|| GameError::not_found(Entity::Building, production.building_id.as_str()))?;
    let health = catalog.unit(production.unit_type)?.health;

    let unit = Unit {
        id: new_id(),
        kind: production.unit_type,
        x: building.x + 1,
        y: building.y,
        health,
        owner: Owner::Player,
        selected: false,
    };
    state.player.units.push(unit);
    production.completed = true;
    Ok(())
}
