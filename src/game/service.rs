//! Load → transition → persist, one game at a time.
//!
//! Every mutating call takes the per-game lock, loads the snapshot, runs one
//! pure transition from [`logic`] / [`ai`], then replaces the stored document
//! and appends the audit record. A failed transition persists nothing.

use crate::{
    db::GameStore,
    game::{
        ai,
        catalog::Catalog,
        error::{Entity, GameError},
        logic,
        types::{BuildingType, GameAction, GameState, UnitProduction, UnitType},
    },
    metrics,
    scheduler::{Clock, Scheduler},
};
use dashmap::DashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = DashMap<String, Arc<AsyncMutex<()>>>;

/// Held for the duration of one game write. On release the map entry is
/// dropped again unless another caller is already waiting on it.
struct GameLock<'a> {
    locks: &'a LockMap,
    game_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for GameLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.game_id, |_, slot| Arc::strong_count(slot) == 1);
    }
}

/// Cheap to clone; all clones share store, locks and RNG.
#[derive(Clone)]
pub struct GameService {
    store: Arc<dyn GameStore>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    catalog: Arc<Catalog>,
    rng: Arc<Mutex<ChaCha8Rng>>,
    locks: Arc<LockMap>,
    list_limit: usize,
}

impl GameService {
    pub fn new(
        store: Arc<dyn GameStore>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        catalog: Arc<Catalog>,
        ai_seed: Option<u64>,
    ) -> Self {
        let seed = ai_seed.unwrap_or_else(rand::random);
        GameService {
            store,
            scheduler,
            clock,
            catalog,
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            locks: Arc::new(DashMap::new()),
            list_limit: 100,
        }
    }

    pub fn with_list_limit(mut self, limit: usize) -> Self {
        self.list_limit = limit;
        self
    }

    pub fn store(&self) -> &Arc<dyn GameStore> {
        &self.store
    }

    /// Games with a writer in flight or queued.
    pub fn locked_games(&self) -> usize {
        self.locks.len()
    }

    async fn lock(&self, game_id: &str) -> GameLock<'_> {
        let slot = self.locks.entry(game_id.to_owned()).or_default().clone();
        let guard = slot.lock_owned().await;
        GameLock {
            locks: &self.locks,
            game_id: game_id.to_owned(),
            guard: Some(guard),
        }
    }

    async fn load(&self, game_id: &str) -> Result<GameState, GameError> {
        self.store
            .load_game(game_id)
            .await?
            .ok_or_else(|| GameError::not_found(Entity::Game, game_id))
    }

    async fn persist(&self, state: &mut GameState) -> Result<(), GameError> {
        state.updated_at = self.clock.now();
        self.store.save_game(state).await?;
        Ok(())
    }

    async fn record(&self, action: &GameAction) -> Result<(), GameError> {
        self.store.append_action(action).await?;
        metrics::record_op(action.action_type.as_str());
        Ok(())
    }

    /// Serialised read-modify-write of one game.
    async fn mutate<T, F>(&self, game_id: &str, f: F) -> Result<(GameState, T), GameError>
    where
        F: FnOnce(&mut GameState, &Catalog) -> Result<T, GameError> + Send,
        T: Send,
    {
        let _guard = self.lock(game_id).await;
        let mut state = self.load(game_id).await?;
        let out = f(&mut state, &*self.catalog)?;
        self.persist(&mut state).await?;
        Ok((state, out))
    }

    pub async fn create_game(&self, player_name: &str) -> Result<GameState, GameError> {
        let state = logic::new_game(player_name, &self.catalog, self.clock.now());
        self.store.save_game(&state).await?;
        log::info!("game {} created for {player_name}", state.id);
        Ok(state)
    }

    pub async fn get_game(&self, game_id: &str) -> Result<GameState, GameError> {
        self.load(game_id).await
    }

    pub async fn list_games(&self) -> Result<Vec<GameState>, GameError> {
        Ok(self.store.list_games(self.list_limit).await?)
    }

    pub async fn move_units(
        &self,
        game_id: &str,
        unit_ids: &[String],
        x: i32,
        y: i32,
    ) -> Result<GameState, GameError> {
        let now = self.clock.now();
        let (state, action) = self
            .mutate(game_id, |s, _| Ok(logic::move_units(s, unit_ids, x, y, now)))
            .await?;
        self.record(&action).await?;
        Ok(state)
    }

    pub async fn attack(
        &self,
        game_id: &str,
        attacker_id: &str,
        target_id: &str,
    ) -> Result<GameState, GameError> {
        let now = self.clock.now();
        let (state, action) = self
            .mutate(game_id, |s, c| logic::attack(s, c, attacker_id, target_id, now))
            .await?;
        self.record(&action).await?;
        log::debug!("game {game_id}: {attacker_id} hit {target_id}");
        Ok(state)
    }

    pub async fn build(
        &self,
        game_id: &str,
        kind: BuildingType,
        x: i32,
        y: i32,
    ) -> Result<GameState, GameError> {
        let now = self.clock.now();
        let (state, action) = self
            .mutate(game_id, |s, c| logic::build(s, c, kind, x, y, now))
            .await?;
        self.record(&action).await?;
        log::debug!("game {game_id}: built {kind:?} at ({x}, {y})");
        Ok(state)
    }

    pub async fn update_resources(&self, game_id: &str) -> Result<GameState, GameError> {
        let (state, ()) = self
            .mutate(game_id, |s, c| {
                logic::update_resources(s, c);
                Ok(())
            })
            .await?;
        metrics::record_op("resources");
        Ok(state)
    }

    pub async fn ai_turn(&self, game_id: &str) -> Result<GameState, GameError> {
        let rng = &self.rng;
        let (state, ()) = self
            .mutate(game_id, |s, c| {
                let mut rng = rng.lock().unwrap_or_else(PoisonError::into_inner);
                ai::ai_turn(s, c, &mut *rng)
            })
            .await?;
        metrics::record_op("ai_turn");
        Ok(state)
    }

    /// Pay for a unit, store the order and schedule its completion at
    /// `end_time`. Completion failures are logged, never propagated.
    pub async fn produce_unit(
        &self,
        game_id: &str,
        building_id: &str,
        unit_type: UnitType,
    ) -> Result<UnitProduction, GameError> {
        let now = self.clock.now();
        let _guard = self.lock(game_id).await;
        let before = self.load(game_id).await?;
        let mut state = before.clone();
        let (production, action) =
            logic::start_production(&mut state, &self.catalog, building_id, unit_type, now)?;

        self.persist(&mut state).await?;
        if let Err(e) = self.store.save_production(&production).await {
            self.restore(&before).await;
            return Err(e.into());
        }
        self.record(&action).await?;

        let svc = self.clone();
        let production_id = production.id.clone();
        self.scheduler.schedule_at(
            production.end_time,
            Box::pin(async move {
                if let Err(e) = svc.complete_production(&production_id).await {
                    log::warn!("completing production {production_id} failed: {e}");
                }
            }),
        );
        log::debug!(
            "game {game_id}: {unit_type:?} queued at {building_id}, due {}",
            production.end_time
        );
        Ok(production)
    }

    /// Apply a finished production order to its game.
    ///
    /// The game snapshot is written before the order is marked completed, so a
    /// failed write leaves the order pending and the call can be retried.
    pub async fn complete_production(&self, production_id: &str) -> Result<GameState, GameError> {
        let game_id = self
            .store
            .load_production(production_id)
            .await?
            .ok_or_else(|| GameError::not_found(Entity::Production, production_id))?
            .game_id;

        let _guard = self.lock(&game_id).await;

        // Re-read under the lock so a concurrent completion is seen.
        let mut production = self
            .store
            .load_production(production_id)
            .await?
            .ok_or_else(|| GameError::not_found(Entity::Production, production_id))?;
        if production.completed {
            return Err(GameError::AlreadyCompleted);
        }

        let before = self.load(&game_id).await?;
        let mut state = before.clone();
        logic::finish_production(&mut state, &self.catalog, &mut production)?;

        self.persist(&mut state).await?;
        if let Err(e) = self.store.save_production(&production).await {
            self.restore(&before).await;
            return Err(e.into());
        }
        metrics::record_op("complete_production");
        log::info!(
            "game {game_id}: production {production_id} delivered a {:?}",
            production.unit_type
        );
        Ok(state)
    }

    /// Put back the snapshot a half-applied command started from. Caller
    /// holds the game lock.
    async fn restore(&self, snapshot: &GameState) {
        if let Err(e) = self.store.save_game(snapshot).await {
            log::error!("game {}: rollback failed: {e:#}", snapshot.id);
        }
    }

    pub async fn pending_productions(
        &self,
        game_id: &str,
    ) -> Result<Vec<UnitProduction>, GameError> {
        Ok(self.store.list_productions(game_id, false).await?)
    }
}
