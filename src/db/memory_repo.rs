//! Process-local store used by tests and `STORE_BACKEND=memory`.

use crate::{
    db::GameStore,
    game::types::{GameAction, GameState, UnitProduction},
};
use dashmap::DashMap;
use futures::future::{self, BoxFuture};
use std::sync::Arc;

fn ready<'a, T: Send + 'a>(value: T) -> BoxFuture<'a, anyhow::Result<T>> {
    Box::pin(future::ready(anyhow::Ok(value)))
}

#[derive(Clone, Default)]
pub struct MemoryRepo {
    games: Arc<DashMap<String, GameState>>,
    actions: Arc<DashMap<String, Vec<GameAction>>>,
    productions: Arc<DashMap<String, UnitProduction>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Audit trail recorded for one game, oldest first.
    pub fn actions(&self, game_id: &str) -> Vec<GameAction> {
        self.actions
            .get(game_id)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }
}

impl GameStore for MemoryRepo {
    fn load_game<'a>(&'a self, id: &'a str) -> BoxFuture<'a, anyhow::Result<Option<GameState>>> {
        let found = self.games.get(id).map(|e| e.value().clone());
        ready(found)
    }

    fn save_game<'a>(&'a self, state: &'a GameState) -> BoxFuture<'a, anyhow::Result<()>> {
        self.games.insert(state.id.clone(), state.clone());
        ready(())
    }

    fn list_games(&self, limit: usize) -> BoxFuture<'_, anyhow::Result<Vec<GameState>>> {
        let all: Vec<GameState> = self
            .games
            .iter()
            .take(limit)
            .map(|e| e.value().clone())
            .collect();
        ready(all)
    }

    fn append_action<'a>(&'a self, action: &'a GameAction) -> BoxFuture<'a, anyhow::Result<()>> {
        self.actions
            .entry(action.game_id.clone())
            .or_default()
            .push(action.clone());
        ready(())
    }

    fn load_production<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Option<UnitProduction>>> {
        let found = self.productions.get(id).map(|e| e.value().clone());
        ready(found)
    }

    fn save_production<'a>(
        &'a self,
        production: &'a UnitProduction,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        self.productions
            .insert(production.id.clone(), production.clone());
        ready(())
    }

    fn list_productions<'a>(
        &'a self,
        game_id: &'a str,
        completed: bool,
    ) -> BoxFuture<'a, anyhow::Result<Vec<UnitProduction>>> {
        let matching: Vec<UnitProduction> = self
            .productions
            .iter()
            .filter(|e| e.game_id == game_id && e.completed == completed)
            .map(|e| e.value().clone())
            .collect();
        ready(matching)
    }

    fn ping(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        ready(())
    }
}
