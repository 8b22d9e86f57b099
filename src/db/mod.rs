//! Document storage for game snapshots, audit records and production orders.
//!
//! Only whole-document load / replace and filtered listing are assumed; there
//! is no partial update and no transaction. Writers serialise per game above
//! this layer.

pub mod memory_repo;
pub mod redis_repo;

use crate::game::types::{GameAction, GameState, UnitProduction};
use futures::future::BoxFuture;

pub use memory_repo::MemoryRepo;
pub use redis_repo::RedisRepo;

pub trait GameStore: Send + Sync {
    fn load_game<'a>(&'a self, id: &'a str) -> BoxFuture<'a, anyhow::Result<Option<GameState>>>;

    /// Full-document replace (insert if new).
    fn save_game<'a>(&'a self, state: &'a GameState) -> BoxFuture<'a, anyhow::Result<()>>;

    fn list_games(&self, limit: usize) -> BoxFuture<'_, anyhow::Result<Vec<GameState>>>;

    fn append_action<'a>(&'a self, action: &'a GameAction) -> BoxFuture<'a, anyhow::Result<()>>;

    fn load_production<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Option<UnitProduction>>>;

    fn save_production<'a>(
        &'a self,
        production: &'a UnitProduction,
    ) -> BoxFuture<'a, anyhow::Result<()>>;

    /// Production orders of one game whose `completed` flag equals `completed`.
    fn list_productions<'a>(
        &'a self,
        game_id: &'a str,
        completed: bool,
    ) -> BoxFuture<'a, anyhow::Result<Vec<UnitProduction>>>;

    /// Liveness probe for the health endpoint.
    fn ping(&self) -> BoxFuture<'_, anyhow::Result<()>>;
}
