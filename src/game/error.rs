//! Engine failure kinds. Every operation either fully succeeds or returns one
//! of these with no mutation persisted.

use crate::game::types::Resource;
use thiserror::Error;

/// Which collection a missing id was looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Game,
    Unit,
    Building,
    Target,
    Production,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Entity::Game => "Game",
            Entity::Unit => "Unit",
            Entity::Building => "Building",
            Entity::Target => "Target",
            Entity::Production => "Production",
        })
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("{0} not found: {1}")]
    NotFound(Entity, String),
    #[error("Insufficient {0}")]
    InsufficientResources(Resource),
    #[error("Position occupied: ({x}, {y})")]
    PositionOccupied { x: i32, y: i32 },
    #[error("Building cannot produce this unit")]
    CannotProduce,
    #[error("Production already completed")]
    AlreadyCompleted,
    #[error("no catalog entry for {0}")]
    InvalidCatalogEntry(String),
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl GameError {
    pub fn not_found(entity: Entity, id: impl Into<String>) -> Self {
        GameError::NotFound(entity, id.into())
    }
}
