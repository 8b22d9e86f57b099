//! Real-time strategy game backend: a snapshot-based game engine behind a
//! small REST API, backed by a Redis document store.

pub mod config;
pub mod db;
pub mod game;
pub mod http;
pub mod metrics;
pub mod scheduler;
