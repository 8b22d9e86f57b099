pub mod ai;
pub mod catalog;
pub mod error;
pub mod logic;
pub mod service;
pub mod ticker;
pub mod types;
