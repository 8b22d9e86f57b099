//! Runtime configuration for the RTS server.

use once_cell::sync::Lazy;
use std::env;

/// Where game documents live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug)]
pub struct Settings {
    /// HTTP bind address.
    pub server_addr: String,
    pub redis_url: String,
    pub store_backend: StoreBackend,
    /// Seconds between background economy / AI ticks; 0 disables the ticker.
    pub tick_secs: u64,
    /// Fixed seed for the AI RNG (reproducible runs).
    pub ai_seed: Option<u64>,
    /// JSON catalog replacing the built-in one.
    pub catalog_path: Option<String>,
    /// Cap on `GET /games`.
    pub list_limit: usize,
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl Settings {
    fn from_env() -> Self {
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into());
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".into());

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            _ => StoreBackend::Redis,
        };

        Settings {
            server_addr,
            redis_url,
            store_backend,
            tick_secs: parsed("TICK_SECS").unwrap_or(0),
            ai_seed: parsed("AI_SEED"),
            catalog_path: env::var("CATALOG_PATH").ok().filter(|p| !p.is_empty()),
            list_limit: parsed("LIST_LIMIT").unwrap_or(100),
        }
    }
}

static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

pub fn settings() -> &'static Settings {
    &SETTINGS
}
