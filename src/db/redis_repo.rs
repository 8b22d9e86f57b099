//! Redis-backed document store. Every document is one JSON string.
//
//  Keys
//  ----
//  game:<id>               – STRING  GameState JSON
//  games                   – SET     every game id
//  game:<id>:actions       – LIST    GameAction JSON, append-only
//  game:<id>:productions   – SET     production ids of that game
//  production:<id>         – STRING  UnitProduction JSON

use crate::{
    db::GameStore,
    game::types::{GameAction, GameState, UnitProduction},
};
use anyhow::Context;
use futures::future::BoxFuture;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client as RedisClient};
use serde::de::DeserializeOwned;

#[derive(Clone)]
pub struct RedisRepo {
    client: RedisClient,
}

fn game_key(id: &str) -> String {
    format!("game:{id}")
}

fn production_key(id: &str) -> String {
    format!("production:{id}")
}

impl RedisRepo {
    pub fn new(client: RedisClient) -> Self {
        RedisRepo { client }
    }

    async fn conn(&self) -> anyhow::Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .context("connecting to redis")
    }

    async fn get_json<T: DeserializeOwned>(
        conn: &mut MultiplexedConnection,
        key: &str,
    ) -> anyhow::Result<Option<T>> {
        let raw: Option<String> = conn
            .get(key)
            .await
            .with_context(|| format!("reading {key}"))?;
        raw.map(|json| serde_json::from_str(&json).with_context(|| format!("decoding {key}")))
            .transpose()
    }

    async fn get_many<T: DeserializeOwned>(
        conn: &mut MultiplexedConnection,
        keys: &[String],
    ) -> anyhow::Result<Vec<T>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            // Dangling set members are skipped.
            if let Some(doc) = Self::get_json(conn, key).await? {
                out.push(doc);
            }
        }
        Ok(out)
    }
}

impl GameStore for RedisRepo {
    fn load_game<'a>(&'a self, id: &'a str) -> BoxFuture<'a, anyhow::Result<Option<GameState>>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            Self::get_json(&mut conn, &game_key(id)).await
        })
    }

    fn save_game<'a>(&'a self, state: &'a GameState) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let json = serde_json::to_string(state).context("encoding game")?;
            let mut conn = self.conn().await?;
            let _: () = conn
                .set(game_key(&state.id), json)
                .await
                .context("writing game")?;
            let _: () = conn
                .sadd("games", &state.id)
                .await
                .context("indexing game")?;
            Ok(())
        })
    }

    fn list_games(&self, limit: usize) -> BoxFuture<'_, anyhow::Result<Vec<GameState>>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            let ids: Vec<String> = conn.smembers("games").await.context("listing games")?;
            let keys: Vec<String> = ids.iter().take(limit).map(|id| game_key(id)).collect();
            Self::get_many(&mut conn, &keys).await
        })
    }

    fn append_action<'a>(&'a self, action: &'a GameAction) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let json = serde_json::to_string(action).context("encoding action")?;
            let mut conn = self.conn().await?;
            let _: () = conn
                .rpush(format!("game:{}:actions", action.game_id), json)
                .await
                .context("appending action")?;
            Ok(())
        })
    }

    fn load_production<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, anyhow::Result<Option<UnitProduction>>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            Self::get_json(&mut conn, &production_key(id)).await
        })
    }

    fn save_production<'a>(
        &'a self,
        production: &'a UnitProduction,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let json = serde_json::to_string(production).context("encoding production")?;
            let mut conn = self.conn().await?;
            let _: () = conn
                .set(production_key(&production.id), json)
                .await
                .context("writing production")?;
            let _: () = conn
                .sadd(format!("game:{}:productions", production.game_id), &production.id)
                .await
                .context("indexing production")?;
            Ok(())
        })
    }

    fn list_productions<'a>(
        &'a self,
        game_id: &'a str,
        completed: bool,
    ) -> BoxFuture<'a, anyhow::Result<Vec<UnitProduction>>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            let ids: Vec<String> = conn
                .smembers(format!("game:{game_id}:productions"))
                .await
                .context("listing productions")?;
            let keys: Vec<String> = ids.iter().map(|id| production_key(id)).collect();
            let all: Vec<UnitProduction> = Self::get_many(&mut conn, &keys).await?;
            Ok(all.into_iter().filter(|p| p.completed == completed).collect())
        })
    }

    fn ping(&self) -> BoxFuture<'_, anyhow::Result<()>> {
        Box::pin(async move {
            let mut conn = self.conn().await?;
            conn.ping::<String>().await.context("pinging redis")?;
            Ok(())
        })
    }
}
