use actix_web::{middleware::Logger, web, App, HttpServer};
use redis::Client as RedisClient;
use rts_server::{
    config::{settings, StoreBackend},
    db::{GameStore, MemoryRepo, RedisRepo},
    game::{
        catalog::{Catalog, STANDARD},
        service::GameService,
        ticker,
    },
    http, metrics,
    scheduler::{Clock, SystemClock, TokioScheduler},
};
use std::sync::Arc;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cfg = settings();

    // Content tables
    let catalog = match &cfg.catalog_path {
        Some(path) => Catalog::load(path).map_err(std::io::Error::other)?,
        None => Catalog::clone(&STANDARD),
    };

    // Document store
    let store: Arc<dyn GameStore> = match cfg.store_backend {
        StoreBackend::Memory => {
            log::warn!("using in-memory store; games are lost on restart");
            Arc::new(MemoryRepo::new())
        }
        StoreBackend::Redis => {
            let client = RedisClient::open(cfg.redis_url.as_str()).map_err(std::io::Error::other)?;
            let backoff = ExponentialBackoff::from_millis(100).map(jitter).take(5);
            Retry::spawn(backoff, || client.get_multiplexed_async_connection())
                .await
                .map_err(std::io::Error::other)?;
            Arc::new(RedisRepo::new(client))
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let svc = GameService::new(
        store,
        Arc::new(TokioScheduler::new(clock.clone())),
        clock,
        Arc::new(catalog),
        cfg.ai_seed,
    )
    .with_list_limit(cfg.list_limit);

    // Background income / AI loop
    ticker::start(svc.clone(), cfg.tick_secs);

    log::info!("listening on {}", cfg.server_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(metrics::METRICS.clone())
            .app_data(web::Data::new(svc.clone()))
            .configure(http::routes::init_routes)
    })
    .bind(&cfg.server_addr)?
    .run()
    .await
}
