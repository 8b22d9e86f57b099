//! Simple liveness / readiness probe

use crate::game::service::GameService;
use actix_web::{get, web, HttpResponse, Responder};

#[get("/healthz")]
pub async fn healthz(svc: web::Data<GameService>) -> impl Responder {
    if let Err(e) = svc.store().ping().await {
        log::warn!("health check: {e:#}");
        return HttpResponse::ServiceUnavailable().body("store");
    }
    HttpResponse::Ok().body("ok")
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(healthz);
}
