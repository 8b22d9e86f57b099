//! Game lifecycle and command endpoints.

use crate::game::{
    error::GameError,
    service::GameService,
    types::{BuildingType, UnitType},
};
use actix_web::{
    error::{InternalError, JsonPayloadError},
    get,
    http::StatusCode,
    post, web, HttpRequest, HttpResponse, ResponseError,
};
use serde::Deserialize;

/// Engine failures are client errors; only the store yields a 500.
impl ResponseError for GameError {
    fn status_code(&self) -> StatusCode {
        match self {
            GameError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let GameError::Storage(e) = self {
            log::error!("storage failure: {e:?}");
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "detail": self.to_string() }))
    }
}

/// Malformed bodies (unknown unit or building type included) get the same
/// `{"detail"}` shape as engine errors.
fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let body = serde_json::json!({ "detail": err.to_string() });
    InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
}

#[derive(Deserialize)]
pub struct CreateGameReq {
    pub player_name: String,
}

#[derive(Deserialize)]
pub struct MoveReq {
    pub unit_ids: Vec<String>,
    pub target_x: i32,
    pub target_y: i32,
}

#[derive(Deserialize)]
pub struct AttackReq {
    pub attacker_id: String,
    pub target_id: String,
}

#[derive(Deserialize)]
pub struct BuildReq {
    pub building_type: BuildingType,
    pub x: i32,
    pub y: i32,
}

#[derive(Deserialize)]
pub struct ProduceReq {
    pub building_id: String,
    pub unit_type: UnitType,
}

/// POST /api/games
#[post("/games")]
pub async fn create_game(
    info: web::Json<CreateGameReq>,
    svc: web::Data<GameService>,
) -> Result<HttpResponse, GameError> {
    let state = svc.create_game(&info.player_name).await?;
    Ok(HttpResponse::Ok().json(state))
}

/// GET /api/games
#[get("/games")]
pub async fn list_games(svc: web::Data<GameService>) -> Result<HttpResponse, GameError> {
    Ok(HttpResponse::Ok().json(svc.list_games().await?))
}

#[get("/games/{game_id}")]
pub async fn get_game(
    path: web::Path<String>,
    svc: web::Data<GameService>,
) -> Result<HttpResponse, GameError> {
    Ok(HttpResponse::Ok().json(svc.get_game(&path).await?))
}

#[post("/games/{game_id}/move")]
pub async fn move_units(
    path: web::Path<String>,
    info: web::Json<MoveReq>,
    svc: web::Data<GameService>,
) -> Result<HttpResponse, GameError> {
    let state = svc
        .move_units(&path, &info.unit_ids, info.target_x, info.target_y)
        .await?;
    Ok(HttpResponse::Ok().json(state))
}

#[post("/games/{game_id}/attack")]
pub async fn attack(
    path: web::Path<String>,
    info: web::Json<AttackReq>,
    svc: web::Data<GameService>,
) -> Result<HttpResponse, GameError> {
    let state = svc.attack(&path, &info.attacker_id, &info.target_id).await?;
    Ok(HttpResponse::Ok().json(state))
}

#[post("/games/{game_id}/build")]
pub async fn build(
    path: web::Path<String>,
    info: web::Json<BuildReq>,
    svc: web::Data<GameService>,
) -> Result<HttpResponse, GameError> {
    let state = svc.build(&path, info.building_type, info.x, info.y).await?;
    Ok(HttpResponse::Ok().json(state))
}

/// Starts production; completion fires on its own at `end_time`.
#[post("/games/{game_id}/produce")]
pub async fn produce(
    path: web::Path<String>,
    info: web::Json<ProduceReq>,
    svc: web::Data<GameService>,
) -> Result<HttpResponse, GameError> {
    let production = svc
        .produce_unit(&path, &info.building_id, info.unit_type)
        .await?;
    Ok(HttpResponse::Ok().json(production))
}

#[get("/games/{game_id}/productions")]
pub async fn pending_productions(
    path: web::Path<String>,
    svc: web::Data<GameService>,
) -> Result<HttpResponse, GameError> {
    Ok(HttpResponse::Ok().json(svc.pending_productions(&path).await?))
}

#[post("/games/{game_id}/resources")]
pub async fn update_resources(
    path: web::Path<String>,
    svc: web::Data<GameService>,
) -> Result<HttpResponse, GameError> {
    Ok(HttpResponse::Ok().json(svc.update_resources(&path).await?))
}

#[post("/games/{game_id}/ai-turn")]
pub async fn ai_turn(
    path: web::Path<String>,
    svc: web::Data<GameService>,
) -> Result<HttpResponse, GameError> {
    Ok(HttpResponse::Ok().json(svc.ai_turn(&path).await?))
}

/// Manual completion; same checks as the scheduled path.
#[post("/games/{game_id}/complete-production/{production_id}")]
pub async fn complete_production(
    path: web::Path<(String, String)>,
    svc: web::Data<GameService>,
) -> Result<HttpResponse, GameError> {
    let (_game_id, production_id) = path.into_inner();
    Ok(HttpResponse::Ok().json(svc.complete_production(&production_id).await?))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(create_game)
        .service(list_games)
        .service(get_game)
        .service(move_units)
        .service(attack)
        .service(build)
        .service(produce)
        .service(pending_productions)
        .service(update_resources)
        .service(ai_turn)
        .service(complete_production);
}
