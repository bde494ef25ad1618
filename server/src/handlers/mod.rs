use crate::connection::ws_index;
use crate::handlers::polls::configure_poll_handlers;
use actix_web::{web, HttpResponse};
use serde_json::json;

mod error;
mod polls;

pub use error::ApiError;

pub fn root(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ws").route(web::get().to(ws_index)))
        .service(web::resource("/health").route(web::get().to(health)));

    configure_poll_handlers(cfg);
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "OK", "message": "Server is running" }))
}
