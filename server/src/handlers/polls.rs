use actix_web::{error, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use system::{PollCode, PollCoordinator, PollError, PollQueries};

use super::ApiError;

pub fn configure_poll_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/polls")
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))
            .service(web::resource("/create").route(web::post().to(create_poll)))
            .service(web::resource("/teacher/{teacher_id}").route(web::get().to(teacher_polls)))
            .service(web::resource("/{poll_code}").route(web::get().to(get_poll)))
            .service(web::resource("/{poll_code}/results").route(web::get().to(poll_results)))
            .service(web::resource("/{poll_code}/chat").route(web::get().to(chat_history))),
    );
}

fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError(PollError::validation(err.to_string())).into()
}

fn success<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "success": true, "data": data }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollBody {
    teacher_id: String,
}

async fn create_poll(
    body: web::Json<CreatePollBody>,
    coordinator: web::Data<Arc<PollCoordinator>>,
) -> Result<HttpResponse, ApiError> {
    if body.teacher_id.trim().is_empty() {
        return Err(PollError::validation("teacherId is required").into());
    }
    let poll = coordinator.create_poll(&body.teacher_id).await?;
    Ok(HttpResponse::Created().json(json!({ "success": true, "data": poll })))
}

async fn get_poll(
    path: web::Path<String>,
    queries: web::Data<PollQueries>,
) -> Result<HttpResponse, ApiError> {
    let poll = queries.get_poll(&path.parse::<PollCode>()?).await?;
    Ok(success(poll))
}

async fn teacher_polls(
    path: web::Path<String>,
    queries: web::Data<PollQueries>,
) -> Result<HttpResponse, ApiError> {
    let polls = queries.polls_by_teacher(&path.into_inner()).await?;
    Ok(success(polls))
}

async fn poll_results(
    path: web::Path<String>,
    queries: web::Data<PollQueries>,
) -> Result<HttpResponse, ApiError> {
    let reports = queries.poll_results(&path.parse::<PollCode>()?).await?;
    Ok(success(reports))
}

async fn chat_history(
    path: web::Path<String>,
    queries: web::Data<PollQueries>,
) -> Result<HttpResponse, ApiError> {
    let messages = queries.chat_history(&path.parse::<PollCode>()?).await?;
    Ok(success(messages))
}
