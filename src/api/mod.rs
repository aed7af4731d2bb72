pub mod handlers;

use rocket::http::{ContentType, Status};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::{Build, Rocket};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

use crate::common::errors::StationError;
use crate::operations::station::Station;
use handlers::queue::generate_queue_routes;
use handlers::system::generate_system_routes;
use handlers::workflow::generate_workflow_routes;

#[derive(Debug)]
pub struct AppError {
    pub status: Status,
    pub error: anyhow::Error,
}

#[rocket::async_trait]
impl<'r, 'o: 'r> Responder<'r, 'o> for AppError {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'o> {
        let outer_msg = self.error.to_string();

        let chain: Vec<String> = self.error.chain().map(|e| e.to_string()).collect();

        let body = json!({
            "error": outer_msg,
            "chain": chain,
        })
        .to_string();

        Response::build()
            .status(self.status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

impl<E> From<E> for AppError
where
    anyhow::Error: From<E>,
{
    fn from(err: E) -> Self {
        let error = anyhow::Error::from(err);
        let status = error
            .downcast_ref::<StationError>()
            .map(status_of)
            .unwrap_or(Status::InternalServerError);
        AppError { status, error }
    }
}

fn status_of(error: &StationError) -> Status {
    match error {
        StationError::NotFound(_) => Status::NotFound,
        StationError::WorkflowBusy(_) | StationError::InvalidTransition { .. } => Status::Conflict,
        StationError::QueueFull { .. } => Status::ServiceUnavailable,
        StationError::UnknownDriver(_)
        | StationError::CategoryInactive(_)
        | StationError::InvalidName(_)
        | StationError::InvalidCategory(_)
        | StationError::InvalidConfig(_) => Status::BadRequest,
        StationError::Internal(_) => Status::InternalServerError,
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Rocket instance serving the station API, bound to the configured address.
pub fn build_rocket(station: Arc<Station>) -> Rocket<Build> {
    let config = station.config();
    let figment = rocket::Config::figment()
        .merge(("address", config.address.clone()))
        .merge(("port", config.port))
        .merge(("shutdown.ctrlc", true));

    rocket::custom(figment)
        .manage(station)
        .mount("/", generate_workflow_routes())
        .mount("/", generate_queue_routes())
        .mount("/", generate_system_routes())
}
