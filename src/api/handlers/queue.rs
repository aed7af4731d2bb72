use rocket::serde::json::Json;
use rocket::{Route, State, get, routes};
use std::sync::Arc;

use crate::models::job::JobHandle;
use crate::operations::station::Station;

pub fn generate_queue_routes() -> Vec<Route> {
    routes![get_queue]
}

/// Running and pending jobs, in execution order.
#[get("/queue")]
pub fn get_queue(station: &State<Arc<Station>>) -> Json<Vec<JobHandle>> {
    Json(station.jobs())
}
