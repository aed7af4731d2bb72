use rocket::serde::json::Json;
use rocket::{Route, State, get, routes};
use serde::Serialize;
use std::sync::Arc;

use crate::config::Mode;
use crate::operations::station::Station;

pub fn generate_system_routes() -> Vec<Route> {
    routes![get_station]
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationInfo {
    mode: Mode,
    postprocessing_server: Option<String>,
}

#[get("/station")]
pub fn get_station(station: &State<Arc<Station>>) -> Json<StationInfo> {
    let config = station.config();
    Json(StationInfo {
        mode: config.mode,
        postprocessing_server: config.postprocessing_server().map(str::to_string),
    })
}
