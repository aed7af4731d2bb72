use rocket::serde::json::Json;
use rocket::{Route, State, get, post, put, routes};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::spawn_blocking;

use crate::api::AppResult;
use crate::common::errors::StationError;
use crate::models::category::Category;
use crate::models::job::JobHandle;
use crate::models::workflow::{Workflow, WorkflowId, WorkflowSummary};
use crate::operations::station::{CreateWorkflow, Station};
use crate::schema::aggregator::MergedSchema;

pub fn generate_workflow_routes() -> Vec<Route> {
    routes![
        create_workflow,
        list_workflows,
        get_workflow,
        get_config,
        update_config,
        get_options,
        trigger_stage
    ]
}

#[derive(Debug, Serialize)]
pub struct Created {
    id: WorkflowId,
}

#[derive(Debug, Serialize)]
pub struct WorkflowList {
    workflows: Vec<WorkflowSummary>,
}

#[post("/workflow", format = "json", data = "<request>")]
pub async fn create_workflow(
    station: &State<Arc<Station>>,
    request: Json<CreateWorkflow>,
) -> AppResult<Json<Created>> {
    let station = Arc::clone(station);
    let workflow =
        spawn_blocking(move || station.create_workflow(request.into_inner())).await??;
    Ok(Json(Created { id: workflow.id }))
}

#[get("/workflow")]
pub async fn list_workflows(station: &State<Arc<Station>>) -> AppResult<Json<WorkflowList>> {
    let station = Arc::clone(station);
    let workflows = spawn_blocking(move || station.list_workflows()).await??;
    Ok(Json(WorkflowList { workflows }))
}

#[get("/workflow/<id>")]
pub async fn get_workflow(
    station: &State<Arc<Station>>,
    id: WorkflowId,
) -> AppResult<Json<Workflow>> {
    let station = Arc::clone(station);
    let workflow = spawn_blocking(move || station.get_workflow(id)).await??;
    Ok(Json(workflow))
}

#[get("/workflow/<id>/config")]
pub async fn get_config(station: &State<Arc<Station>>, id: WorkflowId) -> AppResult<Json<Value>> {
    let station = Arc::clone(station);
    let config = spawn_blocking(move || station.get_config(id)).await??;
    Ok(Json(config))
}

#[put("/workflow/<id>/config", format = "json", data = "<fragment>")]
pub async fn update_config(
    station: &State<Arc<Station>>,
    id: WorkflowId,
    fragment: Json<Value>,
) -> AppResult<Json<Value>> {
    let station = Arc::clone(station);
    let config = spawn_blocking(move || station.update_config(id, &fragment)).await??;
    Ok(Json(config))
}

/// Configuration options of every extension active for the workflow.
#[get("/workflow/<id>/options")]
pub async fn get_options(
    station: &State<Arc<Station>>,
    id: WorkflowId,
) -> AppResult<Json<Arc<MergedSchema>>> {
    let station = Arc::clone(station);
    let schema = spawn_blocking(move || station.get_schema(id)).await??;
    Ok(Json(schema))
}

#[post("/workflow/<id>/<category>")]
pub async fn trigger_stage(
    station: &State<Arc<Station>>,
    id: WorkflowId,
    category: Result<Category, StationError>,
) -> AppResult<Json<JobHandle>> {
    let category = category?;
    let station = Arc::clone(station);
    let handle = spawn_blocking(move || station.trigger(id, category)).await??;
    Ok(Json(handle))
}
