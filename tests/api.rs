mod common;

use rocket::http::{ContentType, Status};
use rocket::local::blocking::Client;
use serde_json::{Value, json};
use std::collections::BTreeSet;

use common::{config, station};
use scan_station::api::build_rocket;
use scan_station::config::Mode;
use scan_station::extensions::registry::ExtensionRegistry;

fn client(mode: Mode, queue_capacity: usize, dir: &std::path::Path) -> Client {
    let mut config = config(mode, dir);
    config.queue_capacity = queue_capacity;
    let station = station(config, ExtensionRegistry::builtin(), dir);
    Client::tracked(build_rocket(station)).unwrap()
}

fn create(client: &Client, body: Value) -> u64 {
    let response = client
        .post("/workflow")
        .header(ContentType::JSON)
        .body(body.to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let created: Value = response.into_json().unwrap();
    created["id"].as_u64().unwrap()
}

fn option_names(client: &Client, id: u64) -> BTreeSet<String> {
    let response = client.get(format!("/workflow/{id}/options")).dispatch();
    assert_eq!(response.status(), Status::Ok);
    let schema: Value = response.into_json().unwrap();
    schema.as_object().unwrap().keys().cloned().collect()
}

#[test]
fn scanner_schema_contains_only_capture_entries() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(Mode::Scanner, 8, dir.path());
    let id = create(&client, json!({"name": "sample"}));

    let names = option_names(&client, id);
    assert_eq!(
        names,
        BTreeSet::from(["dummy".to_string(), "rawcheck".to_string()])
    );

    let response = client.get(format!("/workflow/{id}/options")).dispatch();
    let schema: Value = response.into_json().unwrap();
    assert_eq!(
        schema["dummy"]["pages"],
        json!({"value": 2, "docstring": "Pages written per capture", "selectable": false})
    );
}

#[test]
fn processor_schema_has_no_driver() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(Mode::Processor, 8, dir.path());
    let id = create(&client, json!({"name": "sample", "step": "capture", "step_done": true}));
    assert_eq!(
        option_names(&client, id),
        BTreeSet::from(["autorotate".to_string(), "manifest".to_string()])
    );
}

#[test]
fn driver_change_is_reflected_in_schema() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(Mode::Full, 8, dir.path());
    let id = create(&client, json!({"name": "sample"}));
    assert!(option_names(&client, id).contains("dummy"));

    let response = client
        .put(format!("/workflow/{id}/config"))
        .header(ContentType::JSON)
        .body(json!({"driver": "directory", "directory": {"source": "/media/card"}}).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    let config: Value = response.into_json().unwrap();
    assert_eq!(config["driver"], "directory");

    let names = option_names(&client, id);
    assert!(names.contains("directory"));
    assert!(!names.contains("dummy"));

    let config: Value = client
        .get(format!("/workflow/{id}/config"))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(config["directory"]["source"], "/media/card");
}

#[test]
fn second_trigger_is_rejected_as_busy() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(Mode::Full, 8, dir.path());
    let id = create(&client, json!({"name": "sample", "step": "capture", "step_done": true}));

    let response = client.post(format!("/workflow/{id}/process")).dispatch();
    assert_eq!(response.status(), Status::Ok);
    let handle: Value = response.into_json().unwrap();
    assert_eq!(handle["workflowId"], id);
    assert_eq!(handle["category"], "process");
    assert_eq!(handle["status"], "pending");

    let response = client.post(format!("/workflow/{id}/process")).dispatch();
    assert_eq!(response.status(), Status::Conflict);
    let body: Value = response.into_json().unwrap();
    assert!(body["error"].as_str().unwrap().contains("active job"));

    let queue: Value = client.get("/queue").dispatch().into_json().unwrap();
    assert_eq!(queue.as_array().unwrap().len(), 1);
}

#[test]
fn trigger_reports_state_mode_and_capacity_errors() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(Mode::Scanner, 1, dir.path());
    let first = create(&client, json!({"name": "first"}));
    let second = create(&client, json!({"name": "second"}));

    let status = |path: String| client.post(path).dispatch().status();
    assert_eq!(status(format!("/workflow/{first}/device")), Status::BadRequest);
    assert_eq!(status(format!("/workflow/{first}/process")), Status::BadRequest);
    assert_eq!(status(format!("/workflow/{first}/capture")), Status::Ok);
    assert_eq!(
        status(format!("/workflow/{second}/capture")),
        Status::ServiceUnavailable
    );
    assert_eq!(status("/workflow/99/capture".to_string()), Status::NotFound);
}

#[test]
fn lists_and_fetches_workflows() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(Mode::Full, 8, dir.path());
    let id = create(&client, json!({"name": "sample", "config": {"dummy": {"pages": 5}}}));

    let listing: Value = client.get("/workflow").dispatch().into_json().unwrap();
    let workflows = listing["workflows"].as_array().unwrap();
    assert_eq!(workflows.len(), 1);
    assert_eq!(workflows[0]["name"], "sample");
    assert_eq!(workflows[0]["status"]["state"], "created");
    assert_eq!(workflows[0]["imageCount"], 0);

    let workflow: Value = client
        .get(format!("/workflow/{id}"))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(workflow["config"]["driver"], "dummy");
    assert_eq!(workflow["config"]["dummy"]["pages"], 5);
}

#[test]
fn unknown_workflow_and_bad_input_map_to_client_errors() {
    let dir = tempfile::tempdir().unwrap();
    let client = client(Mode::Full, 8, dir.path());

    let response = client.get("/workflow/42").dispatch();
    assert_eq!(response.status(), Status::NotFound);
    let body: Value = response.into_json().unwrap();
    assert_eq!(body["error"], "workflow 42 not found");
    assert!(body["chain"].is_array());

    assert_eq!(client.get("/workflow/42/options").dispatch().status(), Status::NotFound);

    let response = client
        .post("/workflow")
        .header(ContentType::JSON)
        .body(json!({"name": "a/b"}).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::BadRequest);

    let id = create(&client, json!({"name": "sample"}));
    let response = client
        .put(format!("/workflow/{id}/config"))
        .header(ContentType::JSON)
        .body(json!({"driver": "gphoto2"}).to_string())
        .dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
        client.get(format!("/workflow/{id}/options")).dispatch().status(),
        Status::BadRequest
    );
}

#[test]
fn station_info_reports_postprocessing_server_in_scanner_mode() {
    let dir = tempfile::tempdir().unwrap();
    let info = |mode: Mode| -> Value {
        let mut config = config(mode, dir.path());
        config.postprocessing_server = "http://10.0.0.2:5000".to_string();
        let station = station(config, ExtensionRegistry::builtin(), dir.path());
        let client = Client::tracked(build_rocket(station)).unwrap();
        let response = client.get("/station").dispatch();
        assert_eq!(response.status(), Status::Ok);
        response.into_json().unwrap()
    };

    assert_eq!(
        info(Mode::Scanner),
        json!({"mode": "scanner", "postprocessingServer": "http://10.0.0.2:5000"})
    );
    assert_eq!(
        info(Mode::Processor),
        json!({"mode": "processor", "postprocessingServer": null})
    );
}
