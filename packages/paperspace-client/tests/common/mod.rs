//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use paperspace_client::{MockTransport, PaperspaceClient, PollPolicy, PollSettings};
use serde_json::{json, Value};

/// Client over `mock` that polls every millisecond, at most `attempts` times.
pub fn fast_client(mock: &MockTransport, attempts: u32) -> PaperspaceClient {
    PaperspaceClient::new(mock.clone()).with_poll_policy(PollPolicy::uniform(
        PollSettings::attempts(Duration::from_millis(1), attempts),
    ))
}

pub fn machine(id: &str, state: &str) -> Value {
    json!({
        "id": id,
        "name": "build-box",
        "state": state,
        "machineType": "C4",
        // 50 GiB
        "storageTotal": "53687091200",
        "region": "ny2",
    })
}

pub fn event(id: &str, machine_id: &str, state: &str) -> Value {
    json!({
        "id": id,
        "name": "update",
        "state": state,
        "machineId": machine_id,
    })
}

pub fn event_response(event_id: &str, machine_id: &str) -> Value {
    json!({
        "event": event(event_id, machine_id, "running"),
        "data": machine(machine_id, "provisioning"),
    })
}

pub fn template(id: &str, name: &str, created: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "dtCreated": created,
    })
}

pub fn page(items: Vec<Value>, next_page: Option<&str>) -> Value {
    json!({
        "items": items,
        "nextPage": next_page,
        "hasMore": next_page.is_some(),
    })
}
