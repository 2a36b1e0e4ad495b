//! Integration tests for the machine lifecycle protocols.
//!
//! Every test scripts the API with `MockTransport` and checks both the
//! outcome and the exact calls made.

mod common;

use common::{event, event_response, fast_client, machine, page};
use paperspace_client::{
    CallContext, CancellationToken, MachineCreateConfig, MachineUpdateConfig, MockTransport,
    PaperspaceError, TargetState,
};
use reqwest::Method;
use serde_json::json;

fn create_config(start_on_create: bool) -> MachineCreateConfig {
    MachineCreateConfig {
        name: "build-box".into(),
        machine_type: "C4".into(),
        template_id: "t0nspur5".into(),
        disk_size: 50,
        region: "ny2".into(),
        start_on_create,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_waits_for_event_and_ready_state() {
    let mock = MockTransport::new()
        .on_json(Method::POST, "machines", 200, event_response("ev1", "psm1"))
        .on_json(Method::GET, "machine-events/ev1", 200, event("ev1", "psm1", "running"))
        .on_json(Method::GET, "machine-events/ev1", 200, event("ev1", "psm1", "done"))
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "starting"))
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "ready"));
    let client = fast_client(&mock, 10);

    let created = client
        .create_machine(&CallContext::new(), &create_config(true))
        .await
        .unwrap();

    assert_eq!(created.id, "psm1");
    assert_eq!(created.state, "ready");
    assert_eq!(mock.calls_to(&Method::GET, "machine-events/ev1").len(), 2);
    // starting, ready, then the final re-fetch
    assert_eq!(mock.calls_to(&Method::GET, "machines/psm1").len(), 3);

    let post = &mock.calls_to(&Method::POST, "machines")[0];
    let body = post.body.as_ref().unwrap();
    assert_eq!(body["templateId"], "t0nspur5");
    assert_eq!(body["startOnCreate"], true);
}

#[tokio::test]
async fn test_create_without_start_skips_state_wait() {
    let mock = MockTransport::new()
        .on_json(Method::POST, "machines", 200, event_response("ev1", "psm1"))
        .on_json(Method::GET, "machine-events/ev1", 200, event("ev1", "psm1", "done"))
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "off"));
    let client = fast_client(&mock, 10);

    let created = client
        .create_machine(&CallContext::new(), &create_config(false))
        .await
        .unwrap();

    assert_eq!(created.state, "off");
    assert_eq!(mock.calls_to(&Method::GET, "machines/psm1").len(), 1);
}

#[tokio::test]
async fn test_create_surfaces_event_failure() {
    let mock = MockTransport::new()
        .on_json(Method::POST, "machines", 200, event_response("ev1", "psm1"))
        .on_json(
            Method::GET,
            "machine-events/ev1",
            200,
            json!({"id": "ev1", "name": "create", "state": "error", "error": "quota exceeded"}),
        );
    let client = fast_client(&mock, 10);

    let err = client
        .create_machine(&CallContext::new(), &create_config(true))
        .await
        .unwrap_err();

    match err {
        PaperspaceError::OperationFailed { message, .. } => assert_eq!(message, "quota exceeded"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(mock.calls_to(&Method::GET, "machines/psm1").is_empty());
}

#[tokio::test]
async fn test_empty_update_makes_no_calls() {
    let mock = MockTransport::new();
    let client = fast_client(&mock, 10);

    let sent = client
        .update_machine(&CallContext::new(), "psm1", &MachineUpdateConfig::default())
        .await
        .unwrap();

    assert!(!sent);
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_update_drains_outstanding_events() {
    let finished = json!({
        "id": "ev4",
        "name": "restart",
        "state": "done",
        "machineId": "psm1",
        "dtFinished": "2024-05-01T10:00:00.000Z",
    });
    let mock = MockTransport::new()
        .on_json(Method::PUT, "machines/psm1", 200, json!({"event": event("ev5", "psm1", "running")}))
        .on_json(
            Method::GET,
            "machine-events",
            200,
            page(vec![finished, event("ev5", "psm1", "running")], None),
        )
        .on_json(Method::GET, "machine-events/ev5", 200, event("ev5", "psm1", "running"))
        .on_json(Method::GET, "machine-events/ev5", 200, event("ev5", "psm1", "done"));
    let client = fast_client(&mock, 10);

    let update = MachineUpdateConfig {
        name: Some("renamed".into()),
        ..Default::default()
    };
    let sent = client
        .update_machine(&CallContext::new(), "psm1", &update)
        .await
        .unwrap();

    assert!(sent);
    let put = &mock.calls_to(&Method::PUT, "machines/psm1")[0];
    assert_eq!(put.body, Some(json!({"name": "renamed"})));

    let list = &mock.calls_to(&Method::GET, "machine-events")[0];
    assert_eq!(list.query_value("machineId"), Some("psm1"));

    assert!(mock.calls_to(&Method::GET, "machine-events/ev4").is_empty());
    assert_eq!(mock.calls_to(&Method::GET, "machine-events/ev5").len(), 2);
}

#[tokio::test]
async fn test_update_drain_stops_at_first_failed_event() {
    let mock = MockTransport::new()
        .on_json(Method::PUT, "machines/psm1", 200, json!({"event": event("ev3", "psm1", "running")}))
        .on_json(
            Method::GET,
            "machine-events",
            200,
            page(
                vec![event("ev1", "psm1", "running"), event("ev2", "psm1", "running")],
                None,
            ),
        )
        .on_json(
            Method::GET,
            "machine-events/ev1",
            200,
            json!({"id": "ev1", "name": "update", "state": "error", "error": "boom"}),
        )
        .on_json(Method::GET, "machine-events/ev2", 200, event("ev2", "psm1", "running"));
    let client = fast_client(&mock, 10);

    let update = MachineUpdateConfig {
        name: Some("renamed".into()),
        ..Default::default()
    };
    let err = client
        .update_machine(&CallContext::new(), "psm1", &update)
        .await
        .unwrap_err();

    match err {
        PaperspaceError::OperationFailed { event_id, message, .. } => {
            assert_eq!(event_id, "ev1");
            assert_eq!(message, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(mock.calls_to(&Method::GET, "machine-events/ev2").is_empty());
}

#[tokio::test]
async fn test_start_already_ready_is_noop() {
    let mock = MockTransport::new().on_json(Method::GET, "machines/psm1", 200, machine("psm1", "ready"));
    let client = fast_client(&mock, 10);

    let machine = client.start_machine(&CallContext::new(), "psm1").await.unwrap();

    assert_eq!(machine.state, "ready");
    assert!(mock.calls_to(&Method::PATCH, "machines/psm1/start").is_empty());
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_stop_patches_and_waits_for_off() {
    let mock = MockTransport::new()
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "ready"))
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "stopping"))
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "off"))
        .on(Method::PATCH, "machines/psm1/stop", 200, "{}");
    let client = fast_client(&mock, 10);

    let machine = client.stop_machine(&CallContext::new(), "psm1").await.unwrap();

    assert_eq!(machine.state, "off");
    assert_eq!(mock.calls_to(&Method::PATCH, "machines/psm1/stop").len(), 1);
    assert_eq!(mock.calls_to(&Method::GET, "machines/psm1").len(), 3);
}

#[tokio::test]
async fn test_state_wait_times_out() {
    let mock = MockTransport::new()
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "off"))
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "starting"))
        .on(Method::PATCH, "machines/psm1/start", 200, "{}");
    let client = fast_client(&mock, 3);

    let err = client
        .set_machine_state(&CallContext::new(), "psm1", TargetState::Ready)
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    // initial read plus three probes
    assert_eq!(mock.calls_to(&Method::GET, "machines/psm1").len(), 4);
}

#[tokio::test]
async fn test_delete_of_missing_machine_succeeds_without_polling() {
    let mock = MockTransport::new().on(Method::DELETE, "machines/psm1", 404, "not found");
    let client = fast_client(&mock, 10);

    client.delete_machine(&CallContext::new(), "psm1").await.unwrap();

    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_delete_polls_until_not_found() {
    let mock = MockTransport::new()
        .on(Method::DELETE, "machines/psm1", 200, "{}")
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "stopping"))
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "off"))
        .on(Method::GET, "machines/psm1", 404, "not found");
    let client = fast_client(&mock, 10);

    client.delete_machine(&CallContext::new(), "psm1").await.unwrap();

    assert_eq!(mock.calls_to(&Method::GET, "machines/psm1").len(), 3);
}

#[tokio::test]
async fn test_delete_reports_machine_still_present() {
    let mock = MockTransport::new()
        .on(Method::DELETE, "machines/psm1", 200, "{}")
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "off"));
    let client = fast_client(&mock, 3);

    let err = client
        .delete_machine(&CallContext::new(), "psm1")
        .await
        .unwrap_err();

    assert!(matches!(err, PaperspaceError::NotDeleted { kind: "machine", ref id, .. } if id == "psm1"));
    assert_eq!(mock.calls_to(&Method::GET, "machines/psm1").len(), 3);
}

#[tokio::test]
async fn test_apply_changes_stops_before_resize() {
    let mock = MockTransport::new()
        // current read, stop pre-check, stop convergence
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "ready"))
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "ready"))
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "off"))
        // start pre-check, start convergence and final read
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "off"))
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "ready"))
        .on(Method::PATCH, "machines/psm1/stop", 200, "{}")
        .on(Method::PATCH, "machines/psm1/start", 200, "{}")
        .on_json(Method::PUT, "machines/psm1", 200, json!({"event": event("ev7", "psm1", "running")}))
        .on_json(Method::GET, "machine-events", 200, page(vec![], None));
    let client = fast_client(&mock, 10);

    let update = MachineUpdateConfig {
        disk_size: Some(100),
        ..Default::default()
    };
    let machine = client
        .apply_machine_changes(&CallContext::new(), "psm1", &update, TargetState::Ready)
        .await
        .unwrap();
    assert_eq!(machine.state, "ready");

    let calls = mock.calls();
    let position = |method: Method, path: &str| {
        calls
            .iter()
            .position(|c| c.method == method && c.path == path)
            .unwrap()
    };
    let stop = position(Method::PATCH, "machines/psm1/stop");
    let put = position(Method::PUT, "machines/psm1");
    let start = position(Method::PATCH, "machines/psm1/start");
    assert!(stop < put && put < start);
}

#[tokio::test]
async fn test_apply_changes_keeps_running_machine_when_disk_unchanged() {
    let mock = MockTransport::new()
        .on_json(Method::GET, "machines/psm1", 200, machine("psm1", "ready"))
        .on_json(Method::PUT, "machines/psm1", 200, json!({"event": event("ev8", "psm1", "running")}))
        .on_json(Method::GET, "machine-events", 200, page(vec![], None));
    let client = fast_client(&mock, 10);

    let update = MachineUpdateConfig {
        name: Some("renamed".into()),
        machine_type: Some("C4".into()),
        disk_size: Some(50),
        ..Default::default()
    };
    let machine = client
        .apply_machine_changes(&CallContext::new(), "psm1", &update, TargetState::Ready)
        .await
        .unwrap();

    assert_eq!(machine.state, "ready");
    assert!(mock.calls_to(&Method::PATCH, "machines/psm1/stop").is_empty());
    assert!(mock.calls_to(&Method::PATCH, "machines/psm1/start").is_empty());
    assert_eq!(mock.calls_to(&Method::PUT, "machines/psm1").len(), 1);
}

#[tokio::test]
async fn test_apply_changes_refused_while_transitioning() {
    let mock = MockTransport::new().on_json(Method::GET, "machines/psm1", 200, machine("psm1", "starting"));
    let client = fast_client(&mock, 10);

    let update = MachineUpdateConfig {
        name: Some("renamed".into()),
        ..Default::default()
    };
    let err = client
        .apply_machine_changes(&CallContext::new(), "psm1", &update, TargetState::Ready)
        .await
        .unwrap_err();

    assert!(matches!(err, PaperspaceError::InvalidState { ref state, .. } if state == "starting"));
    assert!(mock.calls_to(&Method::PUT, "machines/psm1").is_empty());
}

#[tokio::test]
async fn test_lifecycle_call_waits_for_lease() {
    let mock = MockTransport::new().on_json(Method::GET, "machines/psm1", 200, machine("psm1", "off"));
    let client = fast_client(&mock, 10);

    let held = client.locks().try_acquire("psm1").unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let ctx = CallContext::new().with_cancellation(token);

    let err = client.start_machine(&ctx, "psm1").await.unwrap_err();
    assert!(matches!(err, PaperspaceError::Cancelled { .. }));
    assert_eq!(mock.call_count(), 0);

    drop(held);
    assert!(!client.locks().is_held("psm1"));
}
