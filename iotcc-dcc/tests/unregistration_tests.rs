mod common;

use common::{uuid, Harness, MockServer};
use iotcc_dcc::protocol::REMOVE_RESOURCE_REQUEST;
use iotcc_dcc::DccError;
use iotcc_store::{ATTR_DEVICE_NAME, ATTR_DEVICE_TYPE, ATTR_EDGE_SYSTEM_NAME};
use iotcc_types::Entity;
use pretty_assertions::assert_eq;
use serde_json::json;

async fn unregister_gateway(server: MockServer) -> (Harness, bool) {
    let h = Harness::new(server.granting("gw-local", "U1"));
    let gw = h
        .cc
        .register_entity(Entity::edge_system("gw-1").with_id("gw-local"))
        .await
        .unwrap();
    assert_eq!(h.summary().await.edge_system().unwrap().uuid, "U1");

    let confirmed = h.cc.unregister(&gw).await.unwrap();
    (h, confirmed)
}

// ── Edge systems ────────────────────────────────────────────────

#[tokio::test]
async fn confirmed_unregister_clears_edge_system() {
    let (h, confirmed) = unregister_gateway(MockServer::default()).await;

    assert!(confirmed);
    assert!(h.summary().await.edge_system().is_none());

    let discovery = h.discovery(&uuid("U1")).await.unwrap();
    assert!(discovery.remove);
    assert_eq!(discovery.attribute(ATTR_EDGE_SYSTEM_NAME), Some("gw-1"));
}

#[tokio::test]
async fn failed_unregister_still_clears_edge_system() {
    let (h, confirmed) =
        unregister_gateway(MockServer::default().removing(Some("failed"))).await;

    assert!(!confirmed);
    assert!(h.summary().await.edge_system().is_none());
    assert!(h.discovery(&uuid("U1")).await.unwrap().remove);
}

#[tokio::test(start_paused = true)]
async fn silent_server_still_clears_edge_system() {
    let (h, confirmed) = unregister_gateway(MockServer::default().removing(None)).await;

    assert!(!confirmed);
    assert!(h.summary().await.edge_system().is_none());
}

#[tokio::test]
async fn remove_request_names_the_entity() {
    let (h, _) = unregister_gateway(MockServer::default()).await;

    let sent = h.transport.sent_of_type(REMOVE_RESOURCE_REQUEST);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0]["body"],
        json!({"kind": "HelixGateway", "id": "gw-local", "name": "gw-1"})
    );
}

#[tokio::test]
async fn other_edge_system_is_left_in_place() {
    let h = Harness::new(MockServer::default());
    let old = h
        .cc
        .register_entity(Entity::edge_system("gw-old").with_id("old"))
        .await
        .unwrap();
    h.cc.register_entity(Entity::edge_system("gw-new").with_id("new"))
        .await
        .unwrap();

    h.cc.unregister(&old).await.unwrap();

    let summary = h.summary().await;
    assert_eq!(summary.edge_system().unwrap().system_name, "gw-new");
}

// ── Devices ─────────────────────────────────────────────────────

#[tokio::test]
async fn unregister_device_drops_summary_entry() {
    let h = Harness::new(
        MockServer::default()
            .granting("a", "DA")
            .granting("b", "DB"),
    );
    let a = h
        .cc
        .register_entity(Entity::device("sensor-a", "LM35").with_id("a"))
        .await
        .unwrap();
    h.cc.register_entity(Entity::device("sensor-b", "LM35").with_id("b"))
        .await
        .unwrap();

    assert!(h.cc.unregister(&a).await.unwrap());

    let summary = h.summary().await;
    let names: Vec<_> = summary.devices().iter().map(|d| d.device_name.as_str()).collect();
    assert_eq!(names, vec!["sensor-b"]);

    let discovery = h.discovery(&uuid("DA")).await.unwrap();
    assert!(discovery.remove);
    assert_eq!(discovery.attribute(ATTR_DEVICE_TYPE), Some("LM35"));
    assert_eq!(discovery.attribute(ATTR_DEVICE_NAME), Some("sensor-a"));
}

#[tokio::test]
async fn unregister_surfaces_transport_failure() {
    let h = Harness::new(MockServer::default());
    let gw = h
        .cc
        .register_entity(Entity::edge_system("gw-1"))
        .await
        .unwrap();
    h.transport.set_failing(true);

    let result = h.cc.unregister(&gw).await;
    assert!(matches!(result, Err(DccError::Transport(_))));
}
