use async_trait::async_trait;
use iotcc_dcc::protocol::{CreateOrFindResourceRequest, CREATE_OR_FIND_RESOURCE_RESPONSE};
use iotcc_dcc::transport::mock::MockTransport;
use iotcc_dcc::{inbox, Correlator, DccError, DccResult, TransactionId, TransactionIds, Transport};
use iotcc_types::Entity;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const RESPONSE: &str = CREATE_OR_FIND_RESOURCE_RESPONSE;

fn echo_server(req: &serde_json::Value) -> Vec<serde_json::Value> {
    vec![json!({
        "type": RESPONSE,
        "transactionID": req["transactionID"],
        "body": {"id": req["body"]["id"], "uuid": format!("reg-{}", req["body"]["id"].as_str().unwrap())}
    })]
}

fn response_for(id: &str) -> String {
    json!({"type": RESPONSE, "body": {"id": id, "uuid": format!("reg-{id}")}}).to_string()
}

fn raw(id: TransactionId) -> u64 {
    serde_json::to_value(id).unwrap().as_u64().unwrap()
}

struct NullTransport;

#[async_trait]
impl Transport for NullTransport {
    async fn send(&self, _payload: String) -> DccResult<()> {
        Ok(())
    }
}

// ── Transaction ids ─────────────────────────────────────────────

#[test]
fn ids_are_even_and_start_at_two() {
    let ids = TransactionIds::new();
    let first: Vec<u64> = (0..5).map(|_| raw(ids.next())).collect();
    assert_eq!(first, vec![2, 4, 6, 8, 10]);
}

#[test]
fn ids_stay_within_24_bit_counter_space() {
    assert_eq!(raw(TransactionId::from_counter(0x00FF_FFFF)), 0x01FF_FFFE);
    assert_eq!(raw(TransactionId::from_counter(0x0100_0000)), 0);
}

#[test]
fn ids_are_unique_across_threads() {
    let ids = Arc::new(TransactionIds::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let ids = ids.clone();
            std::thread::spawn(move || (0..500).map(|_| ids.next()).collect::<Vec<_>>())
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert_eq!(raw(id) % 2, 0);
            assert!(seen.insert(id), "duplicate id {id}");
        }
    }
    assert_eq!(seen.len(), 4000);
}

// ── Matching ────────────────────────────────────────────────────

#[tokio::test]
async fn correlate_returns_matching_response() {
    let (tx, rx) = inbox();
    let transport = Arc::new(MockTransport::with_responder(tx, echo_server));
    let correlator = Correlator::new(transport.clone(), rx);
    let entity = Entity::edge_system("gw-1").with_id("local-1");

    let msg = correlator
        .correlate(
            RESPONSE,
            |id| CreateOrFindResourceRequest::new(id, &entity),
            |m| m.is(RESPONSE) && m.body_str("id") == Some("local-1"),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    assert_eq!(msg.granted_uuid(), Some("reg-local-1"));
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["transactionID"], 2);
}

#[tokio::test]
async fn correlate_discards_unrelated_frames() {
    let (tx, rx) = inbox();
    let transport = Arc::new(MockTransport::new(tx.clone()));
    let correlator = Correlator::new(transport, rx);
    let entity = Entity::device("thermo", "LM35").with_id("mine");

    tx.deliver("not json at all");
    tx.deliver(json!({"type": "add_properties", "body": {}}).to_string());
    tx.deliver(response_for("someone-else"));
    tx.deliver(response_for("mine"));

    let msg = correlator
        .correlate(
            RESPONSE,
            |id| CreateOrFindResourceRequest::new(id, &entity),
            |m| m.is(RESPONSE) && m.body_str("id") == Some("mine"),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    assert_eq!(msg.body_str("id"), Some("mine"));
}

#[tokio::test]
async fn correlate_never_returns_mismatched_id() {
    let (tx, rx) = inbox();
    let transport = Arc::new(MockTransport::new(tx.clone()));
    let correlator = Correlator::new(transport, rx);
    let entity = Entity::edge_system("gw").with_id("wanted");

    for i in 0..20 {
        tx.deliver(response_for(&format!("other-{i}")));
    }

    let result = correlator
        .correlate(
            RESPONSE,
            |id| CreateOrFindResourceRequest::new(id, &entity),
            |m| m.is(RESPONSE) && m.body_str("id") == Some("wanted"),
            Duration::from_millis(50),
        )
        .await;

    assert!(matches!(
        result,
        Err(DccError::CorrelationTimeout { expected: RESPONSE, .. })
    ));
}

#[tokio::test]
async fn correlate_matches_whatever_transaction_id_shape_is_echoed() {
    let (tx, rx) = inbox();
    let transport = Arc::new(MockTransport::new(tx.clone()));
    let correlator = Correlator::new(transport, rx);
    let entity = Entity::edge_system("gw").with_id("local-1");

    tx.deliver(
        json!({
            "type": RESPONSE,
            "transactionID": "2",
            "body": {"id": "local-1", "uuid": "U1"}
        })
        .to_string(),
    );

    let msg = correlator
        .correlate(
            RESPONSE,
            |id| CreateOrFindResourceRequest::new(id, &entity),
            |m| m.is(RESPONSE) && m.body_str("id") == Some("local-1"),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

    assert_eq!(msg.granted_uuid(), Some("U1"));
    assert_eq!(msg.transaction_id, Some(json!("2")));
}

#[tokio::test]
async fn negative_or_fractional_transaction_ids_are_not_dropped() {
    for echoed in [json!(-4), json!(2.5), json!(null), json!({"id": 2})] {
        let (tx, rx) = inbox();
        let transport = Arc::new(MockTransport::new(tx.clone()));
        let correlator = Correlator::new(transport, rx);
        let entity = Entity::edge_system("gw").with_id("local-1");

        tx.deliver(
            json!({
                "type": RESPONSE,
                "transactionID": echoed,
                "body": {"id": "local-1", "uuid": "U1"}
            })
            .to_string(),
        );

        let result = correlator
            .correlate(
                RESPONSE,
                |id| CreateOrFindResourceRequest::new(id, &entity),
                |m| m.is(RESPONSE) && m.body_str("id") == Some("local-1"),
                Duration::from_millis(200),
            )
            .await;

        assert!(result.is_ok(), "response with transactionID {echoed} was dropped");
    }
}

// ── Deadline ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn busy_inbox_cannot_extend_the_deadline() {
    let (tx, rx) = inbox();
    let transport = Arc::new(MockTransport::new(tx.clone()));
    let correlator = Correlator::new(transport, rx);
    let entity = Entity::edge_system("gw").with_id("starved");

    let noise = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(900)).await;
            if !tx.deliver(response_for("noise")) {
                break;
            }
        }
    });

    let start = Instant::now();
    let result = correlator
        .correlate(
            RESPONSE,
            |id| CreateOrFindResourceRequest::new(id, &entity),
            |m| m.body_str("id") == Some("starved"),
            Duration::from_secs(5),
        )
        .await;
    let elapsed = start.elapsed();
    noise.abort();

    assert!(matches!(result, Err(DccError::CorrelationTimeout { .. })));
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(6), "deadline drifted to {elapsed:?}");
}

#[tokio::test]
async fn closed_inbox_is_reported() {
    let (tx, rx) = inbox();
    let correlator = Correlator::new(Arc::new(NullTransport), rx);
    drop(tx);
    let entity = Entity::edge_system("gw");

    let result = correlator
        .correlate(
            RESPONSE,
            |id| CreateOrFindResourceRequest::new(id, &entity),
            |_| true,
            Duration::from_secs(5),
        )
        .await;

    assert!(matches!(result, Err(DccError::InboxClosed)));
}

#[tokio::test]
async fn send_failure_propagates() {
    let (tx, rx) = inbox();
    let transport = Arc::new(MockTransport::new(tx));
    transport.set_failing(true);
    let correlator = Correlator::new(transport.clone(), rx);
    let entity = Entity::edge_system("gw");

    let result = correlator
        .correlate(
            RESPONSE,
            |id| CreateOrFindResourceRequest::new(id, &entity),
            |_| true,
            Duration::from_secs(5),
        )
        .await;

    assert!(matches!(result, Err(DccError::Transport(_))));
    assert!(transport.sent().is_empty());
}

// ── Single flight ───────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_get_their_own_responses() {
    let (tx, rx) = inbox();
    let transport = Arc::new(MockTransport::with_responder(tx, echo_server));
    let correlator = Arc::new(Correlator::new(transport.clone(), rx));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let correlator = correlator.clone();
            tokio::spawn(async move {
                let local = format!("local-{i}");
                let entity = Entity::device(format!("dev-{i}"), "LM35").with_id(local.as_str());
                let msg = correlator
                    .correlate(
                        RESPONSE,
                        |id| CreateOrFindResourceRequest::new(id, &entity),
                        |m| m.is(RESPONSE) && m.body_str("id") == Some(local.as_str()),
                        Duration::from_secs(5),
                    )
                    .await
                    .unwrap();
                (local, msg.granted_uuid().map(String::from))
            })
        })
        .collect();

    for task in tasks {
        let (local, granted) = task.await.unwrap();
        assert_eq!(granted, Some(format!("reg-{local}")));
    }

    let ids: HashSet<_> = transport
        .sent()
        .iter()
        .map(|m| m["transactionID"].as_u64().unwrap())
        .collect();
    assert_eq!(ids.len(), 16);
}
