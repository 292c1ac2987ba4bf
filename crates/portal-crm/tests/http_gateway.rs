//! ---
//! portal_section: "05-external-interfaces"
//! portal_subsection: "tests"
//! portal_type: "test"
//! portal_scope: "code"
//! portal_description: "HTTP CRM gateway against an in-process fake CRM."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use parking_lot::Mutex;
use portal_crm::{CrmError, CrmGateway, HttpCrmGateway, QuoteResponseEvent};
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Default)]
struct FakeCrm {
    webhooks: Mutex<Vec<(Option<String>, Value)>>,
}

async fn orders(
    State(_): State<Arc<FakeCrm>>,
    Path(client): Path<String>,
) -> (StatusCode, Json<Value>) {
    match client.as_str() {
        "C-1001" => (
            StatusCode::OK,
            Json(json!([
                { "id": "SO-1", "reference": "SO-2024-001", "status": "delivered", "total": "420.00", "placed_at": "2024-01-12" },
                { "id": 2, "reference": "SO-2024-007", "status": "in production", "total": 1936, "placed_at": "2024-03-02", "delivery_date": "2024-04-01" }
            ])),
        ),
        "C-wrapped" => (StatusCode::OK, Json(json!({ "orders": [] }))),
        "C-broken" => (StatusCode::OK, Json(json!({ "unexpected": true }))),
        _ => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown client" })),
        ),
    }
}

async fn webhook(
    State(state): State<Arc<FakeCrm>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let refuse = body["reference"] == "Q-refused";
    state.webhooks.lock().push((auth, body));
    if refuse {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::NO_CONTENT
    }
}

async fn spawn_fake_crm() -> (SocketAddr, Arc<FakeCrm>) {
    let state = Arc::new(FakeCrm::default());
    let router = Router::new()
        .route("/api/clients/:client/orders", get(orders))
        .route("/api/webhooks/quote-response", post(webhook))
        .with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, state)
}

fn event(reference: &str) -> QuoteResponseEvent {
    QuoteResponseEvent {
        quotation_id: 12,
        reference: reference.into(),
        client_email: "anna@example.com".into(),
        crm_client_id: Some("C-1001".into()),
        decision: "accept".into(),
        comment: Some("Go ahead".into()),
        responded_at: Utc::now(),
    }
}

#[tokio::test]
async fn lists_orders_in_both_payload_shapes() {
    let (addr, _) = spawn_fake_crm().await;
    let crm = HttpCrmGateway::new(
        &format!("http://{addr}/api"),
        Some("secret".into()),
        Duration::from_secs(5),
    )
    .unwrap();

    let orders = crm.orders_for("C-1001").await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[1].id, "2");
    assert_eq!(orders[1].total, "1936");
    assert_eq!(orders[1].delivery_date.as_deref(), Some("2024-04-01"));

    assert!(crm.orders_for("C-wrapped").await.unwrap().is_empty());
    assert!(matches!(
        crm.orders_for("C-broken").await,
        Err(CrmError::Decode(_))
    ));
    match crm.orders_for("C-missing").await {
        Err(CrmError::Status { status, body }) => {
            assert_eq!(status, 404);
            assert!(body.contains("unknown client"));
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn forwards_quote_responses_with_bearer_token() {
    let (addr, state) = spawn_fake_crm().await;
    let crm = HttpCrmGateway::new(
        &format!("http://{addr}/api"),
        Some("secret".into()),
        Duration::from_secs(5),
    )
    .unwrap();

    crm.forward_quote_response(&event("Q-2024-031")).await.unwrap();
    let err = crm
        .forward_quote_response(&event("Q-refused"))
        .await
        .unwrap_err();
    assert!(matches!(err, CrmError::Status { status: 422, .. }));

    let seen = state.webhooks.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].0.as_deref(), Some("Bearer secret"));
    assert_eq!(seen[0].1["quotation_id"], 12);
    assert_eq!(seen[0].1["decision"], "accept");
    assert_eq!(seen[0].1["crm_client_id"], "C-1001");
}

#[tokio::test]
async fn unreachable_crm_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let crm = HttpCrmGateway::new(&format!("http://{addr}"), None, Duration::from_secs(2))
        .unwrap();
    assert!(matches!(
        crm.orders_for("C-1001").await,
        Err(CrmError::Transport(_))
    ));
}
