//! ---
//! portal_section: "15-testing-qa-runbook"
//! portal_subsection: "integration-tests"
//! portal_type: "source"
//! portal_scope: "code"
//! portal_description: "Integration and validation tests for the client portal stack."
//! portal_version: "v0.0.0-prealpha"
//! portal_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use portal_api::{spawn_portal_server, PortalState};
use portal_common::AppConfig;
use portal_store::{seed_demo, PortalStore};
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::net::TcpListener;

#[derive(Default)]
struct Crm {
    webhooks: Mutex<Vec<(Option<String>, Value)>>,
}

async fn orders(Path(client): Path<String>) -> Json<Value> {
    Json(json!({
        "orders": [
            { "id": 77, "reference": format!("{client}-SO-1"), "status": "shipped", "total": 95.5, "placed_at": "2024-02-01" }
        ]
    }))
}

async fn webhook(
    State(state): State<Arc<Crm>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let auth = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    state.webhooks.lock().push((auth, body));
    StatusCode::ACCEPTED
}

async fn spawn_crm() -> (SocketAddr, Arc<Crm>) {
    let state = Arc::new(Crm::default());
    let router = Router::new()
        .route("/crm/clients/:client/orders", get(orders))
        .route("/crm/webhooks/quote-response", post(webhook))
        .with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr, state)
}

fn session_cookie(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("set-cookie")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .unwrap()
        .to_owned()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_signs_in_reviews_and_accepts_a_quotation() {
    let temp = tempdir().expect("tempdir");
    let database = temp.path().join("data").join("portal.sqlite3");
    let (crm_addr, crm) = spawn_crm().await;

    let raw = format!(
        r#"
        [server]
        listen = "127.0.0.1:0"

        [database]
        path = "{database}"

        [crm]
        base_url = "http://{crm_addr}/crm"
        api_key = "crm-token"
        timeout = 5

        [company]
        name = "Signs & Co"
        address_lines = ["Dorpsstraat 1", "1234 AB Utrecht"]

        [pricing]
        currency = "EUR"
        default_vat_rate = "21"
        "#,
        database = database.display().to_string().replace('\\', "/"),
    );
    let config = AppConfig::from_str(&raw).unwrap();

    let ids = {
        let mut store = PortalStore::open(&config.database.path).unwrap();
        seed_demo(&mut store).unwrap()
    };

    let listen = config.server.listen;
    let state = Arc::new(PortalState::from_config(config).unwrap());
    let server = spawn_portal_server(state, listen).unwrap();
    let base = format!("http://{}", server.addr());
    let http = reqwest::Client::new();

    let login = http
        .post(format!("{base}/api/login"))
        .json(&json!({ "email": "anna@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), reqwest::StatusCode::OK);
    let cookie = session_cookie(&login);

    let quotations: Vec<Value> = http
        .get(format!("{base}/api/quotations"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let sent = quotations
        .iter()
        .find(|quotation| quotation["status"] == "sent")
        .unwrap();
    assert_eq!(sent["id"], ids.quotation);
    assert_eq!(sent["net_total"], "1600.00");
    assert_eq!(sent["currency"], "EUR");

    let html = http
        .get(format!("{base}/api/quotations/{}/html", ids.quotation))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Signs &amp; Co"));
    assert!(html.contains("Dorpsstraat 1"));

    let answer: Value = http
        .post(format!("{base}/api/quotations/{}/response", ids.quotation))
        .header("cookie", &cookie)
        .json(&json!({ "decision": "accept", "comment": "Please install in June" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(answer, json!({ "status": "accepted", "forwarded": true }));

    {
        let webhooks = crm.webhooks.lock();
        assert_eq!(webhooks.len(), 1);
        let (auth, body) = &webhooks[0];
        assert_eq!(auth.as_deref(), Some("Bearer crm-token"));
        assert_eq!(body["reference"], "Q-2024-031");
        assert_eq!(body["decision"], "accept");
        assert_eq!(body["crm_client_id"], "C-1001");
    }

    let orders: Vec<Value> = http
        .get(format!("{base}/api/orders"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], "77");
    assert_eq!(orders[0]["reference"], "C-1001-SO-1");

    let status: Value = http
        .get(format!("{base}/api/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["crm_enabled"], true);
    assert_eq!(status["pdf_enabled"], false);

    server.shutdown().await.unwrap();

    let store = PortalStore::open(&database).unwrap();
    let responses = store.quote_responses(ids.quotation).unwrap();
    assert_eq!(responses.len(), 1);
    assert!(responses[0].forwarded);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_crm_does_not_lose_the_answer() {
    let temp = tempdir().expect("tempdir");
    let database = temp.path().join("portal.sqlite3");
    let unused = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let raw = format!(
        r#"
        [server]
        listen = "127.0.0.1:0"

        [database]
        path = "{database}"

        [crm]
        base_url = "http://{unused}/crm"
        timeout = 2
        "#,
        database = database.display().to_string().replace('\\', "/"),
    );
    let config = AppConfig::from_str(&raw).unwrap();
    let ids = {
        let mut store = PortalStore::open(&config.database.path).unwrap();
        seed_demo(&mut store).unwrap()
    };

    let listen = config.server.listen;
    let state = Arc::new(PortalState::from_config(config).unwrap());
    let server = spawn_portal_server(state, listen).unwrap();
    let base = format!("http://{}", server.addr());
    let http = reqwest::Client::new();

    let login = http
        .post(format!("{base}/api/login"))
        .json(&json!({ "email": "anna@example.com" }))
        .send()
        .await
        .unwrap();
    let cookie = session_cookie(&login);

    let answer: Value = http
        .post(format!("{base}/api/quotations/{}/response", ids.quotation))
        .header("cookie", &cookie)
        .json(&json!({ "decision": "reject" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(answer, json!({ "status": "rejected", "forwarded": false }));

    let orders = http
        .get(format!("{base}/api/orders"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(orders.status(), reqwest::StatusCode::BAD_GATEWAY);

    server.shutdown().await.unwrap();

    let store = PortalStore::open(&database).unwrap();
    let responses = store.quote_responses(ids.quotation).unwrap();
    assert_eq!(responses.len(), 1);
    assert!(!responses[0].forwarded);
}
