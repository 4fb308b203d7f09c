//! API description endpoints.

use reqwest::StatusCode;
use serde_json::Value;

mod common;
use common::TestServer;

const ORDERS: &str = r#"
//! Order management.
//!
//! Orders placed through the shop.

/// Place an order.
///
/// Reserves stock and returns the order id.
///
/// Args:
///     sku (string): Product code.
///     qty (int): Quantity.
fn place(req) { #{ id: 1 } }

fn cancel(req) { true }

private fn audit(order) { () }
"#;

async fn server() -> TestServer {
    TestServer::start(&[
        ("orders.rhai", ORDERS),
        ("health.rhai", "/// Liveness probe.\nfn handle_request(req) { \"ok\" }"),
        ("main.rhai", "fn handle_request(req) { 1 }"),
        (".git/hooks.rhai", "fn handle_request(req) { 1 }"),
        ("venv/lib.rhai", "fn handle_request(req) { 1 }"),
    ])
    .await
}

async fn spec(server: &TestServer) -> (String, Value) {
    let res = server.get("/__api/spec.json").await;
    assert_eq!(res.status(), StatusCode::OK);
    let text = res.text().await.unwrap();
    let value = serde_json::from_str(&text).unwrap();
    (text, value)
}

#[tokio::test]
async fn test_document_lists_routines() {
    let server = TestServer::start_with(
        &[
            ("orders.rhai", ORDERS),
            ("health.rhai", "/// Liveness probe.\nfn handle_request(req) { \"ok\" }"),
            ("main.rhai", "fn handle_request(req) { 1 }"),
            (".git/hooks.rhai", "fn handle_request(req) { 1 }"),
            ("venv/lib.rhai", "fn handle_request(req) { 1 }"),
        ],
        |c| c.handlers.entry_unit = Some("main.rhai".to_string()),
    )
    .await;
    let (_, doc) = spec(&server).await;

    let paths: Vec<&String> = doc["paths"].as_object().unwrap().keys().collect();
    assert_eq!(paths, vec!["/health", "/orders/cancel", "/orders/place"]);

    let place = &doc["paths"]["/orders/place"]["post"];
    assert_eq!(place["summary"], "Place an order.");
    assert!(place["description"]
        .as_str()
        .unwrap()
        .starts_with("Reserves stock and returns the order id."));
    assert_eq!(place["parameters"][0]["name"], "sku");
    assert_eq!(place["parameters"][0]["type"], "string");
    assert_eq!(place["parameters"][1]["description"], "Quantity.");
    assert_eq!(place["x-source"], "orders.rhai");
    assert_eq!(place["x-kind"], "module-function");

    let cancel = &doc["paths"]["/orders/cancel"]["post"];
    assert_eq!(cancel["summary"], "Order management.");
    assert_eq!(cancel["description"], "Orders placed through the shop.");

    let health = &doc["paths"]["/health"]["post"];
    assert_eq!(health["summary"], "Liveness probe.");
    assert_eq!(health["x-kind"], "single-handler");

    assert_eq!(doc["info"]["title"], "Treeserve API");
    assert_eq!(
        doc["servers"][0]["url"],
        format!("http://{}", server.addr)
    );
}

#[tokio::test]
async fn test_scanning_runs_no_unit_code() {
    let server = server().await;
    server.write(
        "loud.rhai",
        "print(\"side effect\");\nthrow \"top level ran\";\n/// Loud.\nfn handle_request(req) { 1 }",
    );

    let (_, doc) = spec(&server).await;
    assert_eq!(doc["paths"]["/loud"]["post"]["summary"], "Loud.");

    // Loading the unit for dispatch does run the top level, and fails.
    let res = server.client.post(server.url("/loud")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Unit Load Error");
}

#[tokio::test]
async fn test_repeated_requests_are_identical() {
    let server = server().await;
    let (first, _) = spec(&server).await;
    let (second, _) = spec(&server).await;
    let res = server.get("/__api/spec").await;
    let third = res.text().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[tokio::test]
async fn test_unparsable_units_are_skipped() {
    let server = server().await;
    server.write("broken.rhai", "fn handle_request(req) {");
    let (_, doc) = spec(&server).await;
    assert!(doc["paths"].get("/broken").is_none());
    assert!(doc["paths"].get("/health").is_some());
}

#[tokio::test]
async fn test_docs_page() {
    let server = server().await;
    for path in ["/__api", "/__api/docs"] {
        let res = server.get(path).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers()["content-type"].to_str().unwrap().starts_with("text/html"));
        assert!(res.text().await.unwrap().contains("/__api/spec.json"));
    }
}

#[tokio::test]
async fn test_docs_can_be_disabled_live() {
    let server = server().await;
    let mut config = treeserve::ServerConfig::default();
    config.handlers.root = server.root();
    config.docs.enabled = false;
    server.update_config(config);

    let mut status = StatusCode::OK;
    for _ in 0..50 {
        status = server.get("/__api/spec.json").await.status();
        if status == StatusCode::NOT_FOUND {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_post_to_doc_path_dispatches() {
    let server = server().await;
    let res = server
        .client
        .post(server.url("/__api/spec"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
