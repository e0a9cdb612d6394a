use std::time::Duration;

use scriptgate::{config::RhaiConfig, models::Method, persistence::ServiceRepository};
use serde_json::{Value, json};

use crate::helpers::*;

#[tokio::test]
async fn analysis_endpoint_returns_service_metadata() {
    let server = TestServer::new().await;

    let resp = server
        .post("/admin/services/analysis")
        .json(&json!({ "name": "greeting", "source": GREETING_SOURCE }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["path"], "/greet/{name}");
    assert_eq!(body["method"], "GET");
    assert_eq!(body["name"], "greeting");
    assert_eq!(body["params"], json!([{ "name": "excited", "dataType": "BOOL" }]));

    server.cleanup();
}

#[tokio::test]
async fn analysis_endpoint_rejects_unsupported_method() {
    let server = TestServer::new().await;

    let resp = server
        .post("/admin/services/analysis")
        .json(&json!({ "source": r#"service.define(#{ path: "/a", method: "PATCH" });"# }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Service method[PATCH] error");

    server.cleanup();
}

#[tokio::test]
async fn analysis_of_runaway_script_times_out() {
    let server = TestServer::new_with_rhai(RhaiConfig {
        max_operations: 0,
        execution_timeout: Duration::from_millis(100),
        ..Default::default()
    })
    .await;

    let resp = server
        .post("/admin/services/analysis")
        .json(&json!({ "source": "loop { }" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 504);

    // Workers stay free for other requests.
    let resp = server.get("/health").await;
    assert_eq!(resp.status(), 200);

    server.cleanup();
}

#[tokio::test]
async fn test_endpoint_runs_handler_with_params() {
    let server = TestServer::new().await;

    let resp = server
        .post("/admin/services/test")
        .json(&json!({
            "source": GREETING_SOURCE,
            "params": { "name": "ada", "excited": "true" }
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["x-greeting"], "1");
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], 200);
    assert_eq!(body["data"], json!({ "text": "hello ada!" }));
    assert_eq!(body["header"]["X-Greeting"], "1");
    assert_eq!(body["log"], json!([]));

    server.cleanup();
}

#[tokio::test]
async fn test_endpoint_reports_missing_param() {
    let server = TestServer::new().await;

    let resp = server
        .post("/admin/services/test")
        .json(&json!({ "source": GREETING_SOURCE, "params": { "name": "ada" } }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Parameter excited not found");

    server.cleanup();
}

#[tokio::test]
async fn test_endpoint_returns_partial_log_on_failure() {
    let server = TestServer::new().await;

    let resp = server
        .post("/admin/services/test")
        .json(&json!({
            "source": "service.define(#{ path: \"/fail\", method: \"POST\" });\nprintln(\"step 1\");\nthrow \"boom\";"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["log"], json!(["step 1"]));
    assert!(body["error"].as_str().unwrap().contains("boom"));

    server.cleanup();
}

#[tokio::test]
async fn create_stores_service_under_header_namespace() {
    let server = TestServer::new().await;

    let resp = server
        .post("/admin/services")
        .header("namespace", "tenant-a")
        .json(&json!({ "name": "greeting", "source": GREETING_SOURCE }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["msg"], "Service /greet/{name} created successfully");

    let stored = server
        .repo
        .get_service("tenant-a", Method::Get, "/greet/{name}")
        .await
        .unwrap()
        .expect("service not stored");
    assert_eq!(stored.name, "greeting");
    assert_eq!(stored.source, GREETING_SOURCE);

    server.cleanup();
}

#[tokio::test]
async fn create_rejects_duplicates_and_empty_scripts() {
    let server = TestServer::new_with_greeting().await;

    let resp = server
        .post("/admin/services")
        .json(&json!({ "source": GREETING_SOURCE }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = server
        .post("/admin/services")
        .json(&json!({ "source": "component = ();" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Script defines no service");

    server.cleanup();
}

#[tokio::test]
async fn modify_replaces_stored_service() {
    let server = TestServer::new_with_greeting().await;
    let modified = GREETING_SOURCE.replace("hello ", "hi ");

    let resp = server
        .put("/admin/services")
        .json(&json!({ "name": "greeting-v2", "source": modified }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["msg"], "Service /greet/{name} modified successfully");

    let resp = server.get("/admin/services/get/greet/{name}").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["name"], "greeting-v2");
    assert_eq!(body["source"], modified);

    server.cleanup();
}

#[tokio::test]
async fn modify_unknown_service_is_not_found() {
    let server = TestServer::new().await;

    let resp = server
        .put("/admin/services")
        .json(&json!({ "source": GREETING_SOURCE }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server.cleanup();
}

#[tokio::test]
async fn list_returns_method_and_path() {
    let server = TestServer::new_with_greeting().await;
    for source in [
        r#"service.define(#{ path: "/orders", method: "POST" });"#,
        r#"service.define(#{ path: "/orders", method: "GET" });"#,
        r#"component.exports = #{ path: "/lib/util" };"#,
    ] {
        let resp = server.post("/admin/services").json(&json!({ "source": source })).send().await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = server.get("/admin/services").await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body, json!(["GET:/greet/{name}", "LOCAL:/lib/util", "GET:/orders", "POST:/orders"]));

    let resp = server.get("/admin/services?prefix=/orders").await;
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body, json!(["GET:/orders", "POST:/orders"]));

    server.cleanup();
}

#[tokio::test]
async fn get_and_delete_validate_method() {
    let server = TestServer::new_with_greeting().await;

    let resp = server.get("/admin/services/patch/greet/{name}").await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Method patch not found");

    let resp = server.delete("/admin/services/GET/greet/{name}").send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["msg"], "Service /greet/{name} deleted successfully");

    let resp = server.get("/admin/services/GET/greet/{name}").await;
    assert_eq!(resp.status(), 404);

    let resp = server.delete("/admin/services/GET/greet/{name}").send().await.unwrap();
    assert_eq!(resp.status(), 404);

    server.cleanup();
}
