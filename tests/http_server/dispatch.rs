use serde_json::{Value, json};

use crate::helpers::*;

async fn create(server: &TestServer, namespace: &str, source: &str) {
    let resp = server
        .post("/admin/services")
        .header("namespace", namespace)
        .json(&json!({ "source": source }))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(resp.status(), 200, "Failed to create service");
}

#[tokio::test]
async fn dispatch_binds_path_and_query_params() {
    let server = TestServer::new_with_greeting().await;

    let resp = server.get("/api/greet/grace?excited=yes").await;

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["x-greeting"], "1");
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body, json!({ "text": "hello grace!" }));

    server.cleanup();
}

#[tokio::test]
async fn dispatch_merges_json_body_over_query() {
    let server = TestServer::new().await;
    create(
        &server,
        "default",
        r#"service.define(#{ path: "/sum", method: "POST", params: [#{ name: "a", dataType: "INTEGER" }, #{ name: "b", dataType: "INTEGER" }] });
setRespStatus(201);
setRespData(a + b);"#,
    )
    .await;

    let resp = server.post("/api/sum?a=1&b=2").json(&json!({ "b": 40 })).send().await.unwrap();

    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body, json!(41));

    server.cleanup();
}

#[tokio::test]
async fn dispatch_collects_repeated_query_keys() {
    let server = TestServer::new().await;
    create(
        &server,
        "default",
        r#"service.define(#{ path: "/pick", method: "GET", params: [#{ name: "ids", dataType: "ARRAY" }] });
setRespData(ids);"#,
    )
    .await;

    let resp = server.get("/api/pick?ids=a&ids=b&ids=c").await;

    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body, json!(["a", "b", "c"]));

    server.cleanup();
}

#[tokio::test]
async fn dispatch_prefers_exact_template() {
    let server = TestServer::new().await;
    create(&server, "default", r#"service.define(#{ path: "/users/{id}", method: "GET" }); setRespData("by id " + id);"#).await;
    create(&server, "default", r#"service.define(#{ path: "/users/me", method: "GET" }); setRespData("me");"#).await;

    let body: Value = server.get("/api/users/me").await.json().await.unwrap();
    assert_eq!(body, json!("me"));

    let body: Value = server.get("/api/users/42").await.json().await.unwrap();
    assert_eq!(body, json!("by id 42"));

    server.cleanup();
}

#[tokio::test]
async fn dispatch_resolves_in_request_namespace() {
    let server = TestServer::new().await;
    create(&server, "tenant-a", r#"service.define(#{ path: "/whoami", method: "GET" }); setRespData(namespace());"#).await;

    let resp = server.get("/api/whoami").await;
    assert_eq!(resp.status(), 404);

    let resp = server.client.get(server.url("/api/whoami")).header("namespace", "tenant-a").send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body, json!("tenant-a"));

    server.cleanup();
}

#[tokio::test]
async fn dispatch_never_routes_local_modules() {
    let server = TestServer::new().await;
    create(&server, "default", r#"component.exports = #{ path: "/lib/util", answer: 42 };"#).await;
    create(
        &server,
        "default",
        r#"service.define(#{ path: "/answer", method: "GET" });
setRespData(require("/lib/util").answer);"#,
    )
    .await;

    let resp = server.get("/api/lib/util").await;
    assert_eq!(resp.status(), 404);

    let body: Value = server.get("/api/answer").await.json().await.unwrap();
    assert_eq!(body, json!(42));

    server.cleanup();
}

#[tokio::test]
async fn dispatch_reads_registered_data_source() {
    let server = TestServer::new().await;
    server.data.push_row(json!({ "id": 1, "title": "first" }));
    create(
        &server,
        "default",
        r#"service.define(#{ path: "/notes", method: "GET" });
setRespData(db("main").queryMap("select * from notes"));"#,
    )
    .await;

    let body: Value = server.get("/api/notes").await.json().await.unwrap();
    assert_eq!(body, json!({ "id": 1, "title": "first" }));

    server.cleanup();
}

#[tokio::test]
async fn dispatch_rejects_bad_input() {
    let server = TestServer::new().await;
    create(
        &server,
        "default",
        r#"service.define(#{ path: "/age", method: "PUT", params: [#{ name: "age", dataType: "INTEGER" }] });
setRespData(age);"#,
    )
    .await;

    let resp = server.put("/api/age").json(&json!({ "age": "old" })).send().await.unwrap();
    assert_eq!(resp.status(), 400);

    let resp = server.put("/api/age").body("[1, 2]").send().await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Request body must be a JSON object");

    let resp = server.put("/api/age").send().await.unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Parameter age not found");

    server.cleanup();
}
