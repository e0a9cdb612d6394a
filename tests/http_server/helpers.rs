use std::{net::SocketAddr, sync::Arc};

use scriptgate::{
    config::{AppConfig, RhaiConfig, ServerConfig},
    engine::DataSourceRegistry,
    http_server::{self, ApiState},
    persistence::{InMemoryServiceRepository, ServiceRepository},
    test_helpers::MemoryDataAccess,
};
use reqwest::Client;
use tokio::task;

pub const GREETING_SOURCE: &str = r#"service.define(#{ path: "/greet/{name}", method: "GET", params: [#{ name: "excited", dataType: "BOOL" }] });
let text = "hello " + name;
if excited { text += "!"; }
addRespHeader("X-Greeting", "1");
setRespData(#{ text: text });"#;

pub fn create_test_server_config(address: &str, rhai: RhaiConfig) -> Arc<AppConfig> {
    Arc::new(AppConfig {
        server: ServerConfig {
            listen_address: address.into(),
            default_namespace: "default".to_string(),
        },
        rhai,
        ..Default::default()
    })
}

pub struct TestServer {
    pub address: SocketAddr,
    pub server_handle: task::JoinHandle<()>,
    pub client: Client,
    pub repo: Arc<InMemoryServiceRepository>,
    pub data: Arc<MemoryDataAccess>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::new_with_rhai(RhaiConfig::default()).await
    }

    pub async fn new_with_rhai(rhai: RhaiConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get address");
        drop(listener); // Release port for the app to use

        let config = create_test_server_config(&addr.to_string(), rhai);
        let repo = Arc::new(InMemoryServiceRepository::new());
        let data = Arc::new(MemoryDataAccess::default());
        let registry = DataSourceRegistry::new();
        registry.register("default", "main", data.clone());

        let state = ApiState::new(
            config,
            Arc::clone(&repo) as Arc<dyn ServiceRepository>,
            repo.clone(),
            Arc::new(registry),
        );

        // Spawn the actual app server
        let server_handle = task::spawn(async move {
            http_server::run_server_from_config(state).await.expect("Server failed");
        });

        // Wait for server to start
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        Self { address: addr, server_handle, client: Client::new(), repo, data }
    }

    pub async fn new_with_greeting() -> Self {
        let server = Self::new().await;
        let resp = server
            .post("/admin/services")
            .json(&serde_json::json!({ "name": "greeting", "source": GREETING_SOURCE }))
            .send()
            .await
            .expect("Request failed");
        assert_eq!(resp.status(), 200, "Failed to create test service");
        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.expect("Request failed")
    }

    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.post(self.url(path))
    }

    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.put(self.url(path))
    }

    pub fn delete(&self, path: &str) -> reqwest::RequestBuilder {
        self.client.delete(self.url(path))
    }

    pub fn cleanup(self) {
        self.server_handle.abort();
    }
}
