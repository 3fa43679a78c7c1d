use std::sync::Arc;

use registration_service::config::{
    Config, RazorpayConfig, ServerConfig, StoreBackend, StoreConfig,
};
use registration_service::services::RegistrationStore;
use registration_service::Application;
use secrecy::Secret;

pub const TEST_USER_ID: &str = "test-user";
pub const TEST_KEY_ID: &str = "rzp_test_key";
pub const TEST_KEY_SECRET: &str = "test_key_secret";

pub struct TestApp {
    pub address: String,
    pub store: Arc<dyn RegistrationStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn the service on a random port with the in-memory store, pointing
    /// the gateway client at `gateway_url` (a wiremock server, or an
    /// unroutable address for tests that must not reach the gateway).
    pub async fn spawn_with_gateway(gateway_url: &str) -> Self {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                url: Secret::new("unused".to_string()),
                db_name: "unused".to_string(),
            },
            razorpay: RazorpayConfig {
                key_id: TEST_KEY_ID.to_string(),
                key_secret: Secret::new(TEST_KEY_SECRET.to_string()),
                api_base_url: gateway_url.to_string(),
            },
            service_name: "registration-service-test".to_string(),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);
        let store = app.store();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to come up.
        let client = reqwest::Client::new();
        let health_url = format!("{address}/health");
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            store,
            client,
        }
    }

    pub async fn spawn() -> Self {
        Self::spawn_with_gateway("http://127.0.0.1:9").await
    }

    /// Request builder pre-loaded with signed-in-user identity headers.
    pub fn as_user(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("X-User-Id", TEST_USER_ID)
            .header("X-User-Email", "test-user@example.com")
    }

    /// Request builder pre-loaded with admin identity headers.
    pub fn as_admin(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        self.as_user(builder).header("X-User-Roles", "admin")
    }
}

/// Reference signature computation, as the gateway would produce it.
pub fn gateway_signature(order_id: &str, payment_id: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(TEST_KEY_SECRET.as_bytes()).unwrap();
    mac.update(format!("{order_id}|{payment_id}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
