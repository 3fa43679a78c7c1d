use anyhow::{bail, Result};
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub razorpay: RazorpayConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// MongoDB-backed store (production).
    Mongodb,
    /// In-memory store, for tests and local development.
    Memory,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: Secret<String>,
    pub db_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: Secret<String>,
    pub api_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host =
            env::var("REGISTRATION_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("REGISTRATION_SERVICE_PORT")
            .unwrap_or_else(|_| "3005".to_string())
            .parse()?;

        let backend = match env::var("REGISTRATION_STORE_BACKEND")
            .unwrap_or_else(|_| "mongodb".to_string())
            .to_lowercase()
            .as_str()
        {
            "mongodb" => StoreBackend::Mongodb,
            "memory" => StoreBackend::Memory,
            other => bail!("Unknown store backend: {other}"),
        };
        let db_url = env::var("REGISTRATION_MONGODB_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
        let db_name = env::var("REGISTRATION_DATABASE_NAME")
            .unwrap_or_else(|_| "registration_db".to_string());

        let razorpay_key_id = env::var("RAZORPAY_KEY_ID").unwrap_or_default();
        let razorpay_key_secret = env::var("RAZORPAY_KEY_SECRET").unwrap_or_default();
        let razorpay_api_base_url = env::var("RAZORPAY_API_BASE_URL")
            .unwrap_or_else(|_| "https://api.razorpay.com/v1".to_string());

        Ok(Self {
            server: ServerConfig { host, port },
            store: StoreConfig {
                backend,
                url: Secret::new(db_url),
                db_name,
            },
            razorpay: RazorpayConfig {
                key_id: razorpay_key_id,
                key_secret: Secret::new(razorpay_key_secret),
                api_base_url: razorpay_api_base_url,
            },
            service_name: "registration-service".to_string(),
        })
    }
}
