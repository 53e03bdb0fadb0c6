//! Carga y gestión de configuración de la aplicación (servidor + webhook).

use std::env;

use anyhow::{anyhow, Result};

/// URL del webhook de n8n usada cuando no se configura otra.
const DEFAULT_WEBHOOK_URL: &str = "https://n8n.comware.com.co/webhook/AGC_WARE";

/// Configuración completa de la aplicación.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_addr: String,
    pub webhook_url: String,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        let server_addr =
            env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:3322".to_string());

        let webhook_url =
            env::var("WEBHOOK_URL").unwrap_or_else(|_| DEFAULT_WEBHOOK_URL.to_string());
        if !webhook_url.starts_with("http") {
            return Err(anyhow!("WEBHOOK_URL no es una URL http válida: {webhook_url}"));
        }

        Ok(Self {
            server_addr,
            webhook_url,
        })
    }
}
