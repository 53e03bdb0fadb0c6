//! Cliente del webhook de automatización (n8n) al que se reenvían los
//! mensajes del usuario.
//!
//! El webhook puede responder JSON con distintas formas o texto plano; la
//! extracción de la respuesta prueba una lista ordenada de campos candidatos
//! y cae en serializar el cuerpo completo si ninguno aplica.

use chrono::Utc;
use reqwest::{header::CONTENT_TYPE, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::config::AppConfig;

/// Campos candidatos donde n8n suele dejar el texto de respuesta,
/// en orden de preferencia.
const REPLY_FIELDS: [&str; 6] = ["output", "response", "text", "message", "reply", "answer"];

/// Fallos al comunicarse con el webhook. `Upstream` se traduce en 502;
/// el resto se reduce a un error interno genérico (500).
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("el webhook respondió {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("error de red hacia el webhook: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("respuesta JSON inválida del webhook: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Cliente HTTP hacia el webhook configurado. Sin timeout explícito: la
/// llamada espera lo que permita la pila de red subyacente.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    webhook_url: String,
}

impl RelayClient {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            webhook_url: cfg.webhook_url.clone(),
        }
    }

    /// Reenvía un mensaje al webhook y devuelve el texto de respuesta ya
    /// normalizado a `String`.
    pub async fn send(
        &self,
        message: &str,
        conversation_id: Option<&str>,
    ) -> Result<String, RelayError> {
        let payload = json!({
            "message": message,
            "conversationId": conversation_id,
            "timestamp": Utc::now().to_rfc3339(),
        });

        let response = self.http.post(&self.webhook_url).json(&payload).send().await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Error del webhook n8n: {} {}", status, body);
            return Err(RelayError::Upstream { status, body });
        }

        let body = response.text().await?;
        if content_type.contains("application/json") {
            let value: Value = serde_json::from_str(&body)?;
            Ok(extract_reply(&value))
        } else {
            Ok(body)
        }
    }
}

/// Extrae el texto de respuesta de un cuerpo JSON con forma desconocida:
/// primero los campos candidatos en orden (gana la primera cadena no vacía),
/// luego el cuerpo si es él mismo una cadena, y como último recurso el JSON
/// serializado completo.
pub fn extract_reply(value: &Value) -> String {
    for field in REPLY_FIELDS {
        if let Some(text) = value.get(field).and_then(Value::as_str) {
            if !text.is_empty() {
                return text.to_string();
            }
        }
    }
    if let Some(text) = value.as_str() {
        return text.to_string();
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::extract_reply;
    use serde_json::json;

    #[test]
    fn prefiere_los_campos_candidatos_en_orden() {
        assert_eq!(extract_reply(&json!({"output": "hola"})), "hola");
        assert_eq!(
            extract_reply(&json!({"response": "b", "output": "a"})),
            "a"
        );
        assert_eq!(
            extract_reply(&json!({"reply": "r", "text": "t"})),
            "t"
        );
    }

    #[test]
    fn ignora_campos_candidatos_vacios() {
        assert_eq!(
            extract_reply(&json!({"output": "", "response": "hola"})),
            "hola"
        );
    }

    #[test]
    fn acepta_un_cuerpo_que_es_cadena_plana() {
        assert_eq!(extract_reply(&json!("directo")), "directo");
    }

    #[test]
    fn serializa_el_cuerpo_completo_como_ultimo_recurso() {
        assert_eq!(
            extract_reply(&json!({"otro": {"campo": 1}})),
            r#"{"otro":{"campo":1}}"#
        );
    }
}
