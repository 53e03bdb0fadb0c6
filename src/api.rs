//! API HTTP de la aplicación: el endpoint de relevo hacia el webhook de IA y
//! las operaciones de sesión/demo/conversaciones que consume el frontend.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::spawn;
use tracing::{error, info};

use crate::{app_state::AppState, relay::RelayError};

// --- Payloads de la API ---

#[derive(Deserialize)]
pub struct SelectConversationPayload {
    id: String,
}

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/session", get(session_handler))
        .route("/api/status", get(status_handler))
        .route("/api/demo/start", post(demo_start_handler))
        .route("/api/conversations/new", post(new_conversation_handler))
        .route("/api/conversations/select", post(select_conversation_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(app_state)
}

// --- Handlers ---

/// Endpoint de relevo: valida el mensaje, lo registra en la conversación
/// activa, lo reenvía al webhook y devuelve `{reply}` con la respuesta
/// normalizada. 400 si falta el mensaje, 502 si el webhook falla, 500 ante
/// cualquier otro error.
#[axum::debug_handler]
async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let message = match payload.get("message").and_then(Value::as_str) {
        Some(m) => m.to_string(),
        None => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "El campo 'message' es requerido."})),
            ));
        }
    };

    // La identidad de conversación que viaja al webhook es la activa en la
    // sesión (se crea una si no hay ninguna), no la que diga el cliente.
    let conversation_id = {
        let mut session = state.session.lock().unwrap();
        session.begin_user_message(&message)
    };

    match state.relay.send(&message, Some(&conversation_id)).await {
        Ok(raw_reply) => {
            let reply = {
                let mut session = state.session.lock().unwrap();
                session.complete_with_reply(&raw_reply)
            };
            Ok(Json(json!({ "reply": reply })))
        }
        Err(err) => {
            {
                let mut session = state.session.lock().unwrap();
                session.fail_with_error();
            }
            match err {
                RelayError::Upstream { .. } => Err((
                    StatusCode::BAD_GATEWAY,
                    Json(json!({"error": "Error al comunicarse con el servicio de IA."})),
                )),
                other => {
                    error!("Error interno en el relevo al webhook: {}", other);
                    Err((
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"error": "Error interno del servidor."})),
                    ))
                }
            }
        }
    }
}

/// Instantánea completa de la sesión para que el frontend se re-renderice.
#[axum::debug_handler]
async fn session_handler(State(state): State<AppState>) -> Json<Value> {
    let session = state.session.lock().unwrap();
    Json(serde_json::to_value(&*session).unwrap_or_else(|_| json!({})))
}

/// Indicador de proceso (el "está escribiendo..." del chat).
#[axum::debug_handler]
async fn status_handler(State(state): State<AppState>) -> Json<Value> {
    let session = state.session.lock().unwrap();
    Json(json!({
        "is_busy": session.processing,
        "message": session
            .processing_text
            .clone()
            .unwrap_or_else(|| "Servidor listo.".to_string()),
    }))
}

/// Arranca (o reinicia) el flujo escenificado del demo. El avance corre en
/// una tarea de fondo que muta la sesión compartida; un reinicio posterior
/// invalida por generación a la tarea anterior.
#[axum::debug_handler]
async fn demo_start_handler(State(state): State<AppState>) -> impl IntoResponse {
    {
        let mut session = state.session.lock().unwrap();
        session.start_demo();
    }

    let sequencer = state.sequencer.clone();
    let session = state.session.clone();
    spawn(async move {
        sequencer.run(session).await;
    });

    StatusCode::ACCEPTED
}

#[axum::debug_handler]
async fn new_conversation_handler(State(state): State<AppState>) -> Json<Value> {
    let mut session = state.session.lock().unwrap();
    let id = session.new_conversation();
    Json(json!({ "id": id }))
}

#[axum::debug_handler]
async fn select_conversation_handler(
    State(state): State<AppState>,
    Json(payload): Json<SelectConversationPayload>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let mut session = state.session.lock().unwrap();
    if session.select_conversation(&payload.id) {
        Ok(StatusCode::OK)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "La conversación indicada no existe."})),
        ))
    }
}

#[axum::debug_handler]
async fn shutdown_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Some(sender) = state.shutdown_sender.lock().unwrap().take() {
        let _ = sender.send(());
    }
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::http::header;
    use axum::routing::post as axum_post;
    use tokio::sync::oneshot;

    /// Levanta un webhook falso que responde siempre con el mismo estado,
    /// content-type y cuerpo. Devuelve su URL base.
    async fn spawn_fake_webhook(
        status: StatusCode,
        content_type: &'static str,
        body: &'static str,
    ) -> String {
        let handler = move || async move {
            (status, [(header::CONTENT_TYPE, content_type)], body)
        };
        let router = Router::new().route("/", axum_post(handler));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/")
    }

    /// Levanta la aplicación completa contra el webhook indicado y devuelve
    /// su URL base junto con el estado compartido.
    async fn spawn_app(webhook_url: String) -> (String, AppState) {
        let cfg = AppConfig {
            server_addr: "127.0.0.1:0".to_string(),
            webhook_url,
        };
        let (shutdown_tx, _shutdown_rx) = oneshot::channel();
        let state = AppState::new(cfg, shutdown_tx);
        let app = create_router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), state)
    }

    #[tokio::test]
    async fn rechaza_peticiones_sin_mensaje() {
        let webhook = spawn_fake_webhook(StatusCode::OK, "application/json", "{}").await;
        let (base, _state) = spawn_app(webhook).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/chat"))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert!(body.get("error").is_some());
    }

    #[tokio::test]
    async fn rechaza_un_mensaje_que_no_es_cadena() {
        let webhook = spawn_fake_webhook(StatusCode::OK, "application/json", "{}").await;
        let (base, state) = spawn_app(webhook).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/chat"))
            .json(&json!({"message": 123}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        // El rechazo es inmediato: la sesión no registra nada.
        assert!(state.session.lock().unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn extrae_la_respuesta_del_campo_output() {
        let webhook =
            spawn_fake_webhook(StatusCode::OK, "application/json", r#"{"output": "hola"}"#).await;
        let (base, state) = spawn_app(webhook).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/chat"))
            .json(&json!({"message": "¿Estado de la factura?"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["reply"], "hola");

        // El controlador registró usuario y bot, en ese orden.
        let session = state.session.lock().unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].content, "hola");
        assert!(!session.processing);
    }

    #[tokio::test]
    async fn usa_el_texto_plano_del_webhook_tal_cual() {
        let webhook =
            spawn_fake_webhook(StatusCode::OK, "text/plain; charset=utf-8", "respuesta plana")
                .await;
        let (base, _state) = spawn_app(webhook).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/chat"))
            .json(&json!({"message": "hola"}))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["reply"], "respuesta plana");
    }

    #[tokio::test]
    async fn un_webhook_caido_produce_502_y_mensaje_de_error_en_el_chat() {
        let webhook =
            spawn_fake_webhook(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", "boom").await;
        let (base, state) = spawn_app(webhook).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/chat"))
            .json(&json!({"message": "hola"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_GATEWAY);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Error al comunicarse con el servicio de IA.");

        let session = state.session.lock().unwrap();
        let ultimo = session.messages.last().unwrap();
        assert_eq!(ultimo.kind, crate::models::MessageType::Error);
        assert!(!session.processing);
    }

    #[tokio::test]
    async fn seleccionar_una_conversacion_inexistente_devuelve_404() {
        let webhook = spawn_fake_webhook(StatusCode::OK, "application/json", "{}").await;
        let (base, _state) = spawn_app(webhook).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/conversations/select"))
            .json(&json!({"id": "conv-nope"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn arrancar_el_demo_responde_accepted_y_activa_la_sesion() {
        let webhook = spawn_fake_webhook(StatusCode::OK, "application/json", "{}").await;
        let (base, state) = spawn_app(webhook).await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{base}/api/demo/start"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::ACCEPTED);

        let session = state.session.lock().unwrap();
        assert!(session.demo_started);
        assert_eq!(
            session.active_conversation.as_deref(),
            Some(crate::demo_data::DEMO_CONVERSATION_ID)
        );
    }

    #[tokio::test]
    async fn la_instantanea_de_sesion_expone_el_estado_visible() {
        let webhook =
            spawn_fake_webhook(StatusCode::OK, "application/json", r#"{"reply": "ok"}"#).await;
        let (base, _state) = spawn_app(webhook).await;
        let client = reqwest::Client::new();

        client
            .post(format!("{base}/api/chat"))
            .json(&json!({"message": "hola"}))
            .send()
            .await
            .unwrap();

        let snapshot: Value = client
            .get(format!("{base}/api/session"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(snapshot["messages"].as_array().unwrap().len(), 2);
        assert_eq!(snapshot["processing"], false);
        assert!(snapshot["activeConversation"].is_string());
    }
}
