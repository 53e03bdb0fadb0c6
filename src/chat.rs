//! Estado de sesión del chat y controlador de conversaciones en vivo.
//!
//! Toda la mutación de estado pasa por los métodos de `Session`; la sesión
//! vive detrás de un único `Arc<Mutex<_>>` compartido con los handlers y el
//! secuenciador del demo, y el candado nunca se retiene a través de un await.

use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use uuid::Uuid;

use crate::demo_data::{self, DEMO_CONVERSATION_ID};
use crate::models::*;

/// Longitud máxima del título derivado del primer mensaje del usuario.
const TITLE_MAX_CHARS: usize = 40;

/// Indicador fijo mientras se espera la respuesta del webhook.
const LIVE_PROCESSING_TEXT: &str = "Analizando consulta...";

/// Aviso mostrado en el chat cuando el reenvío al webhook falla. El error
/// subyacente sólo se registra en el log, nunca se muestra al usuario.
const RELAY_FAILURE_NOTICE: &str =
    "No pude comunicarme con el servicio de IA. Por favor, intenta de nuevo en unos momentos.";

/// Estado completo de la sesión: mensajes visibles, estado derivado del
/// panel de contexto, historial de conversaciones y progreso del demo.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub messages: Vec<ChatMessage>,
    pub processing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_text: Option<String>,
    pub current_invoice: Option<InvoiceData>,
    pub current_validation: Option<ValidationResult>,
    pub current_classification: Option<ClassificationResult>,
    pub current_recommendation: Option<AIRecommendation>,
    pub audit_log: Vec<AuditEntry>,
    pub conversations: Vec<Conversation>,
    pub active_conversation: Option<String>,
    pub demo_step: usize,
    pub demo_started: bool,
    /// Generación de la sesión. Cada reinicio la incrementa para invalidar
    /// temporizadores del demo que quedaron en vuelo.
    #[serde(skip)]
    pub epoch: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Sesión inicial, con el historial de conversaciones sembrado.
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            processing: false,
            processing_text: None,
            current_invoice: None,
            current_validation: None,
            current_classification: None,
            current_recommendation: None,
            audit_log: Vec::new(),
            conversations: demo_data::demo_conversations(),
            active_conversation: None,
            demo_step: 0,
            demo_started: false,
            epoch: 0,
        }
    }

    // ---------------------------------------------------------------------
    // CICLO DE VIDA DE CONVERSACIONES
    // ---------------------------------------------------------------------

    /// Limpia todo el estado transitorio y derivado: mensajes, panel de
    /// contexto, bitácora, progreso del demo e indicador de proceso.
    pub fn reset_transient(&mut self) {
        self.messages.clear();
        self.processing = false;
        self.processing_text = None;
        self.current_invoice = None;
        self.current_validation = None;
        self.current_classification = None;
        self.current_recommendation = None;
        self.audit_log.clear();
        self.demo_step = 0;
        self.demo_started = false;
        self.epoch += 1;
    }

    /// Prepara la sesión para el modo demo. La conversación del demo se crea
    /// una sola vez; volver a entrar la reutiliza sin duplicarla.
    pub fn start_demo(&mut self) {
        if !self.conversations.iter().any(|c| c.id == DEMO_CONVERSATION_ID) {
            self.conversations.insert(
                0,
                Conversation {
                    id: DEMO_CONVERSATION_ID.to_string(),
                    title: "Factura TAV A-4521".to_string(),
                    date: display_date_now(),
                    messages: Vec::new(),
                },
            );
        }
        self.reset_transient();
        self.active_conversation = Some(DEMO_CONVERSATION_ID.to_string());
        self.demo_started = true;
    }

    /// Crea una conversación nueva vacía y la activa.
    pub fn new_conversation(&mut self) -> String {
        self.reset_transient();
        let conversation = Conversation {
            id: format!("conv-{}", Uuid::new_v4()),
            title: "Nueva conversación".to_string(),
            date: display_date_now(),
            messages: Vec::new(),
        };
        let id = conversation.id.clone();
        self.conversations.insert(0, conversation);
        self.active_conversation = Some(id.clone());
        id
    }

    /// Cambia a otra conversación: descarta todo el estado transitorio y
    /// restaura la lista de mensajes guardada. Devuelve `false` si el id no
    /// existe.
    pub fn select_conversation(&mut self, id: &str) -> bool {
        let Some(stored) = self.conversations.iter().find(|c| c.id == id) else {
            return false;
        };
        let restored = stored.messages.clone();
        self.reset_transient();
        self.messages = restored;
        self.active_conversation = Some(id.to_string());
        true
    }

    // ---------------------------------------------------------------------
    // FLUJO DE CHAT EN VIVO
    // ---------------------------------------------------------------------

    /// Registra el mensaje del usuario y deja la sesión en estado de proceso.
    /// Devuelve el id de la conversación activa, que se reenvía al webhook.
    ///
    /// El título se deriva de la lista de mensajes en vuelo (no del registro
    /// persistido), así el primer mensaje nunca se evalúa contra una copia
    /// desactualizada.
    pub fn begin_user_message(&mut self, content: &str) -> String {
        let conversation_id = match &self.active_conversation {
            Some(id) => id.clone(),
            None => self.new_conversation(),
        };

        self.messages.push(ChatMessage {
            id: format!("user-{}", Uuid::new_v4()),
            sender: Sender::User,
            kind: MessageType::Text,
            content: content.to_string(),
            timestamp: now_hhmm(),
            data: None,
        });

        // Las conversaciones sembradas (la del demo) conservan su título fijo.
        let first_user_message = conversation_id != DEMO_CONVERSATION_ID
            && self
                .messages
                .iter()
                .filter(|m| m.sender == Sender::User)
                .count()
                == 1;
        if first_user_message {
            let title = derive_title(content);
            if let Some(conv) = self.conversations.iter_mut().find(|c| c.id == conversation_id) {
                conv.title = title;
            }
        }

        self.processing = true;
        self.processing_text = Some(LIVE_PROCESSING_TEXT.to_string());
        self.persist_active_messages();
        conversation_id
    }

    /// Cierra el ciclo de un envío exitoso: formatea la respuesta cruda del
    /// webhook y la añade como mensaje del bot. Devuelve el texto formateado.
    pub fn complete_with_reply(&mut self, raw_reply: &str) -> String {
        self.processing = false;
        self.processing_text = None;
        let formatted = format_assistant_text(raw_reply);
        self.messages.push(ChatMessage {
            id: format!("bot-{}", Uuid::new_v4()),
            sender: Sender::Bot,
            kind: MessageType::Text,
            content: formatted.clone(),
            timestamp: now_hhmm(),
            data: None,
        });
        self.persist_active_messages();
        formatted
    }

    /// Cierra el ciclo de un envío fallido con el aviso fijo de error.
    pub fn fail_with_error(&mut self) {
        self.processing = false;
        self.processing_text = None;
        self.messages.push(ChatMessage {
            id: format!("bot-{}", Uuid::new_v4()),
            sender: Sender::Bot,
            kind: MessageType::Error,
            content: RELAY_FAILURE_NOTICE.to_string(),
            timestamp: now_hhmm(),
            data: None,
        });
        self.persist_active_messages();
    }

    /// Write-through: sobreescribe la lista guardada de la conversación
    /// activa con la lista visible. La conversación del demo no se persiste;
    /// su guion es fijo.
    fn persist_active_messages(&mut self) {
        let Some(active) = self.active_conversation.clone() else {
            return;
        };
        if active == DEMO_CONVERSATION_ID {
            return;
        }
        if let Some(conv) = self.conversations.iter_mut().find(|c| c.id == active) {
            conv.messages = self.messages.clone();
        }
    }
}

/// Título derivado del primer mensaje: primeros 40 caracteres, con elipsis
/// cuando el texto es más largo.
fn derive_title(content: &str) -> String {
    if content.chars().count() > TITLE_MAX_CHARS {
        let truncated: String = content.chars().take(TITLE_MAX_CHARS).collect();
        format!("{truncated}...")
    } else {
        content.to_string()
    }
}

fn now_hhmm() -> String {
    Local::now().format("%H:%M").to_string()
}

fn display_date_now() -> String {
    Local::now().format("Hoy, %H:%M").to_string()
}

// -------------------------------------------------------------------------
// FORMATO DE RESPUESTAS DEL ASISTENTE
// -------------------------------------------------------------------------

/// Marcador de lista numerada de la forma `1)` precedido de espacio.
static NUMBERED_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s(\d+\))").expect("regex de marcadores numerados"));

/// Normaliza el texto crudo del asistente para su presentación.
///
/// Regla 1: salto de línea antes de cada marcador `<dígitos>)` precedido de
/// espacio. Regla 2: en el texto anterior al último punto, cada ". " pasa a
/// ".\n"; la frase final (desde el último punto) queda intacta. La función es
/// pura y determinista; la entrada vacía se devuelve sin cambios.
pub fn format_assistant_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let with_breaks = NUMBERED_MARKER.replace_all(text, "\n$1").into_owned();

    match with_breaks.rfind('.') {
        Some(last_dot) => {
            let (head, tail) = with_breaks.split_at(last_dot);
            format!("{}{}", head.replace(". ", ".\n"), tail)
        }
        None => with_breaks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageType, Sender};

    // --- format_assistant_text ---

    #[test]
    fn entrada_vacia_sin_cambios() {
        assert_eq!(format_assistant_text(""), "");
    }

    #[test]
    fn inserta_saltos_ante_marcadores_numerados() {
        assert_eq!(
            format_assistant_text("Paso 1) hacer. Paso 2) revisar."),
            "Paso\n1) hacer.\nPaso\n2) revisar."
        );
    }

    #[test]
    fn separa_oraciones_antes_del_ultimo_punto() {
        assert_eq!(
            format_assistant_text("Primera frase. Segunda frase. Final."),
            "Primera frase.\nSegunda frase.\nFinal."
        );
    }

    #[test]
    fn no_toca_la_frase_final_tras_el_ultimo_punto() {
        // El único punto es el último: el texto que lo precede no contiene
        // ". " y la cola queda intacta.
        assert_eq!(
            format_assistant_text("Listo. Sin punto final"),
            "Listo. Sin punto final"
        );
    }

    #[test]
    fn los_marcadores_con_punto_no_disparan_la_regla_de_parentesis() {
        // "1." no es marcador para la regla 1; sólo actúa la regla 2.
        assert_eq!(format_assistant_text("1. Uno. 2. Dos."), "1.\nUno.\n2.\nDos.");
    }

    #[test]
    fn es_idempotente_sin_tokens_que_transformar() {
        let texto = "Una sola frase sin separadores internos.";
        let una = format_assistant_text(texto);
        assert_eq!(una, texto);
        assert_eq!(format_assistant_text(&una), una);
    }

    // --- título y ciclo de conversaciones ---

    #[test]
    fn titulo_de_55_caracteres_queda_en_43() {
        let mut session = Session::new();
        let contenido = "a".repeat(55);
        session.begin_user_message(&contenido);

        let active = session.active_conversation.clone().unwrap();
        let conv = session.conversations.iter().find(|c| c.id == active).unwrap();
        assert_eq!(conv.title.chars().count(), 43);
        assert!(conv.title.ends_with("..."));
    }

    #[test]
    fn titulo_corto_se_conserva_integro() {
        let mut session = Session::new();
        session.begin_user_message("Factura pendiente");

        let active = session.active_conversation.clone().unwrap();
        let conv = session.conversations.iter().find(|c| c.id == active).unwrap();
        assert_eq!(conv.title, "Factura pendiente");
    }

    #[test]
    fn un_envio_en_vivo_no_retitula_la_conversacion_del_demo() {
        let mut session = Session::new();
        session.start_demo();
        session.begin_user_message("Pregunta sobre otra factura distinta");

        let conv = session
            .conversations
            .iter()
            .find(|c| c.id == DEMO_CONVERSATION_ID)
            .unwrap();
        assert_eq!(conv.title, "Factura TAV A-4521");
    }

    #[test]
    fn el_titulo_solo_se_deriva_del_primer_mensaje() {
        let mut session = Session::new();
        session.begin_user_message("Primer mensaje");
        session.complete_with_reply("ok");
        session.begin_user_message("Segundo mensaje que no debe renombrar nada");

        let active = session.active_conversation.clone().unwrap();
        let conv = session.conversations.iter().find(|c| c.id == active).unwrap();
        assert_eq!(conv.title, "Primer mensaje");
    }

    #[test]
    fn envio_exitoso_agrega_usuario_y_bot_en_orden() {
        let mut session = Session::new();
        session.begin_user_message("hola");
        assert!(session.processing);

        session.complete_with_reply("respuesta del bot");
        assert!(!session.processing);
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].sender, Sender::User);
        assert_eq!(session.messages[1].sender, Sender::Bot);
        assert_eq!(session.messages[1].kind, MessageType::Text);
    }

    #[test]
    fn envio_fallido_agrega_mensaje_de_error() {
        let mut session = Session::new();
        session.begin_user_message("hola");
        session.fail_with_error();

        assert!(!session.processing);
        let ultimo = session.messages.last().unwrap();
        assert_eq!(ultimo.kind, MessageType::Error);
        assert_eq!(ultimo.sender, Sender::Bot);
    }

    #[test]
    fn los_mensajes_se_persisten_en_el_registro_activo() {
        let mut session = Session::new();
        session.begin_user_message("hola");
        session.complete_with_reply("adiós");

        let active = session.active_conversation.clone().unwrap();
        let conv = session.conversations.iter().find(|c| c.id == active).unwrap();
        assert_eq!(conv.messages, session.messages);
    }

    #[test]
    fn cambiar_de_conversacion_no_arrastra_estado() {
        let mut session = Session::new();
        let primera = session.new_conversation();
        session.begin_user_message("mensaje en la primera");
        // A media espera: processing activo y bitácora simulada poblada.
        session.audit_log = crate::demo_data::demo_audit_log(7);

        assert!(session.select_conversation("conv-2"));
        assert!(!session.processing);
        assert!(session.processing_text.is_none());
        assert!(session.audit_log.is_empty());
        assert!(session.messages.is_empty());
        assert_eq!(session.active_conversation.as_deref(), Some("conv-2"));

        // Volver a la primera restaura sus mensajes persistidos.
        assert!(session.select_conversation(&primera));
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].content, "mensaje en la primera");
    }

    #[test]
    fn seleccionar_un_id_desconocido_no_altera_nada() {
        let mut session = Session::new();
        session.begin_user_message("hola");
        assert!(!session.select_conversation("conv-inexistente"));
        assert_eq!(session.messages.len(), 1);
    }

    #[test]
    fn reentrar_al_demo_no_duplica_su_conversacion() {
        let mut session = Session::new();
        session.start_demo();
        session.start_demo();
        let demos = session
            .conversations
            .iter()
            .filter(|c| c.id == DEMO_CONVERSATION_ID)
            .count();
        assert_eq!(demos, 1);
        assert!(session.demo_started);
        assert_eq!(session.demo_step, 0);
    }

    #[test]
    fn cada_reinicio_incrementa_la_generacion() {
        let mut session = Session::new();
        let antes = session.epoch;
        session.reset_transient();
        session.new_conversation();
        assert_eq!(session.epoch, antes + 2);
    }
}
