//! Modelos de dominio del copilot contable (factura, resultados de cada
//! etapa, mensajes de chat y conversaciones).
//!
//! Los nombres de campo serializados coinciden con el contrato JSON que
//! consume el frontend (camelCase, valores de enum en español).

use serde::{Deserialize, Serialize};

/// Estado de progreso de una factura dentro del flujo de procesamiento.
///
/// La progresión es lineal: recibida → validando → validada → clasificando →
/// clasificada → recomendando → aprobada → enviando_erp → enviada_erp.
/// `Error` es terminal y alcanzable desde cualquier punto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Recibida,
    Validando,
    Validada,
    Clasificando,
    Clasificada,
    Recomendando,
    Aprobada,
    EnviandoErp,
    EnviadaErp,
    Error,
}

/// Concepto (línea) de una factura CFDI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concepto {
    pub descripcion: String,
    pub cantidad: u32,
    pub valor_unitario: f64,
    pub importe: f64,
}

/// Instantánea fiscal de una factura. Se reemplaza completa en cada cambio
/// de estado; nunca se mutan campos anidados sueltos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceData {
    pub id: String,
    pub folio: String,
    pub emisor: String,
    pub receptor: String,
    pub rfc_emisor: String,
    pub rfc_receptor: String,
    pub fecha: String,
    pub subtotal: f64,
    pub iva: f64,
    pub total: f64,
    pub moneda: String,
    pub uuid: String,
    pub tipo_comprobante: String,
    pub status: InvoiceStatus,
    pub conceptos: Vec<Concepto>,
}

/// Un control individual de la validación fiscal (estructura XML, sellos,
/// RFC contra listas del SAT, etc.).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

/// Resultado de la validación fiscal de la factura.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub checks: Vec<ValidationCheck>,
    pub score: u32,
}

/// Resultado de la clasificación contable automática.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub cuenta_contable: String,
    pub descripcion_cuenta: String,
    pub centro_costo: String,
    pub categoria: String,
    pub confianza: u32,
}

/// Acción sugerida por el motor de recomendación.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendedAction {
    Aprobar,
    Revisar,
    Rechazar,
}

/// Recomendación del motor IA sobre qué hacer con la factura.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIRecommendation {
    pub action: RecommendedAction,
    pub confidence: u32,
    pub reasoning: String,
    pub flags: Vec<String>,
}

/// Resultado del alta de la factura en el ERP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ERPResult {
    pub success: bool,
    pub erp_id: String,
    pub timestamp: String,
    pub module: String,
    pub message: String,
}

/// Severidad de una entrada de la bitácora de auditoría.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Success,
    Warning,
    Error,
    Info,
}

/// Entrada de la bitácora. La bitácora es una secuencia ordenada que sólo
/// crece por prefijos: se deriva del índice de paso, nunca se reordena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub timestamp: String,
    pub action: String,
    pub detail: String,
    pub user: String,
    pub status: AuditStatus,
}

/// Quién emitió un mensaje de chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Bot,
    User,
}

/// Discriminante del contenido de un mensaje de chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    FileUpload,
    ValidationResult,
    ClassificationResult,
    AiRecommendation,
    ErpResult,
    StatusUpdate,
    Error,
    ActionButtons,
}

/// Botón de acción sugerido dentro de un mensaje `action_buttons`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionButton {
    pub label: String,
    pub variant: String,
    pub action: String,
}

/// Carga asociada a un mensaje. Los campos presentes deben corresponder con
/// el `type` del mensaje (p. ej. `validation_result` implica `validation`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<InvoiceData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<AIRecommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub erp: Option<ERPResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InvoiceStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ActionButton>>,
}

/// Mensaje del chat. Inmutable una vez añadido: la lista de mensajes de una
/// conversación es sólo-append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub content: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageData>,
}

/// Registro de una conversación del historial lateral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub date: String,
    /// Mensajes persistidos de la conversación (write-through desde la sesión).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ChatMessage>,
}
