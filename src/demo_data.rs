//! Datos de demostración del flujo de procesamiento de facturas.
//!
//! Todo el contenido es estático: una factura de ejemplo, los resultados de
//! cada etapa, el guion de 12 mensajes con sus retardos y la bitácora de
//! auditoría derivada por prefijos del índice de paso.

use crate::models::*;

/// Identificador fijo de la conversación del modo demo. Se crea una sola vez
/// y se reutiliza al volver a entrar en el demo.
pub const DEMO_CONVERSATION_ID: &str = "conv-1";

/// Factura CFDI de ejemplo (estado inicial `recibida`).
pub fn demo_invoice() -> InvoiceData {
    InvoiceData {
        id: "inv-001".to_string(),
        folio: "A-4521".to_string(),
        emisor: "Tecnologías Avanzadas S.A. de C.V.".to_string(),
        receptor: "AGC Corporativo S.A. de C.V.".to_string(),
        rfc_emisor: "TAV200315KJ8".to_string(),
        rfc_receptor: "AGC180901LP4".to_string(),
        fecha: "2026-02-20".to_string(),
        subtotal: 45800.0,
        iva: 7328.0,
        total: 53128.0,
        moneda: "MXN".to_string(),
        uuid: "6ba7b810-9dad-11d1-80b4-00c04fd430c8".to_string(),
        tipo_comprobante: "Ingreso".to_string(),
        status: InvoiceStatus::Recibida,
        conceptos: vec![
            Concepto {
                descripcion: "Servicio de consultoría tecnológica".to_string(),
                cantidad: 1,
                valor_unitario: 35000.0,
                importe: 35000.0,
            },
            Concepto {
                descripcion: "Licencias de software empresarial".to_string(),
                cantidad: 3,
                valor_unitario: 3600.0,
                importe: 10800.0,
            },
        ],
    }
}

/// Resultado de validación fiscal: los seis controles aprobados.
pub fn demo_validation() -> ValidationResult {
    let check = |name: &str, detail: &str| ValidationCheck {
        name: name.to_string(),
        passed: true,
        detail: detail.to_string(),
    };
    ValidationResult {
        is_valid: true,
        checks: vec![
            check("Estructura XML", "Formato CFDI 4.0 válido"),
            check("Sello Digital", "Firma del emisor verificada"),
            check("RFC Emisor", "RFC activo en lista del SAT"),
            check("RFC Receptor", "Coincide con razón social"),
            check("UUID SAT", "Folio fiscal verificado"),
            check("Cálculos Fiscales", "IVA y subtotal correctos"),
        ],
        score: 98,
    }
}

/// Clasificación contable automática de la factura de ejemplo.
pub fn demo_classification() -> ClassificationResult {
    ClassificationResult {
        cuenta_contable: "6100-001-003".to_string(),
        descripcion_cuenta: "Gastos de consultoría y servicios profesionales".to_string(),
        centro_costo: "CC-TI-2026".to_string(),
        categoria: "Servicios Profesionales".to_string(),
        confianza: 94,
    }
}

/// Recomendación del motor IA para la factura de ejemplo.
pub fn demo_recommendation() -> AIRecommendation {
    AIRecommendation {
        action: RecommendedAction::Aprobar,
        confidence: 96,
        reasoning: "La factura cumple con todas las validaciones fiscales. El proveedor tiene \
                    historial positivo (12 transacciones previas). El monto está dentro del \
                    presupuesto autorizado para el centro de costo CC-TI-2026. Se recomienda \
                    aprobar y enviar al ERP."
            .to_string(),
        flags: vec!["Monto superior a $50,000".to_string()],
    }
}

/// Alta simulada de la factura en el ERP.
pub fn demo_erp_result() -> ERPResult {
    ERPResult {
        success: true,
        erp_id: "ERP-2026-04521".to_string(),
        timestamp: "2026-02-24T14:32:15Z".to_string(),
        module: "Cuentas por Pagar".to_string(),
        message: "Factura registrada exitosamente en el módulo de Cuentas por Pagar.".to_string(),
    }
}

/// Guion completo del demo: los 12 mensajes escenificados y el retardo (ms)
/// de revelado de cada uno.
pub fn demo_messages() -> (Vec<ChatMessage>, Vec<u64>) {
    let msg = |id: &str, sender: Sender, kind: MessageType, content: &str, ts: &str| ChatMessage {
        id: id.to_string(),
        sender,
        kind,
        content: content.to_string(),
        timestamp: ts.to_string(),
        data: None,
    };

    let messages = vec![
        msg(
            "msg-1",
            Sender::Bot,
            MessageType::Text,
            "Bienvenido a AGC-WARE. Soy tu Copilot Contable Empresarial. Puedo ayudarte a \
             procesar, validar y clasificar facturas electrónicas usando inteligencia \
             artificial. Adjunta un archivo XML para comenzar, o escríbeme lo que necesitas.",
            "14:25",
        ),
        msg(
            "msg-2",
            Sender::User,
            MessageType::Text,
            "Necesito procesar una factura nueva de Tecnologías Avanzadas.",
            "14:26",
        ),
        msg(
            "msg-3",
            Sender::Bot,
            MessageType::Text,
            "Perfecto, adjunta el archivo XML de la factura y comenzaré el procesamiento \
             automático.",
            "14:26",
        ),
        ChatMessage {
            data: Some(MessageData {
                file_name: Some("factura_TAV_A4521.xml".to_string()),
                ..Default::default()
            }),
            ..msg(
                "msg-4",
                Sender::User,
                MessageType::FileUpload,
                "He adjuntado la factura.",
                "14:27",
            )
        },
        ChatMessage {
            data: Some(MessageData {
                status: Some(InvoiceStatus::Recibida),
                ..Default::default()
            }),
            ..msg(
                "msg-5",
                Sender::Bot,
                MessageType::StatusUpdate,
                "Factura recibida correctamente. Iniciando proceso de validación...",
                "14:27",
            )
        },
        ChatMessage {
            data: Some(MessageData {
                validation: Some(demo_validation()),
                ..Default::default()
            }),
            ..msg(
                "msg-6",
                Sender::Bot,
                MessageType::ValidationResult,
                "La validación ha finalizado. Todos los controles fiscales pasaron exitosamente.",
                "14:28",
            )
        },
        ChatMessage {
            data: Some(MessageData {
                classification: Some(demo_classification()),
                ..Default::default()
            }),
            ..msg(
                "msg-7",
                Sender::Bot,
                MessageType::ClassificationResult,
                "He clasificado la factura automáticamente basándome en el historial contable y \
                 los conceptos facturados.",
                "14:28",
            )
        },
        ChatMessage {
            data: Some(MessageData {
                recommendation: Some(demo_recommendation()),
                ..Default::default()
            }),
            ..msg(
                "msg-8",
                Sender::Bot,
                MessageType::AiRecommendation,
                "Basándome en el análisis completo, esta es mi recomendación:",
                "14:29",
            )
        },
        msg(
            "msg-9",
            Sender::User,
            MessageType::Text,
            "Aprobado. Enviar al ERP.",
            "14:30",
        ),
        ChatMessage {
            data: Some(MessageData {
                status: Some(InvoiceStatus::EnviandoErp),
                ..Default::default()
            }),
            ..msg(
                "msg-10",
                Sender::Bot,
                MessageType::StatusUpdate,
                "Enviando factura al ERP...",
                "14:30",
            )
        },
        ChatMessage {
            data: Some(MessageData {
                erp: Some(demo_erp_result()),
                ..Default::default()
            }),
            ..msg(
                "msg-11",
                Sender::Bot,
                MessageType::ErpResult,
                "La factura ha sido enviada y registrada exitosamente en el ERP.",
                "14:32",
            )
        },
        msg(
            "msg-12",
            Sender::Bot,
            MessageType::Text,
            "Proceso completado. La factura A-4521 de Tecnologías Avanzadas ha sido procesada, \
             validada, clasificada y enviada al ERP exitosamente. Puedes ver el detalle \
             completo en el panel de contexto. ¿Necesitas procesar otra factura?",
            "14:32",
        ),
    ];

    let delays = vec![0, 800, 600, 1200, 1500, 2500, 2000, 2200, 800, 1500, 3000, 1000];

    (messages, delays)
}

/// Bitácora de auditoría para un índice de paso dado: un prefijo de la lista
/// completa de siete entradas, según la tabla paso → número de entradas.
pub fn demo_audit_log(step: usize) -> Vec<AuditEntry> {
    let entry = |id: &str, ts: &str, action: &str, detail: &str, user: &str, status: AuditStatus| {
        AuditEntry {
            id: id.to_string(),
            timestamp: ts.to_string(),
            action: action.to_string(),
            detail: detail.to_string(),
            user: user.to_string(),
            status,
        }
    };

    let all_entries = vec![
        entry(
            "aud-1",
            "14:27",
            "Factura Recibida",
            "XML cargado: factura_TAV_A4521.xml",
            "Sistema",
            AuditStatus::Info,
        ),
        entry(
            "aud-2",
            "14:28",
            "Validación Completa",
            "6/6 controles aprobados - Score: 98%",
            "Motor IA",
            AuditStatus::Success,
        ),
        entry(
            "aud-3",
            "14:28",
            "Clasificación Automática",
            "Cuenta 6100-001-003 - Confianza: 94%",
            "Motor IA",
            AuditStatus::Success,
        ),
        entry(
            "aud-4",
            "14:29",
            "Recomendación IA",
            "Acción: Aprobar - Confianza: 96%",
            "Motor IA",
            AuditStatus::Success,
        ),
        entry(
            "aud-5",
            "14:29",
            "Alerta",
            "Monto superior a $50,000 MXN",
            "Motor IA",
            AuditStatus::Warning,
        ),
        entry(
            "aud-6",
            "14:30",
            "Aprobación Manual",
            "Factura aprobada por usuario",
            "Admin",
            AuditStatus::Success,
        ),
        entry(
            "aud-7",
            "14:32",
            "Enviada a ERP",
            "ID: ERP-2026-04521 - Cuentas por Pagar",
            "Sistema",
            AuditStatus::Success,
        ),
    ];

    const STEP_MAP: [usize; 8] = [0, 1, 2, 3, 5, 5, 6, 7];
    let count = STEP_MAP[step.min(STEP_MAP.len() - 1)];
    all_entries.into_iter().take(count).collect()
}

/// Conversaciones sembradas del historial lateral. La primera es la del demo.
pub fn demo_conversations() -> Vec<Conversation> {
    let conv = |id: &str, title: &str, date: &str| Conversation {
        id: id.to_string(),
        title: title.to_string(),
        date: date.to_string(),
        messages: Vec::new(),
    };
    vec![
        conv(DEMO_CONVERSATION_ID, "Factura TAV A-4521", "Hoy, 14:25"),
        conv("conv-2", "Lote facturas Feb 2026", "Ayer, 09:15"),
        conv("conv-3", "Corrección RFC emisor", "22 Feb, 16:30"),
        conv("conv-4", "Factura rechazada #3891", "21 Feb, 11:00"),
        conv("conv-5", "Consulta clasificación", "20 Feb, 08:45"),
    ]
}
