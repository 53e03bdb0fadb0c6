//! Secuenciador del modo demo: revela el guion de mensajes contra la máquina
//! de estados de la factura, con los retardos escenificados de cada paso.
//!
//! El secuenciador sólo contiene las tablas fijas del guion; el progreso
//! (`demo_step`, `demo_started`) vive en la `Session` compartida. Cada sleep
//! es un punto de suspensión: al despertar se revalida la generación de la
//! sesión (`epoch`) para que un reinicio cancele los avances en vuelo.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::chat::Session;
use crate::demo_data::{self, demo_audit_log, demo_invoice, demo_messages};
use crate::models::{ChatMessage, InvoiceData, InvoiceStatus, Sender};

/// Retardo de revelado cuando el guion no especifica uno.
const DEFAULT_REVEAL_MS: u64 = 1000;
/// Pausa del auto-avance antes del primer paso.
const FIRST_STEP_INTERVAL_MS: u64 = 500;
/// Pausa del auto-avance entre pasos siguientes.
const STEP_INTERVAL_MS: u64 = 1200;

/// Tablas fijas del guion del demo. Inmutables tras la construcción.
#[derive(Debug)]
pub struct Sequencer {
    script: Vec<ChatMessage>,
    delays: Vec<u64>,
    statuses: Vec<Option<InvoiceStatus>>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    pub fn new() -> Self {
        let (script, delays) = demo_messages();
        // Estado de la factura que materializa cada paso (None = sin cambio).
        let statuses = vec![
            None,                             // msg-1: bienvenida
            None,                             // msg-2: petición del usuario
            None,                             // msg-3: el bot pide el archivo
            Some(InvoiceStatus::Recibida),    // msg-4: archivo adjuntado
            Some(InvoiceStatus::Validando),   // msg-5: actualización de estado
            Some(InvoiceStatus::Validada),    // msg-6: resultado de validación
            Some(InvoiceStatus::Clasificada), // msg-7: clasificación
            Some(InvoiceStatus::Aprobada),    // msg-8: recomendación
            None,                             // msg-9: el usuario aprueba
            Some(InvoiceStatus::EnviandoErp), // msg-10: enviando
            Some(InvoiceStatus::EnviadaErp),  // msg-11: resultado ERP
            Some(InvoiceStatus::EnviadaErp),  // msg-12: cierre
        ];
        debug_assert_eq!(script.len(), statuses.len());
        Self {
            script,
            delays,
            statuses,
        }
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    /// Un avance del demo sobre la generación actual de la sesión. Para
    /// mensajes del bot (salvo el paso 0) enciende el indicador de proceso,
    /// espera el retardo del paso y sólo entonces aplica los efectos; los
    /// mensajes del usuario se aplican en el acto.
    pub async fn advance_once(&self, session: &Arc<Mutex<Session>>) {
        let epoch = session.lock().unwrap().epoch;
        self.advance_for_epoch(session, epoch).await;
    }

    /// Núcleo del avance, ligado a una generación concreta: si la sesión ya
    /// no está en esa generación (reinicio o nuevo arranque del demo), el
    /// avance se descarta sin tocar nada.
    async fn advance_for_epoch(&self, session: &Arc<Mutex<Session>>, epoch: u64) {
        let (needs_delay, delay_ms) = {
            let mut s = session.lock().unwrap();
            if s.epoch != epoch || s.demo_step >= self.script.len() {
                return;
            }
            let step = s.demo_step;
            let message = &self.script[step];
            if message.sender == Sender::Bot && step > 0 {
                s.processing = true;
                s.processing_text = Some(processing_label(step).to_string());
                let delay = self.delays.get(step).copied().unwrap_or(DEFAULT_REVEAL_MS);
                (true, delay)
            } else {
                self.apply_step(&mut s);
                (false, 0)
            }
        };

        if !needs_delay {
            return;
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;

        let mut s = session.lock().unwrap();
        if s.epoch != epoch {
            // La sesión se reinició durante la espera; el avance se descarta.
            debug!("Avance del demo descartado por reinicio de sesión");
            return;
        }
        s.processing = false;
        s.processing_text = None;
        self.apply_step(&mut s);
    }

    /// Bucle de auto-avance: mientras el demo esté en marcha y queden pasos,
    /// espera la pausa entre pasos (500 ms antes del primero, 1200 ms después)
    /// y avanza. Se detiene solo al agotar el guion o al reiniciarse la
    /// sesión; si un envío en vivo dejó encendido el indicador de proceso,
    /// el bucle reintenta tras la siguiente pausa y el demo se reanuda en
    /// cuanto el indicador se apaga.
    ///
    /// La generación de la sesión se captura una sola vez al arrancar: un
    /// `epoch` distinto en cualquier despertar significa que otro arranque
    /// tomó el relevo y este conductor termina sin tocar la sesión.
    pub async fn run(&self, session: Arc<Mutex<Session>>) {
        let epoch = session.lock().unwrap().epoch;
        loop {
            let interval_ms = {
                let s = session.lock().unwrap();
                if s.epoch != epoch || !s.demo_started || s.demo_step >= self.script.len() {
                    return;
                }
                if s.demo_step == 0 {
                    FIRST_STEP_INTERVAL_MS
                } else {
                    STEP_INTERVAL_MS
                }
            };

            tokio::time::sleep(Duration::from_millis(interval_ms)).await;

            {
                let s = session.lock().unwrap();
                if s.epoch != epoch || !s.demo_started {
                    return;
                }
                if s.processing {
                    continue;
                }
            }

            self.advance_for_epoch(&session, epoch).await;
        }
    }

    /// Efectos sincrónicos de revelar el paso actual: añade el mensaje,
    /// actualiza el estado de la factura, adjunta los resultados de etapa en
    /// sus pasos designados, recalcula la bitácora e incrementa el paso.
    fn apply_step(&self, session: &mut Session) {
        let step = session.demo_step;
        if step >= self.script.len() {
            return;
        }

        session.messages.push(self.script[step].clone());

        if let Some(status) = self.statuses[step] {
            session.current_invoice = match session.current_invoice.take() {
                // El primer estado no nulo a partir del paso 3 materializa la
                // factura; los siguientes sólo reemplazan su estado.
                None if step >= 3 => Some(InvoiceData {
                    status,
                    ..demo_invoice()
                }),
                Some(invoice) => Some(InvoiceData { status, ..invoice }),
                None => None,
            };
        }

        if step == 5 {
            session.current_validation = Some(demo_data::demo_validation());
        }
        if step == 6 {
            session.current_classification = Some(demo_data::demo_classification());
        }
        if step == 7 {
            session.current_recommendation = Some(demo_data::demo_recommendation());
        }

        session.audit_log = demo_audit_log(step);
        session.demo_step = step + 1;
    }
}

/// Texto del indicador de proceso por paso; "Procesando..." por defecto.
fn processing_label(step: usize) -> &'static str {
    match step {
        2 => "Analizando solicitud...",
        4 => "Procesando factura...",
        5 => "Validando factura con SAT...",
        6 => "Clasificando contablemente...",
        7 => "Generando recomendación IA...",
        9 => "Enviando al ERP...",
        10 => "Confirmando registro...",
        11 => "Generando resumen...",
        _ => "Procesando...",
    }
}
