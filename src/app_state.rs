use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::{chat::Session, config::AppConfig, relay::RelayClient, sequencer::Sequencer};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub relay: RelayClient,
    pub session: Arc<Mutex<Session>>,
    pub sequencer: Arc<Sequencer>,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl AppState {
    pub fn new(config: AppConfig, shutdown_tx: oneshot::Sender<()>) -> Self {
        Self {
            relay: RelayClient::new(&config),
            config,
            session: Arc::new(Mutex::new(Session::new())),
            sequencer: Arc::new(Sequencer::new()),
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_tx))),
        }
    }
}
