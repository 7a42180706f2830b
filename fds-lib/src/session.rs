//! A live connection: one transport, one read loop, one buffer.

use crate::command::Command;
use crate::constants::REQUEST_SETTINGS;
use crate::demux::Demultiplexer;
use crate::device::Transport;
use crate::error::FdsError;
use crate::settings::Settings;
use crate::store::{Edit, SettingsStore, transmit};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub type SharedStore = Arc<Mutex<SettingsStore>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Link is up, nothing received yet.
    Connecting,
    /// The device is streaming its settings dump.
    ReceivingSettings,
    Ready,
    /// The read loop has stopped. Carries the reason, if any.
    Detached(Option<String>),
}

pub struct Session<T: Transport + 'static> {
    transport: Arc<T>,
    store: SharedStore,
    state: watch::Receiver<SessionState>,
    reader: JoinHandle<()>,
}

impl<T: Transport + 'static> Session<T> {
    /// Start reading from `transport`, optionally asking the device for its
    /// settings first.
    pub async fn start(transport: T, store: SharedStore, request_settings: bool) -> Result<Self, FdsError> {
        let transport = Arc::new(transport);
        let demux = Demultiplexer::new(&*store.lock().await)?;
        let (state_tx, state) = watch::channel(SessionState::Connecting);
        let reader = tokio::spawn(read_loop(Arc::clone(&transport), Arc::clone(&store), demux, state_tx));

        if request_settings {
            info!("Requesting settings");
            if let Err(e) = transport.send(REQUEST_SETTINGS).await {
                reader.abort();
                return Err(e);
            }
        }

        Ok(Self {
            transport,
            store,
            state,
            reader,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait until the device finishes its settings dump.
    pub async fn wait_ready(&mut self) -> Result<(), FdsError> {
        loop {
            let current = self.state.borrow_and_update().clone();
            match current {
                SessionState::Ready => return Ok(()),
                SessionState::Detached(_) => return Err(FdsError::Disconnected),
                SessionState::Connecting | SessionState::ReceivingSettings => {}
            }
            if self.state.changed().await.is_err() {
                return Err(FdsError::Disconnected);
            }
        }
    }

    pub fn store(&self) -> SharedStore {
        Arc::clone(&self.store)
    }

    pub async fn snapshot(&self) -> Arc<Settings> {
        self.store.lock().await.snapshot()
    }

    pub async fn apply_and_send(&self, edit: Edit) -> Result<Command, FdsError> {
        self.ensure_attached()?;
        let mut store = self.store.lock().await;
        store.apply_and_send(edit, self.transport.as_ref()).await
    }

    /// Replace local settings and push every difference to the device.
    /// Returns the number of messages sent.
    pub async fn import_and_send(&self, settings: Settings) -> Result<usize, FdsError> {
        self.ensure_attached()?;
        let commands = self.store.lock().await.import(settings)?;
        for command in &commands {
            transmit(self.transport.as_ref(), command).await?;
        }
        Ok(commands.len())
    }

    pub async fn play_notification(&self, name: &str) -> Result<(), FdsError> {
        self.ensure_attached()?;
        let command = self.store.lock().await.play_notification(name)?;
        transmit(self.transport.as_ref(), &command).await
    }

    /// Stop reading and release the device.
    pub async fn disconnect(self) -> Result<(), FdsError> {
        self.reader.abort();
        self.transport.disconnect().await
    }

    fn ensure_attached(&self) -> Result<(), FdsError> {
        match *self.state.borrow() {
            SessionState::Detached(_) => Err(FdsError::Disconnected),
            _ => Ok(()),
        }
    }
}

impl<T: Transport + 'static> Drop for Session<T> {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop<T: Transport>(
    transport: Arc<T>,
    store: SharedStore,
    mut demux: Demultiplexer,
    state: watch::Sender<SessionState>,
) {
    let mut buffer = String::new();
    loop {
        let chunk = match transport.receive().await {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "Transport closed, detaching");
                state.send_replace(SessionState::Detached(Some(e.to_string())));
                return;
            }
        };
        debug!(bytes = chunk.len(), "Received chunk");

        let scan = {
            let mut store = store.lock().await;
            demux.feed(std::mem::take(&mut buffer), &chunk, &mut store)
        };
        match scan {
            Ok(scan) => {
                buffer = scan.buffer;
                if scan.session_started {
                    state.send_replace(SessionState::ReceivingSettings);
                }
                if scan.session_ended {
                    state.send_replace(SessionState::Ready);
                }
            }
            Err(e) => {
                error!(error = %e, "Protocol violation, aborting session");
                state.send_replace(SessionState::Detached(Some(e.to_string())));
                return;
            }
        }
    }
}
