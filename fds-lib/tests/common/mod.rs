//! Common test utilities and shared imports

// Shared across test files; not every helper is used by every file
#![allow(dead_code, unused_imports)]

pub use bytes::Bytes;
pub use fds_lib::command::{Command, Field};
pub use fds_lib::demux::{Demultiplexer, Scan};
pub use fds_lib::device::Transport;
pub use fds_lib::error::FdsError;
pub use fds_lib::session::{Session, SessionState};
pub use fds_lib::settings::{
    AdditionalNotification, GeneralSetting, PresetIndex, Settings, StageFlag, StageId, StageNumber,
};
pub use fds_lib::store::{Edit, SettingsStore, StageValue};

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// A settings dump as a device with newer firmware sends it after `-`.
pub const SETTINGS_DUMP: &str = "n41A1B0C1D101G100020005000V051001Y010020030Z+00100-00200+00000\
+2a01000Beep+4c00150Flare+3f04000SwoopaSwoopaHop popend-settings";

/// In-memory stand-in for the USB link.
pub struct MockTransport {
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Bytes>>,
    sent: Arc<Mutex<Vec<String>>>,
}

/// The device side of a [`MockTransport`].
pub struct MockDevice {
    chunks: mpsc::UnboundedSender<Bytes>,
    sent: Arc<Mutex<Vec<String>>>,
}

pub fn mock_link() -> (MockTransport, MockDevice) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sent = Arc::new(Mutex::new(Vec::new()));
    (
        MockTransport {
            inbound: tokio::sync::Mutex::new(rx),
            sent: Arc::clone(&sent),
        },
        MockDevice { chunks: tx, sent },
    )
}

impl MockDevice {
    pub fn push(&self, chunk: &str) {
        self.chunks.send(Bytes::copy_from_slice(chunk.as_bytes())).unwrap();
    }

    /// Messages the host has written so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Close the inbound side, as if the cable were pulled.
    pub fn unplug(self) {
        drop(self.chunks);
    }
}

impl Transport for MockTransport {
    async fn send(&self, message: &str) -> Result<(), FdsError> {
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn receive(&self) -> Result<Bytes, FdsError> {
        self.inbound.lock().await.recv().await.ok_or(FdsError::Disconnected)
    }

    async fn disconnect(&self) -> Result<(), FdsError> {
        Ok(())
    }
}

/// Route library logs to the test harness; `RUST_LOG=debug` shows wire traffic.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn preset(index: usize) -> PresetIndex {
    PresetIndex::new(index).unwrap()
}

/// Run every chunk through one demultiplexer, threading the buffer.
pub fn feed_chunks<'a>(chunks: impl IntoIterator<Item = &'a str>) -> (SettingsStore, Vec<Scan>) {
    init_logging();
    let mut store = SettingsStore::default();
    let mut demux = Demultiplexer::new(&store).unwrap();
    let mut buffer = String::new();
    let mut scans = Vec::new();
    for chunk in chunks {
        let scan = demux.feed(buffer, chunk.as_bytes(), &mut store).unwrap();
        buffer = scan.buffer.clone();
        scans.push(scan);
    }
    (store, scans)
}

pub async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("timed out")
}

/// Start a session over a fresh mock link and wait for the dump to finish.
pub async fn ready_session() -> (Session<MockTransport>, MockDevice) {
    init_logging();
    let (transport, device) = mock_link();
    let store = Arc::new(tokio::sync::Mutex::new(SettingsStore::default()));
    let mut session = Session::start(transport, store, true).await.unwrap();
    device.push(SETTINGS_DUMP);
    within(session.wait_ready()).await.unwrap();
    (session, device)
}
