pub mod command;
pub mod constants;
pub mod demux;
pub mod device;
pub mod error;
pub mod file;
pub mod notification;
pub mod session;
pub mod settings;
pub mod store;

pub use command::{Command, Field, Registry};
pub use demux::{Demultiplexer, Scan};
pub use device::{DeviceConfig, FdsDevice, Transport};
pub use error::FdsError;
pub use session::{Session, SessionState, SharedStore};
pub use settings::Settings;
pub use store::{Edit, SettingsStore, StageValue};
