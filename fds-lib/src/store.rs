//! # Settings store
//!
//! The store owns the canonical [`Settings`] snapshot. Every mutation builds a
//! fresh snapshot from a copy of the current one and swaps it in whole, so a
//! reader holding an `Arc<Settings>` never observes a half-applied update.
//!
//! Local edits go through [`SettingsStore::apply`] (state only) or
//! [`SettingsStore::apply_and_send`] (state, then the re-read triple on the
//! wire). Values decoded from the device use [`SettingsStore::apply_command`],
//! which has no way to reach a transport and therefore cannot echo.

use crate::command::{Command, NotificationChange, NotificationOp};
use crate::constants::{MAX_ALTITUDE, MAX_DROPZONE_OFFSET, MAX_FREEFALL_THRESHOLD, MAX_VOLUME, MIN_VOLUME};
use crate::device::Transport;
use crate::error::FdsError;
use crate::notification::NotificationCatalog;
use crate::settings::{
    AdditionalNotification, GeneralSetting, PresetIndex, Settings, StageFlag, StageId, StageNumber, check_range,
    validate_frequency, validate_notification,
};
use std::sync::Arc;
use strum::IntoEnumIterator;
use tokio::sync::watch;
use tracing::{debug, info};

/// A single value on one stage of one preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageValue {
    Flag(StageFlag, bool),
    Number(StageNumber, u32),
}

/// A user-initiated change to the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    General(GeneralSetting, bool),
    DropzoneOffset(PresetIndex, i32),
    Stage(PresetIndex, StageId, StageValue),
    FreefallThreshold(PresetIndex, u16),
    AddNotification(PresetIndex, StageId, AdditionalNotification),
    RemoveNotification(PresetIndex, StageId, AdditionalNotification),
}

#[derive(Debug)]
pub struct SettingsStore {
    settings: Arc<Settings>,
    catalog: NotificationCatalog,
    updates: watch::Sender<Arc<Settings>>,
    revision: u64,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl SettingsStore {
    pub fn new(settings: Settings) -> Self {
        let settings = Arc::new(settings);
        let (updates, _) = watch::channel(Arc::clone(&settings));
        Self {
            settings,
            catalog: NotificationCatalog::new(),
            updates,
            revision: 0,
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Settings> {
        Arc::clone(&self.settings)
    }

    /// Receives every committed snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Settings>> {
        self.updates.subscribe()
    }

    /// Number of snapshots committed since the store was created.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn catalog(&self) -> &NotificationCatalog {
        &self.catalog
    }

    pub fn add_extra_notification(&mut self, name: impl Into<String>) -> bool {
        self.catalog.insert(name)
    }

    fn commit(&mut self, update: impl FnOnce(&mut Settings)) {
        let mut next = Settings::clone(&self.settings);
        update(&mut next);
        if next == *self.settings {
            return;
        }
        self.settings = Arc::new(next);
        self.revision += 1;
        self.updates.send_replace(Arc::clone(&self.settings));
    }

    /// Replace the whole snapshot.
    pub fn set_settings(&mut self, settings: Settings) {
        debug!("Replacing settings snapshot");
        self.commit(|current| *current = settings);
    }

    pub fn update_general_setting(&mut self, key: GeneralSetting, value: bool) -> Command {
        self.commit(|s| s.general_settings.set(key, value));
        Command::General(key, self.settings.general_settings.get(key))
    }

    /// Set the dropzone offset of one preset.
    pub fn update_preset_setting(&mut self, preset: PresetIndex, dropzone_offset: i32) -> Command {
        self.commit(|s| s.preset_mut(preset).dropzone_offset = dropzone_offset);
        Command::DropzoneOffset(self.settings.dropzone_offsets())
    }

    pub fn update_preset_stage_setting(&mut self, preset: PresetIndex, stage: StageId, value: StageValue) -> Command {
        match value {
            StageValue::Flag(key, value) => {
                self.commit(|s| s.preset_mut(preset).stage_mut(stage).set_flag(key, value));
                Command::StageFlags(stage, key, self.settings.stage_flags(stage, key))
            }
            StageValue::Number(key, value) => {
                self.commit(|s| s.preset_mut(preset).stage_mut(stage).set_number(key, value));
                Command::StageNumbers(stage, key, self.settings.stage_numbers(stage, key))
            }
        }
    }

    pub fn update_freefall_threshold(&mut self, preset: PresetIndex, threshold: u16) -> Command {
        self.commit(|s| s.preset_mut(preset).freefall_settings.freefall_threshold = threshold);
        Command::FreefallThreshold(self.settings.freefall_thresholds())
    }

    /// Insert a notification unless an identical one exists.
    pub fn add_preset_stage_notification(
        &mut self,
        preset: PresetIndex,
        stage: StageId,
        notification: AdditionalNotification,
    ) -> Command {
        let change = NotificationChange {
            op: NotificationOp::Add,
            preset,
            stage,
            notification: notification.clone(),
        };
        self.commit(|s| {
            s.preset_mut(preset).stage_mut(stage).add_notification(notification);
        });
        Command::Notification(change)
    }

    /// Remove the first identical notification; absent entries are ignored.
    pub fn remove_preset_stage_notification(
        &mut self,
        preset: PresetIndex,
        stage: StageId,
        notification: AdditionalNotification,
    ) -> Command {
        self.commit(|s| {
            s.preset_mut(preset).stage_mut(stage).remove_notification(&notification);
        });
        Command::Notification(NotificationChange {
            op: NotificationOp::Remove,
            preset,
            stage,
            notification,
        })
    }

    /// Validate and apply a local edit without touching any device.
    pub fn apply(&mut self, edit: Edit) -> Result<Command, FdsError> {
        self.check(&edit)?;
        Ok(match edit {
            Edit::General(key, value) => self.update_general_setting(key, value),
            Edit::DropzoneOffset(preset, offset) => self.update_preset_setting(preset, offset),
            Edit::Stage(preset, stage, value) => self.update_preset_stage_setting(preset, stage, value),
            Edit::FreefallThreshold(preset, threshold) => self.update_freefall_threshold(preset, threshold),
            Edit::AddNotification(preset, stage, n) => self.add_preset_stage_notification(preset, stage, n),
            Edit::RemoveNotification(preset, stage, n) => self.remove_preset_stage_notification(preset, stage, n),
        })
    }

    /// Apply a local edit, then transmit the affected field.
    pub async fn apply_and_send<T: Transport>(&mut self, edit: Edit, transport: &T) -> Result<Command, FdsError> {
        let command = self.apply(edit)?;
        transmit(transport, &command).await?;
        Ok(command)
    }

    /// Apply a command decoded from the device. Nothing is sent back, and a
    /// triple lands in a single snapshot.
    pub fn apply_command(&mut self, command: Command) {
        match command {
            Command::General(key, value) => {
                self.update_general_setting(key, value);
            }
            Command::StageFlags(stage, key, values) => self.commit(|s| {
                for (preset, value) in PresetIndex::ALL.into_iter().zip(values) {
                    s.preset_mut(preset).stage_mut(stage).set_flag(key, value);
                }
            }),
            Command::StageNumbers(stage, key, values) => self.commit(|s| {
                for (preset, value) in PresetIndex::ALL.into_iter().zip(values) {
                    s.preset_mut(preset).stage_mut(stage).set_number(key, value);
                }
            }),
            Command::FreefallThreshold(values) => self.commit(|s| {
                for (preset, value) in PresetIndex::ALL.into_iter().zip(values) {
                    s.preset_mut(preset).freefall_settings.freefall_threshold =
                        u16::try_from(value).unwrap_or(u16::MAX);
                }
            }),
            Command::DropzoneOffset(values) => self.commit(|s| {
                for (preset, value) in PresetIndex::ALL.into_iter().zip(values) {
                    s.preset_mut(preset).dropzone_offset = value;
                }
            }),
            Command::Notification(change) => match change.op {
                NotificationOp::Add => {
                    self.add_preset_stage_notification(change.preset, change.stage, change.notification);
                }
                NotificationOp::Remove => {
                    self.remove_preset_stage_notification(change.preset, change.stage, change.notification);
                }
            },
            Command::CustomNotification(name) => {
                if self.catalog.insert(name.as_str()) {
                    info!(name = %name, "Device announced a custom notification");
                }
            }
            Command::PlayNotification(name) => info!(name = %name, "Device played notification"),
        }
    }

    /// Replace the snapshot with an imported one. Returns the commands that
    /// bring an attached device in line with it: every scalar field, then
    /// notification removals, then additions.
    pub fn import(&mut self, settings: Settings) -> Result<Vec<Command>, FdsError> {
        settings.validate()?;
        for preset in &settings.preset_settings {
            for stage in StageId::iter() {
                for n in &preset.stage(stage).additional_notifications {
                    self.catalog.insert(n.notification.as_str());
                }
            }
        }

        let mut commands = Command::dump(&settings);
        commands.extend(notification_diff(&self.settings, &settings));
        info!(commands = commands.len(), "Importing settings");
        self.set_settings(settings);
        Ok(commands)
    }

    /// The play command for a known notification name.
    pub fn play_notification(&self, name: &str) -> Result<Command, FdsError> {
        if !self.catalog.contains(name) {
            return Err(FdsError::UnknownNotification(name.to_string()));
        }
        Ok(Command::PlayNotification(name.to_string()))
    }

    fn check(&self, edit: &Edit) -> Result<(), FdsError> {
        match edit {
            Edit::General(..) | Edit::Stage(_, _, StageValue::Flag(..)) => Ok(()),
            Edit::DropzoneOffset(_, offset) => check_range(
                "dropzoneOffset",
                i64::from(*offset),
                -i64::from(MAX_DROPZONE_OFFSET),
                i64::from(MAX_DROPZONE_OFFSET),
            ),
            Edit::Stage(preset, stage, StageValue::Number(key, value)) => {
                let current = self.settings.preset(*preset).stage(*stage);
                match key {
                    StageNumber::AnnouncementFrequency => validate_frequency(*value),
                    StageNumber::FromAltitude => {
                        check_range("fromAltitude", i64::from(*value), 0, i64::from(MAX_ALTITUDE))?;
                        ordered_band(*value, current.to_altitude)
                    }
                    StageNumber::ToAltitude => {
                        check_range("toAltitude", i64::from(*value), 0, i64::from(MAX_ALTITUDE))?;
                        ordered_band(current.from_altitude, *value)
                    }
                    StageNumber::Volume => check_range(
                        "volume",
                        i64::from(*value),
                        i64::from(MIN_VOLUME),
                        i64::from(MAX_VOLUME),
                    ),
                }
            }
            Edit::FreefallThreshold(_, threshold) => check_range(
                "freefallThreshold",
                i64::from(*threshold),
                0,
                i64::from(MAX_FREEFALL_THRESHOLD),
            ),
            Edit::AddNotification(_, _, n) => {
                validate_notification(n)?;
                if self.catalog.contains(&n.notification) {
                    Ok(())
                } else {
                    Err(FdsError::UnknownNotification(n.notification.clone()))
                }
            }
            Edit::RemoveNotification(_, _, n) => validate_notification(n),
        }
    }
}

fn ordered_band(from: u32, to: u32) -> Result<(), FdsError> {
    if from <= to {
        Ok(())
    } else {
        Err(FdsError::InvertedAltitudeBand { from, to })
    }
}

fn notification_diff(old: &Settings, new: &Settings) -> Vec<Command> {
    let mut removals = Vec::new();
    let mut additions = Vec::new();
    for preset in PresetIndex::ALL {
        for stage in StageId::iter() {
            let before = &old.preset(preset).stage(stage).additional_notifications;
            let after = &new.preset(preset).stage(stage).additional_notifications;
            let change = |op, notification: &AdditionalNotification| {
                Command::Notification(NotificationChange {
                    op,
                    preset,
                    stage,
                    notification: notification.clone(),
                })
            };
            removals.extend(
                before
                    .iter()
                    .filter(|n| !after.contains(n))
                    .map(|n| change(NotificationOp::Remove, n)),
            );
            additions.extend(
                after
                    .iter()
                    .filter(|n| !before.contains(n))
                    .map(|n| change(NotificationOp::Add, n)),
            );
        }
    }
    removals.extend(additions);
    removals
}

/// Encode a command and hand it to the transport.
pub async fn transmit<T: Transport>(transport: &T, command: &Command) -> Result<(), FdsError> {
    let message = command.encode()?;
    info!(field = %command.field(), message = %message, "Sending update");
    transport.send(&message).await
}
