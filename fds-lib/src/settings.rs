//! # Altimeter configuration model
//!
//! The device stores one block of [`GeneralSettings`] and exactly three
//! [`PresetSettings`] slots. Each preset carries a dropzone offset and one
//! [`StageSettings`] block per jump phase; the freefall phase additionally
//! carries a speed threshold ([`FreefallStageSettings`]).
//!
//! All types serialize with camelCase keys so a backup document reads the
//! same as the device's own field names.

use crate::constants::{
    ANNOUNCEMENT_FREQUENCIES, MAX_ALTITUDE, MAX_DROPZONE_OFFSET, MAX_FREEFALL_THRESHOLD,
    MAX_NOTIFICATION_ALTITUDE, MAX_VOLUME, MIN_VOLUME, PRESET_COUNT, PRESET_DIGIT_OFFSET,
};
use crate::error::FdsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use strum_macros::{Display, EnumIter, EnumString};

/// Positional address of a preset slot (0..=2, shown to users as 1..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PresetIndex(usize);

impl PresetIndex {
    pub const ALL: [PresetIndex; PRESET_COUNT] = [PresetIndex(0), PresetIndex(1), PresetIndex(2)];

    pub fn new(index: usize) -> Result<Self, FdsError> {
        if index < PRESET_COUNT {
            Ok(Self(index))
        } else {
            Err(FdsError::InvalidPresetIndex(index))
        }
    }

    pub fn get(self) -> usize {
        self.0
    }

    /// Digit used in notification messages: index 0 is sent as `2`.
    pub fn wire_digit(self) -> char {
        char::from(b'0' + PRESET_DIGIT_OFFSET + self.0 as u8)
    }

    pub fn from_wire_digit(digit: char) -> Result<Self, FdsError> {
        let value = digit
            .to_digit(10)
            .and_then(|d| d.checked_sub(u32::from(PRESET_DIGIT_OFFSET)))
            .ok_or(FdsError::Grammar {
                what: "preset digit",
                found: digit,
            })?;
        Self::new(value as usize).map_err(|_| FdsError::Grammar {
            what: "preset digit",
            found: digit,
        })
    }
}

impl TryFrom<usize> for PresetIndex {
    type Error = FdsError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::new(index)
    }
}

impl fmt::Display for PresetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Preset {}", self.0 + 1)
    }
}

/// The three jump phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageId {
    #[strum(to_string = "ascend")]
    Ascend,
    #[strum(to_string = "freefall")]
    Freefall,
    #[strum(to_string = "canopy")]
    Canopy,
}

impl StageId {
    /// Stage character used in notification messages.
    pub fn wire_char(self) -> char {
        match self {
            StageId::Ascend => 'a',
            StageId::Freefall => 'f',
            StageId::Canopy => 'c',
        }
    }

    pub fn from_wire_char(c: char) -> Result<Self, FdsError> {
        match c {
            'a' => Ok(StageId::Ascend),
            'f' => Ok(StageId::Freefall),
            'c' => Ok(StageId::Canopy),
            other => Err(FdsError::Grammar {
                what: "notification stage",
                found: other,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum GeneralSetting {
    #[strum(to_string = "includePreJumpInfo")]
    IncludePreJumpInfo,
    #[strum(to_string = "includePostJumpInfo")]
    IncludePostJumpInfo,
    #[strum(to_string = "useMetric")]
    UseMetric,
}

/// Boolean settings present on every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum StageFlag {
    #[strum(to_string = "abbreviateReadings")]
    AbbreviateReadings,
    #[strum(to_string = "announceAltitude")]
    AnnounceAltitude,
    #[strum(to_string = "announceSpeed")]
    AnnounceSpeed,
}

/// Numeric settings present on every stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum StageNumber {
    #[strum(to_string = "announcementFrequency")]
    AnnouncementFrequency,
    #[strum(to_string = "fromAltitude")]
    FromAltitude,
    #[strum(to_string = "toAltitude")]
    ToAltitude,
    #[strum(to_string = "volume")]
    Volume,
}

/// A named audio cue played at a trigger altitude (feet).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdditionalNotification {
    pub notification: String,
    pub altitude: u32,
}

impl AdditionalNotification {
    pub fn new(notification: impl Into<String>, altitude: u32) -> Self {
        Self {
            notification: notification.into(),
            altitude,
        }
    }
}

impl fmt::Display for AdditionalNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {} feet", self.notification, self.altitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
    pub include_pre_jump_info: bool,
    pub include_post_jump_info: bool,
    pub use_metric: bool,
}

impl GeneralSettings {
    pub fn get(&self, key: GeneralSetting) -> bool {
        match key {
            GeneralSetting::IncludePreJumpInfo => self.include_pre_jump_info,
            GeneralSetting::IncludePostJumpInfo => self.include_post_jump_info,
            GeneralSetting::UseMetric => self.use_metric,
        }
    }

    pub fn set(&mut self, key: GeneralSetting, value: bool) {
        match key {
            GeneralSetting::IncludePreJumpInfo => self.include_pre_jump_info = value,
            GeneralSetting::IncludePostJumpInfo => self.include_post_jump_info = value,
            GeneralSetting::UseMetric => self.use_metric = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSettings {
    pub abbreviate_readings: bool,
    pub announcement_frequency: u16,
    pub announce_altitude: bool,
    pub announce_speed: bool,
    pub from_altitude: u32,
    pub to_altitude: u32,
    pub volume: u8,
    #[serde(default)]
    pub additional_notifications: Vec<AdditionalNotification>,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            abbreviate_readings: false,
            announcement_frequency: 1000,
            announce_altitude: false,
            announce_speed: false,
            from_altitude: 0,
            to_altitude: 10_000,
            volume: 5,
            additional_notifications: Vec::new(),
        }
    }
}

impl StageSettings {
    pub fn flag(&self, key: StageFlag) -> bool {
        match key {
            StageFlag::AbbreviateReadings => self.abbreviate_readings,
            StageFlag::AnnounceAltitude => self.announce_altitude,
            StageFlag::AnnounceSpeed => self.announce_speed,
        }
    }

    pub fn set_flag(&mut self, key: StageFlag, value: bool) {
        match key {
            StageFlag::AbbreviateReadings => self.abbreviate_readings = value,
            StageFlag::AnnounceAltitude => self.announce_altitude = value,
            StageFlag::AnnounceSpeed => self.announce_speed = value,
        }
    }

    pub fn number(&self, key: StageNumber) -> u32 {
        match key {
            StageNumber::AnnouncementFrequency => u32::from(self.announcement_frequency),
            StageNumber::FromAltitude => self.from_altitude,
            StageNumber::ToAltitude => self.to_altitude,
            StageNumber::Volume => u32::from(self.volume),
        }
    }

    /// Store a numeric value as-is. Values that cannot be represented by the
    /// field's type saturate; range policy is enforced by [`Settings::validate`].
    pub fn set_number(&mut self, key: StageNumber, value: u32) {
        match key {
            StageNumber::AnnouncementFrequency => {
                self.announcement_frequency = u16::try_from(value).unwrap_or(u16::MAX)
            }
            StageNumber::FromAltitude => self.from_altitude = value,
            StageNumber::ToAltitude => self.to_altitude = value,
            StageNumber::Volume => self.volume = u8::try_from(value).unwrap_or(u8::MAX),
        }
    }

    /// Insert unless an entry with the same name and altitude exists.
    /// Returns whether the list changed.
    pub fn add_notification(&mut self, notification: AdditionalNotification) -> bool {
        if self.additional_notifications.contains(&notification) {
            return false;
        }
        self.additional_notifications.push(notification);
        true
    }

    /// Remove the first entry with the same name and altitude.
    /// Returns whether the list changed.
    pub fn remove_notification(&mut self, notification: &AdditionalNotification) -> bool {
        match self
            .additional_notifications
            .iter()
            .position(|existing| existing == notification)
        {
            Some(index) => {
                self.additional_notifications.remove(index);
                true
            }
            None => false,
        }
    }

    fn validate(&self) -> Result<(), FdsError> {
        validate_frequency(u32::from(self.announcement_frequency))?;
        check_range("fromAltitude", i64::from(self.from_altitude), 0, i64::from(MAX_ALTITUDE))?;
        check_range("toAltitude", i64::from(self.to_altitude), 0, i64::from(MAX_ALTITUDE))?;
        if self.from_altitude > self.to_altitude {
            return Err(FdsError::InvertedAltitudeBand {
                from: self.from_altitude,
                to: self.to_altitude,
            });
        }
        check_range(
            "volume",
            i64::from(self.volume),
            i64::from(MIN_VOLUME),
            i64::from(MAX_VOLUME),
        )?;
        for notification in &self.additional_notifications {
            validate_notification(notification)?;
        }
        Ok(())
    }
}

/// Freefall stage: a [`StageSettings`] with one extra field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreefallStageSettings {
    #[serde(flatten)]
    pub stage: StageSettings,
    pub freefall_threshold: u16,
}

impl Deref for FreefallStageSettings {
    type Target = StageSettings;

    fn deref(&self) -> &StageSettings {
        &self.stage
    }
}

impl DerefMut for FreefallStageSettings {
    fn deref_mut(&mut self) -> &mut StageSettings {
        &mut self.stage
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetSettings {
    /// Landing area elevation relative to takeoff, in feet. Positive when the
    /// landing area is higher.
    pub dropzone_offset: i32,
    pub ascend_settings: StageSettings,
    pub freefall_settings: FreefallStageSettings,
    pub canopy_settings: StageSettings,
}

impl PresetSettings {
    pub fn stage(&self, id: StageId) -> &StageSettings {
        match id {
            StageId::Ascend => &self.ascend_settings,
            StageId::Freefall => &self.freefall_settings,
            StageId::Canopy => &self.canopy_settings,
        }
    }

    pub fn stage_mut(&mut self, id: StageId) -> &mut StageSettings {
        match id {
            StageId::Ascend => &mut self.ascend_settings,
            StageId::Freefall => &mut self.freefall_settings,
            StageId::Canopy => &mut self.canopy_settings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub general_settings: GeneralSettings,
    pub preset_settings: [PresetSettings; PRESET_COUNT],
}

impl Settings {
    pub fn preset(&self, index: PresetIndex) -> &PresetSettings {
        &self.preset_settings[index.get()]
    }

    pub fn preset_mut(&mut self, index: PresetIndex) -> &mut PresetSettings {
        &mut self.preset_settings[index.get()]
    }

    /// Read one stage flag across all three presets.
    pub fn stage_flags(&self, stage: StageId, key: StageFlag) -> [bool; PRESET_COUNT] {
        PresetIndex::ALL.map(|p| self.preset(p).stage(stage).flag(key))
    }

    /// Read one stage number across all three presets.
    pub fn stage_numbers(&self, stage: StageId, key: StageNumber) -> [u32; PRESET_COUNT] {
        PresetIndex::ALL.map(|p| self.preset(p).stage(stage).number(key))
    }

    pub fn freefall_thresholds(&self) -> [u32; PRESET_COUNT] {
        PresetIndex::ALL.map(|p| u32::from(self.preset(p).freefall_settings.freefall_threshold))
    }

    pub fn dropzone_offsets(&self) -> [i32; PRESET_COUNT] {
        PresetIndex::ALL.map(|p| self.preset(p).dropzone_offset)
    }

    /// Check every domain constraint of the model.
    pub fn validate(&self) -> Result<(), FdsError> {
        for preset in &self.preset_settings {
            check_range(
                "dropzoneOffset",
                i64::from(preset.dropzone_offset),
                -i64::from(MAX_DROPZONE_OFFSET),
                i64::from(MAX_DROPZONE_OFFSET),
            )?;
            preset.ascend_settings.validate()?;
            preset.freefall_settings.validate()?;
            preset.canopy_settings.validate()?;
            check_range(
                "freefallThreshold",
                i64::from(preset.freefall_settings.freefall_threshold),
                0,
                i64::from(MAX_FREEFALL_THRESHOLD),
            )?;
        }
        Ok(())
    }
}

pub(crate) fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<(), FdsError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(FdsError::OutOfRange { field, value, min, max })
    }
}

pub(crate) fn validate_frequency(value: u32) -> Result<(), FdsError> {
    if ANNOUNCEMENT_FREQUENCIES.iter().any(|&f| u32::from(f) == value) {
        Ok(())
    } else {
        Err(FdsError::UnsupportedFrequency(value))
    }
}

pub(crate) fn validate_notification(notification: &AdditionalNotification) -> Result<(), FdsError> {
    check_range(
        "notification altitude",
        i64::from(notification.altitude),
        0,
        i64::from(MAX_NOTIFICATION_ALTITUDE),
    )
}
