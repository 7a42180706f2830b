//! # Command registry
//!
//! Every configurable value on the altimeter is bound to one [`Field`]. Each
//! field owns a wire pattern (used by the demultiplexer to find it in the
//! inbound stream), a decoder turning captured groups into a [`Command`], and
//! an encoder turning a [`Command`] back into its fixed-width wire string.
//!
//! ## Wire table
//!
//! | Tag | Field | Encoding |
//! |-----|-------|----------|
//! | `A` `B` `C` | general flags | one `0`/`1` |
//! | `D` `E` `F` | abbreviate readings (ascend, freefall, canopy) | three bits |
//! | `G` `H` `I` | announcement frequency | three 4-digit runs |
//! | `J` `K` | ascend announce altitude / speed | three bits |
//! | `L` `M` | freefall announce altitude / speed | three bits |
//! | `N` `O` | canopy announce altitude / speed | three bits |
//! | `P` `Q` | ascend from / to altitude | three 5-digit runs |
//! | `R` `S` | freefall from / to altitude | three 5-digit runs |
//! | `T` `U` | canopy from / to altitude | three 5-digit runs |
//! | `V` `W` `X` | volume | three 2-digit runs |
//! | `Y` | freefall threshold | three 3-digit runs |
//! | `Z` | dropzone offset | three `sign + 5 digits` runs |
//!
//! Structural messages carry no letter tag:
//!
//! - `{+|-}{2-4}{a|f|c}{altitude:05}{name}` adds or removes a notification.
//! - `a{Name}` announces a custom notification name (device to host only).
//! - `p{name}` plays (or echoes) a notification.
//!
//! Every triple is ordered by preset index 0, 1, 2. Values that do not fit the
//! field width are rejected by [`Command::encode`] rather than truncated.

use crate::constants::{
    DROPZONE_OFFSET_WIDTH, FREEFALL_THRESHOLD_WIDTH, NOTIFICATION_ALTITUDE_WIDTH, PRESET_COUNT,
};
use crate::error::FdsError;
use crate::notification::NotificationCatalog;
use crate::settings::{
    AdditionalNotification, GeneralSetting, PresetIndex, Settings, StageFlag, StageId, StageNumber,
};
use regex::{Captures, Regex};
use std::fmt;
use tracing::error;

/// Number of registered fields.
pub const FIELD_COUNT: usize = 29;

/// Logical identity of one wire command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    General(GeneralSetting),
    StageFlag(StageId, StageFlag),
    StageNumber(StageId, StageNumber),
    FreefallThreshold,
    DropzoneOffset,
    CustomNotification,
    Notification,
    PlayNotification,
}

impl Field {
    /// All fields in demultiplexer sweep order. The first 26 entries follow
    /// the tag letters `A..=Z`.
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::General(GeneralSetting::IncludePreJumpInfo),
        Field::General(GeneralSetting::IncludePostJumpInfo),
        Field::General(GeneralSetting::UseMetric),
        Field::StageFlag(StageId::Ascend, StageFlag::AbbreviateReadings),
        Field::StageFlag(StageId::Freefall, StageFlag::AbbreviateReadings),
        Field::StageFlag(StageId::Canopy, StageFlag::AbbreviateReadings),
        Field::StageNumber(StageId::Ascend, StageNumber::AnnouncementFrequency),
        Field::StageNumber(StageId::Freefall, StageNumber::AnnouncementFrequency),
        Field::StageNumber(StageId::Canopy, StageNumber::AnnouncementFrequency),
        Field::StageFlag(StageId::Ascend, StageFlag::AnnounceAltitude),
        Field::StageFlag(StageId::Ascend, StageFlag::AnnounceSpeed),
        Field::StageFlag(StageId::Freefall, StageFlag::AnnounceAltitude),
        Field::StageFlag(StageId::Freefall, StageFlag::AnnounceSpeed),
        Field::StageFlag(StageId::Canopy, StageFlag::AnnounceAltitude),
        Field::StageFlag(StageId::Canopy, StageFlag::AnnounceSpeed),
        Field::StageNumber(StageId::Ascend, StageNumber::FromAltitude),
        Field::StageNumber(StageId::Ascend, StageNumber::ToAltitude),
        Field::StageNumber(StageId::Freefall, StageNumber::FromAltitude),
        Field::StageNumber(StageId::Freefall, StageNumber::ToAltitude),
        Field::StageNumber(StageId::Canopy, StageNumber::FromAltitude),
        Field::StageNumber(StageId::Canopy, StageNumber::ToAltitude),
        Field::StageNumber(StageId::Ascend, StageNumber::Volume),
        Field::StageNumber(StageId::Freefall, StageNumber::Volume),
        Field::StageNumber(StageId::Canopy, StageNumber::Volume),
        Field::FreefallThreshold,
        Field::DropzoneOffset,
        // Catalog extensions first, so a notification naming a freshly
        // announced custom cue in the same chunk still decodes.
        Field::CustomNotification,
        Field::Notification,
        Field::PlayNotification,
    ];

    /// Letter tag, or `None` for the structural messages.
    pub fn tag(self) -> Option<char> {
        let stage_offset = |stage: StageId| match stage {
            StageId::Ascend => 0u8,
            StageId::Freefall => 1,
            StageId::Canopy => 2,
        };
        let letter = match self {
            Field::General(GeneralSetting::IncludePreJumpInfo) => b'A',
            Field::General(GeneralSetting::IncludePostJumpInfo) => b'B',
            Field::General(GeneralSetting::UseMetric) => b'C',
            Field::StageFlag(stage, StageFlag::AbbreviateReadings) => b'D' + stage_offset(stage),
            Field::StageNumber(stage, StageNumber::AnnouncementFrequency) => b'G' + stage_offset(stage),
            Field::StageFlag(stage, StageFlag::AnnounceAltitude) => b'J' + 2 * stage_offset(stage),
            Field::StageFlag(stage, StageFlag::AnnounceSpeed) => b'K' + 2 * stage_offset(stage),
            Field::StageNumber(stage, StageNumber::FromAltitude) => b'P' + 2 * stage_offset(stage),
            Field::StageNumber(stage, StageNumber::ToAltitude) => b'Q' + 2 * stage_offset(stage),
            Field::StageNumber(stage, StageNumber::Volume) => b'V' + stage_offset(stage),
            Field::FreefallThreshold => b'Y',
            Field::DropzoneOffset => b'Z',
            Field::CustomNotification | Field::Notification | Field::PlayNotification => return None,
        };
        Some(char::from(letter))
    }

    /// Digits per preset value for numeric fields.
    pub fn width(self) -> Option<usize> {
        match self {
            Field::StageNumber(_, number) => Some(stage_number_width(number)),
            Field::FreefallThreshold => Some(FREEFALL_THRESHOLD_WIDTH),
            Field::DropzoneOffset => Some(DROPZONE_OFFSET_WIDTH),
            _ => None,
        }
    }

    /// Regex source for this field. Notification-bearing patterns embed every
    /// name currently in the catalog.
    pub fn pattern_source(self, catalog: &NotificationCatalog) -> String {
        let tag = self.tag().map(|c| regex::escape(&c.to_string())).unwrap_or_default();
        match self {
            Field::General(_) => format!("{tag}([01])"),
            Field::StageFlag(..) => format!("{tag}([01])([01])([01])"),
            Field::StageNumber(..) | Field::FreefallThreshold => {
                let w = self.width().unwrap_or_default();
                format!("{tag}([0-9]{{{w}}})([0-9]{{{w}}})([0-9]{{{w}}})")
            }
            Field::DropzoneOffset => {
                let w = DROPZONE_OFFSET_WIDTH;
                format!("{tag}([+-]?[0-9]{{{w}}})([+-]?[0-9]{{{w}}})([+-]?[0-9]{{{w}}})")
            }
            Field::Notification => format!(
                "([+-])([2-4])([afc])([0-9]{{{}}})({})",
                NOTIFICATION_ALTITUDE_WIDTH,
                name_alternation(catalog)
            ),
            // Group 2 is the boundary that terminates the name; it is left in
            // the buffer for the next message.
            Field::CustomNotification => "a([A-Z][a-z -]+)(a[A-Z]|end[- ]settings)".to_string(),
            Field::PlayNotification => format!("p({})", name_alternation(catalog)),
        }
    }

    /// Whether the pattern depends on the notification catalog.
    pub fn uses_catalog(self) -> bool {
        matches!(self, Field::Notification | Field::PlayNotification)
    }

    /// Capture group holding the catalog name.
    pub fn name_group(self) -> Option<usize> {
        match self {
            Field::Notification => Some(5),
            Field::PlayNotification => Some(1),
            _ => None,
        }
    }

    /// Byte offset where this field's message ends within a match. Only the
    /// custom announcement stops short of the full match.
    pub fn consumed_end(self, captures: &Captures<'_>) -> usize {
        match (self, captures.get(2)) {
            (Field::CustomNotification, Some(boundary)) => boundary.start(),
            _ => captures.get(0).map(|m| m.end()).unwrap_or_default(),
        }
    }

    /// Turn the captured groups of a match into a command.
    pub fn decode(self, captures: &Captures<'_>) -> Result<Command, FdsError> {
        let group = |i: usize| capture(self, captures, i);

        Ok(match self {
            Field::General(key) => Command::General(key, group(1)? == "1"),
            Field::StageFlag(stage, key) => {
                Command::StageFlags(stage, key, [group(1)? == "1", group(2)? == "1", group(3)? == "1"])
            }
            Field::StageNumber(stage, key) => Command::StageNumbers(
                stage,
                key,
                [
                    parse_number(self, group(1)?)?,
                    parse_number(self, group(2)?)?,
                    parse_number(self, group(3)?)?,
                ],
            ),
            Field::FreefallThreshold => Command::FreefallThreshold([
                parse_number(self, group(1)?)?,
                parse_number(self, group(2)?)?,
                parse_number(self, group(3)?)?,
            ]),
            Field::DropzoneOffset => Command::DropzoneOffset([
                parse_number(self, group(1)?)?,
                parse_number(self, group(2)?)?,
                parse_number(self, group(3)?)?,
            ]),
            Field::Notification => Command::Notification(NotificationChange::parse(
                group(1)?,
                group(2)?,
                group(3)?,
                group(4)?,
                group(5)?,
            )?),
            Field::CustomNotification => Command::CustomNotification(group(1)?.to_string()),
            Field::PlayNotification => Command::PlayNotification(group(1)?.to_string()),
        })
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::General(key) => write!(f, "{key}"),
            Field::StageFlag(stage, key) => write!(f, "{stage}Settings.{key}"),
            Field::StageNumber(stage, key) => write!(f, "{stage}Settings.{key}"),
            Field::FreefallThreshold => write!(f, "freefallSettings.freefallThreshold"),
            Field::DropzoneOffset => write!(f, "dropzoneOffset"),
            Field::CustomNotification => write!(f, "customNotification"),
            Field::Notification => write!(f, "notification"),
            Field::PlayNotification => write!(f, "playNotification"),
        }
    }
}

fn stage_number_width(number: StageNumber) -> usize {
    match number {
        StageNumber::AnnouncementFrequency => 4,
        StageNumber::FromAltitude | StageNumber::ToAltitude => 5,
        StageNumber::Volume => 2,
    }
}

fn name_alternation(catalog: &NotificationCatalog) -> String {
    catalog
        .all_names()
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|")
}

fn capture<'h>(field: Field, captures: &Captures<'h>, i: usize) -> Result<&'h str, FdsError> {
    captures.get(i).map(|m| m.as_str()).ok_or_else(|| FdsError::Malformed {
        field: field.to_string(),
        message: format!("missing capture group {i}"),
    })
}

fn parse_number<T: std::str::FromStr>(field: Field, digits: &str) -> Result<T, FdsError> {
    digits.parse().map_err(|_| FdsError::Malformed {
        field: field.to_string(),
        message: format!("'{digits}' is not a number"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOp {
    Add,
    Remove,
}

impl NotificationOp {
    pub fn wire_char(self) -> char {
        match self {
            NotificationOp::Add => '+',
            NotificationOp::Remove => '-',
        }
    }

    pub fn from_wire_char(c: char) -> Result<Self, FdsError> {
        match c {
            '+' => Ok(NotificationOp::Add),
            '-' => Ok(NotificationOp::Remove),
            other => Err(FdsError::Grammar {
                what: "notification operation",
                found: other,
            }),
        }
    }
}

/// Adding or removing one notification on one preset stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationChange {
    pub op: NotificationOp,
    pub preset: PresetIndex,
    pub stage: StageId,
    pub notification: AdditionalNotification,
}

impl NotificationChange {
    /// Build a change from the five textual parts of a notification message.
    pub fn parse(op: &str, preset: &str, stage: &str, altitude: &str, name: &str) -> Result<Self, FdsError> {
        let single = |s: &str, what: &'static str| -> Result<char, FdsError> {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                (found, _) => Err(FdsError::Grammar {
                    what,
                    found: found.unwrap_or(' '),
                }),
            }
        };
        Ok(Self {
            op: NotificationOp::from_wire_char(single(op, "notification operation")?)?,
            preset: PresetIndex::from_wire_digit(single(preset, "preset digit")?)?,
            stage: StageId::from_wire_char(single(stage, "notification stage")?)?,
            notification: AdditionalNotification::new(name, parse_number(Field::Notification, altitude)?),
        })
    }
}

/// A decoded (or to-be-encoded) wire message with its full value payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    General(GeneralSetting, bool),
    StageFlags(StageId, StageFlag, [bool; PRESET_COUNT]),
    StageNumbers(StageId, StageNumber, [u32; PRESET_COUNT]),
    FreefallThreshold([u32; PRESET_COUNT]),
    DropzoneOffset([i32; PRESET_COUNT]),
    Notification(NotificationChange),
    CustomNotification(String),
    PlayNotification(String),
}

impl Command {
    /// Current value of a state-bearing field, read across all presets.
    /// Structural fields carry no stored value and yield `None`.
    pub fn read(field: Field, settings: &Settings) -> Option<Command> {
        Some(match field {
            Field::General(key) => Command::General(key, settings.general_settings.get(key)),
            Field::StageFlag(stage, key) => Command::StageFlags(stage, key, settings.stage_flags(stage, key)),
            Field::StageNumber(stage, key) => Command::StageNumbers(stage, key, settings.stage_numbers(stage, key)),
            Field::FreefallThreshold => Command::FreefallThreshold(settings.freefall_thresholds()),
            Field::DropzoneOffset => Command::DropzoneOffset(settings.dropzone_offsets()),
            Field::CustomNotification | Field::Notification | Field::PlayNotification => return None,
        })
    }

    /// Commands that reproduce every stored scalar of `settings` on a device.
    pub fn dump(settings: &Settings) -> Vec<Command> {
        Field::ALL.iter().filter_map(|&field| Command::read(field, settings)).collect()
    }

    pub fn field(&self) -> Field {
        match self {
            Command::General(key, _) => Field::General(*key),
            Command::StageFlags(stage, key, _) => Field::StageFlag(*stage, *key),
            Command::StageNumbers(stage, key, _) => Field::StageNumber(*stage, *key),
            Command::FreefallThreshold(_) => Field::FreefallThreshold,
            Command::DropzoneOffset(_) => Field::DropzoneOffset,
            Command::Notification(_) => Field::Notification,
            Command::CustomNotification(_) => Field::CustomNotification,
            Command::PlayNotification(_) => Field::PlayNotification,
        }
    }

    /// Produce the wire string for this command.
    pub fn encode(&self) -> Result<String, FdsError> {
        let field = self.field();
        let tag = field.tag().unwrap_or_default();
        match self {
            Command::General(_, value) => Ok(format!("{tag}{}", bit(*value))),
            Command::StageFlags(_, _, values) => Ok(std::iter::once(tag)
                .chain(values.iter().map(|v| bit(*v)))
                .collect()),
            Command::StageNumbers(_, _, values) | Command::FreefallThreshold(values) => {
                let width = field.width().unwrap_or_default();
                let mut out = String::with_capacity(1 + width * PRESET_COUNT);
                out.push(tag);
                for &value in values {
                    check_width(tag, i64::from(value), width)?;
                    out.push_str(&format!("{value:0width$}"));
                }
                Ok(out)
            }
            Command::DropzoneOffset(values) => {
                let width = DROPZONE_OFFSET_WIDTH;
                let mut out = String::with_capacity(1 + (width + 1) * PRESET_COUNT);
                out.push(tag);
                for &value in values {
                    check_width(tag, i64::from(value), width)?;
                    let sign = if value >= 0 { '+' } else { '-' };
                    out.push(sign);
                    out.push_str(&format!("{:0width$}", value.unsigned_abs()));
                }
                Ok(out)
            }
            Command::Notification(change) => {
                let altitude = change.notification.altitude;
                check_width(change.op.wire_char(), i64::from(altitude), NOTIFICATION_ALTITUDE_WIDTH)?;
                Ok(format!(
                    "{}{}{}{:0w$}{}",
                    change.op.wire_char(),
                    change.preset.wire_digit(),
                    change.stage.wire_char(),
                    altitude,
                    change.notification.notification,
                    w = NOTIFICATION_ALTITUDE_WIDTH,
                ))
            }
            Command::CustomNotification(_) => Err(FdsError::Unencodable("Custom notification announcement")),
            Command::PlayNotification(name) => Ok(format!("p{name}")),
        }
    }
}

fn bit(value: bool) -> char {
    if value { '1' } else { '0' }
}

fn check_width(tag: char, value: i64, width: usize) -> Result<(), FdsError> {
    let limit = 10i64.pow(width as u32);
    if value.abs() < limit {
        Ok(())
    } else {
        Err(FdsError::ValueTooWide { tag, value, width })
    }
}

/// Compiled patterns for every field, rebuilt when the notification catalog
/// grows.
#[derive(Debug, Clone)]
pub struct Registry {
    patterns: Vec<(Field, Option<Regex>)>,
    generation: usize,
}

impl Registry {
    pub fn new(catalog: &NotificationCatalog) -> Self {
        let patterns = Field::ALL
            .iter()
            .map(|&field| (field, compile(field, &field.pattern_source(catalog))))
            .collect();
        Self {
            patterns,
            generation: catalog.generation(),
        }
    }

    /// Recompile catalog-dependent patterns if the catalog changed since the
    /// last build.
    pub fn refresh(&mut self, catalog: &NotificationCatalog) {
        if catalog.generation() == self.generation {
            return;
        }
        for (field, regex) in self.patterns.iter_mut().filter(|(f, _)| f.uses_catalog()) {
            *regex = compile(*field, &field.pattern_source(catalog));
        }
        self.generation = catalog.generation();
    }

    /// Pattern for a field; `None` when it failed to compile and must be
    /// skipped.
    pub fn pattern(&self, field: Field) -> Option<&Regex> {
        self.patterns
            .iter()
            .find(|(f, _)| *f == field)
            .and_then(|(_, regex)| regex.as_ref())
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.patterns.iter().map(|(field, _)| *field)
    }
}

pub(crate) fn compile(field: Field, source: &str) -> Option<Regex> {
    match Regex::new(source) {
        Ok(regex) => Some(regex),
        Err(e) => {
            error!(%field, error = %e, "Pattern cannot scan the buffer, skipping field");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(field: Field, input: &str) -> Command {
        let catalog = NotificationCatalog::new();
        let regex = Regex::new(&field.pattern_source(&catalog)).unwrap();
        let captures = regex.captures(input).unwrap();
        field.decode(&captures).unwrap()
    }

    #[test]
    fn tags_cover_the_alphabet_in_order() {
        let tags: String = Field::ALL.iter().filter_map(|f| f.tag()).collect();
        assert_eq!(tags, "ABCDEFGHIJKLMNOPQRSTUVWXYZ");
    }

    #[test]
    fn field_names_follow_stage_paths() {
        assert_eq!(
            Field::StageFlag(StageId::Ascend, StageFlag::AbbreviateReadings).to_string(),
            "ascendSettings.abbreviateReadings"
        );
        assert_eq!(Field::General(GeneralSetting::UseMetric).to_string(), "useMetric");
    }

    #[test]
    fn encode_boolean_triple() {
        let cmd = Command::StageFlags(StageId::Ascend, StageFlag::AbbreviateReadings, [true, false, true]);
        assert_eq!(cmd.encode().unwrap(), "D101");
    }

    #[test]
    fn encode_numeric_triple() {
        let cmd = Command::StageNumbers(StageId::Ascend, StageNumber::Volume, [5, 10, 1]);
        assert_eq!(cmd.encode().unwrap(), "V051001");
        let cmd = Command::StageNumbers(StageId::Canopy, StageNumber::ToAltitude, [0, 30000, 12]);
        assert_eq!(cmd.encode().unwrap(), "U000003000000012");
        assert_eq!(Command::FreefallThreshold([7, 999, 0]).encode().unwrap(), "Y007999000");
    }

    #[test]
    fn encode_signed_triple() {
        assert_eq!(
            Command::DropzoneOffset([100, -200, 0]).encode().unwrap(),
            "Z+00100-00200+00000"
        );
    }

    #[test]
    fn encode_rejects_values_wider_than_field() {
        let cmd = Command::StageNumbers(StageId::Freefall, StageNumber::Volume, [5, 100, 1]);
        assert!(matches!(
            cmd.encode(),
            Err(FdsError::ValueTooWide { tag: 'W', value: 100, width: 2 })
        ));
        assert!(matches!(
            Command::DropzoneOffset([0, -100_000, 0]).encode(),
            Err(FdsError::ValueTooWide { tag: 'Z', .. })
        ));
    }

    #[test]
    fn encode_notification_change() {
        let cmd = Command::Notification(NotificationChange {
            op: NotificationOp::Add,
            preset: PresetIndex::new(0).unwrap(),
            stage: StageId::Ascend,
            notification: AdditionalNotification::new("Beep", 1000),
        });
        assert_eq!(cmd.encode().unwrap(), "+2a01000Beep");

        let cmd = Command::Notification(NotificationChange {
            op: NotificationOp::Remove,
            preset: PresetIndex::new(2).unwrap(),
            stage: StageId::Canopy,
            notification: AdditionalNotification::new("Flare", 150),
        });
        assert_eq!(cmd.encode().unwrap(), "-4c00150Flare");
    }

    #[test]
    fn custom_notification_cannot_be_encoded() {
        let cmd = Command::CustomNotification("Swoop".to_string());
        assert!(matches!(cmd.encode(), Err(FdsError::Unencodable(_))));
    }

    #[test]
    fn play_notification_encodes_name() {
        assert_eq!(Command::PlayNotification("Pull".into()).encode().unwrap(), "pPull");
    }

    #[test]
    fn decode_round_trips_through_encode() {
        let round_trip = |cmd: Command| assert_eq!(decode_one(cmd.field(), &cmd.encode().unwrap()), cmd);

        for field in Field::ALL {
            match field {
                Field::StageFlag(stage, key) => {
                    for bits in 0..8u8 {
                        let values = [bits & 4 != 0, bits & 2 != 0, bits & 1 != 0];
                        round_trip(Command::StageFlags(stage, key, values));
                    }
                }
                Field::StageNumber(stage, key) => {
                    let max = 10u32.pow(field.width().unwrap() as u32) - 1;
                    round_trip(Command::StageNumbers(stage, key, [0, max, 1]));
                    round_trip(Command::StageNumbers(stage, key, [max, 0, max]));
                }
                Field::General(key) => {
                    round_trip(Command::General(key, true));
                    round_trip(Command::General(key, false));
                }
                _ => {}
            }
        }
        round_trip(Command::FreefallThreshold([0, 999, 7]));
        round_trip(Command::DropzoneOffset([0, -99_999, 99_999]));
        round_trip(Command::DropzoneOffset([-1, 42, -99_999]));
    }

    #[test]
    fn dump_covers_every_lettered_field() {
        let mut settings = Settings::default();
        settings.preset_settings[1].dropzone_offset = -250;
        let dump = Command::dump(&settings);
        assert_eq!(dump.len(), 26);
        assert_eq!(dump.last(), Some(&Command::DropzoneOffset([0, -250, 0])));
        assert_eq!(
            Command::read(Field::StageNumber(StageId::Canopy, StageNumber::Volume), &settings),
            Some(Command::StageNumbers(StageId::Canopy, StageNumber::Volume, [5, 5, 5]))
        );
        assert_eq!(Command::read(Field::Notification, &settings), None);
    }

    #[test]
    fn decode_unsigned_dropzone_digits() {
        assert_eq!(
            decode_one(Field::DropzoneOffset, "Z00010-0002000003"),
            Command::DropzoneOffset([10, -20, 3])
        );
    }

    #[test]
    fn custom_notification_stops_at_next_announcement() {
        let field = Field::CustomNotification;
        let regex = Regex::new(&field.pattern_source(&NotificationCatalog::new())).unwrap();
        let input = "aSwoop landingaHop popend-settings";
        let captures = regex.captures(input).unwrap();
        assert_eq!(
            field.decode(&captures).unwrap(),
            Command::CustomNotification("Swoop landing".into())
        );
        assert_eq!(&input[..field.consumed_end(&captures)], "aSwoop landing");
    }

    #[test]
    fn notification_parse_rejects_unknown_characters() {
        assert!(matches!(
            NotificationChange::parse("*", "2", "a", "01000", "Beep"),
            Err(FdsError::Grammar { what: "notification operation", found: '*' })
        ));
        assert!(matches!(
            NotificationChange::parse("+", "2", "x", "01000", "Beep"),
            Err(FdsError::Grammar { what: "notification stage", found: 'x' })
        ));
        assert!(matches!(
            NotificationChange::parse("+", "7", "a", "01000", "Beep"),
            Err(FdsError::Grammar { what: "preset digit", .. })
        ));
    }

    #[test]
    fn registry_refreshes_catalog_patterns() {
        let mut catalog = NotificationCatalog::new();
        let mut registry = Registry::new(&catalog);
        let notification = registry.pattern(Field::Notification).unwrap();
        assert!(!notification.is_match("+3f02000Swoop"));

        catalog.insert("Swoop");
        registry.refresh(&catalog);
        let notification = registry.pattern(Field::Notification).unwrap();
        assert!(notification.is_match("+3f02000Swoop"));
        assert_eq!(registry.fields().count(), FIELD_COUNT);
    }

    #[test]
    fn catalog_names_are_escaped() {
        let mut catalog = NotificationCatalog::new();
        catalog.insert("(Altitude)");
        let registry = Registry::new(&catalog);
        let play = registry.pattern(Field::PlayNotification).unwrap();
        let captures = play.captures("p(Altitude)").unwrap();
        assert_eq!(&captures[1], "(Altitude)");
    }
}
