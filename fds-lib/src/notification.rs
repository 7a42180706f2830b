use crate::settings::StageId;
use std::collections::BTreeSet;
use tracing::debug;

pub const ASCEND_NOTIFICATIONS: &[&str] = &["Beep", "Door", "Gear check", "Helmets on", "Jump run", "Seatbelts"];

pub const FREEFALL_NOTIFICATIONS: &[&str] = &["Beep", "Break off", "Check altitude", "Pull", "Track", "Wave off"];

pub const CANOPY_NOTIFICATIONS: &[&str] = &["Base", "Beep", "Downwind", "Final", "Flare", "Holding area"];

/// Built-in notification names the firmware ships with for one stage.
pub fn builtin_notifications(stage: StageId) -> &'static [&'static str] {
    match stage {
        StageId::Ascend => ASCEND_NOTIFICATIONS,
        StageId::Freefall => FREEFALL_NOTIFICATIONS,
        StageId::Canopy => CANOPY_NOTIFICATIONS,
    }
}

/// Known notification names: the built-in per-stage lists plus any custom
/// names the device announced at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationCatalog {
    extra: Vec<String>,
}

impl NotificationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a runtime name. Returns `false` if it was already known.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        debug!(name, "New notification registered");
        self.extra.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.extra.iter().any(|n| n == name)
            || [StageId::Ascend, StageId::Freefall, StageId::Canopy]
                .iter()
                .any(|&stage| builtin_notifications(stage).contains(&name))
    }

    /// Names announced by the device, in arrival order.
    pub fn extra(&self) -> &[String] {
        &self.extra
    }

    /// Selectable names for a stage, sorted and de-duplicated.
    pub fn options(&self, stage: StageId) -> Vec<String> {
        builtin_notifications(stage)
            .iter()
            .map(|s| s.to_string())
            .chain(self.extra.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Every known name, longest first. Regex alternations built from this
    /// list prefer the longest name when one is a prefix of another.
    pub fn all_names(&self) -> Vec<String> {
        let mut names: Vec<String> = ASCEND_NOTIFICATIONS
            .iter()
            .chain(FREEFALL_NOTIFICATIONS)
            .chain(CANOPY_NOTIFICATIONS)
            .map(|s| s.to_string())
            .chain(self.extra.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        names
    }

    /// Number of runtime names; changes whenever the catalog grows.
    pub fn generation(&self) -> usize {
        self.extra.len()
    }
}
