//! Extracts commands from the accumulated inbound text.
//!
//! The wire has no delimiters, so each scan looks for every field's pattern
//! anywhere in the buffer, splices each match out and hands the decoded
//! command to the store. Whatever does not match stays in the buffer until
//! the next chunk completes it.

use crate::command::{Field, Registry};
use crate::constants::ALTITUDE_NOTIFICATION;
use crate::error::FdsError;
use crate::notification::NotificationCatalog;
use crate::store::SettingsStore;
use regex::{Captures, Regex};
use std::ops::Range;
use tracing::{debug, info, warn};

/// Firmware version tag sent before a settings dump.
const SESSION_START: &str = "n([0-9]{1,2})";

/// Sent after the last field of a dump. Newer firmware uses the hyphen.
const SESSION_END: &str = "end([- ])settings";

/// Outcome of one scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Scan {
    /// Unconsumed text, to be passed back with the next chunk.
    pub buffer: String,
    pub session_started: bool,
    pub session_ended: bool,
    /// Fields decoded in this scan, in decode order.
    pub changed: Vec<Field>,
}

#[derive(Debug, Clone)]
pub struct Demultiplexer {
    registry: Registry,
    session_start: Regex,
    session_end: Regex,
    /// Leading bytes of a UTF-8 sequence cut off by the last chunk.
    pending: Vec<u8>,
}

impl Demultiplexer {
    pub fn new(store: &SettingsStore) -> Result<Self, FdsError> {
        let marker = |source: &str| {
            Regex::new(source).map_err(|e| FdsError::Malformed {
                field: "session marker".to_string(),
                message: e.to_string(),
            })
        };
        Ok(Self {
            registry: Registry::new(store.catalog()),
            session_start: marker(SESSION_START)?,
            session_end: marker(SESSION_END)?,
            pending: Vec::new(),
        })
    }

    /// Append a raw chunk to `buffer` and scan the result. A multi-byte
    /// character split across chunks is held back until it is complete.
    pub fn feed(&mut self, mut buffer: String, chunk: &[u8], store: &mut SettingsStore) -> Result<Scan, FdsError> {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);
        let complete = bytes.len() - incomplete_tail(&bytes);
        self.pending = bytes.split_off(complete);
        buffer.push_str(&String::from_utf8_lossy(&bytes));
        self.process(buffer, store)
    }

    /// Scan `buffer` once, applying every complete command to `store`.
    ///
    /// A grammar violation inside a notification message aborts the scan; the
    /// caller should treat the session as broken.
    pub fn process(&mut self, mut buffer: String, store: &mut SettingsStore) -> Result<Scan, FdsError> {
        let mut scan = Scan::default();
        self.registry.refresh(store.catalog());

        if let Some(range) = self.find_session_start(&buffer) {
            debug!(marker = &buffer[range.clone()], "Session start marker");
            buffer.replace_range(range, "");
            scan.session_started = true;
            info!("Receiving settings from device");
        }

        for field in Field::ALL {
            let Some(pattern) = self.registry.pattern(field).cloned() else {
                continue;
            };
            let mut from = 0;
            loop {
                let (range, command) = {
                    let Some(captures) = pattern.captures_at(&buffer, from) else {
                        break;
                    };
                    let start = captures.get(0).map(|m| m.start()).unwrap_or_default();
                    if !name_is_complete(field, &captures, &buffer, store.catalog()) {
                        // Every message starts with an ASCII marker.
                        from = start + 1;
                        continue;
                    }
                    (start..field.consumed_end(&captures), field.decode(&captures)?)
                };
                if range.is_empty() {
                    warn!(%field, "Empty match, skipping field for this scan");
                    break;
                }
                debug!(%field, message = &buffer[range.clone()], "Decoded");
                buffer.replace_range(range, "");
                store.apply_command(command);
                scan.changed.push(field);
            }
            // A custom announcement may have introduced a name later fields match on.
            self.registry.refresh(store.catalog());
        }

        let end_marker = self
            .session_end
            .captures(&buffer)
            .and_then(|c| Some((c.get(0)?.range(), c.get(1)?.as_str() == "-")));
        if let Some((range, hyphenated)) = end_marker {
            buffer.replace_range(range, "");
            if hyphenated && store.add_extra_notification(ALTITUDE_NOTIFICATION) {
                debug!("Firmware reports altitude notifications");
            }
            scan.session_ended = true;
            info!(fields = scan.changed.len(), "Settings received");
        }

        if !scan.session_started && !scan.session_ended && scan.changed.is_empty() && !buffer.is_empty() {
            warn!(buffer = %buffer, "Buffer contains unparsed data");
        }

        scan.buffer = buffer;
        Ok(scan)
    }

    fn find_session_start(&self, buffer: &str) -> Option<Range<usize>> {
        let captures = self.session_start.captures(buffer)?;
        let whole = captures.get(0)?;
        let digits = captures.get(1)?;
        // One digit at the very end may be the first half of a two-digit tag.
        if digits.len() == 1 && whole.end() == buffer.len() {
            return None;
        }
        Some(whole.range())
    }
}

/// Whether the name captured by `field` is the whole name and not the head of
/// a longer one still arriving or still running on in the buffer.
fn name_is_complete(field: Field, captures: &Captures<'_>, buffer: &str, catalog: &NotificationCatalog) -> bool {
    let Some(name) = field.name_group().and_then(|i| captures.get(i)) else {
        return true;
    };
    let rest = &buffer[name.end()..];
    let mut next = rest.chars();
    match (next.next(), next.next()) {
        // No message starts with a space, and a hyphen only starts a removal.
        (Some(' '), _) | (Some('-'), None) => return false,
        (Some('-'), Some(digit)) if !('2'..='4').contains(&digit) => return false,
        _ => {}
    }
    let name = name.as_str();
    !catalog.all_names().iter().any(|known| {
        known.len() > name.len() && known.starts_with(name) && known[name.len()..].starts_with(rest)
    })
}

/// Length of a trailing UTF-8 sequence that still lacks continuation bytes.
fn incomplete_tail(bytes: &[u8]) -> usize {
    for (back, &byte) in bytes.iter().rev().take(3).enumerate() {
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let needed = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        let have = back + 1;
        return if have < needed { have } else { 0 };
    }
    0
}
