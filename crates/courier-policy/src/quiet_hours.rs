// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quiet-hours window arithmetic.
//!
//! Windows are tenant-local `HH:MM` pairs reduced to minutes since midnight.
//! Semantics: `start == end` is a degenerate window that is never active;
//! `start < end` is same-day `[start, end)`; `start > end` wraps midnight
//! (active when `now >= start OR now < end`).

/// Parse `HH:MM` 24-hour into minutes since midnight. Returns `None` for
/// anything malformed or out of range; the policy engine treats an
/// unparseable bound as quiet hours not configured.
pub fn parse_hhmm(value: &str) -> Option<u32> {
    let (h, m) = value.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Is `now_minutes` inside the quiet window `[start, end)`?
pub fn in_quiet_window(now_minutes: u32, start: u32, end: u32) -> bool {
    if start == end {
        return false;
    }
    if start < end {
        now_minutes >= start && now_minutes < end
    } else {
        now_minutes >= start || now_minutes < end
    }
}
