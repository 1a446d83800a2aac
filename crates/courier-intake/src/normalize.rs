// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sender identity normalization.
//!
//! Contact uniqueness is keyed on these normalized forms, so every lookup
//! and insert must pass through here.

/// Lowercase-trim an email address. Addresses in `Name <addr>` form are
/// reduced to the bare address. Returns `None` when no plausible address
/// remains.
pub fn normalize_email(raw: &str) -> Option<String> {
    let mut candidate = raw.trim();
    if let (Some(start), Some(end)) = (candidate.rfind('<'), candidate.rfind('>'))
        && start < end
    {
        candidate = candidate[start + 1..end].trim();
    }
    let normalized = candidate.to_lowercase();
    if normalized.contains('@') && !normalized.contains(' ') {
        Some(normalized)
    } else {
        None
    }
}

/// Canonicalize a phone number to E.164. Strips non-digits; a bare 10-digit
/// number is assumed US (`+1`), an 11-digit number with a leading `1` gets a
/// `+`. Anything else keeps its digits behind a `+` when the length is
/// plausible; callers must supply already-normalized numbers where real
/// ambiguity exists.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        10 => Some(format!("+1{digits}")),
        11 if digits.starts_with('1') => Some(format!("+{digits}")),
        8..=15 => Some(format!("+{digits}")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_lowercases_and_trims() {
        assert_eq!(
            normalize_email("  Kim.Lee@Example.COM  ").as_deref(),
            Some("kim.lee@example.com")
        );
    }

    #[test]
    fn email_unwraps_display_name_form() {
        assert_eq!(
            normalize_email("Kim Lee <Kim@Example.com>").as_deref(),
            Some("kim@example.com")
        );
    }

    #[test]
    fn email_garbage_is_none() {
        assert_eq!(normalize_email("not an address"), None);
        assert_eq!(normalize_email(""), None);
    }

    #[test]
    fn phone_ten_digits_assumes_us() {
        assert_eq!(normalize_phone("(555) 123-0000").as_deref(), Some("+15551230000"));
    }

    #[test]
    fn phone_eleven_digits_with_leading_one() {
        assert_eq!(normalize_phone("1-555-123-0000").as_deref(), Some("+15551230000"));
    }

    #[test]
    fn phone_e164_passes_through() {
        assert_eq!(normalize_phone("+15551230000").as_deref(), Some("+15551230000"));
        assert_eq!(normalize_phone("+447911123456").as_deref(), Some("+447911123456"));
    }

    #[test]
    fn phone_too_short_is_none() {
        assert_eq!(normalize_phone("911"), None);
    }
}
