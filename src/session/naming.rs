//! File and folder naming for recording runs.

use chrono::{DateTime, Local};
use std::collections::HashSet;
use std::path::Path;

/// Replacement for characters that are not allowed in file names.
pub const SUBSTITUTE_CHAR: char = '_';

const INVALID_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replaces characters that are invalid on any mainstream filesystem.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_control() || INVALID_CHARS.contains(&c) {
                SUBSTITUTE_CHAR
            } else {
                c
            }
        })
        .collect()
}

/// `Recording_<local ISO-8601 timestamp>` with colons replaced by dots.
pub fn recording_folder_name(at: DateTime<Local>) -> String {
    format!("Recording_{}", at.format("%Y-%m-%dT%H.%M.%S"))
}

/// Picks `<stem>.<ext>`, or `<stem>_2.<ext>`, `<stem>_3.<ext>` ... when the
/// name is already claimed in this run or already exists in `dir`.
/// Claims are compared case-insensitively.
pub fn claim_file_name(
    dir: &Path,
    channel_name: &str,
    extension: &str,
    claimed: &mut HashSet<String>,
) -> String {
    let stem = sanitize_file_name(channel_name);
    let mut candidate = format!("{stem}.{extension}");
    let mut n = 2;
    while claimed.contains(&candidate.to_lowercase()) || dir.join(&candidate).exists() {
        candidate = format!("{stem}_{n}.{extension}");
        n += 1;
    }
    claimed.insert(candidate.to_lowercase());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_replaces_invalid_chars() {
        assert_eq!(sanitize_file_name("Mic: Left/Right?"), "Mic_ Left_Right_");
        assert_eq!(sanitize_file_name("a\tb"), "a_b");
        assert_eq!(sanitize_file_name("Plain Name"), "Plain Name");
    }

    #[test]
    fn test_recording_folder_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(recording_folder_name(at), "Recording_2024-03-09T14.05.07");
    }

    #[test]
    fn test_claim_disambiguates_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let mut claimed = HashSet::new();
        assert_eq!(claim_file_name(dir.path(), "Mic:1", "wav", &mut claimed), "Mic_1.wav");
        assert_eq!(claim_file_name(dir.path(), "Mic/1", "wav", &mut claimed), "Mic_1_2.wav");
        assert_eq!(claim_file_name(dir.path(), "mic?1", "wav", &mut claimed), "mic_1_3.wav");
    }

    #[test]
    fn test_claim_avoids_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Desk.wav"), b"x").unwrap();
        let mut claimed = HashSet::new();
        assert_eq!(claim_file_name(dir.path(), "Desk", "wav", &mut claimed), "Desk_2.wav");
    }
}
