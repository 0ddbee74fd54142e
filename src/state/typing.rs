//! Ephemeral "who is typing" state.
//!
//! Entries expire after [`TYPING_TTL_MS`] and are purged lazily while
//! scanning — there is no background timer, typing indicators are advisory.

use dashmap::DashMap;

use super::now_millis;

/// How long a "start typing" signal stays valid.
pub const TYPING_TTL_MS: i64 = 10_000;

/// Tracks the last start-typing timestamp per (room, user).
#[derive(Default)]
pub struct TypingTracker {
    entries: DashMap<(String, String), i64>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or refresh a typing entry (`is_typing = true`), or remove it
    /// (`is_typing = false`).
    pub fn set_typing(&self, room_id: &str, user_id: &str, is_typing: bool) {
        let key = (room_id.to_string(), user_id.to_string());
        if is_typing {
            self.entries.insert(key, now_millis());
        } else {
            self.entries.remove(&key);
        }
    }

    /// User ids currently typing in a room. Expired entries found during the
    /// scan are purged as a side effect.
    pub fn active_typers(&self, room_id: &str) -> Vec<String> {
        let cutoff = now_millis() - TYPING_TTL_MS;
        let mut active = Vec::new();
        self.entries.retain(|(room, user), stamp| {
            if room != room_id {
                return true;
            }
            if *stamp > cutoff {
                active.push(user.clone());
                true
            } else {
                false
            }
        });
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_typing_removes_entry() {
        let tracker = TypingTracker::new();
        tracker.set_typing("general", "u1", true);
        assert_eq!(tracker.active_typers("general"), vec!["u1"]);

        tracker.set_typing("general", "u1", false);
        assert!(tracker.active_typers("general").is_empty());
    }

    #[test]
    fn expired_entries_are_excluded_and_purged() {
        let tracker = TypingTracker::new();
        // Simulate a signal older than the TTL.
        tracker.entries.insert(
            ("general".to_string(), "u1".to_string()),
            now_millis() - TYPING_TTL_MS - 1,
        );
        tracker.set_typing("general", "u2", true);

        assert_eq!(tracker.active_typers("general"), vec!["u2"]);
        // The expired entry was purged during the scan.
        assert_eq!(tracker.entries.len(), 1);
    }

    #[test]
    fn rooms_are_independent() {
        let tracker = TypingTracker::new();
        tracker.set_typing("general", "u1", true);
        tracker.set_typing("dev", "u2", true);

        assert_eq!(tracker.active_typers("general"), vec!["u1"]);
        assert_eq!(tracker.active_typers("dev"), vec!["u2"]);
    }
}
