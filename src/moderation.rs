use crate::store::Store;

/// Warnings at which the automatic group removal fires.
pub(crate) const WARN_LIMIT: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WarnOutcome {
    /// Below the limit; carries the new count.
    Warned(u32),
    /// This warn reached the limit; the removal side effect is due now.
    Flagged,
    /// Already at the limit before this call; nothing changed.
    AlreadyFlagged,
}

pub(crate) fn warn(store: &Store, user: &str) -> WarnOutcome {
    store.update(|d| {
        let rec = d.users.entry(user.to_string()).or_default();
        if rec.warnings >= WARN_LIMIT {
            return WarnOutcome::AlreadyFlagged;
        }
        rec.warnings += 1;
        if rec.warnings >= WARN_LIMIT {
            WarnOutcome::Flagged
        } else {
            WarnOutcome::Warned(rec.warnings)
        }
    })
}

/// Remove one warning. Returns the new count, or None when the user had no
/// warnings (the count never goes negative).
pub(crate) fn unwarn(store: &Store, user: &str) -> Option<u32> {
    store.update(|d| {
        let rec = d.users.entry(user.to_string()).or_default();
        if rec.warnings == 0 {
            return None;
        }
        rec.warnings -= 1;
        Some(rec.warnings)
    })
}

/// Set or clear the ban flag. Returns false when the flag already had the
/// requested value.
pub(crate) fn set_banned(store: &Store, user: &str, banned: bool) -> bool {
    store.update(|d| {
        let rec = d.users.entry(user.to_string()).or_default();
        if rec.banned == banned {
            return false;
        }
        rec.banned = banned;
        true
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::load(dir.path().join("state.json"));
        (dir, store)
    }

    const USER: &str = "target@s.whatsapp.net";

    #[test]
    fn test_warn_progression() {
        let (_dir, store) = temp_store();
        assert_eq!(warn(&store, USER), WarnOutcome::Warned(1));
        assert_eq!(warn(&store, USER), WarnOutcome::Warned(2));
        assert_eq!(warn(&store, USER), WarnOutcome::Flagged);
        assert_eq!(store.user(USER).warnings, 3);
    }

    #[test]
    fn test_flagged_fires_exactly_once() {
        let (_dir, store) = temp_store();
        warn(&store, USER);
        warn(&store, USER);
        assert_eq!(warn(&store, USER), WarnOutcome::Flagged);
        assert_eq!(warn(&store, USER), WarnOutcome::AlreadyFlagged);
        assert_eq!(warn(&store, USER), WarnOutcome::AlreadyFlagged);
        assert_eq!(store.user(USER).warnings, 3, "count never exceeds the limit");
    }

    #[test]
    fn test_unwarn_floors_at_zero() {
        let (_dir, store) = temp_store();
        assert_eq!(unwarn(&store, USER), None);
        assert_eq!(store.user(USER).warnings, 0);

        warn(&store, USER);
        assert_eq!(unwarn(&store, USER), Some(0));
        assert_eq!(unwarn(&store, USER), None);
    }

    #[test]
    fn test_count_stays_in_bounds_under_any_sequence() {
        let (_dir, store) = temp_store();
        let ops: [bool; 12] = [
            true, true, false, true, true, true, false, false, false, false, true, true,
        ];
        for &do_warn in &ops {
            if do_warn {
                warn(&store, USER);
            } else {
                unwarn(&store, USER);
            }
            let count = store.user(USER).warnings;
            assert!(count <= WARN_LIMIT, "count {count} out of bounds");
        }
    }

    #[test]
    fn test_unwarn_after_flag_lowers_count() {
        let (_dir, store) = temp_store();
        for _ in 0..3 {
            warn(&store, USER);
        }
        assert_eq!(unwarn(&store, USER), Some(2));
        // the removal already happened; warning again may flag again
        assert_eq!(warn(&store, USER), WarnOutcome::Flagged);
    }

    #[test]
    fn test_ban_unban() {
        let (_dir, store) = temp_store();
        assert!(set_banned(&store, USER, true));
        assert!(store.user(USER).banned);
        assert!(!set_banned(&store, USER, true), "already banned");
        assert!(set_banned(&store, USER, false));
        assert!(!store.user(USER).banned);
        assert!(!set_banned(&store, USER, false), "already clear");
    }
}
