//! Candidate selection
//!
//! Decides which feed items a reconciliation pass evaluates, and in which
//! order.

use std::collections::HashSet;

use crate::config::CandidateMode;
use crate::model::{Item, PersistedState};

/// Select the items to evaluate, in evaluation order
///
/// - `Newest`: exactly the first (newest) feed item.
/// - `CatchUp`: every item strictly newer than the newest already-notified
///   one, at most `limit` of them (the newest ones); this is also the
///   lookback when no notified item appears in the snapshot at all. Any
///   other unnotified item still in the snapshot that has a pending record
///   is evaluated too, so a failed send behind a newer delivery is retried.
///   Items come out oldest first so messages follow upload order.
///
/// `feed` must be newest first. Repeated ids keep their newest position only.
pub fn select_candidates<'a>(
    feed: &'a [Item],
    state: &PersistedState,
    mode: CandidateMode,
    limit: usize,
) -> Vec<&'a Item> {
    match mode {
        CandidateMode::Newest => feed.first().into_iter().collect(),
        CandidateMode::CatchUp => {
            let mut seen = HashSet::new();
            let newer: HashSet<&str> = feed
                .iter()
                .take_while(|item| !state.is_notified(&item.id))
                .filter(|item| seen.insert(item.id.as_str()))
                .take(limit)
                .map(|item| item.id.as_str())
                .collect();

            let mut chosen = HashSet::new();
            let mut selected: Vec<&Item> = feed
                .iter()
                .filter(|item| {
                    let id = item.id.as_str();
                    let retry = !state.is_notified(id) && state.pending_record(id).is_some();
                    (newer.contains(id) || retry) && chosen.insert(id)
                })
                .collect();
            selected.reverse();
            selected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::VisibilityStatus;
    use chrono::Utc;

    fn feed(ids: &[&str]) -> Vec<Item> {
        ids.iter()
            .map(|id| Item::new(*id, format!("title {}", id), format!("https://example.com/{}", id)))
            .collect()
    }

    fn ids(items: &[&Item]) -> Vec<String> {
        items.iter().map(|item| item.id.clone()).collect()
    }

    #[test]
    fn test_newest_mode_takes_first_item() {
        let feed = feed(&["c", "b", "a"]);
        let state = PersistedState::new();
        let selected = select_candidates(&feed, &state, CandidateMode::Newest, 5);
        assert_eq!(ids(&selected), vec!["c"]);
    }

    #[test]
    fn test_newest_mode_returns_notified_item_too() {
        // The engine skips it; selection stays purely positional
        let feed = feed(&["c", "b"]);
        let mut state = PersistedState::new();
        state.mark_notified("c");
        let selected = select_candidates(&feed, &state, CandidateMode::Newest, 5);
        assert_eq!(ids(&selected), vec!["c"]);
    }

    #[test]
    fn test_catch_up_stops_at_boundary_oldest_first() {
        let feed = feed(&["new3", "new2", "new1", "old", "older"]);
        let mut state = PersistedState::new();
        state.mark_notified("old");
        let selected = select_candidates(&feed, &state, CandidateMode::CatchUp, 5);
        assert_eq!(ids(&selected), vec!["new1", "new2", "new3"]);
    }

    #[test]
    fn test_catch_up_cold_state_is_bounded() {
        let feed = feed(&["f", "e", "d", "c", "b", "a"]);
        let state = PersistedState::new();
        let selected = select_candidates(&feed, &state, CandidateMode::CatchUp, 2);
        assert_eq!(ids(&selected), vec!["e", "f"]);
    }

    #[test]
    fn test_catch_up_newest_is_notified() {
        let feed = feed(&["b", "a"]);
        let mut state = PersistedState::new();
        state.mark_notified("b");
        let selected = select_candidates(&feed, &state, CandidateMode::CatchUp, 5);
        assert!(selected.is_empty());
    }

    #[test]
    fn test_catch_up_skips_repeated_ids() {
        let feed = feed(&["b", "a", "b"]);
        let state = PersistedState::new();
        let selected = select_candidates(&feed, &state, CandidateMode::CatchUp, 5);
        assert_eq!(ids(&selected), vec!["a", "b"]);
    }

    #[test]
    fn test_catch_up_retries_pending_behind_boundary() {
        // "b" failed while "c" went out; "c" is now the boundary
        let feed = feed(&["d", "c", "b", "a"]);
        let mut state = PersistedState::new();
        state.mark_notified("a");
        state.mark_notified("c");
        state.upsert_pending("b", VisibilityStatus::Public, Utc::now());
        let selected = select_candidates(&feed, &state, CandidateMode::CatchUp, 5);
        assert_eq!(ids(&selected), vec!["b", "d"]);
    }

    #[test]
    fn test_catch_up_pending_outside_limit_still_selected() {
        let feed = feed(&["e", "d", "c", "b"]);
        let mut state = PersistedState::new();
        state.upsert_pending("b", VisibilityStatus::Private, Utc::now());
        let selected = select_candidates(&feed, &state, CandidateMode::CatchUp, 2);
        assert_eq!(ids(&selected), vec!["b", "d", "e"]);
    }

    #[test]
    fn test_newest_mode_ignores_older_pending() {
        let feed = feed(&["c", "b"]);
        let mut state = PersistedState::new();
        state.upsert_pending("b", VisibilityStatus::Public, Utc::now());
        let selected = select_candidates(&feed, &state, CandidateMode::Newest, 5);
        assert_eq!(ids(&selected), vec!["c"]);
    }

    #[test]
    fn test_empty_feed() {
        let state = PersistedState::new();
        assert!(select_candidates(&[], &state, CandidateMode::Newest, 5).is_empty());
        assert!(select_candidates(&[], &state, CandidateMode::CatchUp, 5).is_empty());
    }
}
