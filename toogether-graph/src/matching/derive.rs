//! Match derivation.
//!
//! A match exists for a pair exactly when both sides liked each other at some
//! point. Checking and inserting happen in one store call keyed on the
//! canonical pair, so two profiles liking each other at the same moment still
//! produce a single row.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use uuid::Uuid;

use toogether_shared::errors::AppResult;

use crate::models::{CanonicalPair, Match, MatchDetail, ProfileCard};
use crate::store::GraphStore;

/// Creates the match for `a` and `b` if both likes are present.
///
/// Returns the match (new or already stored) when the pair is mutual, `None`
/// otherwise.
pub fn try_create_match<S: GraphStore + ?Sized>(store: &S, a: Uuid, b: Uuid) -> AppResult<Option<Match>> {
    let pair = CanonicalPair::new(a, b)?;
    if !store.has_liked(a, b)? || !store.has_liked(b, a)? {
        return Ok(None);
    }

    let (m, created) = store.insert_match(pair)?;
    if created {
        metrics::counter!("graph_matches_created_total").increment(1);
        tracing::info!(match_id = %m.id, profile1 = %m.profile1_id, profile2 = %m.profile2_id, "match created");
    }
    Ok(Some(m))
}

/// Matches involving `profile_id`, oldest first, with both sides expanded.
pub fn list_matches<S: GraphStore + ?Sized>(
    store: &S,
    profile_id: Uuid,
    today: NaiveDate,
) -> AppResult<Vec<MatchDetail>> {
    let matches = store.matches_of(profile_id)?;
    let ids: Vec<Uuid> = matches
        .iter()
        .flat_map(|m| [m.profile1_id, m.profile2_id])
        .collect();
    let in_group: HashSet<Uuid> = store
        .groups()?
        .iter()
        .flat_map(|g| g.member_ids.iter().copied())
        .collect();
    let cards: HashMap<Uuid, ProfileCard> = store
        .profiles_by_ids(&ids)?
        .iter()
        .map(|p| (p.id, ProfileCard::new(p, today, in_group.contains(&p.id), None)))
        .collect();

    Ok(matches
        .into_iter()
        .filter_map(|m| {
            Some(MatchDetail {
                id: m.id,
                created_at: m.created_at,
                profile1: cards.get(&m.profile1_id)?.clone(),
                profile2: cards.get(&m.profile2_id)?.clone(),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use super::*;
    use crate::models::{Gender, ShowMe};
    use crate::testing::onboard;
    use crate::MemoryStore;

    #[test]
    fn one_sided_like_is_not_a_match() {
        let store = MemoryStore::new();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        store.add_like(a, b).unwrap();
        assert!(try_create_match(&store, a, b).unwrap().is_none());
        assert_eq!(store.count_matches(a).unwrap(), 0);
    }

    #[test]
    fn mutual_like_creates_one_match_regardless_of_argument_order() {
        let store = MemoryStore::new();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        store.add_like(a, b).unwrap();
        store.add_like(b, a).unwrap();

        let first = try_create_match(&store, a, b).unwrap().unwrap();
        let second = try_create_match(&store, b, a).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(store.count_matches(a).unwrap(), 1);
        assert_eq!(store.count_matches(b).unwrap(), 1);
    }

    #[test]
    fn self_pair_is_invalid() {
        let store = MemoryStore::new();
        let a = Uuid::now_v7();
        let err = try_create_match(&store, a, a).unwrap_err();
        assert!(err.is(toogether_shared::errors::ErrorCode::InvalidInput));
    }

    #[test]
    fn concurrent_attempts_yield_a_single_match() {
        let store = Arc::new(MemoryStore::new());
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        store.add_like(a, b).unwrap();
        store.add_like(b, a).unwrap();

        let barrier = Barrier::new(8);
        let results: Vec<Match> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let store = &store;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        let (x, y) = if i % 2 == 0 { (a, b) } else { (b, a) };
                        try_create_match(store.as_ref(), x, y).unwrap().unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.count_matches(a).unwrap(), 1);
    }

    #[test]
    fn list_matches_expands_both_sides() {
        let store = MemoryStore::new();
        let ana = onboard(&store, "ana@example.com", Gender::Female, ShowMe::Men);
        let leo = onboard(&store, "leo@example.com", Gender::Male, ShowMe::Women);
        store.add_like(ana.id, leo.id).unwrap();
        store.add_like(leo.id, ana.id).unwrap();
        try_create_match(&store, leo.id, ana.id).unwrap();

        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let listed = list_matches(&store, ana.id, today).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].profile1.id, ana.id.min(leo.id));
        assert_eq!(listed[0].profile2.id, ana.id.max(leo.id));
        assert_eq!(listed[0].profile1.age, Some(26));
        assert!(list_matches(&store, Uuid::now_v7(), today).unwrap().is_empty());
    }
}
