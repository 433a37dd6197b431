//! Derived counters. Always recomputed from the graph; nothing is cached.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use toogether_shared::errors::AppResult;

use crate::store::GraphStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub pending_likes: u64,
    pub total_matches: u64,
}

/// Likes given by `profile_id` that have not turned into a match.
pub fn pending_likes<S: GraphStore + ?Sized>(store: &S, profile_id: Uuid) -> AppResult<u64> {
    let matched: HashSet<Uuid> = store
        .matches_of(profile_id)?
        .iter()
        .filter_map(|m| m.counterpart(profile_id))
        .collect();
    let pending = store
        .liked_by(profile_id)?
        .into_iter()
        .filter(|liked| !matched.contains(liked))
        .count();
    Ok(pending as u64)
}

pub fn total_matches<S: GraphStore + ?Sized>(store: &S, profile_id: Uuid) -> AppResult<u64> {
    store.count_matches(profile_id)
}

pub fn counters<S: GraphStore + ?Sized>(store: &S, profile_id: Uuid) -> AppResult<Counters> {
    Ok(Counters {
        pending_likes: pending_likes(store, profile_id)?,
        total_matches: total_matches(store, profile_id)?,
    })
}
