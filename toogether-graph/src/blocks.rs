//! Block manager.
//!
//! A block hides both profiles from each other's queues and rejects swipes
//! between them. It clears pending likes both ways but leaves existing matches
//! in place. Unblocking only removes the block.

use chrono::NaiveDate;
use uuid::Uuid;

use toogether_shared::errors::{AppError, AppResult, ErrorCode};
use toogether_shared::types::api::Counted;

use crate::models::ProfileCard;
use crate::store::GraphStore;

fn require_profile<S: GraphStore + ?Sized>(store: &S, id: Uuid) -> AppResult<()> {
    match store.profile(id)? {
        Some(_) => Ok(()),
        None => Err(AppError::with_details(
            ErrorCode::ProfileNotFound,
            "profile not found",
            serde_json::json!({ "profile_id": id }),
        )),
    }
}

pub fn block<S: GraphStore + ?Sized>(store: &S, actor: Uuid, target: Uuid) -> AppResult<()> {
    if actor == target {
        return Err(AppError::invalid_input("you cannot block yourself"));
    }
    require_profile(store, actor)?;
    require_profile(store, target)?;

    if store.add_block(actor, target)? {
        metrics::counter!("graph_blocks_total").increment(1);
        tracing::info!(profile_id = %actor, target_id = %target, "profile blocked");
    }
    Ok(())
}

pub fn unblock<S: GraphStore + ?Sized>(store: &S, actor: Uuid, target: Uuid) -> AppResult<()> {
    if actor == target {
        return Err(AppError::invalid_input("you cannot unblock yourself"));
    }
    require_profile(store, actor)?;

    if store.remove_block(actor, target)? {
        tracing::info!(profile_id = %actor, target_id = %target, "profile unblocked");
    }
    Ok(())
}

/// Profiles `actor` has blocked, ascending by id.
pub fn list_blocked<S: GraphStore + ?Sized>(
    store: &S,
    actor: Uuid,
    today: NaiveDate,
) -> AppResult<Counted<ProfileCard>> {
    let ids = store.blocked_by(actor)?;
    let cards: Vec<ProfileCard> = store
        .profiles_by_ids(&ids)?
        .iter()
        .map(|p| ProfileCard::new(p, today, false, None))
        .collect();
    Ok(cards.into())
}
