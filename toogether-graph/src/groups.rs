//! Groups: a profile plus friends swiping as one unit. Only the owner manages
//! membership, and the owner is always a member.

use chrono::NaiveDate;
use uuid::Uuid;

use toogether_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Gender, Group, GroupCard, ProfileCard};
use crate::profiles::require;
use crate::store::GraphStore;

fn load<S: GraphStore + ?Sized>(store: &S, group_id: Uuid) -> AppResult<Group> {
    store.group(group_id)?.ok_or_else(|| {
        AppError::with_details(
            ErrorCode::GroupNotFound,
            "group not found",
            serde_json::json!({ "group_id": group_id }),
        )
    })
}

fn owned_by<S: GraphStore + ?Sized>(store: &S, actor: Uuid, group_id: Uuid) -> AppResult<Group> {
    let group = load(store, group_id)?;
    if group.owner_id != actor {
        return Err(AppError::with_details(
            ErrorCode::NotGroupOwner,
            "only the group owner can change its members",
            serde_json::json!({ "group_id": group_id }),
        ));
    }
    Ok(group)
}

pub fn create_group<S: GraphStore + ?Sized>(store: &S, owner: Uuid, gender: Gender) -> AppResult<Group> {
    require(store, owner)?;
    let group = store.insert_group(owner, gender)?;
    tracing::info!(group_id = %group.id, owner_id = %owner, "group created");
    Ok(group)
}

pub fn add_member<S: GraphStore + ?Sized>(store: &S, actor: Uuid, group_id: Uuid, member: Uuid) -> AppResult<Group> {
    owned_by(store, actor, group_id)?;
    require(store, member)?;
    if store.add_member(group_id, member)? {
        tracing::info!(group_id = %group_id, profile_id = %member, "member added");
    }
    load(store, group_id)
}

pub fn remove_member<S: GraphStore + ?Sized>(store: &S, actor: Uuid, group_id: Uuid, member: Uuid) -> AppResult<Group> {
    let group = owned_by(store, actor, group_id)?;
    if member == group.owner_id {
        return Err(AppError::invalid_input("the owner cannot leave their own group"));
    }
    if store.remove_member(group_id, member)? {
        tracing::info!(group_id = %group_id, profile_id = %member, "member removed");
    }
    load(store, group_id)
}

pub fn group_card<S: GraphStore + ?Sized>(store: &S, group_id: Uuid, today: NaiveDate) -> AppResult<GroupCard> {
    let group = load(store, group_id)?;
    let ids: Vec<Uuid> = group.member_ids.iter().copied().collect();
    let members: Vec<ProfileCard> = store
        .profiles_by_ids(&ids)?
        .iter()
        .map(|p| ProfileCard::new(p, today, true, None))
        .collect();
    let owner = members
        .iter()
        .find(|c| c.id == group.owner_id)
        .cloned()
        .ok_or_else(|| AppError::internal(format!("group {group_id} has no owner profile")))?;

    Ok(GroupCard {
        id: group.id,
        gender: group.gender,
        total_members: group.member_ids.len(),
        created_at: group.created_at,
        owner,
        members,
    })
}
