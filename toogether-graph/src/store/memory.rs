//! In-process `GraphStore`.
//!
//! Each relation lives behind its own lock. Operations touching more than one
//! relation take locks in a fixed order (profiles, likes, passes, blocks,
//! matches, groups, codes) so they cannot deadlock.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError, RwLock};

use chrono::Utc;
use uuid::Uuid;

use toogether_shared::errors::{AppError, AppResult, ErrorCode};

use super::GraphStore;
use crate::models::{
    CanonicalPair, Gender, Group, Match, NewProfile, Profile, SwipeTarget, VerificationCode,
};

fn poisoned<T>(_: PoisonError<T>) -> AppError {
    AppError::internal("memory store lock poisoned")
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: RwLock<BTreeMap<Uuid, Profile>>,
    likes: RwLock<BTreeSet<(Uuid, Uuid)>>,
    passes: RwLock<BTreeSet<(Uuid, SwipeTarget)>>,
    blocks: RwLock<BTreeSet<(Uuid, Uuid)>>,
    matches: Mutex<BTreeMap<CanonicalPair, Match>>,
    groups: RwLock<BTreeMap<Uuid, Group>>,
    codes: Mutex<HashMap<String, VerificationCode>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for MemoryStore {
    fn insert_profile(&self, new: NewProfile) -> AppResult<Profile> {
        let mut profiles = self.profiles.write().map_err(poisoned)?;
        if profiles.values().any(|p| p.email == new.email) {
            return Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"));
        }

        let now = Utc::now();
        let profile = Profile {
            id: Uuid::now_v7(),
            email: new.email,
            password_hash: new.password_hash,
            name: None,
            birthdate: None,
            gender: None,
            show_me: None,
            location: None,
            has_account: false,
            description: None,
            university: None,
            city: None,
            nationality: None,
            instagram: None,
            created_at: now,
            updated_at: now,
        };
        profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    fn profile(&self, id: Uuid) -> AppResult<Option<Profile>> {
        Ok(self.profiles.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn profile_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        let profiles = self.profiles.read().map_err(poisoned)?;
        Ok(profiles.values().find(|p| p.email == email).cloned())
    }

    fn profiles_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Profile>> {
        let profiles = self.profiles.read().map_err(poisoned)?;
        let wanted: BTreeSet<Uuid> = ids.iter().copied().collect();
        Ok(wanted.iter().filter_map(|id| profiles.get(id).cloned()).collect())
    }

    fn candidate_profiles(&self) -> AppResult<Vec<Profile>> {
        let profiles = self.profiles.read().map_err(poisoned)?;
        Ok(profiles.values().filter(|p| p.has_account).cloned().collect())
    }

    fn save_profile(&self, profile: &Profile) -> AppResult<Profile> {
        let mut profiles = self.profiles.write().map_err(poisoned)?;
        let stored = profiles
            .get_mut(&profile.id)
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;
        let mut updated = profile.clone();
        updated.id = stored.id;
        updated.email = stored.email.clone();
        updated.password_hash = stored.password_hash.clone();
        updated.created_at = stored.created_at;
        *stored = updated;
        Ok(stored.clone())
    }

    fn set_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let mut profiles = self.profiles.write().map_err(poisoned)?;
        let stored = profiles
            .get_mut(&id)
            .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;
        stored.password_hash = password_hash.to_string();
        stored.updated_at = Utc::now();
        Ok(())
    }

    fn delete_profile(&self, id: Uuid) -> AppResult<bool> {
        let mut profiles = self.profiles.write().map_err(poisoned)?;
        let mut likes = self.likes.write().map_err(poisoned)?;
        let mut passes = self.passes.write().map_err(poisoned)?;
        let mut blocks = self.blocks.write().map_err(poisoned)?;
        let mut matches = self.matches.lock().map_err(poisoned)?;
        let mut groups = self.groups.write().map_err(poisoned)?;
        let mut codes = self.codes.lock().map_err(poisoned)?;

        let Some(removed) = profiles.remove(&id) else {
            return Ok(false);
        };
        codes.remove(&removed.email);

        likes.retain(|(a, b)| *a != id && *b != id);
        blocks.retain(|(a, b)| *a != id && *b != id);
        matches.retain(|_, m| !m.involves(id));

        let owned: BTreeSet<Uuid> = groups
            .values()
            .filter(|g| g.owner_id == id)
            .map(|g| g.id)
            .collect();
        groups.retain(|gid, _| !owned.contains(gid));
        for group in groups.values_mut() {
            group.member_ids.remove(&id);
        }

        passes.retain(|(actor, target)| {
            *actor != id
                && *target != SwipeTarget::Profile(id)
                && !matches!(target, SwipeTarget::Group(g) if owned.contains(g))
        });

        Ok(true)
    }

    fn add_like(&self, liker: Uuid, liked: Uuid) -> AppResult<bool> {
        let mut likes = self.likes.write().map_err(poisoned)?;
        let blocks = self.blocks.read().map_err(poisoned)?;
        if blocks.contains(&(liker, liked)) || blocks.contains(&(liked, liker)) {
            return Err(AppError::new(ErrorCode::Blocked, "a block exists between these profiles"));
        }
        Ok(likes.insert((liker, liked)))
    }

    fn has_liked(&self, liker: Uuid, liked: Uuid) -> AppResult<bool> {
        Ok(self.likes.read().map_err(poisoned)?.contains(&(liker, liked)))
    }

    fn liked_by(&self, liker: Uuid) -> AppResult<Vec<Uuid>> {
        let likes = self.likes.read().map_err(poisoned)?;
        Ok(likes.iter().filter(|(a, _)| *a == liker).map(|(_, b)| *b).collect())
    }

    fn add_pass(&self, actor: Uuid, target: SwipeTarget) -> AppResult<bool> {
        Ok(self.passes.write().map_err(poisoned)?.insert((actor, target)))
    }

    fn passes(&self, actor: Uuid) -> AppResult<Vec<SwipeTarget>> {
        let passes = self.passes.read().map_err(poisoned)?;
        Ok(passes.iter().filter(|(a, _)| *a == actor).map(|(_, t)| *t).collect())
    }

    fn add_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool> {
        let mut likes = self.likes.write().map_err(poisoned)?;
        let mut blocks = self.blocks.write().map_err(poisoned)?;
        likes.remove(&(blocker, blocked));
        likes.remove(&(blocked, blocker));
        Ok(blocks.insert((blocker, blocked)))
    }

    fn remove_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool> {
        Ok(self.blocks.write().map_err(poisoned)?.remove(&(blocker, blocked)))
    }

    fn blocked_by(&self, blocker: Uuid) -> AppResult<Vec<Uuid>> {
        let blocks = self.blocks.read().map_err(poisoned)?;
        Ok(blocks.iter().filter(|(a, _)| *a == blocker).map(|(_, b)| *b).collect())
    }

    fn blockers_of(&self, blocked: Uuid) -> AppResult<Vec<Uuid>> {
        let blocks = self.blocks.read().map_err(poisoned)?;
        Ok(blocks.iter().filter(|(_, b)| *b == blocked).map(|(a, _)| *a).collect())
    }

    fn is_blocked_between(&self, a: Uuid, b: Uuid) -> AppResult<bool> {
        let blocks = self.blocks.read().map_err(poisoned)?;
        Ok(blocks.contains(&(a, b)) || blocks.contains(&(b, a)))
    }

    fn insert_match(&self, pair: CanonicalPair) -> AppResult<(Match, bool)> {
        let mut matches = self.matches.lock().map_err(poisoned)?;
        if let Some(existing) = matches.get(&pair) {
            return Ok((existing.clone(), false));
        }
        let created = Match {
            id: Uuid::now_v7(),
            profile1_id: pair.low(),
            profile2_id: pair.high(),
            created_at: Utc::now(),
        };
        matches.insert(pair, created.clone());
        Ok((created, true))
    }

    fn matches_of(&self, profile: Uuid) -> AppResult<Vec<Match>> {
        let matches = self.matches.lock().map_err(poisoned)?;
        let mut found: Vec<Match> = matches.values().filter(|m| m.involves(profile)).cloned().collect();
        found.sort_by_key(|m| m.id);
        Ok(found)
    }

    fn count_matches(&self, profile: Uuid) -> AppResult<u64> {
        let matches = self.matches.lock().map_err(poisoned)?;
        Ok(matches.values().filter(|m| m.involves(profile)).count() as u64)
    }

    fn insert_group(&self, owner: Uuid, gender: Gender) -> AppResult<Group> {
        let group = Group {
            id: Uuid::now_v7(),
            owner_id: owner,
            gender,
            member_ids: BTreeSet::from([owner]),
            created_at: Utc::now(),
        };
        self.groups.write().map_err(poisoned)?.insert(group.id, group.clone());
        Ok(group)
    }

    fn group(&self, id: Uuid) -> AppResult<Option<Group>> {
        Ok(self.groups.read().map_err(poisoned)?.get(&id).cloned())
    }

    fn groups(&self) -> AppResult<Vec<Group>> {
        Ok(self.groups.read().map_err(poisoned)?.values().cloned().collect())
    }

    fn groups_of(&self, member: Uuid) -> AppResult<Vec<Group>> {
        let groups = self.groups.read().map_err(poisoned)?;
        Ok(groups.values().filter(|g| g.has_member(member)).cloned().collect())
    }

    fn add_member(&self, group: Uuid, member: Uuid) -> AppResult<bool> {
        let mut groups = self.groups.write().map_err(poisoned)?;
        let stored = groups
            .get_mut(&group)
            .ok_or_else(|| AppError::new(ErrorCode::GroupNotFound, "group not found"))?;
        Ok(stored.member_ids.insert(member))
    }

    fn remove_member(&self, group: Uuid, member: Uuid) -> AppResult<bool> {
        let mut groups = self.groups.write().map_err(poisoned)?;
        let stored = groups
            .get_mut(&group)
            .ok_or_else(|| AppError::new(ErrorCode::GroupNotFound, "group not found"))?;
        Ok(stored.member_ids.remove(&member))
    }

    fn upsert_code(&self, code: &VerificationCode) -> AppResult<Option<VerificationCode>> {
        let mut codes = self.codes.lock().map_err(poisoned)?;
        Ok(codes.insert(code.email.clone(), code.clone()))
    }

    fn verification_code(&self, email: &str) -> AppResult<Option<VerificationCode>> {
        Ok(self.codes.lock().map_err(poisoned)?.get(email).cloned())
    }

    fn consume_code(&self, email: &str, code: &str) -> AppResult<bool> {
        let mut codes = self.codes.lock().map_err(poisoned)?;
        match codes.get(email) {
            Some(stored) if stored.code == code => {
                codes.remove(email);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
