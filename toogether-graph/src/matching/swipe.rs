use uuid::Uuid;

use toogether_shared::errors::{AppError, AppResult, ErrorCode};

use crate::matching::derive::try_create_match;
use crate::models::{Decision, SwipeOutcome, SwipeTarget};
use crate::store::GraphStore;

fn blocked(actor: Uuid, target: SwipeTarget) -> AppError {
    AppError::with_details(
        ErrorCode::Blocked,
        "a block exists between you and this profile",
        serde_json::json!({ "actor_id": actor, "kind": target.kind(), "target_id": target.id() }),
    )
}

/// Resolves the profile a swipe lands on, after checking that the target
/// exists, is not the actor, and is not blocked either way.
fn counterpart<S: GraphStore + ?Sized>(store: &S, actor: Uuid, target: SwipeTarget) -> AppResult<Uuid> {
    match target {
        SwipeTarget::Profile(id) => {
            if id == actor {
                return Err(AppError::invalid_input("you cannot swipe on yourself"));
            }
            if store.profile(id)?.is_none() {
                return Err(AppError::with_details(
                    ErrorCode::ProfileNotFound,
                    "profile not found",
                    serde_json::json!({ "profile_id": id }),
                ));
            }
            if store.is_blocked_between(actor, id)? {
                return Err(blocked(actor, target));
            }
            Ok(id)
        }
        SwipeTarget::Group(id) => {
            let group = store.group(id)?.ok_or_else(|| {
                AppError::with_details(
                    ErrorCode::GroupNotFound,
                    "group not found",
                    serde_json::json!({ "group_id": id }),
                )
            })?;
            if group.has_member(actor) {
                return Err(AppError::invalid_input("you cannot swipe on your own group"));
            }
            for member in &group.member_ids {
                if store.is_blocked_between(actor, *member)? {
                    return Err(blocked(actor, target));
                }
            }
            Ok(group.owner_id)
        }
    }
}

/// Records a swipe. A like on a group lands on its owner.
pub fn swipe<S: GraphStore + ?Sized>(
    store: &S,
    actor: Uuid,
    target: SwipeTarget,
    decision: Decision,
) -> AppResult<SwipeOutcome> {
    if store.profile(actor)?.is_none() {
        return Err(AppError::new(ErrorCode::ProfileNotFound, "profile not found"));
    }
    let liked = counterpart(store, actor, target)?;

    match decision {
        Decision::Pass => {
            store.add_pass(actor, target)?;
            tracing::debug!(profile_id = %actor, kind = target.kind(), target_id = %target.id(), "passed");
            Ok(SwipeOutcome::none())
        }
        Decision::Like => {
            // Re-checked by the store: a block may have landed since `counterpart`.
            let added = store.add_like(actor, liked).map_err(|e| {
                if e.is(ErrorCode::Blocked) {
                    blocked(actor, target)
                } else {
                    e
                }
            })?;
            if added {
                metrics::counter!("graph_likes_total", "kind" => target.kind()).increment(1);
            }
            tracing::info!(profile_id = %actor, kind = target.kind(), target_id = %liked, "liked");
            let matched = try_create_match(store, actor, liked)?;
            Ok(SwipeOutcome::from_match(matched))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Barrier;

    use super::*;
    use crate::counters::total_matches;
    use crate::models::{CanonicalPair, Gender, Group, Match, NewProfile, Profile, ShowMe, VerificationCode};
    use crate::testing::onboard;
    use crate::{blocks, groups, MemoryStore};

    /// Lands `blocker`'s block right after the first block check passes.
    struct BlockAfterCheck {
        inner: MemoryStore,
        blocker: Uuid,
        blocked: Uuid,
        fired: AtomicBool,
    }

    impl GraphStore for BlockAfterCheck {
        fn insert_profile(&self, new: NewProfile) -> AppResult<Profile> {
            self.inner.insert_profile(new)
        }
        fn profile(&self, id: Uuid) -> AppResult<Option<Profile>> {
            self.inner.profile(id)
        }
        fn profile_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
            self.inner.profile_by_email(email)
        }
        fn profiles_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Profile>> {
            self.inner.profiles_by_ids(ids)
        }
        fn candidate_profiles(&self) -> AppResult<Vec<Profile>> {
            self.inner.candidate_profiles()
        }
        fn save_profile(&self, profile: &Profile) -> AppResult<Profile> {
            self.inner.save_profile(profile)
        }
        fn set_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
            self.inner.set_password_hash(id, password_hash)
        }
        fn delete_profile(&self, id: Uuid) -> AppResult<bool> {
            self.inner.delete_profile(id)
        }
        fn add_like(&self, liker: Uuid, liked: Uuid) -> AppResult<bool> {
            self.inner.add_like(liker, liked)
        }
        fn has_liked(&self, liker: Uuid, liked: Uuid) -> AppResult<bool> {
            self.inner.has_liked(liker, liked)
        }
        fn liked_by(&self, liker: Uuid) -> AppResult<Vec<Uuid>> {
            self.inner.liked_by(liker)
        }
        fn add_pass(&self, actor: Uuid, target: SwipeTarget) -> AppResult<bool> {
            self.inner.add_pass(actor, target)
        }
        fn passes(&self, actor: Uuid) -> AppResult<Vec<SwipeTarget>> {
            self.inner.passes(actor)
        }
        fn add_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool> {
            self.inner.add_block(blocker, blocked)
        }
        fn remove_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool> {
            self.inner.remove_block(blocker, blocked)
        }
        fn blocked_by(&self, blocker: Uuid) -> AppResult<Vec<Uuid>> {
            self.inner.blocked_by(blocker)
        }
        fn blockers_of(&self, blocked: Uuid) -> AppResult<Vec<Uuid>> {
            self.inner.blockers_of(blocked)
        }
        fn is_blocked_between(&self, a: Uuid, b: Uuid) -> AppResult<bool> {
            let result = self.inner.is_blocked_between(a, b)?;
            if !self.fired.swap(true, Ordering::SeqCst) {
                blocks::block(&self.inner, self.blocker, self.blocked)?;
            }
            Ok(result)
        }
        fn insert_match(&self, pair: CanonicalPair) -> AppResult<(Match, bool)> {
            self.inner.insert_match(pair)
        }
        fn matches_of(&self, profile: Uuid) -> AppResult<Vec<Match>> {
            self.inner.matches_of(profile)
        }
        fn count_matches(&self, profile: Uuid) -> AppResult<u64> {
            self.inner.count_matches(profile)
        }
        fn insert_group(&self, owner: Uuid, gender: Gender) -> AppResult<Group> {
            self.inner.insert_group(owner, gender)
        }
        fn group(&self, id: Uuid) -> AppResult<Option<Group>> {
            self.inner.group(id)
        }
        fn groups(&self) -> AppResult<Vec<Group>> {
            self.inner.groups()
        }
        fn groups_of(&self, member: Uuid) -> AppResult<Vec<Group>> {
            self.inner.groups_of(member)
        }
        fn add_member(&self, group: Uuid, member: Uuid) -> AppResult<bool> {
            self.inner.add_member(group, member)
        }
        fn remove_member(&self, group: Uuid, member: Uuid) -> AppResult<bool> {
            self.inner.remove_member(group, member)
        }
        fn upsert_code(&self, code: &VerificationCode) -> AppResult<Option<VerificationCode>> {
            self.inner.upsert_code(code)
        }
        fn verification_code(&self, email: &str) -> AppResult<Option<VerificationCode>> {
            self.inner.verification_code(email)
        }
        fn consume_code(&self, email: &str, code: &str) -> AppResult<bool> {
            self.inner.consume_code(email, code)
        }
        fn ping(&self) -> AppResult<()> {
            self.inner.ping()
        }
    }

    fn pair(store: &MemoryStore) -> (Uuid, Uuid) {
        let a = onboard(store, "a@example.com", Gender::Female, ShowMe::Everyone);
        let b = onboard(store, "b@example.com", Gender::Male, ShowMe::Everyone);
        (a.id, b.id)
    }

    #[test]
    fn like_then_like_back_matches_once() {
        let store = MemoryStore::new();
        let (a, b) = pair(&store);

        let first = swipe(&store, a, SwipeTarget::Profile(b), Decision::Like).unwrap();
        assert!(!first.matched);
        assert_eq!(total_matches(&store, a).unwrap(), 0);
        assert_eq!(total_matches(&store, b).unwrap(), 0);

        let second = swipe(&store, b, SwipeTarget::Profile(a), Decision::Like).unwrap();
        assert!(second.matched);
        let m = second.matched_with.unwrap();
        assert_eq!(m.profile1_id, a.min(b));

        let again = swipe(&store, b, SwipeTarget::Profile(a), Decision::Like).unwrap();
        assert_eq!(again.matched_with.unwrap().id, m.id);
        assert_eq!(total_matches(&store, a).unwrap(), 1);
        assert_eq!(total_matches(&store, b).unwrap(), 1);
    }

    #[test]
    fn pass_is_idempotent_and_never_matches() {
        let store = MemoryStore::new();
        let (a, b) = pair(&store);
        swipe(&store, b, SwipeTarget::Profile(a), Decision::Like).unwrap();

        for _ in 0..2 {
            let outcome = swipe(&store, a, SwipeTarget::Profile(b), Decision::Pass).unwrap();
            assert!(!outcome.matched);
        }
        assert_eq!(store.passes(a).unwrap(), vec![SwipeTarget::Profile(b)]);
        assert_eq!(total_matches(&store, a).unwrap(), 0);
    }

    #[test]
    fn swiping_on_self_is_invalid() {
        let store = MemoryStore::new();
        let (a, _) = pair(&store);
        let err = swipe(&store, a, SwipeTarget::Profile(a), Decision::Like).unwrap_err();
        assert!(err.is(ErrorCode::InvalidInput));
    }

    #[test]
    fn missing_actor_or_target_is_not_found() {
        let store = MemoryStore::new();
        let (a, _) = pair(&store);
        let ghost = Uuid::now_v7();

        let err = swipe(&store, ghost, SwipeTarget::Profile(a), Decision::Like).unwrap_err();
        assert!(err.is(ErrorCode::ProfileNotFound));
        let err = swipe(&store, a, SwipeTarget::Profile(ghost), Decision::Like).unwrap_err();
        assert!(err.is(ErrorCode::ProfileNotFound));
        let err = swipe(&store, a, SwipeTarget::Group(ghost), Decision::Pass).unwrap_err();
        assert!(err.is(ErrorCode::GroupNotFound));
    }

    #[test]
    fn blocked_either_way_is_forbidden() {
        let store = MemoryStore::new();
        let (a, b) = pair(&store);
        blocks::block(&store, b, a).unwrap();

        let err = swipe(&store, a, SwipeTarget::Profile(b), Decision::Like).unwrap_err();
        assert!(err.is(ErrorCode::Blocked));
        let err = swipe(&store, b, SwipeTarget::Profile(a), Decision::Pass).unwrap_err();
        assert!(err.is(ErrorCode::Blocked));
    }

    #[test]
    fn group_like_lands_on_owner() {
        let store = MemoryStore::new();
        let (a, owner) = pair(&store);
        let member = onboard(&store, "m@example.com", Gender::Male, ShowMe::Everyone);
        let group = groups::create_group(&store, owner, Gender::Male).unwrap();
        groups::add_member(&store, owner, group.id, member.id).unwrap();

        swipe(&store, owner, SwipeTarget::Profile(a), Decision::Like).unwrap();
        let outcome = swipe(&store, a, SwipeTarget::Group(group.id), Decision::Like).unwrap();

        assert!(outcome.matched);
        assert!(outcome.matched_with.unwrap().involves(owner));
        assert!(store.has_liked(a, owner).unwrap());
        assert!(!store.has_liked(a, member.id).unwrap());
        assert_eq!(total_matches(&store, member.id).unwrap(), 0);
    }

    #[test]
    fn group_with_blocked_member_is_forbidden() {
        let store = MemoryStore::new();
        let (a, owner) = pair(&store);
        let member = onboard(&store, "m@example.com", Gender::Male, ShowMe::Everyone);
        let group = groups::create_group(&store, owner, Gender::Male).unwrap();
        groups::add_member(&store, owner, group.id, member.id).unwrap();
        blocks::block(&store, a, member.id).unwrap();

        let err = swipe(&store, a, SwipeTarget::Group(group.id), Decision::Like).unwrap_err();
        assert!(err.is(ErrorCode::Blocked));
    }

    #[test]
    fn swiping_on_own_group_is_invalid() {
        let store = MemoryStore::new();
        let (a, _) = pair(&store);
        let group = groups::create_group(&store, a, Gender::Female).unwrap();
        let err = swipe(&store, a, SwipeTarget::Group(group.id), Decision::Like).unwrap_err();
        assert!(err.is(ErrorCode::InvalidInput));
    }

    #[test]
    fn block_landing_mid_like_wins() {
        let inner = MemoryStore::new();
        let (a, b) = pair(&inner);
        let store = BlockAfterCheck { inner, blocker: b, blocked: a, fired: AtomicBool::new(false) };

        let err = swipe(&store, a, SwipeTarget::Profile(b), Decision::Like).unwrap_err();
        assert!(err.is(ErrorCode::Blocked));
        assert!(store.inner.is_blocked_between(a, b).unwrap());
        assert!(!store.inner.has_liked(a, b).unwrap());

        blocks::unblock(&store.inner, b, a).unwrap();
        let outcome = swipe(&store.inner, b, SwipeTarget::Profile(a), Decision::Like).unwrap();
        assert!(!outcome.matched);
        assert_eq!(total_matches(&store.inner, a).unwrap(), 0);
    }

    #[test]
    fn concurrent_mutual_likes_match_once() {
        for _ in 0..20 {
            let store = MemoryStore::new();
            let (a, b) = pair(&store);
            let barrier = Barrier::new(2);

            std::thread::scope(|s| {
                for (actor, target) in [(a, b), (b, a)] {
                    let store = &store;
                    let barrier = &barrier;
                    s.spawn(move || {
                        barrier.wait();
                        swipe(store, actor, SwipeTarget::Profile(target), Decision::Like).unwrap();
                    });
                }
            });

            assert_eq!(total_matches(&store, a).unwrap(), 1);
            assert_eq!(total_matches(&store, b).unwrap(), 1);
            assert_eq!(store.matches_of(a).unwrap(), store.matches_of(b).unwrap());
        }
    }
}
