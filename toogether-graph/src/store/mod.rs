//! The `GraphStore` trait: the transactional store the graph runs against.
//!
//! Implemented in-process by [`MemoryStore`](memory::MemoryStore) and over
//! Postgres by the API crate. Every set mutation is atomic on its own; callers
//! never read-modify-write a relation.

pub mod memory;

use uuid::Uuid;

use toogether_shared::errors::AppResult;

use crate::models::{
    CanonicalPair, Gender, Group, Match, NewProfile, Profile, SwipeTarget, VerificationCode,
};

pub trait GraphStore: Send + Sync {
    // ── Profiles ──────────────────────────────────────────────────────────

    /// Fails with `EmailAlreadyExists` when the email is taken.
    fn insert_profile(&self, new: NewProfile) -> AppResult<Profile>;

    fn profile(&self, id: Uuid) -> AppResult<Option<Profile>>;

    fn profile_by_email(&self, email: &str) -> AppResult<Option<Profile>>;

    /// Profiles for the given ids, ascending by id. Unknown ids are skipped.
    fn profiles_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Profile>>;

    /// All profiles with `has_account = true`, ascending by id.
    fn candidate_profiles(&self) -> AppResult<Vec<Profile>>;

    /// Writes the editable fields of `profile` (descriptive fields, gender,
    /// show-me, location, `has_account`, `updated_at`). The stored `id`,
    /// `email`, `password_hash` and `created_at` are kept as they are.
    fn save_profile(&self, profile: &Profile) -> AppResult<Profile>;

    fn set_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()>;

    /// Removes the profile and everything referencing it: likes, passes and
    /// blocks in both directions, matches, memberships, owned groups, and the
    /// verification code for its email.
    /// Returns `false` if there was no such profile.
    fn delete_profile(&self, id: Uuid) -> AppResult<bool>;

    // ── Likes ─────────────────────────────────────────────────────────────

    /// Returns `true` if the like was newly added. Fails with `Blocked` when
    /// either profile has blocked the other; the check and the insert are one
    /// atomic step, so a like never outlives a concurrent block.
    fn add_like(&self, liker: Uuid, liked: Uuid) -> AppResult<bool>;

    fn has_liked(&self, liker: Uuid, liked: Uuid) -> AppResult<bool>;

    fn liked_by(&self, liker: Uuid) -> AppResult<Vec<Uuid>>;

    // ── Passes ────────────────────────────────────────────────────────────

    fn add_pass(&self, actor: Uuid, target: SwipeTarget) -> AppResult<bool>;

    fn passes(&self, actor: Uuid) -> AppResult<Vec<SwipeTarget>>;

    // ── Blocks ────────────────────────────────────────────────────────────

    /// Adds the block and, in the same atomic step, clears likes between the
    /// two profiles in both directions. Returns `true` if the block is new.
    fn add_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool>;

    fn remove_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool>;

    /// Profiles `blocker` has blocked, ascending by id.
    fn blocked_by(&self, blocker: Uuid) -> AppResult<Vec<Uuid>>;

    /// Profiles that have blocked `blocked`.
    fn blockers_of(&self, blocked: Uuid) -> AppResult<Vec<Uuid>>;

    /// `true` if either profile has blocked the other.
    fn is_blocked_between(&self, a: Uuid, b: Uuid) -> AppResult<bool>;

    // ── Matches ───────────────────────────────────────────────────────────

    /// Inserts the match for `pair`, or returns the existing one. Concurrent
    /// calls for the same pair yield the same row; the flag is `true` only for
    /// the call that created it.
    fn insert_match(&self, pair: CanonicalPair) -> AppResult<(Match, bool)>;

    /// Matches where `profile` is either side, oldest first.
    fn matches_of(&self, profile: Uuid) -> AppResult<Vec<Match>>;

    fn count_matches(&self, profile: Uuid) -> AppResult<u64>;

    // ── Groups ────────────────────────────────────────────────────────────

    /// Creates a group with `owner` as its first member.
    fn insert_group(&self, owner: Uuid, gender: Gender) -> AppResult<Group>;

    fn group(&self, id: Uuid) -> AppResult<Option<Group>>;

    /// All groups, ascending by id.
    fn groups(&self) -> AppResult<Vec<Group>>;

    fn groups_of(&self, member: Uuid) -> AppResult<Vec<Group>>;

    fn add_member(&self, group: Uuid, member: Uuid) -> AppResult<bool>;

    fn remove_member(&self, group: Uuid, member: Uuid) -> AppResult<bool>;

    // ── Verification codes ────────────────────────────────────────────────

    /// Writes the code for its email, replacing any existing row. Returns the
    /// row it replaced.
    fn upsert_code(&self, code: &VerificationCode) -> AppResult<Option<VerificationCode>>;

    fn verification_code(&self, email: &str) -> AppResult<Option<VerificationCode>>;

    /// Deletes the row only if it still holds `code`. Returns whether it did.
    fn consume_code(&self, email: &str, code: &str) -> AppResult<bool>;

    // ── Health ────────────────────────────────────────────────────────────

    fn ping(&self) -> AppResult<()>;
}
