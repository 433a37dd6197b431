//! `GraphStore` over Postgres.
//!
//! Set relations rely on their composite primary keys: inserts are
//! `ON CONFLICT DO NOTHING` and the affected-row count says whether the entry
//! was new. Matches are unique on the ordered pair, which is what keeps two
//! simultaneous mutual likes down to one row.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::upsert::excluded;
use uuid::Uuid;

use toogether_graph::models::{
    CanonicalPair, Gender, Group, Match, NewProfile, Profile, SwipeTarget, VerificationCode,
};
use toogether_graph::GraphStore;
use toogether_shared::clients::db::{checkout, DbPool};
use toogether_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{
    swipe_target, CodeRow, GroupRow, MatchRow, NewBlock, NewLike, NewMember, NewPass, NewProfileRow,
    ProfileChanges, ProfileRow,
};
use crate::schema::{
    group_members, matches, profile_blocks, profile_groups, profile_likes, profile_passes, profiles,
    verification_codes,
};

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn profile_not_found() -> AppError {
    AppError::new(ErrorCode::ProfileNotFound, "profile not found")
}

fn group_not_found() -> AppError {
    AppError::new(ErrorCode::GroupNotFound, "group not found")
}

fn into_profiles(rows: Vec<ProfileRow>) -> AppResult<Vec<Profile>> {
    rows.into_iter().map(Profile::try_from).collect()
}

/// Builds groups from their rows plus every `(group_id, profile_id)` pair.
fn assemble_groups(rows: Vec<GroupRow>, members: Vec<(Uuid, Uuid)>) -> AppResult<Vec<Group>> {
    let mut by_group: BTreeMap<Uuid, BTreeSet<Uuid>> = BTreeMap::new();
    for (group_id, profile_id) in members {
        by_group.entry(group_id).or_default().insert(profile_id);
    }
    rows.into_iter()
        .map(|row| {
            Ok(Group {
                id: row.id,
                owner_id: row.owner_id,
                gender: row.gender.parse::<Gender>().map_err(AppError::internal)?,
                member_ids: by_group.remove(&row.id).unwrap_or_default(),
                created_at: row.created_at,
            })
        })
        .collect()
}

/// Row-locks both profiles, lower id first. Likes and blocks between the same
/// two profiles take this lock, so a like cannot slip in beside a new block.
fn lock_pair(conn: &mut PgConnection, a: Uuid, b: Uuid) -> Result<(), DieselError> {
    profiles::table
        .filter(profiles::id.eq_any(vec![a, b]))
        .order(profiles::id.asc())
        .select(profiles::id)
        .for_update()
        .load::<Uuid>(conn)?;
    Ok(())
}

fn block_exists(conn: &mut PgConnection, a: Uuid, b: Uuid) -> Result<bool, DieselError> {
    diesel::select(exists(profile_blocks::table.filter(
        profile_blocks::blocker_id
            .eq(a)
            .and(profile_blocks::blocked_id.eq(b))
            .or(profile_blocks::blocker_id.eq(b).and(profile_blocks::blocked_id.eq(a))),
    )))
    .get_result::<bool>(conn)
}

impl PgStore {
    fn load_groups(&self, conn: &mut PgConnection, ids: Option<&[Uuid]>) -> AppResult<Vec<Group>> {
        let mut query = profile_groups::table
            .select(GroupRow::as_select())
            .order(profile_groups::id.asc())
            .into_boxed();
        let mut members = group_members::table
            .select((group_members::group_id, group_members::profile_id))
            .into_boxed();
        if let Some(ids) = ids {
            query = query.filter(profile_groups::id.eq_any(ids.to_vec()));
            members = members.filter(group_members::group_id.eq_any(ids.to_vec()));
        }
        let rows = query.load::<GroupRow>(conn)?;
        let members = members.load::<(Uuid, Uuid)>(conn)?;
        assemble_groups(rows, members)
    }
}

impl GraphStore for PgStore {
    // ── Profiles ──────────────────────────────────────────────────────────

    fn insert_profile(&self, new: NewProfile) -> AppResult<Profile> {
        let mut conn = checkout(&self.pool)?;
        let now = Utc::now();
        let row = NewProfileRow {
            id: Uuid::now_v7(),
            email: new.email,
            password_hash: new.password_hash,
            has_account: false,
            created_at: now,
            updated_at: now,
        };

        let inserted = diesel::insert_into(profiles::table)
            .values(&row)
            .returning(ProfileRow::as_returning())
            .get_result::<ProfileRow>(&mut conn);
        match inserted {
            Ok(row) => Profile::try_from(row),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(AppError::new(ErrorCode::EmailAlreadyExists, "email already registered"))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn profile(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let mut conn = checkout(&self.pool)?;
        profiles::table
            .find(id)
            .select(ProfileRow::as_select())
            .first::<ProfileRow>(&mut conn)
            .optional()?
            .map(Profile::try_from)
            .transpose()
    }

    fn profile_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        let mut conn = checkout(&self.pool)?;
        profiles::table
            .filter(profiles::email.eq(email))
            .select(ProfileRow::as_select())
            .first::<ProfileRow>(&mut conn)
            .optional()?
            .map(Profile::try_from)
            .transpose()
    }

    fn profiles_by_ids(&self, ids: &[Uuid]) -> AppResult<Vec<Profile>> {
        let mut conn = checkout(&self.pool)?;
        let rows = profiles::table
            .filter(profiles::id.eq_any(ids.to_vec()))
            .order(profiles::id.asc())
            .select(ProfileRow::as_select())
            .load::<ProfileRow>(&mut conn)?;
        into_profiles(rows)
    }

    fn candidate_profiles(&self) -> AppResult<Vec<Profile>> {
        let mut conn = checkout(&self.pool)?;
        let rows = profiles::table
            .filter(profiles::has_account.eq(true))
            .order(profiles::id.asc())
            .select(ProfileRow::as_select())
            .load::<ProfileRow>(&mut conn)?;
        into_profiles(rows)
    }

    fn save_profile(&self, profile: &Profile) -> AppResult<Profile> {
        let mut conn = checkout(&self.pool)?;
        let row = diesel::update(profiles::table.find(profile.id))
            .set(&ProfileChanges::from(profile))
            .returning(ProfileRow::as_returning())
            .get_result::<ProfileRow>(&mut conn)
            .optional()?
            .ok_or_else(profile_not_found)?;
        Profile::try_from(row)
    }

    fn set_password_hash(&self, id: Uuid, password_hash: &str) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        let updated = diesel::update(profiles::table.find(id))
            .set((
                profiles::password_hash.eq(password_hash),
                profiles::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(profile_not_found());
        }
        Ok(())
    }

    fn delete_profile(&self, id: Uuid) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        let deleted = conn.transaction::<_, DieselError, _>(|conn| {
            let owned: Vec<Uuid> = profile_groups::table
                .filter(profile_groups::owner_id.eq(id))
                .select(profile_groups::id)
                .load(conn)?;

            diesel::delete(
                profile_likes::table
                    .filter(profile_likes::liker_id.eq(id).or(profile_likes::liked_id.eq(id))),
            )
            .execute(conn)?;
            diesel::delete(
                profile_blocks::table
                    .filter(profile_blocks::blocker_id.eq(id).or(profile_blocks::blocked_id.eq(id))),
            )
            .execute(conn)?;
            diesel::delete(
                profile_passes::table.filter(
                    profile_passes::actor_id
                        .eq(id)
                        .or(profile_passes::target_kind.eq("profile").and(profile_passes::target_id.eq(id)))
                        .or(profile_passes::target_kind
                            .eq("group")
                            .and(profile_passes::target_id.eq_any(owned.clone()))),
                ),
            )
            .execute(conn)?;
            diesel::delete(
                matches::table.filter(matches::profile1_id.eq(id).or(matches::profile2_id.eq(id))),
            )
            .execute(conn)?;
            diesel::delete(
                group_members::table.filter(
                    group_members::profile_id
                        .eq(id)
                        .or(group_members::group_id.eq_any(owned.clone())),
                ),
            )
            .execute(conn)?;
            diesel::delete(profile_groups::table.filter(profile_groups::id.eq_any(owned.clone())))
                .execute(conn)?;

            let email: Option<String> = diesel::delete(profiles::table.find(id))
                .returning(profiles::email)
                .get_result(conn)
                .optional()?;
            let Some(email) = email else {
                return Ok(false);
            };
            diesel::delete(verification_codes::table.find(email)).execute(conn)?;
            Ok(true)
        })?;
        Ok(deleted)
    }

    // ── Likes ─────────────────────────────────────────────────────────────

    fn add_like(&self, liker: Uuid, liked: Uuid) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        conn.transaction::<_, AppError, _>(|conn| {
            lock_pair(conn, liker, liked)?;
            if block_exists(conn, liker, liked)? {
                return Err(AppError::new(ErrorCode::Blocked, "a block exists between these profiles"));
            }
            let inserted = diesel::insert_into(profile_likes::table)
                .values(&NewLike { liker_id: liker, liked_id: liked })
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(inserted == 1)
        })
    }

    fn has_liked(&self, liker: Uuid, liked: Uuid) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        let found = diesel::select(exists(
            profile_likes::table
                .filter(profile_likes::liker_id.eq(liker))
                .filter(profile_likes::liked_id.eq(liked)),
        ))
        .get_result::<bool>(&mut conn)?;
        Ok(found)
    }

    fn liked_by(&self, liker: Uuid) -> AppResult<Vec<Uuid>> {
        let mut conn = checkout(&self.pool)?;
        let ids = profile_likes::table
            .filter(profile_likes::liker_id.eq(liker))
            .select(profile_likes::liked_id)
            .order(profile_likes::liked_id.asc())
            .load::<Uuid>(&mut conn)?;
        Ok(ids)
    }

    // ── Passes ────────────────────────────────────────────────────────────

    fn add_pass(&self, actor: Uuid, target: SwipeTarget) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        let inserted = diesel::insert_into(profile_passes::table)
            .values(&NewPass::new(actor, target))
            .on_conflict_do_nothing()
            .execute(&mut conn)?;
        Ok(inserted == 1)
    }

    fn passes(&self, actor: Uuid) -> AppResult<Vec<SwipeTarget>> {
        let mut conn = checkout(&self.pool)?;
        let rows = profile_passes::table
            .filter(profile_passes::actor_id.eq(actor))
            .select((profile_passes::target_kind, profile_passes::target_id))
            .load::<(String, Uuid)>(&mut conn)?;
        rows.iter().map(|(kind, id)| swipe_target(kind, *id)).collect()
    }

    // ── Blocks ────────────────────────────────────────────────────────────

    fn add_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        let inserted = conn.transaction::<_, DieselError, _>(|conn| {
            lock_pair(conn, blocker, blocked)?;
            diesel::delete(
                profile_likes::table.filter(
                    profile_likes::liker_id
                        .eq(blocker)
                        .and(profile_likes::liked_id.eq(blocked))
                        .or(profile_likes::liker_id.eq(blocked).and(profile_likes::liked_id.eq(blocker))),
                ),
            )
            .execute(conn)?;
            diesel::insert_into(profile_blocks::table)
                .values(&NewBlock { blocker_id: blocker, blocked_id: blocked })
                .on_conflict_do_nothing()
                .execute(conn)
        })?;
        Ok(inserted == 1)
    }

    fn remove_block(&self, blocker: Uuid, blocked: Uuid) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        let removed = diesel::delete(profile_blocks::table.find((blocker, blocked))).execute(&mut conn)?;
        Ok(removed > 0)
    }

    fn blocked_by(&self, blocker: Uuid) -> AppResult<Vec<Uuid>> {
        let mut conn = checkout(&self.pool)?;
        let ids = profile_blocks::table
            .filter(profile_blocks::blocker_id.eq(blocker))
            .select(profile_blocks::blocked_id)
            .order(profile_blocks::blocked_id.asc())
            .load::<Uuid>(&mut conn)?;
        Ok(ids)
    }

    fn blockers_of(&self, blocked: Uuid) -> AppResult<Vec<Uuid>> {
        let mut conn = checkout(&self.pool)?;
        let ids = profile_blocks::table
            .filter(profile_blocks::blocked_id.eq(blocked))
            .select(profile_blocks::blocker_id)
            .load::<Uuid>(&mut conn)?;
        Ok(ids)
    }

    fn is_blocked_between(&self, a: Uuid, b: Uuid) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        Ok(block_exists(&mut conn, a, b)?)
    }

    // ── Matches ───────────────────────────────────────────────────────────

    fn insert_match(&self, pair: CanonicalPair) -> AppResult<(Match, bool)> {
        let mut conn = checkout(&self.pool)?;
        let row = MatchRow {
            id: Uuid::now_v7(),
            profile1_id: pair.low(),
            profile2_id: pair.high(),
            created_at: Utc::now(),
        };

        let (stored, inserted) = conn.transaction::<_, DieselError, _>(|conn| {
            // A concurrent insert for the same pair blocks here until it
            // commits, then this one does nothing.
            let inserted = diesel::insert_into(matches::table)
                .values(&row)
                .on_conflict((matches::profile1_id, matches::profile2_id))
                .do_nothing()
                .execute(conn)?;
            let stored = matches::table
                .filter(matches::profile1_id.eq(pair.low()))
                .filter(matches::profile2_id.eq(pair.high()))
                .select(MatchRow::as_select())
                .first::<MatchRow>(conn)?;
            Ok((stored, inserted == 1))
        })?;
        Ok((stored.into(), inserted))
    }

    fn matches_of(&self, profile: Uuid) -> AppResult<Vec<Match>> {
        let mut conn = checkout(&self.pool)?;
        let rows = matches::table
            .filter(matches::profile1_id.eq(profile).or(matches::profile2_id.eq(profile)))
            .order(matches::id.asc())
            .select(MatchRow::as_select())
            .load::<MatchRow>(&mut conn)?;
        Ok(rows.into_iter().map(Match::from).collect())
    }

    fn count_matches(&self, profile: Uuid) -> AppResult<u64> {
        let mut conn = checkout(&self.pool)?;
        let count = matches::table
            .filter(matches::profile1_id.eq(profile).or(matches::profile2_id.eq(profile)))
            .count()
            .get_result::<i64>(&mut conn)?;
        Ok(count.max(0) as u64)
    }

    // ── Groups ────────────────────────────────────────────────────────────

    fn insert_group(&self, owner: Uuid, gender: Gender) -> AppResult<Group> {
        let mut conn = checkout(&self.pool)?;
        let row = GroupRow {
            id: Uuid::now_v7(),
            owner_id: owner,
            gender: gender.code().to_string(),
            created_at: Utc::now(),
        };
        conn.transaction::<_, DieselError, _>(|conn| {
            diesel::insert_into(profile_groups::table).values(&row).execute(conn)?;
            diesel::insert_into(group_members::table)
                .values(&NewMember { group_id: row.id, profile_id: owner })
                .execute(conn)?;
            Ok(())
        })?;

        Ok(Group {
            id: row.id,
            owner_id: owner,
            gender,
            member_ids: BTreeSet::from([owner]),
            created_at: row.created_at,
        })
    }

    fn group(&self, id: Uuid) -> AppResult<Option<Group>> {
        let mut conn = checkout(&self.pool)?;
        Ok(self.load_groups(&mut conn, Some(std::slice::from_ref(&id)))?.into_iter().next())
    }

    fn groups(&self) -> AppResult<Vec<Group>> {
        let mut conn = checkout(&self.pool)?;
        self.load_groups(&mut conn, None)
    }

    fn groups_of(&self, member: Uuid) -> AppResult<Vec<Group>> {
        let mut conn = checkout(&self.pool)?;
        let ids = group_members::table
            .filter(group_members::profile_id.eq(member))
            .select(group_members::group_id)
            .load::<Uuid>(&mut conn)?;
        self.load_groups(&mut conn, Some(&ids))
    }

    fn add_member(&self, group: Uuid, member: Uuid) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        let present = diesel::select(exists(profile_groups::table.find(group))).get_result::<bool>(&mut conn)?;
        if !present {
            return Err(group_not_found());
        }
        let inserted = diesel::insert_into(group_members::table)
            .values(&NewMember { group_id: group, profile_id: member })
            .on_conflict_do_nothing()
            .execute(&mut conn)?;
        Ok(inserted == 1)
    }

    fn remove_member(&self, group: Uuid, member: Uuid) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        let present = diesel::select(exists(profile_groups::table.find(group))).get_result::<bool>(&mut conn)?;
        if !present {
            return Err(group_not_found());
        }
        let removed = diesel::delete(group_members::table.find((group, member))).execute(&mut conn)?;
        Ok(removed > 0)
    }

    // ── Verification codes ────────────────────────────────────────────────

    fn upsert_code(&self, code: &VerificationCode) -> AppResult<Option<VerificationCode>> {
        let mut conn = checkout(&self.pool)?;
        let row = CodeRow::from(code);
        let previous = conn.transaction::<_, DieselError, _>(|conn| {
            let previous = verification_codes::table
                .find(row.email.as_str())
                .select(CodeRow::as_select())
                .for_update()
                .first::<CodeRow>(conn)
                .optional()?;
            diesel::insert_into(verification_codes::table)
                .values(&row)
                .on_conflict(verification_codes::email)
                .do_update()
                .set((
                    verification_codes::code.eq(excluded(verification_codes::code)),
                    verification_codes::expires_at.eq(excluded(verification_codes::expires_at)),
                ))
                .execute(conn)?;
            Ok(previous)
        })?;
        Ok(previous.map(VerificationCode::from))
    }

    fn verification_code(&self, email: &str) -> AppResult<Option<VerificationCode>> {
        let mut conn = checkout(&self.pool)?;
        let row = verification_codes::table
            .find(email)
            .select(CodeRow::as_select())
            .first::<CodeRow>(&mut conn)
            .optional()?;
        Ok(row.map(VerificationCode::from))
    }

    fn consume_code(&self, email: &str, code: &str) -> AppResult<bool> {
        let mut conn = checkout(&self.pool)?;
        let removed = diesel::delete(
            verification_codes::table
                .filter(verification_codes::email.eq(email))
                .filter(verification_codes::code.eq(code)),
        )
        .execute(&mut conn)?;
        Ok(removed == 1)
    }

    // ── Health ────────────────────────────────────────────────────────────

    fn ping(&self) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }
}
