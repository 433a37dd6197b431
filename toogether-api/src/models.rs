//! Diesel rows and their conversion to and from the graph's domain types.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use toogether_graph::models::{Gender, GeoPoint, Match, Profile, ShowMe, SwipeTarget, VerificationCode};
use toogether_shared::errors::{AppError, AppResult};

use crate::schema::{
    group_members, matches, profile_blocks, profile_groups, profile_likes, profile_passes, profiles,
    verification_codes,
};

// --- Profile ---

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProfileRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub gender: Option<String>,
    pub show_me: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub has_account: bool,
    pub description: Option<String>,
    pub university: Option<String>,
    pub city: Option<String>,
    pub nationality: Option<String>,
    pub instagram: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = AppError;

    fn try_from(row: ProfileRow) -> AppResult<Self> {
        let gender = row.gender.as_deref().map(str::parse::<Gender>).transpose().map_err(AppError::internal)?;
        let show_me = row.show_me.as_deref().map(str::parse::<ShowMe>).transpose().map_err(AppError::internal)?;
        let location = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint { latitude, longitude }),
            _ => None,
        };
        Ok(Profile {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            birthdate: row.birthdate,
            gender,
            show_me,
            location,
            has_account: row.has_account,
            description: row.description,
            university: row.university,
            city: row.city,
            nationality: row.nationality,
            instagram: row.instagram,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfileRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub has_account: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Every mutable profile column; `None` writes NULL.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = profiles)]
#[diesel(treat_none_as_null = true)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub gender: Option<String>,
    pub show_me: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub has_account: bool,
    pub description: Option<String>,
    pub university: Option<String>,
    pub city: Option<String>,
    pub nationality: Option<String>,
    pub instagram: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Profile> for ProfileChanges {
    fn from(p: &Profile) -> Self {
        Self {
            name: p.name.clone(),
            birthdate: p.birthdate,
            gender: p.gender.map(|g| g.code().to_string()),
            show_me: p.show_me.map(|s| s.code().to_string()),
            latitude: p.location.map(|l| l.latitude),
            longitude: p.location.map(|l| l.longitude),
            has_account: p.has_account,
            description: p.description.clone(),
            university: p.university.clone(),
            city: p.city.clone(),
            nationality: p.nationality.clone(),
            instagram: p.instagram.clone(),
            updated_at: p.updated_at,
        }
    }
}

// --- Relations ---

#[derive(Debug, Insertable)]
#[diesel(table_name = profile_likes)]
pub struct NewLike {
    pub liker_id: Uuid,
    pub liked_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profile_blocks)]
pub struct NewBlock {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profile_passes)]
pub struct NewPass {
    pub actor_id: Uuid,
    pub target_kind: String,
    pub target_id: Uuid,
}

impl NewPass {
    pub fn new(actor_id: Uuid, target: SwipeTarget) -> Self {
        Self {
            actor_id,
            target_kind: target.kind().to_string(),
            target_id: target.id(),
        }
    }
}

pub fn swipe_target(kind: &str, id: Uuid) -> AppResult<SwipeTarget> {
    match kind {
        "profile" => Ok(SwipeTarget::Profile(id)),
        "group" => Ok(SwipeTarget::Group(id)),
        other => Err(AppError::internal(format!("unknown swipe target kind: {other}"))),
    }
}

// --- Groups ---

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = profile_groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct GroupRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub gender: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = group_members)]
pub struct NewMember {
    pub group_id: Uuid,
    pub profile_id: Uuid,
}

// --- Matches ---

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = matches)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MatchRow {
    pub id: Uuid,
    pub profile1_id: Uuid,
    pub profile2_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<MatchRow> for Match {
    fn from(row: MatchRow) -> Self {
        Match {
            id: row.id,
            profile1_id: row.profile1_id,
            profile2_id: row.profile2_id,
            created_at: row.created_at,
        }
    }
}

// --- Verification codes ---

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = verification_codes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CodeRow {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl From<CodeRow> for VerificationCode {
    fn from(row: CodeRow) -> Self {
        VerificationCode { email: row.email, code: row.code, expires_at: row.expires_at }
    }
}

impl From<&VerificationCode> for CodeRow {
    fn from(code: &VerificationCode) -> Self {
        CodeRow { email: code.email.clone(), code: code.code.clone(), expires_at: code.expires_at }
    }
}
