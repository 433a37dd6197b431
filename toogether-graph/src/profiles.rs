//! Profile lifecycle: registration, login, onboarding, edits, and removal.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use toogether_shared::errors::{AppError, AppResult, ErrorCode};
use toogether_shared::types::auth::AccessGrant;

use crate::counters;
use crate::models::{age_between, GeoPoint, NewProfile, Profile, ProfileSetup, ProfileUpdate};
use crate::ports::{PasswordHasher, TokenIssuer};
use crate::store::GraphStore;

pub const MINIMUM_AGE: i32 = 18;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 8 {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one number"));
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one letter"));
    }
    Ok(())
}

/// Loads a profile or fails with `ProfileNotFound`.
pub fn require<S: GraphStore + ?Sized>(store: &S, id: Uuid) -> AppResult<Profile> {
    store.profile(id)?.ok_or_else(|| {
        AppError::with_details(
            ErrorCode::ProfileNotFound,
            "profile not found",
            serde_json::json!({ "profile_id": id }),
        )
    })
}

pub fn register<S, H>(store: &S, hasher: &H, email: &str, password: &str, repeated: &str) -> AppResult<Profile>
where
    S: GraphStore + ?Sized,
    H: PasswordHasher + ?Sized,
{
    if password != repeated {
        return Err(AppError::new(ErrorCode::PasswordMismatch, "passwords do not match"));
    }
    validate_password(password)?;

    let profile = store.insert_profile(NewProfile {
        email: normalize_email(email),
        password_hash: hasher.hash(password)?,
    })?;

    tracing::info!(profile_id = %profile.id, "profile registered");
    Ok(profile)
}

pub fn login<S, H, I>(store: &S, hasher: &H, issuer: &I, email: &str, password: &str) -> AppResult<AccessGrant>
where
    S: GraphStore + ?Sized,
    H: PasswordHasher + ?Sized,
    I: TokenIssuer + ?Sized,
{
    let invalid = || AppError::new(ErrorCode::InvalidCredentials, "invalid email or password");

    let profile = store.profile_by_email(&normalize_email(email))?.ok_or_else(invalid)?;
    if !hasher.verify(password, &profile.password_hash)? {
        tracing::warn!(profile_id = %profile.id, "login rejected");
        return Err(invalid());
    }
    issuer.issue(profile.id)
}

/// Completes onboarding. The profile becomes visible to others afterwards.
pub fn create_profile<S: GraphStore + ?Sized>(
    store: &S,
    id: Uuid,
    setup: ProfileSetup,
    today: NaiveDate,
) -> AppResult<Profile> {
    let name = setup.name.trim();
    if name.is_empty() {
        return Err(AppError::new(ErrorCode::ValidationError, "name is required"));
    }
    let age = age_between(setup.birthdate, today);
    if age < MINIMUM_AGE {
        return Err(AppError::with_details(
            ErrorCode::Underage,
            "you must be at least 18 years old",
            serde_json::json!({ "age": age }),
        ));
    }

    let mut profile = require(store, id)?;
    profile.name = Some(name.to_string());
    profile.birthdate = Some(setup.birthdate);
    profile.gender = Some(setup.gender);
    profile.show_me = Some(setup.show_me);
    profile.university = setup.university.or(profile.university);
    profile.description = setup.description.or(profile.description);
    profile.has_account = true;
    profile.updated_at = Utc::now();

    let saved = store.save_profile(&profile)?;
    tracing::info!(profile_id = %id, "onboarding completed");
    Ok(saved)
}

pub fn update_profile<S: GraphStore + ?Sized>(store: &S, id: Uuid, update: ProfileUpdate) -> AppResult<Profile> {
    let mut profile = require(store, id)?;

    if let Some(gender) = update.gender {
        profile.gender = Some(gender);
    }
    if let Some(show_me) = update.show_me {
        profile.show_me = Some(show_me);
    }
    if update.nationality.is_some() {
        profile.nationality = update.nationality;
    }
    if update.city.is_some() {
        profile.city = update.city;
    }
    if update.instagram.is_some() {
        profile.instagram = update.instagram;
    }
    if update.university.is_some() {
        profile.university = update.university;
    }
    if update.description.is_some() {
        profile.description = update.description;
    }
    profile.updated_at = Utc::now();

    store.save_profile(&profile)
}

pub fn update_location<S: GraphStore + ?Sized>(store: &S, id: Uuid, latitude: f64, longitude: f64) -> AppResult<Profile> {
    let point = GeoPoint::new(latitude, longitude)?;
    let mut profile = require(store, id)?;
    profile.location = Some(point);
    profile.updated_at = Utc::now();

    let saved = store.save_profile(&profile)?;
    tracing::debug!(profile_id = %id, "location updated");
    Ok(saved)
}

pub fn delete_profile<S: GraphStore + ?Sized>(store: &S, id: Uuid) -> AppResult<()> {
    if !store.delete_profile(id)? {
        return Err(AppError::new(ErrorCode::ProfileNotFound, "profile not found"));
    }
    tracing::info!(profile_id = %id, "profile deleted");
    Ok(())
}

/// A profile as its owner sees it, with the derived fields filled in.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileOverview {
    #[serde(flatten)]
    pub profile: Profile,
    pub age: Option<i32>,
    pub total_likes: u64,
    pub total_matches: u64,
    pub is_in_group: bool,
}

pub fn profile_overview<S: GraphStore + ?Sized>(store: &S, id: Uuid, today: NaiveDate) -> AppResult<ProfileOverview> {
    let profile = require(store, id)?;
    let counters = counters::counters(store, id)?;
    Ok(ProfileOverview {
        age: profile.age_on(today),
        total_likes: counters.pending_likes,
        total_matches: counters.total_matches,
        is_in_group: !store.groups_of(id)?.is_empty(),
        profile,
    })
}
