//! Fixtures shared by the unit tests.

use std::sync::Mutex;

use chrono::NaiveDate;
use uuid::Uuid;

use toogether_shared::errors::AppResult;
use toogether_shared::types::auth::AccessGrant;

use crate::models::{Gender, GeoPoint, NewProfile, Profile, ShowMe};
use crate::ports::{Mailer, PasswordHasher, TokenIssuer};
use crate::store::GraphStore;

/// Stores passwords as `plain:<password>`. Argon2 is too slow for a test suite
/// that hashes hundreds of times.
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> AppResult<String> {
        Ok(format!("plain:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> AppResult<bool> {
        Ok(hash.strip_prefix("plain:") == Some(password))
    }
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<SentMail>>,
    pub fail: Mutex<bool>,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self { fail: Mutex::new(true), ..Self::default() }
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    /// The code in the last message sent, taken from the end of the body.
    pub fn last_code(&self) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let body = &sent.last()?.body;
        body.split_whitespace().last().map(str::to_string)
    }
}

impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        if *self.fail.lock().unwrap() {
            return Err("smtp unavailable".to_string());
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub struct StaticIssuer;

impl TokenIssuer for StaticIssuer {
    fn issue(&self, profile_id: Uuid) -> AppResult<AccessGrant> {
        Ok(AccessGrant::new(profile_id, format!("token-{profile_id}"), 3600))
    }
}

/// A registered profile that has not finished onboarding.
pub fn register(store: &impl GraphStore, email: &str) -> Profile {
    store
        .insert_profile(NewProfile {
            email: email.to_string(),
            password_hash: "plain:Passw0rd!".to_string(),
        })
        .unwrap()
}

pub fn onboard(store: &impl GraphStore, email: &str, gender: Gender, show_me: ShowMe) -> Profile {
    onboard_at(store, email, gender, show_me, None)
}

pub fn onboard_at(
    store: &impl GraphStore,
    email: &str,
    gender: Gender,
    show_me: ShowMe,
    location: Option<(f64, f64)>,
) -> Profile {
    let mut profile = register(store, email);
    profile.name = email.split('@').next().map(str::to_string);
    profile.birthdate = NaiveDate::from_ymd_opt(2000, 1, 1);
    profile.gender = Some(gender);
    profile.show_me = Some(show_me);
    profile.location = location.map(|(lat, lon)| GeoPoint::new(lat, lon).unwrap());
    profile.has_account = true;
    store.save_profile(&profile).unwrap()
}
