//! Password recovery through time-boxed verification codes.
//!
//! Each email holds at most one code. Issuing a new one overwrites the old,
//! a successful validation consumes it, and it stops working
//! `CODE_TTL_MINUTES` after issue.

use chrono::Duration;
use rand::Rng;

use toogether_shared::errors::{AppError, AppResult, ErrorCode};
use toogether_shared::types::auth::AccessGrant;

use crate::models::VerificationCode;
use crate::ports::{Clock, Mailer, PasswordHasher, TokenIssuer};
use crate::profiles::{normalize_email, validate_password};
use crate::store::GraphStore;

pub const CODE_LENGTH: usize = 6;
pub const CODE_TTL_MINUTES: i64 = 5;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const RESET_SUBJECT: &str = "Reset your password";

pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Codes are compared trimmed and uppercased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn email_not_found(email: &str) -> AppError {
    AppError::with_details(
        ErrorCode::EmailNotFound,
        "no account with this email",
        serde_json::json!({ "email": email }),
    )
}

fn invalid_code() -> AppError {
    AppError::new(ErrorCode::VerificationCodeInvalid, "invalid verification code")
}

/// Issues a fresh code for `email` and mails it.
///
/// If the mail cannot be sent the previous code (if any) is put back, so the
/// user is never left with a code they did not receive.
pub async fn request_code<S, M, C>(store: &S, mailer: &M, clock: &C, email: &str) -> AppResult<()>
where
    S: GraphStore + ?Sized,
    M: Mailer,
    C: Clock + ?Sized,
{
    let email = normalize_email(email);
    if store.profile_by_email(&email)?.is_none() {
        return Err(email_not_found(&email));
    }

    let issued = VerificationCode {
        email: email.clone(),
        code: generate_code(),
        expires_at: clock.now() + Duration::minutes(CODE_TTL_MINUTES),
    };
    let previous = store.upsert_code(&issued)?;

    let body = format!("Here is your access code {}", issued.code);
    if let Err(e) = mailer.send(&email, RESET_SUBJECT, &body).await {
        tracing::error!(error = %e, email = %email, "failed to send verification code");
        // Only undo our own write; a newer request may already have replaced it.
        if store.consume_code(&email, &issued.code)? {
            if let Some(previous) = previous {
                store.upsert_code(&previous)?;
            }
        }
        return Err(AppError::with_details(
            ErrorCode::DeliveryFailed,
            "could not deliver the verification code",
            serde_json::json!({ "email": email }),
        ));
    }

    metrics::counter!("recovery_codes_issued_total").increment(1);
    tracing::info!(email = %email, expires_at = %issued.expires_at, "verification code issued");
    Ok(())
}

/// Checks `code` against the one stored for `email` and, on success, consumes
/// it and returns an access credential for the profile.
pub fn validate_code<S, I, C>(store: &S, issuer: &I, clock: &C, email: &str, code: &str) -> AppResult<AccessGrant>
where
    S: GraphStore + ?Sized,
    I: TokenIssuer + ?Sized,
    C: Clock + ?Sized,
{
    let email = normalize_email(email);
    let code = normalize_code(code);

    let stored = match store.verification_code(&email)? {
        Some(stored) if stored.code == code => stored,
        _ => return Err(invalid_code()),
    };
    if stored.is_expired_at(clock.now()) {
        return Err(AppError::with_details(
            ErrorCode::VerificationCodeExpired,
            "verification code expired",
            serde_json::json!({ "expired_at": stored.expires_at }),
        ));
    }

    let profile = store.profile_by_email(&email)?.ok_or_else(|| email_not_found(&email))?;
    if !store.consume_code(&email, &code)? {
        // Someone else validated or re-issued it first.
        return Err(invalid_code());
    }

    tracing::info!(profile_id = %profile.id, "verification code accepted");
    issuer.issue(profile.id)
}

pub fn reset_password<S, H>(store: &S, hasher: &H, email: &str, new_password: &str, confirm: &str) -> AppResult<()>
where
    S: GraphStore + ?Sized,
    H: PasswordHasher + ?Sized,
{
    if new_password != confirm {
        return Err(AppError::new(ErrorCode::PasswordMismatch, "passwords do not match"));
    }
    validate_password(new_password)?;

    let email = normalize_email(email);
    let profile = store.profile_by_email(&email)?.ok_or_else(|| email_not_found(&email))?;
    let hash = hasher.hash(new_password)?;
    store.set_password_hash(profile.id, &hash)?;

    tracing::info!(profile_id = %profile.id, "password reset");
    Ok(())
}
