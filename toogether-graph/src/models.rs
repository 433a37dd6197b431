use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use toogether_shared::errors::{AppError, AppResult, ErrorCode};

// --- Gender / ShowMe ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// (variant, stored code, display label)
const GENDER_TABLE: [(Gender, &str, &str); 3] = [
    (Gender::Male, "M", "Male"),
    (Gender::Female, "F", "Female"),
    (Gender::Other, "O", "Other"),
];

impl Gender {
    pub fn code(self) -> &'static str {
        GENDER_TABLE.iter().find(|(g, _, _)| *g == self).map_or("O", |(_, c, _)| *c)
    }

    pub fn label(self) -> &'static str {
        GENDER_TABLE.iter().find(|(g, _, _)| *g == self).map_or("Other", |(_, _, l)| *l)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Gender {
    type Err = String;

    /// Accepts either the stored code (`"M"`) or the label (`"male"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        GENDER_TABLE
            .iter()
            .find(|(_, code, label)| code.eq_ignore_ascii_case(s) || label.eq_ignore_ascii_case(s))
            .map(|(g, _, _)| *g)
            .ok_or_else(|| format!("unknown gender: {s}"))
    }
}

impl TryFrom<String> for Gender {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Gender> for String {
    fn from(value: Gender) -> Self {
        value.label().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ShowMe {
    Men,
    Women,
    Everyone,
}

const SHOW_ME_TABLE: [(ShowMe, &str, &str); 3] = [
    (ShowMe::Men, "M", "Men"),
    (ShowMe::Women, "W", "Women"),
    (ShowMe::Everyone, "E", "Everyone"),
];

impl ShowMe {
    pub fn code(self) -> &'static str {
        SHOW_ME_TABLE.iter().find(|(s, _, _)| *s == self).map_or("E", |(_, c, _)| *c)
    }

    pub fn label(self) -> &'static str {
        SHOW_ME_TABLE.iter().find(|(s, _, _)| *s == self).map_or("Everyone", |(_, _, l)| *l)
    }

    /// Whether someone with this preference wants to see `gender`.
    pub fn accepts(self, gender: Gender) -> bool {
        match self {
            ShowMe::Everyone => true,
            ShowMe::Men => gender == Gender::Male,
            ShowMe::Women => gender == Gender::Female,
        }
    }
}

impl fmt::Display for ShowMe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ShowMe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        SHOW_ME_TABLE
            .iter()
            .find(|(_, code, label)| code.eq_ignore_ascii_case(s) || label.eq_ignore_ascii_case(s))
            .map(|(v, _, _)| *v)
            .ok_or_else(|| format!("unknown show_me preference: {s}"))
    }
}

impl TryFrom<String> for ShowMe {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ShowMe> for String {
    fn from(value: ShowMe) -> Self {
        value.label().to_string()
    }
}

// --- Location ---

/// A WGS84 point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> AppResult<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(AppError::with_details(
                ErrorCode::InvalidInput,
                "coordinates out of range",
                serde_json::json!({ "lat": latitude, "lon": longitude }),
            ));
        }
        Ok(Self { latitude, longitude })
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        crate::geo::haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

// --- Profile ---

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub show_me: Option<ShowMe>,
    pub location: Option<GeoPoint>,
    pub has_account: bool,
    pub description: Option<String>,
    pub university: Option<String>,
    pub city: Option<String>,
    pub nationality: Option<String>,
    pub instagram: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        self.birthdate.map(|b| age_between(b, today))
    }

    /// Both swipe preferences, present once onboarding set them.
    pub fn preferences(&self) -> Option<(Gender, ShowMe)> {
        Some((self.gender?, self.show_me?))
    }
}

/// Full years elapsed from `birthdate` to `today`.
pub fn age_between(birthdate: NaiveDate, today: NaiveDate) -> i32 {
    let before_birthday = (today.month(), today.day()) < (birthdate.month(), birthdate.day());
    today.year() - birthdate.year() - i32::from(before_birthday)
}

#[derive(Debug, Clone)]
pub struct NewProfile {
    pub email: String,
    pub password_hash: String,
}

/// Fields required to complete onboarding.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileSetup {
    pub name: String,
    pub birthdate: NaiveDate,
    pub gender: Gender,
    pub show_me: ShowMe,
    pub university: Option<String>,
    pub description: Option<String>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub gender: Option<Gender>,
    pub show_me: Option<ShowMe>,
    pub nationality: Option<String>,
    pub city: Option<String>,
    pub instagram: Option<String>,
    pub university: Option<String>,
    pub description: Option<String>,
}

/// What another profile sees of a candidate in a swipe queue.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileCard {
    pub id: Uuid,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub show_me: Option<ShowMe>,
    pub nationality: Option<String>,
    pub city: Option<String>,
    pub university: Option<String>,
    pub description: Option<String>,
    pub instagram: Option<String>,
    pub is_in_group: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl ProfileCard {
    pub fn new(profile: &Profile, today: NaiveDate, is_in_group: bool, from: Option<&GeoPoint>) -> Self {
        let distance_km = match (from, profile.location.as_ref()) {
            (Some(a), Some(b)) => Some(a.distance_km(b)),
            _ => None,
        };
        Self {
            id: profile.id,
            name: profile.name.clone(),
            age: profile.age_on(today),
            gender: profile.gender,
            show_me: profile.show_me,
            nationality: profile.nationality.clone(),
            city: profile.city.clone(),
            university: profile.university.clone(),
            description: profile.description.clone(),
            instagram: profile.instagram.clone(),
            is_in_group,
            distance_km,
        }
    }
}

// --- Group ---

#[derive(Debug, Clone, Serialize)]
pub struct Group {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub gender: Gender,
    pub member_ids: BTreeSet<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn has_member(&self, profile_id: Uuid) -> bool {
        self.member_ids.contains(&profile_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupCard {
    pub id: Uuid,
    pub gender: Gender,
    pub total_members: usize,
    pub created_at: DateTime<Utc>,
    pub owner: ProfileCard,
    pub members: Vec<ProfileCard>,
}

// --- Match ---

/// An unordered profile pair, stored lower id first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalPair {
    low: Uuid,
    high: Uuid,
}

impl CanonicalPair {
    pub fn new(a: Uuid, b: Uuid) -> AppResult<Self> {
        if a == b {
            return Err(AppError::with_details(
                ErrorCode::InvalidInput,
                "a profile cannot be paired with itself",
                serde_json::json!({ "profile_id": a }),
            ));
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { low, high })
    }

    pub fn low(&self) -> Uuid {
        self.low
    }

    pub fn high(&self) -> Uuid {
        self.high
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Match {
    pub id: Uuid,
    pub profile1_id: Uuid,
    pub profile2_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn involves(&self, profile_id: Uuid) -> bool {
        self.profile1_id == profile_id || self.profile2_id == profile_id
    }

    /// The other side of the match, if `profile_id` is one side.
    pub fn counterpart(&self, profile_id: Uuid) -> Option<Uuid> {
        if self.profile1_id == profile_id {
            Some(self.profile2_id)
        } else if self.profile2_id == profile_id {
            Some(self.profile1_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchDetail {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub profile1: ProfileCard,
    pub profile2: ProfileCard,
}

// --- Swipes ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum SwipeTarget {
    Profile(Uuid),
    Group(Uuid),
}

impl SwipeTarget {
    pub fn id(&self) -> Uuid {
        match self {
            SwipeTarget::Profile(id) | SwipeTarget::Group(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SwipeTarget::Profile(_) => "profile",
            SwipeTarget::Group(_) => "group",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Like,
    Pass,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwipeOutcome {
    pub matched: bool,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub matched_with: Option<Match>,
}

impl SwipeOutcome {
    pub fn none() -> Self {
        Self { matched: false, matched_with: None }
    }

    pub fn from_match(m: Option<Match>) -> Self {
        Self { matched: m.is_some(), matched_with: m }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SwipeUnit {
    Profile(ProfileCard),
    Group(GroupCard),
}

impl SwipeUnit {
    pub fn target(&self) -> SwipeTarget {
        match self {
            SwipeUnit::Profile(card) => SwipeTarget::Profile(card.id),
            SwipeUnit::Group(card) => SwipeTarget::Group(card.id),
        }
    }
}

// --- Verification codes ---

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationCode {
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl VerificationCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
