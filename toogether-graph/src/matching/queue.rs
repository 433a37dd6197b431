//! Candidate queue construction.
//!
//! The viewer's exclusion sets are loaded once when the queue is built;
//! candidates are filtered as the iterator is pulled. Rebuilding the queue
//! re-reads everything, so each materialization reflects current state.

use std::collections::{HashMap, HashSet};
use std::vec;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use toogether_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Gender, GeoPoint, Group, GroupCard, Profile, ProfileCard, ShowMe, SwipeTarget, SwipeUnit};
use crate::store::GraphStore;

#[derive(Debug, Clone, Copy)]
pub struct QueueOptions {
    /// Candidates farther than this from the viewer are dropped. Only applies
    /// when both sides have a location.
    pub max_distance_km: Option<f64>,
    /// Reference date for ages on the cards.
    pub today: NaiveDate,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            max_distance_km: None,
            today: Utc::now().date_naive(),
        }
    }
}

impl QueueOptions {
    pub fn within_km(max_distance_km: Option<f64>) -> Self {
        Self { max_distance_km, ..Self::default() }
    }
}

/// Everything the filters need to know about the viewer.
struct Viewer {
    id: Uuid,
    gender: Gender,
    show_me: ShowMe,
    location: Option<GeoPoint>,
    blocked: HashSet<Uuid>,
    liked: HashSet<Uuid>,
    matched: HashSet<Uuid>,
    passed: HashSet<SwipeTarget>,
}

impl Viewer {
    fn is_blocked_with(&self, profile_id: Uuid) -> bool {
        self.blocked.contains(&profile_id)
    }

    fn already_engaged(&self, counterpart: Uuid, target: SwipeTarget) -> bool {
        self.liked.contains(&counterpart)
            || self.matched.contains(&counterpart)
            || self.passed.contains(&target)
    }

    fn within_radius(&self, other: Option<&GeoPoint>, max_km: Option<f64>) -> bool {
        match (self.location.as_ref(), other, max_km) {
            (Some(here), Some(there), Some(max)) => here.distance_km(there) <= max,
            _ => true,
        }
    }
}

/// One-shot, finite sequence of swipe units for a viewer.
pub struct CandidateQueue {
    viewer: Viewer,
    options: QueueOptions,
    profiles: vec::IntoIter<Profile>,
    groups: vec::IntoIter<Group>,
    members: HashMap<Uuid, Profile>,
    in_group: HashSet<Uuid>,
    seen: HashSet<SwipeTarget>,
}

/// Builds the candidate queue for `viewer_id`.
///
/// Fails with `ProfileNotFound` for an unknown viewer and
/// `OnboardingIncomplete` when the viewer has not set gender and show-me.
pub fn build_queue<S: GraphStore + ?Sized>(
    store: &S,
    viewer_id: Uuid,
    options: QueueOptions,
) -> AppResult<CandidateQueue> {
    let profile = store
        .profile(viewer_id)?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;
    let (gender, show_me) = profile.preferences().ok_or_else(|| {
        AppError::new(ErrorCode::OnboardingIncomplete, "complete your profile before swiping")
    })?;

    let mut blocked: HashSet<Uuid> = store.blocked_by(viewer_id)?.into_iter().collect();
    blocked.extend(store.blockers_of(viewer_id)?);

    let matched = store
        .matches_of(viewer_id)?
        .iter()
        .filter_map(|m| m.counterpart(viewer_id))
        .collect();

    let viewer = Viewer {
        id: viewer_id,
        gender,
        show_me,
        location: profile.location,
        blocked,
        liked: store.liked_by(viewer_id)?.into_iter().collect(),
        matched,
        passed: store.passes(viewer_id)?.into_iter().collect(),
    };

    let groups = store.groups()?;
    let in_group: HashSet<Uuid> = groups.iter().flat_map(|g| g.member_ids.iter().copied()).collect();
    let member_ids: Vec<Uuid> = in_group.iter().copied().collect();
    let members = store
        .profiles_by_ids(&member_ids)?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    tracing::debug!(
        profile_id = %viewer_id,
        blocked = viewer.blocked.len(),
        liked = viewer.liked.len(),
        matched = viewer.matched.len(),
        passed = viewer.passed.len(),
        "candidate queue built"
    );

    Ok(CandidateQueue {
        viewer,
        options,
        profiles: store.candidate_profiles()?.into_iter(),
        groups: groups.into_iter(),
        members,
        in_group,
        seen: HashSet::new(),
    })
}

impl CandidateQueue {
    fn admit_profile(&self, candidate: &Profile) -> bool {
        let viewer = &self.viewer;
        if candidate.id == viewer.id || !candidate.has_account {
            return false;
        }
        if viewer.is_blocked_with(candidate.id) {
            return false;
        }
        if viewer.already_engaged(candidate.id, SwipeTarget::Profile(candidate.id)) {
            return false;
        }
        let Some((gender, show_me)) = candidate.preferences() else {
            return false;
        };
        if !viewer.show_me.accepts(gender) || !show_me.accepts(viewer.gender) {
            return false;
        }
        viewer.within_radius(candidate.location.as_ref(), self.options.max_distance_km)
    }

    fn admit_group(&self, group: &Group) -> bool {
        let viewer = &self.viewer;
        if group.has_member(viewer.id) {
            return false;
        }
        if group.member_ids.iter().any(|m| viewer.is_blocked_with(*m)) {
            return false;
        }
        if viewer.already_engaged(group.owner_id, SwipeTarget::Group(group.id)) {
            return false;
        }
        if !viewer.show_me.accepts(group.gender) {
            return false;
        }
        let owner_location = self.members.get(&group.owner_id).and_then(|o| o.location.as_ref());
        viewer.within_radius(owner_location, self.options.max_distance_km)
    }

    fn profile_card(&self, profile: &Profile) -> ProfileCard {
        ProfileCard::new(
            profile,
            self.options.today,
            self.in_group.contains(&profile.id),
            self.viewer.location.as_ref(),
        )
    }

    fn group_card(&self, group: &Group) -> Option<GroupCard> {
        let owner = self.members.get(&group.owner_id)?;
        let members = group
            .member_ids
            .iter()
            .filter_map(|id| self.members.get(id))
            .map(|p| self.profile_card(p))
            .collect();
        Some(GroupCard {
            id: group.id,
            gender: group.gender,
            total_members: group.member_ids.len(),
            created_at: group.created_at,
            owner: self.profile_card(owner),
            members,
        })
    }
}

impl Iterator for CandidateQueue {
    type Item = SwipeUnit;

    fn next(&mut self) -> Option<SwipeUnit> {
        while let Some(candidate) = self.profiles.next() {
            let target = SwipeTarget::Profile(candidate.id);
            if self.seen.contains(&target) || !self.admit_profile(&candidate) {
                continue;
            }
            self.seen.insert(target);
            return Some(SwipeUnit::Profile(self.profile_card(&candidate)));
        }

        while let Some(group) = self.groups.next() {
            let target = SwipeTarget::Group(group.id);
            if self.seen.contains(&target) || !self.admit_group(&group) {
                continue;
            }
            let Some(card) = self.group_card(&group) else {
                continue;
            };
            self.seen.insert(target);
            return Some(SwipeUnit::Group(card));
        }

        None
    }
}
