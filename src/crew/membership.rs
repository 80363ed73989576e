//! Membership transitions for a (crew, user) pair.

use chrono::Utc;

use crate::errors::AppError;
use crate::models::{Crew, CrewMember, CrewRole, CrewSpec};

/// Where a user stands with respect to one crew.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipState {
    NotMember,
    Member,
    Host,
}

impl MembershipState {
    pub fn of(member: Option<&CrewMember>) -> Self {
        match member.map(|m| m.role) {
            None => MembershipState::NotMember,
            Some(CrewRole::Member) => MembershipState::Member,
            Some(CrewRole::Host) => MembershipState::Host,
        }
    }

    /// NOT_MEMBER -> MEMBER, provided the crew still has room.
    pub fn join(self, current_members: i64, max_participants: i64) -> Result<CrewRole, AppError> {
        match self {
            MembershipState::Member | MembershipState::Host => Err(AppError::AlreadyJoined),
            MembershipState::NotMember if current_members >= max_participants => {
                Err(AppError::CapacityExceeded)
            }
            MembershipState::NotMember => Ok(CrewRole::Member),
        }
    }

    /// MEMBER -> NOT_MEMBER. The host can only leave by deleting the crew.
    pub fn leave(self, crew_id: &str) -> Result<(), AppError> {
        match self {
            MembershipState::Member => Ok(()),
            MembershipState::NotMember => Err(AppError::not_a_member(crew_id)),
            MembershipState::Host => Err(AppError::AccessDenied(
                "The host cannot leave their own crew".to_string(),
            )),
        }
    }
}

impl CrewMember {
    pub fn new(crew_id: &str, user_id: &str, role: CrewRole) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            crew_id: crew_id.to_string(),
            user_id: user_id.to_string(),
            role,
            joined_at: Utc::now().to_rfc3339(),
        }
    }
}

impl Crew {
    /// A new crew with `host_id` enrolled as its only member.
    pub fn hosted_by(host_id: &str, spec: CrewSpec) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let host = CrewMember::new(&id, host_id, CrewRole::Host);

        Self {
            id,
            title: spec.title,
            description: spec.description,
            host_id: host_id.to_string(),
            region_id: spec.region_id,
            meeting_time: spec.meeting_time,
            place: spec.place,
            latitude: spec.latitude,
            longitude: spec.longitude,
            max_participants: spec.max_participants,
            level: spec.level,
            members: vec![host],
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn is_hosted_by(&self, user_id: &str) -> bool {
        self.host_id == user_id
    }

    pub fn ensure_host(&self, user_id: &str) -> Result<(), AppError> {
        if self.is_hosted_by(user_id) {
            Ok(())
        } else {
            Err(AppError::AccessDenied(
                "Only the host can change this crew".to_string(),
            ))
        }
    }

    /// Overwrite the mutable fields. Capacity may not drop below the current headcount.
    pub fn apply(&mut self, spec: CrewSpec) -> Result<(), AppError> {
        let headcount = self.members.len() as i64;
        if spec.max_participants < headcount {
            return Err(AppError::capacity_below_headcount(headcount));
        }

        self.title = spec.title;
        self.description = spec.description;
        self.region_id = spec.region_id;
        self.meeting_time = spec.meeting_time;
        self.place = spec.place;
        self.latitude = spec.latitude;
        self.longitude = spec.longitude;
        self.max_participants = spec.max_participants;
        self.level = spec.level;
        self.updated_at = Utc::now().to_rfc3339();
        Ok(())
    }
}
