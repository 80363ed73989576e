//! Storage ports used by the crew services.
//!
//! `db::Repository` implements all of them; tests wrap it to inject failures.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::geo::BoundingBox;
use crate::models::{
    Crew, CrewDetail, CrewMember, CrewSearchCondition, CrewSummary, Page, PageRequest, Region,
    SkillLevel, TimeWindow, User,
};

/// Lookup of users and regions referenced by crews.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError>;

    async fn find_region(&self, id: &str) -> Result<Option<Region>, AppError>;
}

/// Persistence of the crew aggregate and its read models.
#[async_trait]
pub trait CrewStore: Send + Sync {
    /// Persist a new crew together with its members in one transaction.
    async fn insert_crew(&self, crew: &Crew) -> Result<(), AppError>;

    async fn find_crew(&self, id: &str) -> Result<Option<Crew>, AppError>;

    async fn find_crew_detail(&self, id: &str) -> Result<Option<CrewDetail>, AppError>;

    /// Overwrite the mutable fields of an existing crew. Rejected with
    /// `InvalidInput` when the crew has more members than `max_participants`.
    async fn update_crew(&self, crew: &Crew) -> Result<(), AppError>;

    /// Delete a crew and all of its members.
    async fn delete_crew(&self, id: &str) -> Result<(), AppError>;

    async fn search(
        &self,
        condition: &CrewSearchCondition,
        page: PageRequest,
    ) -> Result<Page<CrewSummary>, AppError>;

    /// Candidates inside `bbox`, ordered by meeting time then id.
    async fn search_within_bounding_box(
        &self,
        bbox: &BoundingBox,
        level: Option<SkillLevel>,
        window: &TimeWindow,
    ) -> Result<Vec<CrewSummary>, AppError>;
}

/// Persistence of individual memberships.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn find_member(
        &self,
        crew_id: &str,
        user_id: &str,
    ) -> Result<Option<CrewMember>, AppError>;

    async fn count_members(&self, crew_id: &str) -> Result<i64, AppError>;

    /// Fails with `AppError::UniqueViolation` if the user is already a member.
    async fn insert_member(&self, member: &CrewMember) -> Result<(), AppError>;

    async fn delete_member(&self, member: &CrewMember) -> Result<(), AppError>;
}

/// Everything the crew lifecycle service needs from storage.
pub trait CrewRepository: Directory + CrewStore + MembershipStore {}

impl<T: Directory + CrewStore + MembershipStore> CrewRepository for T {}
