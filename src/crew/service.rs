//! Crew lifecycle: create, read, search, update, delete, join and leave.

use std::sync::Arc;

use super::{find_nearby, CrewRepository, MembershipState};
use crate::errors::AppError;
use crate::models::{
    Crew, CrewDetail, CrewMember, CrewSearchCondition, CrewSpec, CrewSummary, NearbyCrew,
    NearbyQuery, Page, PageRequest,
};

/// Application service for crews. The acting user is always passed in explicitly.
pub struct CrewService<S> {
    store: Arc<S>,
}

impl<S: CrewRepository> CrewService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create a crew hosted by `host_id` and return its id.
    pub async fn create(&self, host_id: &str, spec: CrewSpec) -> Result<String, AppError> {
        self.require_user(host_id).await?;
        self.require_region(&spec.region_id).await?;

        let crew = Crew::hosted_by(host_id, spec);
        self.store.insert_crew(&crew).await?;

        tracing::info!(crew_id = %crew.id, host_id, "Crew created");
        Ok(crew.id)
    }

    pub async fn detail(&self, crew_id: &str) -> Result<CrewDetail, AppError> {
        self.store
            .find_crew_detail(crew_id)
            .await?
            .ok_or_else(|| AppError::crew_not_found(crew_id))
    }

    pub async fn search(
        &self,
        condition: &CrewSearchCondition,
        page: PageRequest,
    ) -> Result<Page<CrewSummary>, AppError> {
        self.store.search(condition, page).await
    }

    pub async fn nearby(&self, query: &NearbyQuery) -> Result<Vec<NearbyCrew>, AppError> {
        find_nearby(self.store.as_ref(), query).await
    }

    pub async fn update(
        &self,
        crew_id: &str,
        requester_id: &str,
        spec: CrewSpec,
    ) -> Result<(), AppError> {
        let mut crew = self.require_crew(crew_id).await?;
        crew.ensure_host(requester_id)?;
        self.require_region(&spec.region_id).await?;

        crew.apply(spec)?;
        self.store.update_crew(&crew).await?;

        tracing::info!(crew_id, "Crew updated");
        Ok(())
    }

    pub async fn delete(&self, crew_id: &str, requester_id: &str) -> Result<(), AppError> {
        let crew = self.require_crew(crew_id).await?;
        crew.ensure_host(requester_id)?;

        self.store.delete_crew(crew_id).await?;

        tracing::info!(crew_id, members = crew.members.len(), "Crew deleted");
        Ok(())
    }

    pub async fn join(&self, crew_id: &str, user_id: &str) -> Result<(), AppError> {
        let crew = self.require_crew(crew_id).await?;
        self.require_user(user_id).await?;

        let existing = self.store.find_member(crew_id, user_id).await?;
        let current = self.store.count_members(crew_id).await?;
        let role = MembershipState::of(existing.as_ref()).join(current, crew.max_participants)?;

        // The pre-check can race with a concurrent join; the unique key settles it.
        match self
            .store
            .insert_member(&CrewMember::new(crew_id, user_id, role))
            .await
        {
            Ok(()) => {
                tracing::info!(crew_id, user_id, "Member joined crew");
                Ok(())
            }
            Err(AppError::UniqueViolation(_)) => Err(AppError::AlreadyJoined),
            Err(e) => Err(e),
        }
    }

    pub async fn leave(&self, crew_id: &str, user_id: &str) -> Result<(), AppError> {
        self.require_crew(crew_id).await?;
        self.require_user(user_id).await?;

        let member = self.store.find_member(crew_id, user_id).await?;
        MembershipState::of(member.as_ref()).leave(crew_id)?;

        if let Some(member) = member {
            self.store.delete_member(&member).await?;
        }

        tracing::info!(crew_id, user_id, "Member left crew");
        Ok(())
    }

    async fn require_crew(&self, crew_id: &str) -> Result<Crew, AppError> {
        self.store
            .find_crew(crew_id)
            .await?
            .ok_or_else(|| AppError::crew_not_found(crew_id))
    }

    async fn require_user(&self, user_id: &str) -> Result<(), AppError> {
        match self.store.find_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::user_not_found(user_id)),
        }
    }

    async fn require_region(&self, region_id: &str) -> Result<(), AppError> {
        match self.store.find_region(region_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::region_not_found(region_id)),
        }
    }
}
