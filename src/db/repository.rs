//! SQLite implementation of the crew, membership and account ports.
//!
//! Crew reads load members alongside the row; nearby candidates come from a
//! plain range query on latitude and longitude.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use crate::crew::{CrewStore, Directory, MembershipStore};
use crate::errors::AppError;
use crate::geo::BoundingBox;
use crate::models::{
    Crew, CrewDetail, CrewMember, CrewRole, CrewSearchCondition, CrewSummary, MemberView, NewUser,
    Page, PageRequest, Region, SkillLevel, TimeWindow, User,
};
use crate::users::UserStore;

const CREW_COLUMNS: &str = "id, title, description, host_id, region_id, meeting_time, place, latitude, longitude, max_participants, level, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, email, password_hash, nickname, region_id, preferred_level, created_at, updated_at";

const SUMMARY_SELECT: &str = r#"
    SELECT c.id, c.title, c.region_id, r.city AS region_city, r.district AS region_district,
           c.meeting_time, c.place, c.latitude, c.longitude, c.max_participants, c.level,
           (SELECT COUNT(*) FROM crew_members m WHERE m.crew_id = c.id) AS current_participants
    FROM crews c
    JOIN regions r ON r.id = c.region_id
    WHERE 1 = 1"#;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== REGION OPERATIONS ====================

    /// List all regions.
    pub async fn list_regions(&self) -> Result<Vec<Region>, AppError> {
        let rows = sqlx::query("SELECT id, city, district FROM regions ORDER BY city, district")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(region_from_row).collect())
    }

    // ==================== CREW MEMBER OPERATIONS ====================

    async fn list_members(&self, crew_id: &str) -> Result<Vec<CrewMember>, AppError> {
        let rows = sqlx::query(
            "SELECT id, crew_id, user_id, role, joined_at FROM crew_members WHERE crew_id = ? ORDER BY joined_at, id",
        )
        .bind(crew_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(member_from_row).collect()
    }

    async fn list_member_views(&self, crew_id: &str) -> Result<Vec<MemberView>, AppError> {
        let rows = sqlx::query(
            r#"
            SELECT m.user_id, u.nickname, m.role, m.joined_at
            FROM crew_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.crew_id = ?
            ORDER BY CASE m.role WHEN 'HOST' THEN 0 ELSE 1 END, m.joined_at, m.id
            "#,
        )
        .bind(crew_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(MemberView {
                    user_id: row.get("user_id"),
                    nickname: row.get("nickname"),
                    role: role_from_row(row)?,
                    joined_at: row.get("joined_at"),
                })
            })
            .collect()
    }
}

// ==================== PORT IMPLEMENTATIONS ====================

#[async_trait]
impl Directory for Repository {
    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_region(&self, id: &str) -> Result<Option<Region>, AppError> {
        let row = sqlx::query("SELECT id, city, district FROM regions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(region_from_row))
    }
}

#[async_trait]
impl UserStore for Repository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&self, user: &NewUser) -> Result<String, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, nickname, region_id, preferred_level, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.nickname)
        .bind(&user.region_id)
        .bind(user.preferred_level.map(|l| l.as_str()))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update_profile(
        &self,
        user_id: &str,
        nickname: &str,
        region_id: Option<&str>,
        preferred_level: Option<SkillLevel>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET nickname = ?, region_id = ?, preferred_level = ?, updated_at = ? WHERE id = ?",
        )
        .bind(nickname)
        .bind(region_id)
        .bind(preferred_level.map(|l| l.as_str()))
        .bind(Utc::now().to_rfc3339())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::user_not_found(user_id));
        }
        Ok(())
    }

    async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(Utc::now().to_rfc3339())
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::user_not_found(user_id));
        }
        Ok(())
    }
}

#[async_trait]
impl CrewStore for Repository {
    async fn insert_crew(&self, crew: &Crew) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            "INSERT INTO crews ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            CREW_COLUMNS
        ))
        .bind(&crew.id)
        .bind(&crew.title)
        .bind(&crew.description)
        .bind(&crew.host_id)
        .bind(&crew.region_id)
        .bind(crew.meeting_time)
        .bind(&crew.place)
        .bind(crew.latitude)
        .bind(crew.longitude)
        .bind(crew.max_participants)
        .bind(crew.level.as_str())
        .bind(&crew.created_at)
        .bind(&crew.updated_at)
        .execute(&mut *tx)
        .await?;

        for member in &crew.members {
            sqlx::query(
                "INSERT INTO crew_members (id, crew_id, user_id, role, joined_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&member.id)
            .bind(&member.crew_id)
            .bind(&member.user_id)
            .bind(member.role.as_str())
            .bind(&member.joined_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_crew(&self, id: &str) -> Result<Option<Crew>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM crews WHERE id = ?", CREW_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let members = self.list_members(id).await?;
        Ok(Some(crew_from_row(&row, members)?))
    }

    async fn find_crew_detail(&self, id: &str) -> Result<Option<CrewDetail>, AppError> {
        let row = sqlx::query(
            r#"
            SELECT c.id, c.title, c.description, c.host_id, u.nickname AS host_nickname,
                   r.id AS region_id, r.city, r.district,
                   c.meeting_time, c.place, c.latitude, c.longitude, c.max_participants,
                   c.level, c.created_at, c.updated_at
            FROM crews c
            JOIN regions r ON r.id = c.region_id
            JOIN users u ON u.id = c.host_id
            WHERE c.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let members = self.list_member_views(id).await?;
        Ok(Some(CrewDetail {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            host_id: row.get("host_id"),
            host_nickname: row.get("host_nickname"),
            region: Region {
                id: row.get("region_id"),
                city: row.get("city"),
                district: row.get("district"),
            },
            meeting_time: row.get("meeting_time"),
            place: row.get("place"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            max_participants: row.get("max_participants"),
            current_participants: members.len() as i64,
            level: level_from_row(&row, "level")?,
            members,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    async fn update_crew(&self, crew: &Crew) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // The headcount guard is part of the write so a concurrent join cannot
        // slip in between the service's check and this update.
        let result = sqlx::query(
            "UPDATE crews SET title = ?, description = ?, region_id = ?, meeting_time = ?, place = ?, latitude = ?, longitude = ?, max_participants = ?, level = ?, updated_at = ? WHERE id = ? AND (SELECT COUNT(*) FROM crew_members WHERE crew_id = ?) <= ?",
        )
        .bind(&crew.title)
        .bind(&crew.description)
        .bind(&crew.region_id)
        .bind(crew.meeting_time)
        .bind(&crew.place)
        .bind(crew.latitude)
        .bind(crew.longitude)
        .bind(crew.max_participants)
        .bind(crew.level.as_str())
        .bind(&crew.updated_at)
        .bind(&crew.id)
        .bind(&crew.id)
        .bind(crew.max_participants)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let headcount: Option<i64> = sqlx::query_scalar(
                "SELECT (SELECT COUNT(*) FROM crew_members WHERE crew_id = crews.id) FROM crews WHERE id = ?",
            )
            .bind(&crew.id)
            .fetch_optional(&mut *tx)
            .await?;

            return Err(match headcount {
                Some(headcount) => AppError::capacity_below_headcount(headcount),
                None => AppError::crew_not_found(&crew.id),
            });
        }

        tx.commit().await?;
        Ok(())
    }

    async fn delete_crew(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM crew_members WHERE crew_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM crews WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::crew_not_found(id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(
        &self,
        condition: &CrewSearchCondition,
        page: PageRequest,
    ) -> Result<Page<CrewSummary>, AppError> {
        let mut count_query = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) AS total FROM crews c JOIN regions r ON r.id = c.region_id WHERE 1 = 1",
        );
        push_search_filters(&mut count_query, condition);
        let total: i64 = count_query
            .build()
            .fetch_one(&self.pool)
            .await?
            .get("total");

        let mut query = QueryBuilder::<Sqlite>::new(SUMMARY_SELECT);
        push_search_filters(&mut query, condition);
        query
            .push(" ORDER BY c.meeting_time, c.id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = query.build().fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(summary_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, page, total))
    }

    async fn search_within_bounding_box(
        &self,
        bbox: &BoundingBox,
        level: Option<SkillLevel>,
        window: &TimeWindow,
    ) -> Result<Vec<CrewSummary>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(SUMMARY_SELECT);
        query
            .push(" AND c.latitude BETWEEN ")
            .push_bind(bbox.min_lat)
            .push(" AND ")
            .push_bind(bbox.max_lat);
        if !bbox.spans_all_longitudes() {
            query
                .push(" AND c.longitude BETWEEN ")
                .push_bind(bbox.min_lng)
                .push(" AND ")
                .push_bind(bbox.max_lng);
        }
        if let Some(level) = level {
            query.push(" AND c.level = ").push_bind(level.as_str());
        }
        push_window(&mut query, window);
        query.push(" ORDER BY c.meeting_time, c.id");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(summary_from_row).collect()
    }
}

#[async_trait]
impl MembershipStore for Repository {
    async fn find_member(
        &self,
        crew_id: &str,
        user_id: &str,
    ) -> Result<Option<CrewMember>, AppError> {
        let row = sqlx::query(
            "SELECT id, crew_id, user_id, role, joined_at FROM crew_members WHERE crew_id = ? AND user_id = ?",
        )
        .bind(crew_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(member_from_row).transpose()
    }

    async fn count_members(&self, crew_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM crew_members WHERE crew_id = ?")
            .bind(crew_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_member(&self, member: &CrewMember) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO crew_members (id, crew_id, user_id, role, joined_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&member.id)
        .bind(&member.crew_id)
        .bind(&member.user_id)
        .bind(member.role.as_str())
        .bind(&member.joined_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_member(&self, member: &CrewMember) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM crew_members WHERE id = ?")
            .bind(&member.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_a_member(&member.crew_id));
        }
        Ok(())
    }
}

// ==================== QUERY HELPERS ====================

fn push_search_filters(query: &mut QueryBuilder<'_, Sqlite>, condition: &CrewSearchCondition) {
    if let Some(region_id) = &condition.region_id {
        query.push(" AND c.region_id = ").push_bind(region_id.clone());
    }
    if let Some(level) = condition.level {
        query.push(" AND c.level = ").push_bind(level.as_str());
    }
    push_window(query, &condition.window);
}

fn push_window(query: &mut QueryBuilder<'_, Sqlite>, window: &TimeWindow) {
    if let Some(start) = window.start {
        query.push(" AND c.meeting_time >= ").push_bind(start);
    }
    if let Some(end) = window.end {
        query.push(" AND c.meeting_time < ").push_bind(end);
    }
}

// ==================== ROW MAPPING HELPERS ====================

fn region_from_row(row: &SqliteRow) -> Region {
    Region {
        id: row.get("id"),
        city: row.get("city"),
        district: row.get("district"),
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, AppError> {
    let preferred_level: Option<String> = row.get("preferred_level");
    let preferred_level = match preferred_level {
        Some(value) => Some(parse_level(&value)?),
        None => None,
    };

    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        nickname: row.get("nickname"),
        region_id: row.get("region_id"),
        preferred_level,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn crew_from_row(row: &SqliteRow, members: Vec<CrewMember>) -> Result<Crew, AppError> {
    Ok(Crew {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        host_id: row.get("host_id"),
        region_id: row.get("region_id"),
        meeting_time: row.get("meeting_time"),
        place: row.get("place"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        max_participants: row.get("max_participants"),
        level: level_from_row(row, "level")?,
        members,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<CrewSummary, AppError> {
    Ok(CrewSummary {
        id: row.get("id"),
        title: row.get("title"),
        region_id: row.get("region_id"),
        region_city: row.get("region_city"),
        region_district: row.get("region_district"),
        meeting_time: row.get("meeting_time"),
        place: row.get("place"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        max_participants: row.get("max_participants"),
        current_participants: row.get("current_participants"),
        level: level_from_row(row, "level")?,
    })
}

fn member_from_row(row: &SqliteRow) -> Result<CrewMember, AppError> {
    Ok(CrewMember {
        id: row.get("id"),
        crew_id: row.get("crew_id"),
        user_id: row.get("user_id"),
        role: role_from_row(row)?,
        joined_at: row.get("joined_at"),
    })
}

fn level_from_row(row: &SqliteRow, column: &str) -> Result<SkillLevel, AppError> {
    let value: String = row.get(column);
    parse_level(&value)
}

fn parse_level(value: &str) -> Result<SkillLevel, AppError> {
    SkillLevel::parse(value)
        .ok_or_else(|| AppError::Internal(format!("unknown skill level {:?} in database", value)))
}

fn role_from_row(row: &SqliteRow) -> Result<CrewRole, AppError> {
    let value: String = row.get("role");
    CrewRole::parse(&value)
        .ok_or_else(|| AppError::Internal(format!("unknown crew role {:?} in database", value)))
}
