//! Crew aggregate, search conditions and the crew-facing request/response shapes.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::user::into_result;
use super::{Region, SkillLevel};
use crate::errors::{AppError, FieldError};

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_PLACE_LEN: usize = 255;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Role a member holds inside a crew.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrewRole {
    Host,
    Member,
}

impl CrewRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrewRole::Host => "HOST",
            CrewRole::Member => "MEMBER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "HOST" => Some(CrewRole::Host),
            "MEMBER" => Some(CrewRole::Member),
            _ => None,
        }
    }
}

/// A user's participation in a crew. Refers back to its crew by id only.
#[derive(Debug, Clone, PartialEq)]
pub struct CrewMember {
    pub id: String,
    pub crew_id: String,
    pub user_id: String,
    pub role: CrewRole,
    pub joined_at: String,
}

/// A scheduled group run together with its members.
#[derive(Debug, Clone, PartialEq)]
pub struct Crew {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub host_id: String,
    pub region_id: String,
    pub meeting_time: NaiveDateTime,
    pub place: String,
    pub latitude: f64,
    pub longitude: f64,
    pub max_participants: i64,
    pub level: SkillLevel,
    pub members: Vec<CrewMember>,
    pub created_at: String,
    pub updated_at: String,
}

/// The mutable fields of a crew, as sent on create and update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewSpec {
    pub title: String,
    pub description: Option<String>,
    pub region_id: String,
    pub meeting_time: NaiveDateTime,
    pub place: String,
    pub latitude: f64,
    pub longitude: f64,
    pub max_participants: i64,
    pub level: SkillLevel,
}

impl CrewSpec {
    pub fn validate(&self) -> Result<(), AppError> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(FieldError::new("title", "must not be blank"));
        } else if self.title.chars().count() > MAX_TITLE_LEN {
            errors.push(FieldError::new(
                "title",
                format!("must be at most {} characters", MAX_TITLE_LEN),
            ));
        }
        if self.region_id.trim().is_empty() {
            errors.push(FieldError::new("regionId", "must not be blank"));
        }
        if self.place.trim().is_empty() {
            errors.push(FieldError::new("place", "must not be blank"));
        } else if self.place.chars().count() > MAX_PLACE_LEN {
            errors.push(FieldError::new(
                "place",
                format!("must be at most {} characters", MAX_PLACE_LEN),
            ));
        }
        if !valid_latitude(self.latitude) {
            errors.push(FieldError::new("latitude", "must be between -90 and 90"));
        }
        if !valid_longitude(self.longitude) {
            errors.push(FieldError::new("longitude", "must be between -180 and 180"));
        }
        if self.max_participants < 1 {
            errors.push(FieldError::new("maxParticipants", "must be at least 1"));
        }

        into_result(errors)
    }
}

pub fn valid_latitude(lat: f64) -> bool {
    lat.is_finite() && (-90.0..=90.0).contains(&lat)
}

pub fn valid_longitude(lng: f64) -> bool {
    lng.is_finite() && (-180.0..=180.0).contains(&lng)
}

/// Response body returned after creating a crew.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewCreated {
    pub crew_id: String,
}

/// List row for search results.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CrewSummary {
    pub id: String,
    pub title: String,
    pub region_id: String,
    pub region_city: String,
    pub region_district: String,
    pub meeting_time: NaiveDateTime,
    pub place: String,
    pub latitude: f64,
    pub longitude: f64,
    pub max_participants: i64,
    pub current_participants: i64,
    pub level: SkillLevel,
}

/// One member as shown on the crew detail page.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub user_id: String,
    pub nickname: String,
    pub role: CrewRole,
    pub joined_at: String,
}

/// Full crew view including host, region and members.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewDetail {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub host_id: String,
    pub host_nickname: String,
    pub region: Region,
    pub meeting_time: NaiveDateTime,
    pub place: String,
    pub latitude: f64,
    pub longitude: f64,
    pub max_participants: i64,
    pub current_participants: i64,
    pub level: SkillLevel,
    pub members: Vec<MemberView>,
    pub created_at: String,
    pub updated_at: String,
}

/// Half-open meeting time interval `[start, end)`. Missing bounds are open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

/// Relative meeting date filter used by the crew list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeetingDateFilter {
    Today,
    ThisWeek,
    Upcoming,
    #[default]
    All,
}

impl MeetingDateFilter {
    /// Resolve the filter against `now`. The week ends at the next Monday 00:00.
    pub fn resolve(self, now: NaiveDateTime) -> TimeWindow {
        let today = now.date().and_time(NaiveTime::MIN);
        match self {
            MeetingDateFilter::Today => TimeWindow {
                start: Some(today),
                end: Some(today + Duration::days(1)),
            },
            MeetingDateFilter::ThisWeek => {
                let days_to_monday = 7 - i64::from(now.weekday().num_days_from_monday());
                TimeWindow {
                    start: Some(today),
                    end: Some(today + Duration::days(days_to_monday)),
                }
            }
            MeetingDateFilter::Upcoming => TimeWindow {
                start: Some(now),
                end: None,
            },
            MeetingDateFilter::All => TimeWindow::default(),
        }
    }
}

/// Filters for the crew list. Every present filter must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrewSearchCondition {
    pub region_id: Option<String>,
    pub level: Option<SkillLevel>,
    pub window: TimeWindow,
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<u32>, size: Option<u32>) -> Result<Self, AppError> {
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(AppError::invalid_fields(vec![FieldError::new(
                "size",
                format!("must be between 1 and {}", MAX_PAGE_SIZE),
            )]));
        }
        Ok(Self {
            page: page.unwrap_or(0),
            size,
        })
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

/// One page of results plus totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: i64,
    pub total_pages: i64,
    pub has_next: bool,
}

impl<T: Serialize> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total_elements: i64) -> Self {
        let size = i64::from(request.size);
        let total_pages = (total_elements + size - 1) / size;
        Self {
            items,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
            has_next: i64::from(request.page) + 1 < total_pages,
        }
    }
}

/// Query string of `GET /crews`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewSearchQuery {
    pub region_id: Option<String>,
    pub level: Option<SkillLevel>,
    pub date_filter: Option<MeetingDateFilter>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl CrewSearchQuery {
    pub fn into_condition(
        self,
        now: NaiveDateTime,
    ) -> Result<(CrewSearchCondition, PageRequest), AppError> {
        let page = PageRequest::new(self.page, self.size)?;
        let condition = CrewSearchCondition {
            region_id: self.region_id.filter(|id| !id.trim().is_empty()),
            level: self.level,
            window: self.date_filter.unwrap_or_default().resolve(now),
        };
        Ok((condition, page))
    }
}

/// Query string of `GET /crews/nearby`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyParams {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub level: Option<SkillLevel>,
    pub start_date_time: Option<NaiveDateTime>,
    pub end_date_time: Option<NaiveDateTime>,
}

impl NearbyParams {
    pub fn validate(self, max_radius_km: f64) -> Result<NearbyQuery, AppError> {
        let mut errors = Vec::new();
        if !valid_latitude(self.latitude) {
            errors.push(FieldError::new("latitude", "must be between -90 and 90"));
        }
        if !valid_longitude(self.longitude) {
            errors.push(FieldError::new("longitude", "must be between -180 and 180"));
        }
        if !(self.radius_km.is_finite() && self.radius_km > 0.0) {
            errors.push(FieldError::new("radiusKm", "must be greater than 0"));
        } else if self.radius_km > max_radius_km {
            errors.push(FieldError::new(
                "radiusKm",
                format!("must be at most {}", max_radius_km),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_date_time, self.end_date_time) {
            if start >= end {
                errors.push(FieldError::new(
                    "endDateTime",
                    "must be after startDateTime",
                ));
            }
        }
        into_result(errors)?;

        Ok(NearbyQuery {
            latitude: self.latitude,
            longitude: self.longitude,
            radius_km: self.radius_km,
            level: self.level,
            window: TimeWindow {
                start: self.start_date_time,
                end: self.end_date_time,
            },
        })
    }
}

/// Validated proximity query.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
    pub level: Option<SkillLevel>,
    pub window: TimeWindow,
}

/// A crew found by proximity search with its distance from the query point.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NearbyCrew {
    pub crew_id: String,
    pub title: String,
    pub region_id: String,
    pub region_city: String,
    pub region_district: String,
    pub meeting_time: NaiveDateTime,
    pub place: String,
    pub latitude: f64,
    pub longitude: f64,
    pub max_participants: i64,
    pub current_participants: i64,
    pub level: SkillLevel,
    pub distance_km: f64,
}

impl NearbyCrew {
    pub fn from_summary(summary: CrewSummary, distance_km: f64) -> Self {
        Self {
            crew_id: summary.id,
            title: summary.title,
            region_id: summary.region_id,
            region_city: summary.region_city,
            region_district: summary.region_district,
            meeting_time: summary.meeting_time,
            place: summary.place,
            latitude: summary.latitude,
            longitude: summary.longitude,
            max_participants: summary.max_participants,
            current_participants: summary.current_participants,
            level: summary.level,
            distance_km,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn spec() -> CrewSpec {
        CrewSpec {
            title: "Morning 5k".to_string(),
            description: None,
            region_id: "region-1".to_string(),
            meeting_time: at(2030, 5, 1, 7, 0),
            place: "City Hall".to_string(),
            latitude: 37.5665,
            longitude: 126.9780,
            max_participants: 10,
            level: SkillLevel::Beginner,
        }
    }

    #[test]
    fn test_today_window() {
        // 2030-05-01 is a Wednesday.
        let window = MeetingDateFilter::Today.resolve(at(2030, 5, 1, 15, 30));
        assert_eq!(window.start, Some(at(2030, 5, 1, 0, 0)));
        assert_eq!(window.end, Some(at(2030, 5, 2, 0, 0)));
    }

    #[test]
    fn test_this_week_ends_next_monday() {
        let window = MeetingDateFilter::ThisWeek.resolve(at(2030, 5, 1, 15, 30));
        assert_eq!(window.start, Some(at(2030, 5, 1, 0, 0)));
        assert_eq!(window.end, Some(at(2030, 5, 6, 0, 0)));

        // On a Monday the window runs a full week.
        let window = MeetingDateFilter::ThisWeek.resolve(at(2030, 5, 6, 9, 0));
        assert_eq!(window.end, Some(at(2030, 5, 13, 0, 0)));

        // On a Sunday only the rest of that day is left.
        let window = MeetingDateFilter::ThisWeek.resolve(at(2030, 5, 5, 9, 0));
        assert_eq!(window.end, Some(at(2030, 5, 6, 0, 0)));
    }

    #[test]
    fn test_upcoming_and_all_windows() {
        let now = at(2030, 5, 1, 15, 30);
        let upcoming = MeetingDateFilter::Upcoming.resolve(now);
        assert_eq!(upcoming.start, Some(now));
        assert_eq!(upcoming.end, None);

        let all = MeetingDateFilter::All.resolve(now);
        assert_eq!(all, TimeWindow::default());
    }

    #[test]
    fn test_page_totals() {
        let page = Page::new(vec![1, 2, 3], PageRequest { page: 0, size: 3 }, 7);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);

        let last = Page::new(vec![7], PageRequest { page: 2, size: 3 }, 7);
        assert!(!last.has_next);

        let empty: Page<i32> = Page::new(Vec::new(), PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
    }

    #[test]
    fn test_page_request_bounds() {
        assert_eq!(PageRequest::new(None, None).unwrap(), PageRequest::default());
        assert_eq!(PageRequest::new(Some(2), Some(20)).unwrap().offset(), 40);
        assert!(PageRequest::new(None, Some(0)).is_err());
        assert!(PageRequest::new(None, Some(MAX_PAGE_SIZE + 1)).is_err());
    }

    #[test]
    fn test_crew_spec_validation() {
        assert!(spec().validate().is_ok());

        let mut bad = spec();
        bad.title = "x".repeat(MAX_TITLE_LEN + 1);
        bad.latitude = 91.0;
        bad.longitude = f64::NAN;
        bad.max_participants = 0;
        match bad.validate().unwrap_err() {
            AppError::InvalidInput { errors, .. } => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["title", "latitude", "longitude", "maxParticipants"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_nearby_params_validation() {
        let params = NearbyParams {
            latitude: 37.5665,
            longitude: 126.9780,
            radius_km: 2.0,
            level: None,
            start_date_time: None,
            end_date_time: None,
        };
        let query = params.clone().validate(50.0).unwrap();
        assert_eq!(query.window, TimeWindow::default());

        let mut too_far = params.clone();
        too_far.radius_km = 51.0;
        assert!(too_far.validate(50.0).is_err());

        let mut zero = params.clone();
        zero.radius_km = 0.0;
        assert!(zero.validate(50.0).is_err());

        let mut reversed = params;
        reversed.start_date_time = Some(at(2030, 5, 2, 0, 0));
        reversed.end_date_time = Some(at(2030, 5, 1, 0, 0));
        assert!(reversed.validate(50.0).is_err());
    }
}
