//! Proximity search: bounding-box prefilter in storage, exact distance in memory.

use super::CrewStore;
use crate::errors::AppError;
use crate::geo::{haversine_km, BoundingBox};
use crate::models::{valid_latitude, valid_longitude, CrewSummary, NearbyCrew, NearbyQuery};

/// Crews whose meeting point lies within `query.radius_km`, nearest first.
///
/// Candidates come back from storage ordered by meeting time then id and the
/// sort below is stable, so crews at the same distance keep that order.
pub async fn find_nearby<S>(store: &S, query: &NearbyQuery) -> Result<Vec<NearbyCrew>, AppError>
where
    S: CrewStore + ?Sized,
{
    if !valid_latitude(query.latitude)
        || !valid_longitude(query.longitude)
        || !(query.radius_km.is_finite() && query.radius_km > 0.0)
    {
        return Err(AppError::Internal(format!(
            "nearby search called with unchecked query {:?}",
            query
        )));
    }

    let bbox = BoundingBox::around(query.latitude, query.longitude, query.radius_km);
    let candidates = store
        .search_within_bounding_box(&bbox, query.level, &query.window)
        .await?;
    let candidate_count = candidates.len();

    let ranked = rank_by_distance(query.latitude, query.longitude, query.radius_km, candidates);

    tracing::debug!(
        radius_km = query.radius_km,
        candidates = candidate_count,
        matched = ranked.len(),
        "Nearby search finished"
    );
    Ok(ranked)
}

/// Keep candidates within `radius_km` of the centre and sort them by distance.
pub fn rank_by_distance(
    lat: f64,
    lng: f64,
    radius_km: f64,
    candidates: Vec<CrewSummary>,
) -> Vec<NearbyCrew> {
    let mut nearby: Vec<NearbyCrew> = candidates
        .into_iter()
        .filter_map(|crew| {
            let distance = haversine_km(lat, lng, crew.latitude, crew.longitude);
            (distance <= radius_km).then(|| NearbyCrew::from_summary(crew, distance))
        })
        .collect();

    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby
}
