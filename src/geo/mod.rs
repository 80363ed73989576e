//! Great-circle distance and bounding-box math (kilometres, WGS84 degrees).

/// Mean earth radius used for all distance calculations.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Below this `cos(lat)` the longitude delta is treated as unbounded.
const MIN_COS_LAT: f64 = 1e-9;

/// Haversine distance between two points in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = ((d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Axis-aligned latitude/longitude rectangle used to prune geo queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Box containing the disc of `radius_km` around the centre.
    ///
    /// The longitude half-width is `asin(sin(d) / cos(lat))` for angular
    /// radius `d`. This matches `d / cos(lat)` to first order and is never
    /// narrower, so the box never excludes an in-radius point. Near the poles,
    /// or when the disc crosses the antimeridian, the box spans every longitude.
    pub fn around(lat: f64, lng: f64, radius_km: f64) -> Self {
        let angular = radius_km / EARTH_RADIUS_KM;
        let lat_delta = angular.to_degrees();
        let min_lat = (lat - lat_delta).max(-90.0);
        let max_lat = (lat + lat_delta).min(90.0);

        let cos_lat = lat.to_radians().cos();
        let touches_pole = min_lat <= -90.0 || max_lat >= 90.0;

        let lng_delta = if cos_lat < MIN_COS_LAT || touches_pole {
            None
        } else {
            let ratio = angular.sin() / cos_lat;
            (ratio < 1.0).then(|| ratio.asin().to_degrees())
        };

        match lng_delta {
            Some(delta) if lng - delta >= -180.0 && lng + delta <= 180.0 => Self {
                min_lat,
                max_lat,
                min_lng: lng - delta,
                max_lng: lng + delta,
            },
            _ => Self {
                min_lat,
                max_lat,
                min_lng: -180.0,
                max_lng: 180.0,
            },
        }
    }

    pub fn spans_all_longitudes(&self) -> bool {
        self.min_lng <= -180.0 && self.max_lng >= 180.0
    }
}
