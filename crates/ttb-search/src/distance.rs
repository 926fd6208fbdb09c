//! Great-circle distance filtering around a search center.

use std::cmp::Ordering;

use ttb_core::{CompanyRecord, Coordinates};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometres.
#[must_use]
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

#[must_use]
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Keeps records within `radius_km` of `center`, nearest first.
///
/// Records without coordinates are kept only when their postcode equals
/// `requested_postcode`; they sort after every measured record and carry no
/// distance. Without a center the input is returned untouched.
#[must_use]
pub fn filter_and_sort(
    records: Vec<CompanyRecord>,
    center: Option<Coordinates>,
    radius_km: f64,
    requested_postcode: Option<&str>,
) -> Vec<CompanyRecord> {
    let Some(center) = center else {
        return records;
    };

    let mut kept: Vec<CompanyRecord> = records
        .into_iter()
        .filter_map(|mut record| match record.coordinates {
            Some(point) => {
                let distance = round_one_decimal(haversine_km(center, point));
                record.distance_km = Some(distance);
                (distance <= radius_km).then_some(record)
            }
            None => {
                record.distance_km = None;
                postcode_matches(&record, requested_postcode).then_some(record)
            }
        })
        .collect();

    kept.sort_by(|a, b| by_distance(a.distance_km, b.distance_km));
    kept
}

/// Equality-only fallback used when no center could be resolved: keeps
/// records in the requested postcode, or in the requested city when no
/// postcode was given.
#[must_use]
pub fn filter_by_place(
    records: Vec<CompanyRecord>,
    postcode: Option<&str>,
    city: Option<&str>,
) -> Vec<CompanyRecord> {
    records
        .into_iter()
        .filter(|record| match (postcode, city) {
            (Some(_), _) => postcode_matches(record, postcode),
            (None, Some(city)) => record
                .city
                .as_deref()
                .is_some_and(|c| c.trim().eq_ignore_ascii_case(city.trim())),
            (None, None) => false,
        })
        .collect()
}

fn postcode_matches(record: &CompanyRecord, requested: Option<&str>) -> bool {
    match (record.postcode.as_deref(), requested) {
        (Some(have), Some(want)) => have.trim() == want.trim(),
        _ => false,
    }
}

fn by_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
