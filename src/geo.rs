use chrono::{DateTime, Duration, Utc};

/// Mean Earth radius (IUGG) in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A location sample older than this no longer marks its owner as near campus.
pub const NEAR_STATUS_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

/// Great-circle distance between two points in meters (haversine formula).
pub fn distance_m(a: Coordinates, b: Coordinates) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proximity {
    /// Close enough to check in.
    WithinRadius,
    Near,
    Far,
}

impl Proximity {
    pub fn classify(distance_m: f64, proximity_radius_m: f64, near_radius_m: f64) -> Self {
        if distance_m <= proximity_radius_m {
            Proximity::WithinRadius
        } else if distance_m <= near_radius_m {
            Proximity::Near
        } else {
            Proximity::Far
        }
    }

    pub fn is_near(self) -> bool {
        !matches!(self, Proximity::Far)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIndicator {
    OnCampus,
    Near,
    Away,
}

impl StatusIndicator {
    pub fn emoji(self) -> &'static str {
        match self {
            StatusIndicator::OnCampus => "🟢",
            StatusIndicator::Near => "🟡",
            StatusIndicator::Away => "🔴",
        }
    }
}

/// Presence wins over location; a "near" sample only counts while it is fresh.
pub fn status_indicator(
    checked_in_today: bool,
    last_sample: Option<(bool, DateTime<Utc>)>,
    now: DateTime<Utc>,
) -> StatusIndicator {
    if checked_in_today {
        return StatusIndicator::OnCampus;
    }
    match last_sample {
        Some((true, recorded_at))
            if now - recorded_at < Duration::minutes(NEAR_STATUS_TTL_MINUTES) =>
        {
            StatusIndicator::Near
        }
        _ => StatusIndicator::Away,
    }
}

pub fn format_distance(distance_m: f64) -> String {
    if distance_m < 1000.0 {
        format!("{}m", distance_m as i64)
    } else {
        format!("{:.1}km", distance_m / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CAMPUS: Coordinates = Coordinates {
        latitude: 43.2220,
        longitude: 76.8512,
    };

    #[test]
    fn test_distance_to_self_is_zero() {
        assert!(distance_m(CAMPUS, CAMPUS).abs() < 1e-6);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let north = Coordinates::new(44.2220, 76.8512);
        let d = distance_m(CAMPUS, north);
        // One degree of latitude is ~111.2 km on the mean sphere.
        assert!((d - 111_195.0).abs() < 100.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let other = Coordinates::new(43.2250, 76.8550);
        let ab = distance_m(CAMPUS, other);
        let ba = distance_m(other, CAMPUS);
        assert!((ab - ba).abs() < 1e-9);
        assert!(ab > 400.0 && ab < 500.0, "got {ab}");
    }

    #[test]
    fn test_distance_antipodal_does_not_nan() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(0.0, 180.0);
        let d = distance_m(a, b);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }

    #[test]
    fn test_classify() {
        assert_eq!(Proximity::classify(0.0, 300.0, 1000.0), Proximity::WithinRadius);
        assert_eq!(Proximity::classify(300.0, 300.0, 1000.0), Proximity::WithinRadius);
        assert_eq!(Proximity::classify(300.1, 300.0, 1000.0), Proximity::Near);
        assert_eq!(Proximity::classify(1000.0, 300.0, 1000.0), Proximity::Near);
        assert_eq!(Proximity::classify(1000.5, 300.0, 1000.0), Proximity::Far);
        assert!(Proximity::Near.is_near());
        assert!(!Proximity::Far.is_near());
    }

    #[test]
    fn test_status_indicator() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let fresh = now - Duration::minutes(10);
        let stale = now - Duration::minutes(45);

        assert_eq!(status_indicator(true, None, now), StatusIndicator::OnCampus);
        assert_eq!(
            status_indicator(true, Some((false, stale)), now),
            StatusIndicator::OnCampus
        );
        assert_eq!(
            status_indicator(false, Some((true, fresh)), now),
            StatusIndicator::Near
        );
        assert_eq!(
            status_indicator(false, Some((true, stale)), now),
            StatusIndicator::Away
        );
        assert_eq!(
            status_indicator(false, Some((false, fresh)), now),
            StatusIndicator::Away
        );
        assert_eq!(status_indicator(false, None, now), StatusIndicator::Away);
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0m");
        assert_eq!(format_distance(299.9), "299m");
        assert_eq!(format_distance(1000.0), "1.0km");
        assert_eq!(format_distance(12_345.0), "12.3km");
    }

    #[test]
    fn test_coordinates_validation() {
        assert!(CAMPUS.is_valid());
        assert!(!Coordinates::new(91.0, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -181.0).is_valid());
    }
}
