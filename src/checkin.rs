use crate::config::CampusConfig;
use crate::db::{self, CheckInWrite, NewGeoSample};
use crate::geo::{self, Coordinates, Proximity};
use crate::models::{DbUser, Event, Rank};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::{Any, Pool};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    NeedsConsent,
    AlreadyCheckedIn,
    AwaitLocation,
}

#[derive(Debug, Clone)]
pub enum CheckInOutcome {
    InvalidLocation,
    TooFar {
        distance_m: f64,
    },
    AlreadyCheckedIn,
    CheckedIn {
        distance_m: f64,
        event: Option<Event>,
        total_checkins: i64,
        rank_up: Option<Rank>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutOutcome {
    NotCheckedIn,
    CheckedOut {
        check_in_time: DateTime<Utc>,
        stay: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationOutcome {
    NoConsent,
    InvalidLocation,
    Recorded { distance_m: f64, proximity: Proximity },
}

pub fn campus_point(campus: &CampusConfig) -> Coordinates {
    Coordinates::new(campus.latitude, campus.longitude)
}

/// Decides whether the user may be asked for a check-in location.
pub async fn begin_check_in(
    pool: &Pool<Any>,
    campus: &CampusConfig,
    user: &DbUser,
    now: DateTime<Utc>,
) -> Result<BeginOutcome> {
    if !user.geo_consent {
        return Ok(BeginOutcome::NeedsConsent);
    }
    let today = campus.local_date(now);
    if db::open_presence(pool, user.user_id, today).await?.is_some() {
        return Ok(BeginOutcome::AlreadyCheckedIn);
    }
    Ok(BeginOutcome::AwaitLocation)
}

pub async fn check_in(
    pool: &Pool<Any>,
    campus: &CampusConfig,
    user_id: i64,
    location: Coordinates,
    now: DateTime<Utc>,
) -> Result<CheckInOutcome> {
    if !location.is_valid() {
        return Ok(CheckInOutcome::InvalidLocation);
    }

    let distance_m = geo::distance_m(campus_point(campus), location);
    let proximity = Proximity::classify(distance_m, campus.proximity_radius_m, campus.near_radius_m);
    if proximity != Proximity::WithinRadius {
        info!(user_id, distance_m, "Check-in refused, too far from campus");
        return Ok(CheckInOutcome::TooFar { distance_m });
    }

    let sample = NewGeoSample {
        user_id,
        latitude: location.latitude,
        longitude: location.longitude,
        distance_m,
        is_near_campus: true,
        recorded_at: now,
    };

    match db::record_check_in(pool, &sample, campus.local_date(now)).await? {
        CheckInWrite::AlreadyCheckedIn => Ok(CheckInOutcome::AlreadyCheckedIn),
        CheckInWrite::Recorded {
            presence_id,
            event,
            total_checkins,
            new_rank,
        } => {
            info!(
                user_id,
                presence_id,
                distance_m,
                total_checkins,
                event_id = ?event.as_ref().map(|e| e.id),
                "User checked in"
            );
            if let Some(rank) = &new_rank {
                info!(user_id, rank = %rank.name, "Rank changed");
            }
            Ok(CheckInOutcome::CheckedIn {
                distance_m,
                event,
                total_checkins,
                rank_up: new_rank,
            })
        }
    }
}

pub async fn check_out(
    pool: &Pool<Any>,
    campus: &CampusConfig,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<CheckOutOutcome> {
    match db::check_out(pool, user_id, campus.local_date(now), now).await? {
        Some(record) => {
            let stay = now - record.check_in_time;
            info!(user_id, presence_id = record.id, minutes = stay.num_minutes(), "User checked out");
            Ok(CheckOutOutcome::CheckedOut {
                check_in_time: record.check_in_time,
                stay,
            })
        }
        None => Ok(CheckOutOutcome::NotCheckedIn),
    }
}

/// A location shared outside a check-in becomes a geo sample, with consent.
pub async fn record_location(
    pool: &Pool<Any>,
    campus: &CampusConfig,
    user: &DbUser,
    location: Coordinates,
    now: DateTime<Utc>,
) -> Result<LocationOutcome> {
    if !user.geo_consent {
        return Ok(LocationOutcome::NoConsent);
    }
    if !location.is_valid() {
        return Ok(LocationOutcome::InvalidLocation);
    }

    let distance_m = geo::distance_m(campus_point(campus), location);
    let proximity = Proximity::classify(distance_m, campus.proximity_radius_m, campus.near_radius_m);
    let sample = NewGeoSample {
        user_id: user.user_id,
        latitude: location.latitude,
        longitude: location.longitude,
        distance_m,
        is_near_campus: proximity.is_near(),
        recorded_at: now,
    };
    let sample_id = db::record_geo_sample(pool, &sample).await?;
    debug!(user_id = user.user_id, sample_id, distance_m, "Location sample stored");

    Ok(LocationOutcome::Recorded {
        distance_m,
        proximity,
    })
}
