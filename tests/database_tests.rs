use campusbot::db::{
    self, CheckInWrite, CloseOutcome, ExportScope, NewEvent, NewGeoSample, NewPost, Registration,
    VoteOutcome,
};
use campusbot::models::{PostStatus, PresenceStatus, User};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sqlx::any::AnyPoolOptions;

async fn setup_test_db() -> sqlx::Pool<sqlx::Any> {
    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::run_migrations(&pool, "sqlite::memory:").await.unwrap();
    pool
}

fn test_user(id: i64, username: Option<&str>) -> User {
    User {
        id,
        is_bot: false,
        username: username.map(String::from),
        first_name: Some(format!("User{}", id)),
        last_name: None,
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 6, 0, 0).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
}

async fn registered_user(pool: &sqlx::Pool<sqlx::Any>, id: i64, first_name: &str) {
    db::upsert_user(pool, &test_user(id, None), false, now())
        .await
        .unwrap();
    let form = Registration {
        first_name: first_name.to_string(),
        last_name: "Test".to_string(),
        birth_date: NaiveDate::from_ymd_opt(2000, 1, 15).unwrap(),
        team_role: "Design".to_string(),
        phone_number: "+77011234567".to_string(),
    };
    db::complete_registration(pool, id, &form, now()).await.unwrap();
}

fn sample(user_id: i64, at: DateTime<Utc>) -> NewGeoSample {
    NewGeoSample {
        user_id,
        latitude: 43.2221,
        longitude: 76.8513,
        distance_m: 14.0,
        is_near_campus: true,
        recorded_at: at,
    }
}

#[tokio::test]
async fn test_upsert_user_creates_new_user() {
    let pool = setup_test_db().await;

    let db_user = db::upsert_user(&pool, &test_user(12345, Some("testuser")), false, now())
        .await
        .unwrap();

    assert_eq!(db_user.user_id, 12345);
    assert_eq!(db_user.username, Some("testuser".to_string()));
    assert_eq!(db_user.first_name, Some("User12345".to_string()));
    assert!(!db_user.is_registered);
    assert!(!db_user.is_admin);
    assert_eq!(db_user.total_checkins, 0);
    assert_eq!(db_user.current_rank, "Newcomer");
}

#[tokio::test]
async fn test_upsert_user_refreshes_username_only() {
    let pool = setup_test_db().await;
    db::upsert_user(&pool, &test_user(12345, Some("oldname")), false, now())
        .await
        .unwrap();

    let renamed = User {
        id: 12345,
        is_bot: false,
        username: Some("newname".to_string()),
        first_name: Some("NewFirst".to_string()),
        last_name: None,
    };
    let db_user = db::upsert_user(&pool, &renamed, false, now()).await.unwrap();

    assert_eq!(db_user.username, Some("newname".to_string()));
    assert_eq!(db_user.first_name, Some("User12345".to_string()));
}

#[tokio::test]
async fn test_upsert_user_never_revokes_admin() {
    let pool = setup_test_db().await;
    db::upsert_user(&pool, &test_user(1, None), true, now())
        .await
        .unwrap();

    let db_user = db::upsert_user(&pool, &test_user(1, None), false, now())
        .await
        .unwrap();

    assert!(db_user.is_admin);
}

#[tokio::test]
async fn test_complete_registration() {
    let pool = setup_test_db().await;
    registered_user(&pool, 7, "Aigerim").await;

    let user = db::get_user(&pool, 7).await.unwrap().unwrap();
    assert!(user.is_registered);
    assert!(user.geo_consent);
    assert_eq!(user.first_name.as_deref(), Some("Aigerim"));
    assert_eq!(user.birth_date, NaiveDate::from_ymd_opt(2000, 1, 15));
    assert_eq!(user.phone_number.as_deref(), Some("+77011234567"));
    assert_eq!(db::registered_user_ids(&pool).await.unwrap(), vec![7]);
}

#[tokio::test]
async fn test_set_admin_and_geo_consent() {
    let pool = setup_test_db().await;
    registered_user(&pool, 7, "Aigerim").await;

    assert!(db::set_admin(&pool, 7, true).await.unwrap());
    assert!(!db::set_admin(&pool, 999, true).await.unwrap());

    db::set_geo_consent(&pool, 7, false).await.unwrap();
    let user = db::get_user(&pool, 7).await.unwrap().unwrap();
    assert!(user.is_admin);
    assert!(!user.geo_consent);
}

#[tokio::test]
async fn test_record_check_in_writes_everything() {
    let pool = setup_test_db().await;
    registered_user(&pool, 7, "Aigerim").await;

    let write = db::record_check_in(&pool, &sample(7, now()), today())
        .await
        .unwrap();

    let CheckInWrite::Recorded {
        total_checkins,
        event,
        new_rank,
        ..
    } = write
    else {
        panic!("expected a recorded check-in");
    };
    assert_eq!(total_checkins, 1);
    assert!(event.is_none());
    assert!(new_rank.is_none());

    let record = db::open_presence(&pool, 7, today()).await.unwrap().unwrap();
    assert_eq!(record.status, PresenceStatus::InCampus);
    assert_eq!(record.check_in_time, now());
    assert_eq!(record.latitude, Some(43.2221));

    let geo = db::latest_geo_sample(&pool, 7).await.unwrap().unwrap();
    assert!(geo.is_near_campus);
    assert_eq!(geo.recorded_at, now());
}

async fn count_rows(pool: &sqlx::Pool<sqlx::Any>, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_record_check_in_for_unknown_user_writes_nothing() {
    let pool = setup_test_db().await;

    let result = db::record_check_in(&pool, &sample(404, now()), today()).await;

    assert!(result.is_err());
    assert_eq!(count_rows(&pool, "presence").await, 0);
    assert_eq!(count_rows(&pool, "geolocation").await, 0);
    assert!(db::open_presence(&pool, 404, today()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_record_check_in_refuses_second_open_record() {
    let pool = setup_test_db().await;
    registered_user(&pool, 7, "Aigerim").await;

    db::record_check_in(&pool, &sample(7, now()), today())
        .await
        .unwrap();
    let second = db::record_check_in(&pool, &sample(7, now() + Duration::minutes(5)), today())
        .await
        .unwrap();

    assert!(matches!(second, CheckInWrite::AlreadyCheckedIn));
    let user = db::get_user(&pool, 7).await.unwrap().unwrap();
    assert_eq!(user.total_checkins, 1);
}

#[tokio::test]
async fn test_check_in_again_after_check_out() {
    let pool = setup_test_db().await;
    registered_user(&pool, 7, "Aigerim").await;

    db::record_check_in(&pool, &sample(7, now()), today())
        .await
        .unwrap();
    let closed = db::check_out(&pool, 7, today(), now() + Duration::hours(2))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(closed.check_in_time, now());

    let again = db::record_check_in(&pool, &sample(7, now() + Duration::hours(3)), today())
        .await
        .unwrap();
    assert!(matches!(
        again,
        CheckInWrite::Recorded {
            total_checkins: 2,
            ..
        }
    ));
}

#[tokio::test]
async fn test_check_out_without_open_record() {
    let pool = setup_test_db().await;
    registered_user(&pool, 7, "Aigerim").await;

    assert!(db::check_out(&pool, 7, today(), now()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rank_is_promoted_at_threshold() {
    let pool = setup_test_db().await;
    registered_user(&pool, 7, "Aigerim").await;

    let mut last = None;
    for day in 0..5 {
        let at = now() + Duration::days(day);
        let date = today() + Duration::days(day);
        last = Some(db::record_check_in(&pool, &sample(7, at), date).await.unwrap());
    }

    let Some(CheckInWrite::Recorded {
        total_checkins,
        new_rank,
        ..
    }) = last
    else {
        panic!("expected a recorded check-in");
    };
    assert_eq!(total_checkins, 5);
    assert_eq!(new_rank.map(|rank| rank.name), Some("Ideologist".to_string()));
    let user = db::get_user(&pool, 7).await.unwrap().unwrap();
    assert_eq!(user.current_rank, "Ideologist");
}

#[tokio::test]
async fn test_refresh_rank_fixes_stale_rank() {
    let pool = setup_test_db().await;
    registered_user(&pool, 7, "Aigerim").await;
    sqlx::query("UPDATE users SET total_checkins = 16 WHERE user_id = 7")
        .execute(&pool)
        .await
        .unwrap();

    let changed = db::refresh_rank(&pool, 7).await.unwrap();
    assert_eq!(changed.map(|rank| rank.name), Some("Reformer".to_string()));
    assert!(db::refresh_rank(&pool, 7).await.unwrap().is_none());
}

#[tokio::test]
async fn test_load_ranks_seeded() {
    let pool = setup_test_db().await;

    let ranks = db::load_ranks(&pool).await.unwrap();
    let names: Vec<_> = ranks.iter().map(|rank| rank.name.as_str()).collect();

    assert_eq!(names, vec!["Newcomer", "Ideologist", "Reformer", "Philosopher"]);
    let philosopher = db::rank_by_name(&pool, "Philosopher").await.unwrap().unwrap();
    assert_eq!(philosopher.min_checkins, 30);
}

#[tokio::test]
async fn test_present_users_and_participants() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;
    registered_user(&pool, 2, "Bota").await;
    registered_user(&pool, 3, "Chingiz").await;

    db::record_check_in(&pool, &sample(1, now()), today())
        .await
        .unwrap();
    let mut far = sample(2, now());
    far.distance_m = 5000.0;
    far.is_near_campus = false;
    db::record_geo_sample(&pool, &far).await.unwrap();

    let present = db::present_users(&pool, today()).await.unwrap();
    assert_eq!(present.len(), 1);
    assert_eq!(present[0].user.user_id, 1);
    assert!(present[0].last_sample.is_some());

    let statuses = db::participants_status(&pool, today()).await.unwrap();
    assert_eq!(statuses.len(), 3);
    let askar = statuses.iter().find(|s| s.user.user_id == 1).unwrap();
    let bota = statuses.iter().find(|s| s.user.user_id == 2).unwrap();
    let chingiz = statuses.iter().find(|s| s.user.user_id == 3).unwrap();
    assert!(askar.checked_in_today);
    assert!(!bota.checked_in_today);
    assert!(!bota.last_sample.as_ref().unwrap().is_near_campus);
    assert!(chingiz.last_sample.is_none());
}

#[tokio::test]
async fn test_latest_geo_sample_wins() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;

    let mut old = sample(1, now() - Duration::hours(1));
    old.is_near_campus = false;
    db::record_geo_sample(&pool, &old).await.unwrap();
    db::record_geo_sample(&pool, &sample(1, now())).await.unwrap();

    let latest = db::latest_geo_sample(&pool, 1).await.unwrap().unwrap();
    assert_eq!(latest.recorded_at, now());
    assert!(latest.is_near_campus);
}

#[tokio::test]
async fn test_presence_stats() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;

    db::record_check_in(&pool, &sample(1, now()), today())
        .await
        .unwrap();
    db::check_out(&pool, 1, today(), now() + Duration::hours(2))
        .await
        .unwrap();
    let tomorrow = today() + Duration::days(1);
    db::record_check_in(&pool, &sample(1, now() + Duration::days(1)), tomorrow)
        .await
        .unwrap();
    db::check_out(&pool, 1, tomorrow, now() + Duration::days(1) + Duration::hours(4))
        .await
        .unwrap();

    let stats = db::presence_stats(&pool, 1).await.unwrap();
    assert_eq!(stats.total_days, 2);
    assert!((stats.average_hours - 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_check_in_is_linked_to_active_event() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;
    let event_id = db::create_event(
        &pool,
        &NewEvent {
            name: "Hackathon".to_string(),
            start_time: now() - Duration::hours(1),
            end_time: now() + Duration::hours(8),
            description: None,
            created_by: 1,
        },
        now(),
    )
    .await
    .unwrap();

    let write = db::record_check_in(&pool, &sample(1, now()), today())
        .await
        .unwrap();
    let CheckInWrite::Recorded { event, .. } = write else {
        panic!("expected a recorded check-in");
    };
    assert_eq!(event.map(|e| e.id), Some(event_id));

    let participants = db::event_participants(&pool, event_id).await.unwrap();
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0].first_name.as_deref(), Some("Askar"));
}

#[tokio::test]
async fn test_event_lists_and_delete() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;
    let past = db::create_event(
        &pool,
        &NewEvent {
            name: "Kickoff".to_string(),
            start_time: now() - Duration::days(2),
            end_time: now() - Duration::days(2) + Duration::hours(3),
            description: Some("Opening".to_string()),
            created_by: 1,
        },
        now(),
    )
    .await
    .unwrap();
    let future = db::create_event(
        &pool,
        &NewEvent {
            name: "Demo day".to_string(),
            start_time: now() + Duration::days(1),
            end_time: now() + Duration::days(1) + Duration::hours(3),
            description: None,
            created_by: 1,
        },
        now(),
    )
    .await
    .unwrap();

    let finished = db::finished_events(&pool, now(), 20).await.unwrap();
    assert_eq!(finished.iter().map(|e| e.id).collect::<Vec<_>>(), vec![past]);
    let upcoming = db::upcoming_events(&pool, now()).await.unwrap();
    assert_eq!(upcoming.iter().map(|e| e.id).collect::<Vec<_>>(), vec![future]);
    let recent = db::recent_events(&pool, 20).await.unwrap();
    assert_eq!(recent.iter().map(|e| e.id).collect::<Vec<_>>(), vec![future, past]);

    assert!(db::delete_event(&pool, past).await.unwrap());
    assert!(!db::delete_event(&pool, past).await.unwrap());
    assert!(db::get_event(&pool, past).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_event_keeps_presence() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;
    let event_id = db::create_event(
        &pool,
        &NewEvent {
            name: "Hackathon".to_string(),
            start_time: now() - Duration::hours(1),
            end_time: now() + Duration::hours(1),
            description: None,
            created_by: 1,
        },
        now(),
    )
    .await
    .unwrap();
    db::record_check_in(&pool, &sample(1, now()), today())
        .await
        .unwrap();

    db::delete_event(&pool, event_id).await.unwrap();

    let record = db::last_presence(&pool, 1).await.unwrap().unwrap();
    assert_eq!(record.event_id, None);
}

#[tokio::test]
async fn test_post_lifecycle() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;
    let post = NewPost {
        event_id: None,
        text: "Lunch at 13:00".to_string(),
        media_id: None,
        scheduled_time: now() + Duration::minutes(30),
        created_by: 1,
    };
    let id = db::create_post(&pool, &post, now()).await.unwrap();

    assert!(db::due_posts(&pool, now()).await.unwrap().is_empty());
    let due = db::due_posts(&pool, now() + Duration::minutes(30)).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].status, PostStatus::Pending);

    assert!(db::mark_post_sent(&pool, id, now() + Duration::minutes(31)).await.unwrap());
    assert!(!db::mark_post_sent(&pool, id, now() + Duration::minutes(32)).await.unwrap());
    assert!(!db::cancel_post(&pool, id).await.unwrap());

    let stored = db::get_post(&pool, id).await.unwrap().unwrap();
    assert_eq!(stored.status, PostStatus::Sent);
    assert_eq!(stored.sent_at, Some(now() + Duration::minutes(31)));
    assert!(db::pending_posts(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_post_is_never_due() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;
    let id = db::create_post(
        &pool,
        &NewPost {
            event_id: None,
            text: "Cancelled".to_string(),
            media_id: Some("photo-1".to_string()),
            scheduled_time: now(),
            created_by: 1,
        },
        now(),
    )
    .await
    .unwrap();

    assert!(db::cancel_post(&pool, id).await.unwrap());
    assert!(db::due_posts(&pool, now() + Duration::hours(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_knowledge_base_files() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;

    let first = db::add_file(&pool, "Rules", "file-1", "document", 1, now())
        .await
        .unwrap();
    let second = db::add_file(&pool, "Map", "file-2", "document", 1, now() + Duration::minutes(1))
        .await
        .unwrap();

    let files = db::list_files(&pool).await.unwrap();
    assert_eq!(files.iter().map(|f| f.id).collect::<Vec<_>>(), vec![second, first]);
    assert_eq!(db::get_file(&pool, first).await.unwrap().unwrap().title, "Rules");

    assert!(db::delete_file(&pool, first).await.unwrap());
    assert!(!db::delete_file(&pool, first).await.unwrap());
    assert_eq!(db::list_files(&pool).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_contest_one_entry_per_day() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;
    db::upsert_schedule(&pool, today(), now() + Duration::hours(6))
        .await
        .unwrap();

    let id = db::submit_photo(&pool, 1, today(), "photo-1", "Sunrise", now())
        .await
        .unwrap();
    assert!(id.is_some());
    let again = db::submit_photo(&pool, 1, today(), "photo-2", "Sunset", now())
        .await
        .unwrap();
    assert!(again.is_none());

    assert!(db::replace_photo(&pool, 1, today(), "photo-2", "Sunset").await.unwrap());
    let entry = db::entry_for(&pool, 1, today()).await.unwrap().unwrap();
    assert_eq!(entry.photo_file_id, "photo-2");
    assert_eq!(entry.author(), "Askar Test");
}

#[tokio::test]
async fn test_cast_vote_rules() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;
    registered_user(&pool, 2, "Bota").await;
    db::upsert_schedule(&pool, today(), now() + Duration::hours(6))
        .await
        .unwrap();
    let photo = db::submit_photo(&pool, 1, today(), "photo-1", "", now())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        db::cast_vote(&pool, photo, 1, now()).await.unwrap(),
        VoteOutcome::OwnPhoto
    );
    assert_eq!(
        db::cast_vote(&pool, photo, 2, now()).await.unwrap(),
        VoteOutcome::Accepted { votes: 1 }
    );
    assert_eq!(
        db::cast_vote(&pool, photo, 2, now()).await.unwrap(),
        VoteOutcome::AlreadyVoted
    );
    assert_eq!(
        db::cast_vote(&pool, 999, 2, now()).await.unwrap(),
        VoteOutcome::NotFound
    );

    let entry = db::get_photo(&pool, photo).await.unwrap().unwrap();
    assert_eq!(entry.votes, 1);
}

#[tokio::test]
async fn test_close_contest_picks_winner_once() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;
    registered_user(&pool, 2, "Bota").await;
    registered_user(&pool, 3, "Chingiz").await;
    db::upsert_schedule(&pool, today(), now() + Duration::hours(6))
        .await
        .unwrap();

    let early = db::submit_photo(&pool, 1, today(), "photo-1", "", now())
        .await
        .unwrap()
        .unwrap();
    let late = db::submit_photo(&pool, 2, today(), "photo-2", "", now() + Duration::minutes(5))
        .await
        .unwrap()
        .unwrap();
    db::cast_vote(&pool, early, 3, now()).await.unwrap();
    db::cast_vote(&pool, late, 3, now()).await.unwrap();

    let outcome = db::close_contest(&pool, today(), now() + Duration::hours(6))
        .await
        .unwrap();
    let CloseOutcome::Winner(winner) = outcome else {
        panic!("expected a winner");
    };
    // Equal votes: the earlier submission wins.
    assert_eq!(winner.id, early);
    assert!(winner.is_winner);

    assert!(matches!(
        db::close_contest(&pool, today(), now() + Duration::hours(7))
            .await
            .unwrap(),
        CloseOutcome::AlreadyClosed
    ));
    assert_eq!(
        db::cast_vote(&pool, late, 1, now() + Duration::hours(7))
            .await
            .unwrap(),
        VoteOutcome::Closed
    );
    assert!(db::due_open_contests(&pool, now() + Duration::days(1))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_close_contest_without_entries() {
    let pool = setup_test_db().await;
    db::upsert_schedule(&pool, today(), now()).await.unwrap();

    let due = db::due_open_contests(&pool, now()).await.unwrap();
    assert_eq!(due.len(), 1);

    assert!(matches!(
        db::close_contest(&pool, today(), now()).await.unwrap(),
        CloseOutcome::NoEntries
    ));
    assert!(db::get_schedule(&pool, today()).await.unwrap().unwrap().is_closed);
}

#[tokio::test]
async fn test_withdraw_and_delete_contest() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;
    registered_user(&pool, 2, "Bota").await;
    db::upsert_schedule(&pool, today(), now() + Duration::hours(6))
        .await
        .unwrap();
    let photo = db::submit_photo(&pool, 1, today(), "photo-1", "", now())
        .await
        .unwrap()
        .unwrap();
    db::cast_vote(&pool, photo, 2, now()).await.unwrap();

    assert!(db::withdraw_photo(&pool, 1, today()).await.unwrap());
    assert!(!db::withdraw_photo(&pool, 1, today()).await.unwrap());

    db::submit_photo(&pool, 2, today(), "photo-2", "", now())
        .await
        .unwrap();
    assert_eq!(db::delete_contest(&pool, today()).await.unwrap(), 1);
    assert!(db::get_schedule(&pool, today()).await.unwrap().is_none());
    assert!(db::entries_for(&pool, today()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_export_rows_by_dates_and_event() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;
    let event_id = db::create_event(
        &pool,
        &NewEvent {
            name: "Hackathon".to_string(),
            start_time: now() - Duration::hours(1),
            end_time: now() + Duration::hours(1),
            description: None,
            created_by: 1,
        },
        now(),
    )
    .await
    .unwrap();
    db::record_check_in(&pool, &sample(1, now()), today())
        .await
        .unwrap();
    db::check_out(&pool, 1, today(), now() + Duration::hours(2))
        .await
        .unwrap();

    let by_dates = db::export_rows(
        &pool,
        ExportScope::Dates {
            from: today() - Duration::days(6),
            to: today(),
        },
    )
    .await
    .unwrap();
    assert_eq!(by_dates.len(), 1);
    assert_eq!(by_dates[0].first_name.as_deref(), Some("Askar"));
    assert_eq!(by_dates[0].check_out_time, Some(now() + Duration::hours(2)));

    let by_event = db::export_rows(&pool, ExportScope::Event(event_id)).await.unwrap();
    assert_eq!(by_event.len(), 1);

    let empty = db::export_rows(
        &pool,
        ExportScope::Dates {
            from: today() + Duration::days(1),
            to: today() + Duration::days(2),
        },
    )
    .await
    .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn test_leaderboard_order() {
    let pool = setup_test_db().await;
    registered_user(&pool, 1, "Askar").await;
    registered_user(&pool, 2, "Bota").await;
    sqlx::query("UPDATE users SET total_checkins = 9 WHERE user_id = 2")
        .execute(&pool)
        .await
        .unwrap();

    let top = db::leaderboard(&pool, 10).await.unwrap();
    assert_eq!(top.iter().map(|u| u.user_id).collect::<Vec<_>>(), vec![2, 1]);
}

#[tokio::test]
async fn test_db_user_display_name() {
    let pool = setup_test_db().await;
    let user = db::upsert_user(&pool, &test_user(5, Some("dana")), false, now())
        .await
        .unwrap();

    assert_eq!(user.display_name(), "@dana");
    assert_eq!(user.full_name(), "User5");
    assert_eq!(user.mention_html(), "<a href=\"tg://user?id=5\">User5</a>");
}
