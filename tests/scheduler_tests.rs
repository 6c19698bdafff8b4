use campusbot::config::CampusConfig;
use campusbot::db::{self, NewPost, Registration};
use campusbot::models::{PostStatus, User};
use campusbot::session::SessionStore;
use campusbot::{api::TelegramApi, scheduler, AppState};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
}

async fn test_state(mock_server: &MockServer) -> AppState {
    let pool = db::connect("sqlite::memory:").await.unwrap();
    db::run_migrations(&pool, "sqlite::memory:").await.unwrap();
    AppState {
        db: pool,
        telegram: TelegramApi::new_with_base_url(format!(
            "http://{}/bot123",
            mock_server.address()
        )),
        bot_username: "campusbot".to_string(),
        campus: CampusConfig::default(),
        sessions: SessionStore::new(),
    }
}

async fn register(state: &AppState, id: i64, first_name: &str) {
    let user = User {
        id,
        is_bot: false,
        username: None,
        first_name: Some(first_name.to_string()),
        last_name: None,
    };
    db::upsert_user(&state.db, &user, false, now()).await.unwrap();
    let form = Registration {
        first_name: first_name.to_string(),
        last_name: "Test".to_string(),
        birth_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        team_role: "Ops".to_string(),
        phone_number: "+77000000000".to_string(),
    };
    db::complete_registration(&state.db, id, &form, now())
        .await
        .unwrap();
}

fn ok_message() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "ok": true,
        "result": { "message_id": 1, "chat": { "id": 1 } }
    }))
}

async fn schedule_post(state: &AppState, text: &str, media_id: Option<&str>, at: DateTime<Utc>) -> i64 {
    db::create_post(
        &state.db,
        &NewPost {
            event_id: None,
            text: text.to_string(),
            media_id: media_id.map(String::from),
            scheduled_time: at,
            created_by: 1,
        },
        now() - Duration::hours(1),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_tick_sends_due_text_post_to_everyone() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123/sendMessage"))
        .and(body_partial_json(json!({ "text": "Lunch is served" })))
        .respond_with(ok_message())
        .expect(2)
        .mount(&mock_server)
        .await;

    let state = test_state(&mock_server).await;
    register(&state, 1, "Askar").await;
    register(&state, 2, "Bota").await;
    let due = schedule_post(&state, "Lunch is served", None, now() - Duration::minutes(1)).await;
    let later = schedule_post(&state, "Dinner", None, now() + Duration::hours(5)).await;

    let report = scheduler::tick(&state, now()).await.unwrap();

    assert_eq!(report.posts_sent, 1);
    let sent = db::get_post(&state.db, due).await.unwrap().unwrap();
    assert_eq!(sent.status, PostStatus::Sent);
    assert_eq!(sent.sent_at, Some(now()));
    let pending = db::get_post(&state.db, later).await.unwrap().unwrap();
    assert_eq!(pending.status, PostStatus::Pending);
}

#[tokio::test]
async fn test_tick_does_not_resend() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123/sendMessage"))
        .respond_with(ok_message())
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = test_state(&mock_server).await;
    register(&state, 1, "Askar").await;
    schedule_post(&state, "Once", None, now()).await;

    assert_eq!(scheduler::tick(&state, now()).await.unwrap().posts_sent, 1);
    assert_eq!(
        scheduler::tick(&state, now() + Duration::minutes(1))
            .await
            .unwrap()
            .posts_sent,
        0
    );
}

#[tokio::test]
async fn test_tick_sends_photo_post() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123/sendPhoto"))
        .and(body_partial_json(json!({ "photo": "photo-7", "caption": "Group photo" })))
        .respond_with(ok_message())
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = test_state(&mock_server).await;
    register(&state, 1, "Askar").await;
    schedule_post(&state, "Group photo", Some("photo-7"), now()).await;

    let report = scheduler::tick(&state, now()).await.unwrap();

    assert_eq!(report.posts_sent, 1);
}

#[tokio::test]
async fn test_failed_delivery_does_not_stop_broadcast() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123/sendMessage"))
        .and(body_partial_json(json!({ "chat_id": 1 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was blocked by the user"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bot123/sendMessage"))
        .and(body_partial_json(json!({ "chat_id": 2 })))
        .respond_with(ok_message())
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = test_state(&mock_server).await;
    register(&state, 1, "Askar").await;
    register(&state, 2, "Bota").await;
    let id = schedule_post(&state, "Heads up", None, now()).await;

    let report = scheduler::tick(&state, now()).await.unwrap();

    assert_eq!(report.posts_sent, 1);
    let post = db::get_post(&state.db, id).await.unwrap().unwrap();
    assert_eq!(post.status, PostStatus::Sent);
}

#[tokio::test]
async fn test_tick_closes_due_contest_and_announces_winner() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123/sendPhoto"))
        .and(body_partial_json(json!({ "photo": "winner-photo" })))
        .respond_with(ok_message())
        .expect(3)
        .mount(&mock_server)
        .await;

    let state = test_state(&mock_server).await;
    register(&state, 1, "Askar").await;
    register(&state, 2, "Bota").await;
    register(&state, 3, "Chingiz").await;
    db::upsert_schedule(&state.db, today(), now() - Duration::minutes(1))
        .await
        .unwrap();
    let winner = db::submit_photo(&state.db, 1, today(), "winner-photo", "", now() - Duration::hours(2))
        .await
        .unwrap()
        .unwrap();
    db::submit_photo(&state.db, 2, today(), "other-photo", "", now() - Duration::hours(1))
        .await
        .unwrap();
    db::cast_vote(&state.db, winner, 3, now() - Duration::minutes(30))
        .await
        .unwrap();

    let report = scheduler::tick(&state, now()).await.unwrap();

    assert_eq!(report.contests_closed, 1);
    let schedule = db::get_schedule(&state.db, today()).await.unwrap().unwrap();
    assert!(schedule.is_closed);
    let entry = db::get_photo(&state.db, winner).await.unwrap().unwrap();
    assert!(entry.is_winner);

    let again = scheduler::tick(&state, now() + Duration::minutes(1)).await.unwrap();
    assert_eq!(again.contests_closed, 0);
}

#[tokio::test]
async fn test_post_text_is_escaped_for_html() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123/sendMessage"))
        .and(body_partial_json(json!({
            "text": "Q&amp;A at 5 &lt;room 12&gt;",
            "parse_mode": "HTML"
        })))
        .respond_with(ok_message())
        .expect(2)
        .mount(&mock_server)
        .await;

    let state = test_state(&mock_server).await;
    register(&state, 1, "Askar").await;
    register(&state, 2, "Bota").await;
    schedule_post(&state, "Q&A at 5 <room 12>", None, now()).await;

    let report = scheduler::tick(&state, now()).await.unwrap();

    assert_eq!(report.posts_sent, 1);
}

#[tokio::test]
async fn test_photo_caption_is_escaped_for_html() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123/sendPhoto"))
        .and(body_partial_json(json!({
            "photo": "photo-8",
            "caption": "Tom &amp; Jerry &lt;3"
        })))
        .respond_with(ok_message())
        .expect(1)
        .mount(&mock_server)
        .await;

    let state = test_state(&mock_server).await;
    register(&state, 1, "Askar").await;
    schedule_post(&state, "Tom & Jerry <3", Some("photo-8"), now()).await;

    scheduler::tick(&state, now()).await.unwrap();
}

#[tokio::test]
async fn test_failed_contest_close_does_not_stop_the_others() {
    let mock_server = MockServer::start().await;
    let state = test_state(&mock_server).await;
    register(&state, 1, "Askar").await;
    let yesterday = today() - Duration::days(1);
    db::upsert_schedule(&state.db, yesterday, now() - Duration::days(1))
        .await
        .unwrap();
    db::upsert_schedule(&state.db, today(), now() - Duration::minutes(1))
        .await
        .unwrap();
    sqlx::raw_sql(
        "CREATE TRIGGER lock_yesterday BEFORE UPDATE ON photo_contest_schedule
         WHEN OLD.contest_date = '2026-05-03'
         BEGIN SELECT RAISE(ABORT, 'schedule locked'); END;",
    )
    .execute(&state.db)
    .await
    .unwrap();

    let report = scheduler::tick(&state, now()).await.unwrap();

    assert_eq!(report.contests_closed, 1);
    let failed = db::get_schedule(&state.db, yesterday).await.unwrap().unwrap();
    assert!(!failed.is_closed);
    let closed = db::get_schedule(&state.db, today()).await.unwrap().unwrap();
    assert!(closed.is_closed);
}

#[tokio::test]
async fn test_tick_with_nothing_due() {
    let mock_server = MockServer::start().await;
    let state = test_state(&mock_server).await;
    register(&state, 1, "Askar").await;

    let report = scheduler::tick(&state, now()).await.unwrap();

    assert_eq!(report, scheduler::TickReport::default());
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}
