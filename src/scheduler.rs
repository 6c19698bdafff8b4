use crate::broadcast::{self, Delivery};
use crate::handlers::contest_handler;
use crate::utils::escape_html;
use crate::{db, AppState};
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub posts_sent: usize,
    pub contests_closed: usize,
}

/// Runs forever, one tick per `period`.
pub async fn run(state: Arc<AppState>, period: Duration) {
    info!(seconds = period.as_secs(), "Scheduler started");
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(err) = tick(&state, Utc::now()).await {
            error!("Scheduler tick failed: {err:?}");
        }
    }
}

pub async fn tick(state: &AppState, now: DateTime<Utc>) -> Result<TickReport> {
    let mut report = TickReport::default();

    for post in db::due_posts(&state.db, now).await? {
        let recipients = db::registered_user_ids(&state.db).await?;
        // Post text is stored as typed; deliveries go out in HTML parse mode.
        let text = escape_html(&post.text);
        let delivery = match &post.media_id {
            Some(file_id) => Delivery::Photo {
                file_id: file_id.clone(),
                caption: text,
                markup: None,
            },
            None => Delivery::text(text),
        };

        let delivered = broadcast::broadcast(&state.telegram, &recipients, &delivery).await;
        if db::mark_post_sent(&state.db, post.id, now).await? {
            report.posts_sent += 1;
        }
        info!(
            post_id = post.id,
            sent = delivered.sent,
            failed = delivered.failed,
            "Scheduled post delivered"
        );
    }

    for schedule in db::due_open_contests(&state.db, now).await? {
        match contest_handler::finish_contest(state, schedule.contest_date, now).await {
            Ok(_) => report.contests_closed += 1,
            Err(err) => error!(
                contest_date = %schedule.contest_date,
                "Failed to close photo contest: {err:?}"
            ),
        }
    }

    Ok(report)
}
