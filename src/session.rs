use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStep {
    FirstName,
    LastName,
    BirthDate,
    TeamRole,
    Phone,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationDraft {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub team_role: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStep {
    Name,
    Start,
    End,
    Description,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub step: EventStep,
    pub name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStep {
    Text,
    Media,
    Time,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub step: PostStep,
    pub text: String,
    pub media_id: Option<String>,
}

/// What the bot expects from a user's next message.
#[derive(Debug, Clone, PartialEq)]
pub enum Session {
    Registration {
        step: RegistrationStep,
        draft: RegistrationDraft,
    },
    AwaitingCheckinLocation,
    ContestPhoto {
        editing: bool,
    },
    NewEvent(EventDraft),
    NewPost(PostDraft),
    KbTitle,
    KbFile {
        title: String,
    },
    ContestEndTime,
}

impl Session {
    pub fn registration() -> Self {
        Session::Registration {
            step: RegistrationStep::FirstName,
            draft: RegistrationDraft::default(),
        }
    }

    pub fn new_event() -> Self {
        Session::NewEvent(EventDraft {
            step: EventStep::Name,
            name: String::new(),
            start_time: None,
            end_time: None,
        })
    }

    pub fn new_post() -> Self {
        Session::NewPost(PostDraft {
            step: PostStep::Text,
            text: String::new(),
            media_id: None,
        })
    }
}

/// Per-user conversation state, kept in memory only.
#[derive(Clone, Default)]
pub struct SessionStore(Arc<Mutex<HashMap<i64, Session>>>);

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Session>> {
        // A panic while holding the lock leaves the map itself intact.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, user_id: i64) -> Option<Session> {
        self.lock().get(&user_id).cloned()
    }

    pub fn set(&self, user_id: i64, session: Session) {
        self.lock().insert(user_id, session);
    }

    pub fn clear(&self, user_id: i64) -> Option<Session> {
        self.lock().remove(&user_id)
    }
}
