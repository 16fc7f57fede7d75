use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::warn;

use crate::db::repository;
use crate::error::AppError;
use crate::models::Attendee;

const LAST_TEACHER_KEY: &str = "last_teacher_id";
const LAST_STUDENT_KEY: &str = "last_student_id";

/// Default selections remembered between sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub last_teacher_id: Option<i64>,
    pub last_student_id: Option<i64>,
}

impl Preferences {
    pub fn remember(&mut self, attendee: Attendee) {
        match attendee {
            Attendee::Teacher(id) => self.last_teacher_id = Some(id),
            Attendee::Student(id) => self.last_student_id = Some(id),
        }
    }

    /// The attendee to reselect on startup, teachers first.
    pub fn default_attendee(&self) -> Option<Attendee> {
        self.last_teacher_id
            .map(Attendee::Teacher)
            .or(self.last_student_id.map(Attendee::Student))
    }
}

#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load(&self) -> Result<Preferences, AppError>;
    async fn save(&self, prefs: &Preferences) -> Result<(), AppError>;
}

pub struct SqlitePreferenceStore {
    db: SqlitePool,
}

impl SqlitePreferenceStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    async fn load_id(&self, key: &str) -> Result<Option<i64>, AppError> {
        let raw = repository::fetch_preference(&self.db, key).await?;
        Ok(raw.and_then(|value| match value.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("ignoring unparsable preference {}={:?}", key, value);
                None
            }
        }))
    }

    async fn save_id(&self, key: &str, id: Option<i64>) -> Result<(), AppError> {
        match id {
            Some(id) => repository::upsert_preference(&self.db, key, &id.to_string()).await?,
            None => {
                repository::delete_preference(&self.db, key).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for SqlitePreferenceStore {
    async fn load(&self) -> Result<Preferences, AppError> {
        Ok(Preferences {
            last_teacher_id: self.load_id(LAST_TEACHER_KEY).await?,
            last_student_id: self.load_id(LAST_STUDENT_KEY).await?,
        })
    }

    async fn save(&self, prefs: &Preferences) -> Result<(), AppError> {
        self.save_id(LAST_TEACHER_KEY, prefs.last_teacher_id).await?;
        self.save_id(LAST_STUDENT_KEY, prefs.last_student_id).await?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPreferenceStore {
    inner: Mutex<Preferences>,
}

impl MemoryPreferenceStore {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            inner: Mutex::new(prefs),
        }
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self) -> Result<Preferences, AppError> {
        let prefs = self.inner.lock().map_err(|_| AppError::InternalServerError)?;
        Ok(*prefs)
    }

    async fn save(&self, prefs: &Preferences) -> Result<(), AppError> {
        let mut current = self.inner.lock().map_err(|_| AppError::InternalServerError)?;
        *current = *prefs;
        Ok(())
    }
}
