//! In-memory fakes for pipeline and applier tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use carscope_db::{DbError, PendingProfile};
use chrono::{Duration, Utc};

use crate::error::EnrichError;
use crate::pipeline::Analyzer;
use crate::store::ProfileStore;

struct FakeRow {
    id: i64,
    username: String,
    is_car_profile: Option<bool>,
    profile_type: Option<String>,
    created_at: chrono::DateTime<Utc>,
}

/// In-memory [`ProfileStore`]: rows with unset analysis fields count as
/// unprocessed, exactly like the SQL predicate.
pub(crate) struct FakeStore {
    rows: Mutex<Vec<FakeRow>>,
    update_calls: AtomicU32,
}

impl FakeStore {
    /// Rows get ids 1.. and strictly decreasing `created_at`, so the first
    /// listed username is the newest (and fetched first).
    pub(crate) fn with_usernames(usernames: &[&str]) -> Self {
        let base = Utc::now();
        let rows = usernames
            .iter()
            .enumerate()
            .map(|(i, username)| FakeRow {
                id: i64::try_from(i).unwrap_or(0) + 1,
                username: (*username).to_owned(),
                is_car_profile: None,
                profile_type: None,
                created_at: base - Duration::seconds(i64::try_from(i).unwrap_or(0)),
            })
            .collect();
        Self {
            rows: Mutex::new(rows),
            update_calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn analysis_of(&self, username: &str) -> Option<(bool, String)> {
        let rows = self.rows.lock().unwrap();
        let row = rows.iter().find(|r| r.username == username)?;
        let is_car = row.is_car_profile?;
        Some((is_car, row.profile_type.clone().unwrap_or_default()))
    }

    pub(crate) fn unprocessed_usernames(&self) -> Vec<String> {
        let rows = self.rows.lock().unwrap();
        rows.iter()
            .filter(|r| r.is_car_profile.is_none())
            .map(|r| r.username.clone())
            .collect()
    }

    pub(crate) fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }
}

impl ProfileStore for FakeStore {
    async fn fetch_unprocessed(
        &self,
        limit: i64,
        exclude_usernames: &[String],
    ) -> Result<Vec<PendingProfile>, DbError> {
        let rows = self.rows.lock().unwrap();
        let mut pending: Vec<&FakeRow> = rows
            .iter()
            .filter(|r| r.is_car_profile.is_none())
            .filter(|r| !exclude_usernames.contains(&r.username))
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending
            .into_iter()
            .take(usize::try_from(limit.max(0)).unwrap_or(0))
            .map(|r| PendingProfile {
                username: r.username.clone(),
                full_name: None,
                biography: None,
                followers_count: None,
                following_count: None,
                is_verified: None,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn find_profile_id(&self, username: &str) -> Result<Option<i64>, DbError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().find(|r| r.username == username).map(|r| r.id))
    }

    async fn apply_analysis(
        &self,
        id: i64,
        is_car_profile: bool,
        profile_type: &str,
    ) -> Result<u64, DbError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.is_car_profile = Some(is_car_profile);
                row.profile_type = Some(profile_type.to_owned());
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

/// Analyzer that fails with a rate-limit error for the first `fail_first`
/// calls, then returns the scripted response text.
pub(crate) struct ScriptedAnalyzer {
    calls: AtomicU32,
    fail_first: u32,
    response: String,
    seen: Mutex<Vec<String>>,
}

impl ScriptedAnalyzer {
    pub(crate) fn new(fail_first: u32, response: &str) -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_first,
            response: response.to_owned(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every username offered to the analyzer, in call order, duplicates
    /// included (one entry per attempt).
    pub(crate) fn seen_usernames(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Analyzer for ScriptedAnalyzer {
    async fn analyze(&self, profiles: &[PendingProfile]) -> Result<String, EnrichError> {
        self.seen
            .lock()
            .unwrap()
            .extend(profiles.iter().map(|p| p.username.clone()));
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.fail_first {
            Err(EnrichError::Unavailable(
                "Gemini rate limited: quota exceeded".to_owned(),
            ))
        } else {
            Ok(self.response.clone())
        }
    }
}

/// Analyzer that classifies every profile it is given as a car-centric
/// individual, echoing the usernames back in order.
pub(crate) struct EchoAnalyzer {
    calls: AtomicU32,
}

impl EchoAnalyzer {
    pub(crate) fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Analyzer for EchoAnalyzer {
    async fn analyze(&self, profiles: &[PendingProfile]) -> Result<String, EnrichError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let entries: Vec<serde_json::Value> = profiles
            .iter()
            .map(|p| {
                serde_json::json!({
                    "username": p.username,
                    "is_car_profile": true,
                    "profile_type": "individual",
                })
            })
            .collect();
        Ok(serde_json::Value::Array(entries).to_string())
    }
}
