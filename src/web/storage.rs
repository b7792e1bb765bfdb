use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::{
    scoring::CandidateResult,
    web::models::{CandidateRecord, CandidateStatus, Position, User},
};

/// Flat keyed store backed by a single JSON file. Every mutation rewrites
/// the whole file under a process-wide lock; last write wins and there is no
/// crash safety. That limitation is accepted, not accidental.
#[derive(Clone)]
pub struct JsonStore {
    path: PathBuf,
    data: Arc<RwLock<StoreData>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    positions: Vec<Position>,
    #[serde(default)]
    candidates: Vec<CandidateRecord>,
    #[serde(default)]
    users: Vec<User>,
}

/// Aggregates for the overview dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OverviewStats {
    pub total_candidates: usize,
    pub total_positions: usize,
    pub today_applicants: usize,
    pub hires_this_month: usize,
    pub pending_count: usize,
    pub accepted_count: usize,
    pub rejected_count: usize,
}

impl JsonStore {
    /// Load the store file, tolerating a missing or unreadable file by
    /// starting with empty collections.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(data) => data,
                Err(err) => {
                    warn!(?err, file = %path.display(), "store file is not valid JSON, starting empty");
                    StoreData::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read store file {}", path.display()));
            }
        };

        Ok(Self {
            path,
            data: Arc::new(RwLock::new(data)),
        })
    }

    async fn persist(&self, data: &StoreData) -> Result<()> {
        let serialized =
            serde_json::to_string_pretty(data).context("failed to serialize store data")?;
        tokio::fs::write(&self.path, serialized)
            .await
            .with_context(|| format!("failed to write store file {}", self.path.display()))
    }

    // ----- positions -----

    pub async fn save_position(&self, title: &str, description: &str) -> Result<Uuid> {
        let mut data = self.data.write().await;
        let id = Uuid::new_v4();
        data.positions.push(Position {
            id,
            title: title.to_string(),
            description: description.to_string(),
        });
        self.persist(&data).await?;
        Ok(id)
    }

    pub async fn positions(&self) -> Vec<Position> {
        self.data.read().await.positions.clone()
    }

    pub async fn position(&self, id: Uuid) -> Option<Position> {
        self.data
            .read()
            .await
            .positions
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub async fn update_position(&self, id: Uuid, title: &str, description: &str) -> Result<bool> {
        let mut data = self.data.write().await;
        let Some(position) = data.positions.iter_mut().find(|p| p.id == id) else {
            return Ok(false);
        };
        position.title = title.to_string();
        position.description = description.to_string();
        self.persist(&data).await?;
        Ok(true)
    }

    /// Delete a position and cascade-delete every candidate referencing it.
    /// Returns the removed candidates so the caller can clean up files.
    pub async fn delete_position(&self, id: Uuid) -> Result<Vec<CandidateRecord>> {
        let mut data = self.data.write().await;
        data.positions.retain(|p| p.id != id);
        let (removed, kept): (Vec<_>, Vec<_>) = data
            .candidates
            .drain(..)
            .partition(|c| c.position_id == Some(id));
        data.candidates = kept;
        self.persist(&data).await?;
        Ok(removed)
    }

    // ----- candidates -----

    /// Persist a freshly scored submission. Identifier, timestamp and the
    /// pending status are assigned here, exactly once per submission.
    #[allow(clippy::too_many_arguments)]
    pub async fn save_candidate(
        &self,
        result: CandidateResult,
        position_id: Option<Uuid>,
        user_id: Option<Uuid>,
        raw_resume_text: String,
        source_file: Option<String>,
        stored_file: Option<String>,
    ) -> Result<Uuid> {
        let mut data = self.data.write().await;
        let id = Uuid::new_v4();
        data.candidates.push(CandidateRecord {
            id,
            created_at: Utc::now(),
            status: CandidateStatus::Pending,
            position_id,
            user_id,
            raw_resume_text,
            source_file,
            stored_file,
            result,
        });
        self.persist(&data).await?;
        Ok(id)
    }

    pub async fn candidates(&self) -> Vec<CandidateRecord> {
        self.data.read().await.candidates.clone()
    }

    pub async fn candidate(&self, id: Uuid) -> Option<CandidateRecord> {
        self.data
            .read()
            .await
            .candidates
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub async fn candidates_for_position(&self, position_id: Uuid) -> Vec<CandidateRecord> {
        self.data
            .read()
            .await
            .candidates
            .iter()
            .filter(|c| c.position_id == Some(position_id))
            .cloned()
            .collect()
    }

    pub async fn candidates_for_user(&self, user_id: Uuid) -> Vec<CandidateRecord> {
        self.data
            .read()
            .await
            .candidates
            .iter()
            .filter(|c| c.user_id == Some(user_id))
            .cloned()
            .collect()
    }

    /// Remove a candidate record, returning it so the caller can attempt
    /// best-effort deletion of any stored upload.
    pub async fn delete_candidate(&self, id: Uuid) -> Result<Option<CandidateRecord>> {
        let mut data = self.data.write().await;
        let Some(index) = data.candidates.iter().position(|c| c.id == id) else {
            return Ok(None);
        };
        let removed = data.candidates.remove(index);
        self.persist(&data).await?;
        Ok(Some(removed))
    }

    pub async fn set_candidate_status(&self, id: Uuid, status: CandidateStatus) -> Result<bool> {
        let mut data = self.data.write().await;
        let Some(candidate) = data.candidates.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        candidate.status = status;
        self.persist(&data).await?;
        Ok(true)
    }

    pub async fn overview_stats(&self) -> OverviewStats {
        let data = self.data.read().await;
        let now = Utc::now();
        let today = now.date_naive();
        let today_start = today.and_time(NaiveTime::MIN).and_utc();
        let month_start = today
            .with_day(1)
            .unwrap_or(today)
            .and_time(NaiveTime::MIN)
            .and_utc();

        let mut stats = OverviewStats {
            total_candidates: data.candidates.len(),
            total_positions: data.positions.len(),
            ..OverviewStats::default()
        };

        for candidate in &data.candidates {
            match candidate.status {
                CandidateStatus::Pending => stats.pending_count += 1,
                CandidateStatus::Accepted => stats.accepted_count += 1,
                CandidateStatus::Rejected => stats.rejected_count += 1,
            }
            if candidate.created_at >= today_start {
                stats.today_applicants += 1;
            }
            if candidate.status == CandidateStatus::Accepted && candidate.created_at >= month_start
            {
                stats.hires_this_month += 1;
            }
        }

        stats
    }

    // ----- users -----

    /// Create an applicant account. Returns `None` when the username is
    /// already taken.
    pub async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        name: &str,
        email: &str,
    ) -> Result<Option<User>> {
        let mut data = self.data.write().await;
        if data.users.iter().any(|u| u.username == username) {
            return Ok(None);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        data.users.push(user.clone());
        self.persist(&data).await?;
        Ok(Some(user))
    }

    pub async fn user_by_username(&self, username: &str) -> Option<User> {
        self.data
            .read()
            .await
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    pub async fn user_by_id(&self, id: Uuid) -> Option<User> {
        self.data
            .read()
            .await
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Lexicon, scoring::heuristic};
    use tempfile::tempdir;

    fn sample_result() -> CandidateResult {
        heuristic::analyze(
            &Lexicon::builtin(),
            "Alice White\nHarvard University\n6 years experience in Python.",
        )
    }

    async fn store_in(dir: &tempfile::TempDir) -> JsonStore {
        JsonStore::open(dir.path().join("data.json")).await.unwrap()
    }

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir).await;
        assert!(store.positions().await.is_empty());
        assert!(store.candidates().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonStore::open(&path).await.unwrap();
        assert!(store.candidates().await.is_empty());
    }

    #[tokio::test]
    async fn candidates_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");

        let store = JsonStore::open(&path).await.unwrap();
        let id = store
            .save_candidate(sample_result(), None, None, "raw".into(), None, None)
            .await
            .unwrap();

        let reopened = JsonStore::open(&path).await.unwrap();
        let record = reopened.candidate(id).await.unwrap();
        assert_eq!(record.status, CandidateStatus::Pending);
        assert_eq!(record.result.name, "Alice White");
    }

    #[tokio::test]
    async fn deleting_a_position_cascades_to_candidates() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir).await;

        let position_id = store.save_position("Backend Engineer", "Rust").await.unwrap();
        let linked = store
            .save_candidate(sample_result(), Some(position_id), None, "raw".into(), None, None)
            .await
            .unwrap();
        let unlinked = store
            .save_candidate(sample_result(), None, None, "raw".into(), None, None)
            .await
            .unwrap();

        let removed = store.delete_position(position_id).await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].id, linked);
        assert!(store.candidate(linked).await.is_none());
        assert!(store.candidate(unlinked).await.is_some());
        assert!(store.position(position_id).await.is_none());
    }

    #[tokio::test]
    async fn status_updates_mutate_in_place() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir).await;
        let id = store
            .save_candidate(sample_result(), None, None, "raw".into(), None, None)
            .await
            .unwrap();

        assert!(store
            .set_candidate_status(id, CandidateStatus::Accepted)
            .await
            .unwrap());
        let record = store.candidate(id).await.unwrap();
        assert_eq!(record.status, CandidateStatus::Accepted);

        let stats = store.overview_stats().await;
        assert_eq!(stats.accepted_count, 1);
        assert_eq!(stats.hires_this_month, 1);
        assert_eq!(stats.today_applicants, 1);
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir).await;

        let first = store.create_user("alice", "hash", "Alice", "a@example.com").await.unwrap();
        assert!(first.is_some());
        let second = store.create_user("alice", "hash", "Alice 2", "b@example.com").await.unwrap();
        assert!(second.is_none());

        let fetched = store.user_by_username("alice").await.unwrap();
        assert_eq!(fetched.name, "Alice");
        assert_eq!(store.user_by_id(fetched.id).await.unwrap().email, "a@example.com");
    }

    #[tokio::test]
    async fn candidate_filters_by_position_and_user() {
        let dir = tempdir().unwrap();
        let store = store_in(&dir).await;

        let position_id = store.save_position("Data Scientist", "ML").await.unwrap();
        let user = store
            .create_user("bob", "hash", "Bob", "bob@example.com")
            .await
            .unwrap()
            .unwrap();

        store
            .save_candidate(sample_result(), Some(position_id), Some(user.id), "raw".into(), None, None)
            .await
            .unwrap();
        store
            .save_candidate(sample_result(), None, None, "raw".into(), None, None)
            .await
            .unwrap();

        assert_eq!(store.candidates_for_position(position_id).await.len(), 1);
        assert_eq!(store.candidates_for_user(user.id).await.len(), 1);
        assert_eq!(store.candidates().await.len(), 2);
    }
}
