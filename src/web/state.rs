use std::{collections::HashMap, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    config::{self, Lexicon},
    llm::LlmClient,
    web::auth::SESSION_TTL_DAYS,
    web::storage::JsonStore,
};

/// Live session entry. `user_id` is set for applicant accounts; the HR
/// operator authenticates against fixed credentials and carries no account.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub is_hr: bool,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    store: JsonStore,
    llm: LlmClient,
    lexicon: Arc<Lexicon>,
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    upload_dir: PathBuf,
}

impl AppState {
    pub async fn new() -> Result<Self> {
        let llm = LlmClient::from_env().context("failed to initialize LLM client")?;
        let store = JsonStore::open(config::data_file())
            .await
            .context("failed to open data store")?;

        let upload_dir = config::upload_dir();
        tokio::fs::create_dir_all(&upload_dir)
            .await
            .with_context(|| format!("failed to create upload dir {}", upload_dir.display()))?;

        Ok(Self {
            store,
            llm,
            lexicon: Arc::new(Lexicon::builtin()),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            upload_dir,
        })
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    pub fn llm_client(&self) -> &LlmClient {
        &self.llm
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn upload_dir(&self) -> &PathBuf {
        &self.upload_dir
    }

    pub async fn create_session(
        &self,
        user_id: Option<Uuid>,
        user_name: Option<String>,
        is_hr: bool,
    ) -> Uuid {
        let token = Uuid::new_v4();
        let session = Session {
            user_id,
            user_name,
            is_hr,
            expires_at: Utc::now() + ChronoDuration::days(SESSION_TTL_DAYS),
        };
        self.sessions.write().await.insert(token, session);
        token
    }

    /// Look up a session, treating expired entries as absent and dropping
    /// them eagerly.
    pub async fn session(&self, token: Uuid) -> Option<Session> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&token) {
                Some(session) if session.expires_at > Utc::now() => return Some(session.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        self.sessions.write().await.remove(&token);
        None
    }

    pub async fn remove_session(&self, token: Uuid) {
        self.sessions.write().await.remove(&token);
    }

    #[cfg(test)]
    pub async fn for_tests(dir: &std::path::Path) -> Self {
        let store = JsonStore::open(dir.join("data.json")).await.unwrap();
        let upload_dir = dir.join("uploads");
        tokio::fs::create_dir_all(&upload_dir).await.unwrap();
        Self {
            store,
            llm: LlmClient::with_keys(None, None).unwrap(),
            lexicon: Arc::new(Lexicon::builtin()),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            upload_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn sessions_round_trip_and_expire() {
        let dir = tempdir().unwrap();
        let state = AppState::for_tests(dir.path()).await;

        let token = state
            .create_session(None, Some("HR".to_string()), true)
            .await;
        let session = state.session(token).await.unwrap();
        assert!(session.is_hr);
        assert_eq!(session.user_name.as_deref(), Some("HR"));

        state.remove_session(token).await;
        assert!(state.session(token).await.is_none());

        // Unknown tokens are simply absent.
        assert!(state.session(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_evicted() {
        let dir = tempdir().unwrap();
        let state = AppState::for_tests(dir.path()).await;

        let token = state.create_session(None, None, true).await;
        {
            let mut sessions = state.sessions.write().await;
            let session = sessions.get_mut(&token).unwrap();
            session.expires_at = Utc::now() - ChronoDuration::minutes(1);
        }
        assert!(state.session(token).await.is_none());
        assert!(state.sessions.read().await.is_empty());
    }
}
