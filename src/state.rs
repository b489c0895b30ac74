//! Application state: exam configuration and the in-memory session store.
//!
//! Every session owns its own `CorpusProvider`, so loading one level never
//! disturbs another candidate's exam. Corpus loading is file I/O and runs on
//! the blocking pool.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_exam_config_from_env, ExamConfig};
use crate::error::{ApiError, ExamError};
use crate::session::Session;

pub struct AppState {
    pub config: Arc<ExamConfig>,
    sessions: RwLock<HashMap<String, Session>>,
}

impl AppState {
    pub fn new(config: ExamConfig) -> Self {
        Self {
            config: Arc::new(config),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Build state from env: HSK_CONFIG_PATH / HSK_DATA_DIR.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Self {
        let config = load_exam_config_from_env();
        info!(target: "hsk_mock", data_dir = %config.data_dir.display(), passing_score = config.passing_score, "Exam state ready");
        Self::new(config)
    }

    /// Construct and start a session, then register it. Returns the new id and
    /// the number of questions actually generated.
    #[instrument(level = "info", skip(self))]
    pub async fn create_session(&self, level: u8, requested: usize, seed: Option<u64>) -> Result<(String, usize), ApiError> {
        let config = self.config.clone();
        let (session, produced) = tokio::task::spawn_blocking(move || {
            let mut session = Session::new(config, level, seed)?;
            let produced = session.start(requested)?;
            Ok::<_, ExamError>((session, produced))
        })
        .await
        .map_err(|e| ApiError::Task(e.to_string()))??;

        let id = Uuid::new_v4().to_string();
        self.sessions.write().await.insert(id.clone(), session);
        info!(target: "exam", session_id = %id, level, requested, produced, "Session registered");
        Ok((id, produced))
    }

    /// Run `f` with exclusive access to one session.
    pub async fn with_session<T>(&self, id: &str, f: impl FnOnce(&mut Session) -> T) -> Result<T, ApiError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| ApiError::UnknownSession(id.to_string()))?;
        Ok(f(session))
    }

    #[instrument(level = "info", skip(self))]
    pub async fn remove_session(&self, id: &str) -> Result<(), ApiError> {
        match self.sessions.write().await.remove(id) {
            Some(_) => Ok(()),
            None => {
                warn!(target: "exam", session_id = %id, "Remove requested for unknown session");
                Err(ApiError::UnknownSession(id.to_string()))
            }
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
