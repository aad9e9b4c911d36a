use async_trait::async_trait;
use augur_core::types::{AgentState, StateStore};
use augur_core::{AugurError, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One JSON document per agent in a directory
///
/// Saves write a temporary sibling file and rename it over the target, so a
/// reader never observes a half-written document. Loads run through the
/// state normalizer; text that is not JSON at all is an error rather
/// than an empty state.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    /// Open (and create if needed) a state directory
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| {
            AugurError::storage(format!(
                "Failed to create state directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the state files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for an agent id
    ///
    /// Characters outside `[A-Za-z0-9_-]` become `_`; when that changes the
    /// id, the first 16 hex digits of the id's SHA-256 are appended so
    /// distinct ids stay distinct. The digest is stable across builds.
    pub fn file_name(agent_id: &str) -> String {
        let sanitized: String = agent_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if sanitized == agent_id && !sanitized.is_empty() {
            format!("{}.json", sanitized)
        } else {
            let digest = Sha256::digest(agent_id.as_bytes());
            let suffix: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
            format!("{}-{}.json", sanitized, suffix)
        }
    }

    /// Full path of an agent's state file
    pub fn path_for(&self, agent_id: &str) -> PathBuf {
        self.dir.join(Self::file_name(agent_id))
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self, agent_id: &str) -> Result<Option<AgentState>> {
        let path = self.path_for(agent_id);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AugurError::storage(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let state = AgentState::from_json_str(&text, Utc::now())?;
        debug!(
            "Loaded state for '{}' ({} hypotheses) from {}",
            agent_id,
            state.hypotheses.len(),
            path.display()
        );
        Ok(Some(state))
    }

    async fn save(&self, agent_id: &str, state: &AgentState) -> Result<()> {
        let path = self.path_for(agent_id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(state)?;

        tokio::fs::write(&tmp, bytes).await.map_err(|e| {
            AugurError::storage(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            AugurError::storage(format!(
                "Failed to move {} into place: {}",
                tmp.display(),
                e
            ))
        })?;

        debug!("Saved state for '{}' to {}", agent_id, path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}
