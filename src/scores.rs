use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{GameError, StoreError};
use crate::session::Mode;

pub const MAX_SCORES: usize = 50;
pub const MAX_NAME_LEN: usize = 12;

/// A trimmed, non-empty player name of at most [`MAX_NAME_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(raw: &str) -> Result<Self, GameError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(GameError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(GameError::NameTooLong { max: MAX_NAME_LEN });
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub id: String,
    pub player_name: String,
    pub score: u32,
    pub mode: Mode,
    /// RFC 3339 UTC timestamp
    pub date: String,
}

/// A score waiting to be stamped and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScore {
    pub player_name: PlayerName,
    pub score: u32,
    pub mode: Mode,
}

impl NewScore {
    fn stamp(self) -> ScoreRecord {
        ScoreRecord {
            id: format!("{:032x}", rand::random::<u128>()),
            player_name: self.player_name.0,
            score: self.score,
            mode: self.mode,
            date: chrono::Utc::now().to_rfc3339(),
        }
    }
}

pub trait ScoreStore {
    /// Every stored score, highest first.
    fn scores(&self) -> Vec<ScoreRecord>;

    /// Stamp and store a score. Returns the stored record, which may already
    /// have been trimmed off the table if it ranks below the cap.
    fn save(&self, score: NewScore) -> Result<ScoreRecord, StoreError>;

    fn by_mode(&self, mode: Mode) -> Vec<ScoreRecord> {
        self.scores().into_iter().filter(|s| s.mode == mode).collect()
    }
}

/// Append, re-rank (stable, so equal scores keep arrival order) and trim.
fn insert_ranked(scores: &mut Vec<ScoreRecord>, record: ScoreRecord) {
    scores.push(record);
    scores.sort_by_key(|s| Reverse(s.score));
    scores.truncate(MAX_SCORES);
}

/// Scores in a JSON file, written atomically via a temp file.
#[derive(Debug)]
pub struct JsonScoreStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonScoreStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn default_path() -> Result<PathBuf, StoreError> {
        dirs::data_dir()
            .map(|d| d.join("staffquest").join("scores.json"))
            .ok_or(StoreError::NoDataDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Vec<ScoreRecord> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) => {
                debug!("[scores] {} not loaded: {e}", self.path.display());
                return Vec::new();
            }
        };
        let mut scores: Vec<ScoreRecord> = serde_json::from_str(&text)
            .map_err(|e| warn!("[scores] parse error {}: {e}", self.path.display()))
            .unwrap_or_default();
        scores.sort_by_key(|s| Reverse(s.score));
        scores.truncate(MAX_SCORES);
        scores
    }

    fn store(&self, scores: &[ScoreRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(scores)?;
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(io_err)?;
        fs::rename(&temp_path, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl ScoreStore for JsonScoreStore {
    fn scores(&self) -> Vec<ScoreRecord> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.load()
    }

    fn save(&self, score: NewScore) -> Result<ScoreRecord, StoreError> {
        // load, insert and write under one lock so two saves can't interleave
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut scores = self.load();
        let record = score.stamp();
        insert_ranked(&mut scores, record.clone());
        self.store(&scores)?;
        debug!(id = %record.id, score = record.score, "[scores] saved");
        Ok(record)
    }
}

/// In-process store, used when no data directory is available and in tests.
#[derive(Debug, Default)]
pub struct MemoryScoreStore {
    scores: Mutex<Vec<ScoreRecord>>,
}

impl ScoreStore for MemoryScoreStore {
    fn scores(&self) -> Vec<ScoreRecord> {
        self.scores
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn save(&self, score: NewScore) -> Result<ScoreRecord, StoreError> {
        let mut scores = self.scores.lock().unwrap_or_else(|e| e.into_inner());
        let record = score.stamp();
        insert_ranked(&mut scores, record.clone());
        Ok(record)
    }
}
