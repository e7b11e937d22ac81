use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Length of a Time Attack game in seconds
    pub timed_duration_secs: u32,
    /// Length of a Matching game in seconds
    pub matching_duration_secs: u32,
    /// Feedback shown after a correct guess before the next note
    pub correct_advance_ms: u64,
    /// Feedback shown after a wrong guess
    pub wrong_clear_ms: u64,
    /// Delay between the clearing guess and the level-complete screen
    pub level_complete_ms: u64,
    /// Delay before a matched pair is taken off the board
    pub match_resolve_ms: u64,
    /// Delay before a mismatched pair is turned back over
    pub mismatch_flip_back_ms: u64,
    /// Delay between clearing the board and dealing the next round
    pub next_round_ms: u64,
    pub match_base_points: u32,
    /// Extra points per pair already matched in the current streak
    pub match_streak_points: u32,
    pub board_clear_bonus: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timed_duration_secs: 60,
            matching_duration_secs: 60,
            correct_advance_ms: 800,
            wrong_clear_ms: 500,
            level_complete_ms: 500,
            match_resolve_ms: 500,
            mismatch_flip_back_ms: 1000,
            next_round_ms: 500,
            match_base_points: 10,
            match_streak_points: 2,
            board_clear_bonus: 50,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("staffquest").join("settings.json"))
    }

    /// Load settings from `path`, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        let mut settings = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| warn!("[settings] parse error {}: {e}", path.display()))
                .unwrap_or_default(),
            Err(e) => {
                debug!("[settings] {} not loaded: {e}", path.display());
                Settings::default()
            }
        };
        settings.sanitize();
        settings
    }

    /// A countdown needs at least one second to run.
    pub fn sanitize(&mut self) {
        self.timed_duration_secs = self.timed_duration_secs.max(1);
        self.matching_duration_secs = self.matching_duration_secs.max(1);
    }
}
