use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::audio::{Audio, Waveform};
use crate::config::Settings;
use crate::error::GameError;
use crate::level::{self, LevelConfig};
use crate::matching::MatchingGame;
use crate::note::{Note, NoteName};
use crate::scores::{NewScore, PlayerName, ScoreStore};
use crate::selector;
use crate::timer::Countdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    Menu,
    Practice,
    Timed,
    Levels,
    Matching,
    Leaderboard,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Menu => "Menu",
            Mode::Practice => "Practice",
            Mode::Timed => "Time Attack",
            Mode::Levels => "Levels",
            Mode::Matching => "Matching",
            Mode::Leaderboard => "Hall of Fame",
        }
    }

    /// Modes where the player names the note on the staff.
    pub fn is_guessing(self) -> bool {
        matches!(self, Mode::Practice | Mode::Timed | Mode::Levels)
    }

    pub fn is_game(self) -> bool {
        self.is_guessing() || self == Mode::Matching
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Feedback {
    #[default]
    None,
    Correct,
    Wrong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Start(Mode),
    /// A pitch-class symbol; anything that isn't one of `A`-`G` is a miss
    Guess(char),
    FlipCard(usize),
    Replay,
    NextLevel,
    Exit,
    ViewLeaderboard,
    Back,
    SaveScore(String),
    Pause,
    Resume,
}

/// Side effects requested by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    PlayTone {
        frequency: f64,
        waveform: Waveform,
        seconds: f64,
    },
    PlayCorrect,
    PlayIncorrect,
    SaveScore(NewScore),
}

/// How a finished run is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    LevelComplete { level: u32 },
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    DrawInitialNote,
    NextNote,
    ClearFeedback,
    CompleteLevel,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    due_ms: u64,
    generation: u64,
    action: Deferred,
}

/// One player's game, from menu to game over.
///
/// Input and the passage of time go in through [`Session::handle`] and
/// [`Session::advance`]; both return the [`Effect`]s the caller carries out.
/// A delayed step (clearing feedback, the next note, the level-complete
/// screen) sits in a single slot stamped with the session generation.
/// Starting, replaying, advancing a level or leaving for the menu bumps the
/// generation, so a step scheduled for an abandoned game never fires.
#[derive(Debug)]
pub struct Session {
    settings: Settings,
    mode: Mode,
    active: bool,
    round_ended: bool,
    note: Option<&'static Note>,
    score: u32,
    streak: u32,
    feedback: Feedback,
    level: u32,
    timer: Countdown,
    matching: Option<MatchingGame>,
    pending: Option<Pending>,
    generation: u64,
    saved: bool,
    paused_at: Option<u64>,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        let timer = Countdown::new(settings.timed_duration_secs);
        Self {
            settings,
            mode: Mode::Menu,
            active: false,
            round_ended: false,
            note: None,
            score: 0,
            streak: 0,
            feedback: Feedback::None,
            level: 1,
            timer,
            matching: None,
            pending: None,
            generation: 0,
            saved: false,
            paused_at: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn round_ended(&self) -> bool {
        self.round_ended
    }

    pub fn current_note(&self) -> Option<&'static Note> {
        self.note
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn feedback(&self) -> Feedback {
        self.feedback
    }

    pub fn time_remaining(&self) -> u32 {
        self.timer.remaining()
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn level_config(&self) -> &'static LevelConfig {
        level::get(self.level)
    }

    pub fn matching(&self) -> Option<&MatchingGame> {
        self.matching.as_ref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn is_saved(&self) -> bool {
        self.saved
    }

    /// Only finished, scoring, non-practice runs go on the leaderboard, once.
    pub fn can_save(&self) -> bool {
        self.round_ended
            && self.mode.is_game()
            && self.mode != Mode::Practice
            && self.score > 0
            && !self.saved
    }

    pub fn outcome(&self) -> Option<Outcome> {
        if !self.round_ended {
            return None;
        }
        if self.mode == Mode::Levels && self.level_config().has_next() {
            Some(Outcome::LevelComplete { level: self.level })
        } else {
            Some(Outcome::GameOver)
        }
    }

    pub fn handle<R: Rng + ?Sized>(&mut self, input: Input, now_ms: u64, rng: &mut R) -> Vec<Effect> {
        match input {
            Input::Start(mode) => self.start(mode, now_ms, rng),
            Input::Guess(symbol) => self.guess(symbol, now_ms),
            Input::FlipCard(index) => self.flip(index, now_ms),
            Input::Replay => {
                if self.round_ended {
                    self.begin(self.mode, now_ms, rng)
                } else {
                    Vec::new()
                }
            }
            Input::NextLevel => {
                self.next_level(rng);
                Vec::new()
            }
            Input::Exit => {
                self.exit_to_menu();
                Vec::new()
            }
            Input::ViewLeaderboard => {
                if self.mode == Mode::Menu {
                    self.mode = Mode::Leaderboard;
                }
                Vec::new()
            }
            Input::Back => {
                if self.mode == Mode::Leaderboard {
                    self.mode = Mode::Menu;
                }
                Vec::new()
            }
            Input::SaveScore(name) => self.save_score(&name).unwrap_or_else(|e| {
                debug!("save ignored: {e}");
                Vec::new()
            }),
            Input::Pause => {
                self.pause(now_ms);
                Vec::new()
            }
            Input::Resume => {
                self.resume(now_ms);
                Vec::new()
            }
        }
    }

    /// Fire whatever has come due by `now_ms`: the pending step, the Time
    /// Attack countdown and the matching game.
    pub fn advance<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) -> Vec<Effect> {
        if self.paused_at.is_some() {
            return Vec::new();
        }

        if let Some(p) = self.pending.filter(|p| p.due_ms <= now_ms) {
            self.pending = None;
            if p.generation == self.generation {
                self.run(p.action, rng);
            } else {
                debug!(action = ?p.action, "dropped step from an abandoned game");
            }
        }

        if self.mode == Mode::Timed && self.active && self.timer.poll(now_ms) {
            info!(score = self.score, "time up");
            self.end_round();
        }

        let mut effects = Vec::new();
        if let Some(game) = self.matching.as_mut() {
            effects.extend(game.advance(now_ms, rng));
            self.score = game.score();
            if game.is_finished() && self.active {
                self.end_round();
            }
        }
        effects
    }

    /// Queue the current score for the leaderboard.
    pub fn save_score(&mut self, name: &str) -> Result<Vec<Effect>, GameError> {
        if !self.can_save() {
            return Err(GameError::SaveUnavailable);
        }
        let player_name = PlayerName::new(name)?;
        debug!(player = player_name.as_str(), score = self.score, "queueing score");
        self.saved = true;
        Ok(vec![Effect::SaveScore(NewScore {
            player_name,
            score: self.score,
            mode: self.mode,
        })])
    }

    fn start<R: Rng + ?Sized>(&mut self, mode: Mode, now_ms: u64, rng: &mut R) -> Vec<Effect> {
        if self.mode != Mode::Menu {
            return Vec::new();
        }
        match mode {
            Mode::Menu => Vec::new(),
            Mode::Leaderboard => {
                self.mode = Mode::Leaderboard;
                Vec::new()
            }
            _ => self.begin(mode, now_ms, rng),
        }
    }

    fn begin<R: Rng + ?Sized>(&mut self, mode: Mode, now_ms: u64, rng: &mut R) -> Vec<Effect> {
        self.reset();
        self.mode = mode;
        self.active = true;
        if mode == Mode::Levels {
            self.level = 1;
        }
        if mode == Mode::Timed {
            self.timer.start(now_ms);
        }
        if mode == Mode::Matching {
            self.matching = Some(MatchingGame::new(&self.settings, now_ms, rng));
        } else {
            // drawn on the next advance, once the mode has been entered
            self.schedule(now_ms, Deferred::DrawInitialNote);
        }
        info!(mode = mode.label(), "game started");

        // opens the audio output in response to the key press
        vec![Effect::PlayTone {
            frequency: 0.0,
            waveform: Waveform::Sine,
            seconds: 0.001,
        }]
    }

    fn guess(&mut self, symbol: char, now_ms: u64) -> Vec<Effect> {
        if !self.active
            || self.feedback != Feedback::None
            || self.paused_at.is_some()
            || !self.mode.is_guessing()
        {
            return Vec::new();
        }
        let Some(note) = self.note else {
            return Vec::new();
        };

        if NoteName::from_letter(symbol) == Some(note.name) {
            self.feedback = Feedback::Correct;
            self.score += 1;
            self.streak += 1;
            if self.mode == Mode::Levels && self.score >= self.level_config().required_score {
                self.schedule(
                    now_ms + self.settings.level_complete_ms,
                    Deferred::CompleteLevel,
                );
            } else {
                self.schedule(now_ms + self.settings.correct_advance_ms, Deferred::NextNote);
            }
            vec![
                Effect::PlayCorrect,
                Effect::PlayTone {
                    frequency: note.frequency,
                    waveform: Waveform::Triangle,
                    seconds: 0.3,
                },
            ]
        } else {
            self.feedback = Feedback::Wrong;
            self.streak = 0;
            self.schedule(now_ms + self.settings.wrong_clear_ms, Deferred::ClearFeedback);
            vec![Effect::PlayIncorrect]
        }
    }

    fn flip(&mut self, index: usize, now_ms: u64) -> Vec<Effect> {
        if !self.active || self.paused_at.is_some() {
            return Vec::new();
        }
        let Some(game) = self.matching.as_mut() else {
            return Vec::new();
        };
        let effects = game.flip(index, now_ms);
        self.score = game.score();
        effects
    }

    fn next_level<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.round_ended || self.mode != Mode::Levels {
            return;
        }
        if !self.level_config().has_next() {
            info!("all levels cleared");
            self.exit_to_menu();
            return;
        }
        let previous = self.note.map(|n| n.id);
        self.reset();
        self.level += 1;
        self.active = true;
        self.note = Some(selector::next_note(
            Mode::Levels,
            self.level_config(),
            previous,
            rng,
        ));
        info!(level = self.level, "next level");
    }

    fn exit_to_menu(&mut self) {
        self.reset();
        self.mode = Mode::Menu;
        self.note = None;
    }

    /// Clear per-run state and invalidate anything still scheduled.
    fn reset(&mut self) {
        self.generation += 1;
        self.pending = None;
        self.active = false;
        self.round_ended = false;
        self.score = 0;
        self.streak = 0;
        self.feedback = Feedback::None;
        self.saved = false;
        self.paused_at = None;
        self.note = None;
        self.matching = None;
        self.timer = Countdown::new(self.settings.timed_duration_secs);
    }

    fn end_round(&mut self) {
        self.active = false;
        self.round_ended = true;
        self.pending = None;
        self.feedback = Feedback::None;
        self.timer.stop();
    }

    fn schedule(&mut self, due_ms: u64, action: Deferred) {
        self.pending = Some(Pending {
            due_ms,
            generation: self.generation,
            action,
        });
    }

    fn run<R: Rng + ?Sized>(&mut self, action: Deferred, rng: &mut R) {
        match action {
            Deferred::DrawInitialNote | Deferred::NextNote => {
                self.feedback = Feedback::None;
                self.note = Some(selector::next_note(
                    self.mode,
                    self.level_config(),
                    self.note.map(|n| n.id),
                    rng,
                ));
            }
            Deferred::ClearFeedback => self.feedback = Feedback::None,
            Deferred::CompleteLevel => {
                info!(level = self.level, score = self.score, "level complete");
                self.end_round();
            }
        }
    }

    fn pause(&mut self, now_ms: u64) {
        if !self.active || self.paused_at.is_some() {
            return;
        }
        self.paused_at = Some(now_ms);
        self.timer.pause(now_ms);
        if let Some(game) = self.matching.as_mut() {
            game.pause(now_ms);
        }
    }

    fn resume(&mut self, now_ms: u64) {
        let Some(at) = self.paused_at.take() else {
            return;
        };
        let paused_for = now_ms.saturating_sub(at);
        self.timer.resume(now_ms);
        if let Some(p) = self.pending.as_mut() {
            p.due_ms += paused_for;
        }
        if let Some(game) = self.matching.as_mut() {
            game.resume(now_ms, paused_for);
        }
    }
}

/// Carry out effects against the audio output and the score store.
/// Failures are logged; they never reach the game.
pub fn perform(effects: Vec<Effect>, audio: &dyn Audio, store: &dyn ScoreStore) {
    for effect in effects {
        match effect {
            Effect::PlayTone {
                frequency,
                waveform,
                seconds,
            } => audio.play_tone(frequency, waveform, seconds),
            Effect::PlayCorrect => audio.play_correct(),
            Effect::PlayIncorrect => audio.play_incorrect(),
            Effect::SaveScore(score) => match store.save(score) {
                Ok(record) => info!(player = %record.player_name, score = record.score, "score saved"),
                Err(e) => warn!("score not saved: {e}"),
            },
        }
    }
}
