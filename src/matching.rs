use rand::Rng;
use rand::seq::{IteratorRandom, SliceRandom};
use tracing::{debug, info};

use crate::audio::Waveform;
use crate::config::Settings;
use crate::note::{self, Note, NoteName};
use crate::session::Effect;
use crate::timer::Countdown;

pub const PAIRS_PER_ROUND: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    /// The note drawn on a staff
    Staff,
    /// The note's letter name
    Label,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: u64,
    pub kind: CardKind,
    pub note: &'static Note,
    pub flipped: bool,
    pub matched: bool,
}

impl Card {
    pub fn match_key(&self) -> NoteName {
        self.note.name
    }

    /// Two distinct cards pair up when their keys agree and their kinds differ.
    pub fn pairs_with(&self, other: &Card) -> bool {
        self.id != other.id && self.kind != other.kind && self.match_key() == other.match_key()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Resolve(usize, usize),
    FlipBack(usize, usize),
    Deal,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    due_ms: u64,
    round: u32,
    action: Action,
}

#[derive(Debug)]
pub struct MatchingGame {
    settings: Settings,
    cards: Vec<Card>,
    face_up: Vec<usize>,
    score: u32,
    streak: u32,
    round: u32,
    next_card_id: u64,
    timer: Countdown,
    pending: Option<Pending>,
    finished: bool,
}

impl MatchingGame {
    /// Deal the first round and start the countdown.
    pub fn new<R: Rng + ?Sized>(settings: &Settings, now_ms: u64, rng: &mut R) -> Self {
        let mut game = Self {
            settings: settings.clone(),
            cards: Vec::with_capacity(PAIRS_PER_ROUND * 2),
            face_up: Vec::with_capacity(2),
            score: 0,
            streak: 0,
            round: 0,
            next_card_id: 0,
            timer: Countdown::new(settings.matching_duration_secs),
            pending: None,
            finished: false,
        };
        game.deal(rng);
        game.timer.start(now_ms);
        game
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Rounds dealt so far, counting the current one.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn time_remaining(&self) -> u32 {
        self.timer.remaining()
    }

    pub fn duration(&self) -> u32 {
        self.timer.duration()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// True while a revealed pair is waiting to be resolved.
    pub fn is_resolving(&self) -> bool {
        self.pending.is_some()
    }

    pub fn board_cleared(&self) -> bool {
        self.cards.iter().all(|c| c.matched)
    }

    /// Turn a card face up. Ignored while a pair is being resolved, when two
    /// cards are already up, or when the card is already up or matched.
    pub fn flip(&mut self, index: usize, now_ms: u64) -> Vec<Effect> {
        if self.finished || self.pending.is_some() || self.face_up.len() >= 2 {
            return Vec::new();
        }
        let Some(card) = self.cards.get_mut(index) else {
            return Vec::new();
        };
        if card.flipped || card.matched {
            return Vec::new();
        }
        card.flipped = true;
        self.face_up.push(index);

        let mut effects = vec![Effect::PlayTone {
            frequency: 600.0,
            waveform: Waveform::Sine,
            seconds: 0.05,
        }];

        if let [a, b] = self.face_up[..] {
            if self.cards[a].pairs_with(&self.cards[b]) {
                let points =
                    self.settings.match_base_points + self.settings.match_streak_points * self.streak;
                self.score += points;
                self.streak += 1;
                debug!(key = %self.cards[a].match_key(), points, "pair found");
                effects.push(Effect::PlayCorrect);
                self.schedule(now_ms + self.settings.match_resolve_ms, Action::Resolve(a, b));
            } else {
                self.streak = 0;
                effects.push(Effect::PlayIncorrect);
                self.schedule(
                    now_ms + self.settings.mismatch_flip_back_ms,
                    Action::FlipBack(a, b),
                );
            }
        }
        effects
    }

    /// Run the countdown and any due resolution.
    pub fn advance<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) -> Vec<Effect> {
        if self.finished {
            return Vec::new();
        }
        if self.timer.poll(now_ms) {
            self.finished = true;
            self.pending = None;
            info!(score = self.score, rounds = self.round, "matching time up");
            return Vec::new();
        }

        let mut effects = Vec::new();
        let due = self
            .pending
            .filter(|p| p.due_ms <= now_ms && p.round == self.round);
        let Some(pending) = due else {
            return effects;
        };
        self.pending = None;

        match pending.action {
            Action::Resolve(a, b) => {
                self.cards[a].matched = true;
                self.cards[b].matched = true;
                self.face_up.clear();
                if self.board_cleared() {
                    self.score += self.settings.board_clear_bonus;
                    info!(round = self.round, score = self.score, "board cleared");
                    effects.push(Effect::PlayTone {
                        frequency: 880.0,
                        waveform: Waveform::Triangle,
                        seconds: 0.3,
                    });
                    self.schedule(now_ms + self.settings.next_round_ms, Action::Deal);
                }
            }
            Action::FlipBack(a, b) => {
                self.cards[a].flipped = false;
                self.cards[b].flipped = false;
                self.face_up.clear();
            }
            Action::Deal => self.deal(rng),
        }
        effects
    }

    pub fn pause(&mut self, now_ms: u64) {
        self.timer.pause(now_ms);
    }

    /// Resume after a pause of `paused_for_ms`, pushing back any pending step.
    pub fn resume(&mut self, now_ms: u64, paused_for_ms: u64) {
        self.timer.resume(now_ms);
        if let Some(p) = self.pending.as_mut() {
            p.due_ms += paused_for_ms;
        }
    }

    fn schedule(&mut self, due_ms: u64, action: Action) {
        self.pending = Some(Pending {
            due_ms,
            round: self.round,
            action,
        });
    }

    /// Replace the board with six fresh pairs of distinct pitch classes.
    fn deal<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.round += 1;
        self.pending = None;
        self.face_up.clear();
        self.cards.clear();

        let names = NoteName::ALL.iter().copied().choose_multiple(rng, PAIRS_PER_ROUND);
        for name in names {
            let Some(note) = note::of_name(name).choose(rng) else {
                continue;
            };
            for kind in [CardKind::Staff, CardKind::Label] {
                self.next_card_id += 1;
                self.cards.push(Card {
                    id: self.next_card_id,
                    kind,
                    note,
                    flipped: false,
                    matched: false,
                });
            }
        }
        self.cards.shuffle(rng);
        debug!(round = self.round, "dealt");
    }
}
