use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, queue};
use rand::Rng;
use tracing::debug;

use crate::audio::Audio;
use crate::error::AppError;
use crate::level;
use crate::matching::{CardKind, MatchingGame};
use crate::note::{Note, NoteName, STAFF_LINES};
use crate::scores::{MAX_NAME_LEN, ScoreRecord, ScoreStore};
use crate::session::{Feedback, Input, Mode, Outcome, Session, perform};

/// Card keys, laid out as the 4x3 board.
const CARD_KEYS: [char; 12] = ['q', 'w', 'e', 'r', 'a', 's', 'd', 'f', 'z', 'x', 'c', 'v'];
const CARD_COLUMNS: usize = 4;
const STAFF_WIDTH: usize = 28;
const NOTE_COLUMN: usize = 16;
/// Rows drawn above and below the staff, as staff positions
const STAFF_TOP: i8 = 12;
const STAFF_BOTTOM: i8 = -1;
const STEM_LENGTH: i8 = 5;

/// Front-end state the session doesn't own.
#[derive(Debug, Default)]
struct Ui {
    name: String,
    editing: bool,
    board: Option<Vec<ScoreRecord>>,
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    None,
    Quit,
    Send(Input),
}

/// Run the game until the player quits from the menu.
pub fn run<R: Rng + ?Sized>(
    mut session: Session,
    start: Option<Mode>,
    audio: &dyn Audio,
    store: &dyn ScoreStore,
    rng: &mut R,
) -> Result<(), AppError> {
    let mut stdout = io::stdout();

    terminal::enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let result = event_loop(&mut session, start, audio, store, rng, &mut stdout);

    // Restore terminal
    let _ = execute!(stdout, Show, LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();

    result
}

fn event_loop<R: Rng + ?Sized>(
    session: &mut Session,
    start: Option<Mode>,
    audio: &dyn Audio,
    store: &dyn ScoreStore,
    rng: &mut R,
    stdout: &mut io::Stdout,
) -> Result<(), AppError> {
    let clock = Instant::now();
    let now = || clock.elapsed().as_millis() as u64;
    let mut ui = Ui::default();
    let mut last_frame: Vec<String> = Vec::new();

    if let Some(mode) = start {
        perform(session.handle(Input::Start(mode), now(), rng), audio, store);
    }

    loop {
        perform(session.advance(now(), rng), audio, store);

        if session.mode() == Mode::Leaderboard {
            if ui.board.is_none() {
                ui.board = Some(store.scores());
            }
        } else {
            ui.board = None;
        }
        if !session.round_ended() {
            ui.editing = false;
        }

        let frame = render(session, &ui);
        if frame != last_frame {
            draw(stdout, &frame)?;
            last_frame = frame;
        }

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }

        let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        else {
            continue;
        };

        match route(session, &mut ui, code) {
            Action::Quit => return Ok(()),
            Action::Send(input) => {
                debug!(?input, "key");
                perform(session.handle(input, now(), rng), audio, store);
            }
            Action::None => {}
        }
    }
}

fn draw(stdout: &mut io::Stdout, frame: &[String]) -> io::Result<()> {
    queue!(stdout, Clear(ClearType::All))?;
    for (row, line) in frame.iter().enumerate() {
        queue!(stdout, MoveTo(0, row as u16))?;
        write!(stdout, "{}", line)?;
    }
    stdout.flush()
}

/// Translate a key press in the current screen into an action.
fn route(session: &Session, ui: &mut Ui, code: KeyCode) -> Action {
    if ui.editing {
        match code {
            KeyCode::Char(c) if ui.name.chars().count() < MAX_NAME_LEN => ui.name.push(c),
            KeyCode::Backspace => {
                ui.name.pop();
            }
            KeyCode::Esc => ui.editing = false,
            KeyCode::Enter if !ui.name.trim().is_empty() => {
                ui.editing = false;
                return Action::Send(Input::SaveScore(std::mem::take(&mut ui.name)));
            }
            _ => {}
        }
        return Action::None;
    }

    let pause = || match (session.is_paused(), session.is_active()) {
        (true, _) => Action::Send(Input::Resume),
        (false, true) => Action::Send(Input::Pause),
        (false, false) => Action::None,
    };

    match session.mode() {
        Mode::Menu => match code {
            KeyCode::Char('1') => Action::Send(Input::Start(Mode::Practice)),
            KeyCode::Char('2') => Action::Send(Input::Start(Mode::Timed)),
            KeyCode::Char('3') => Action::Send(Input::Start(Mode::Matching)),
            KeyCode::Char('4') => Action::Send(Input::Start(Mode::Levels)),
            KeyCode::Char('l') => Action::Send(Input::ViewLeaderboard),
            KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
            _ => Action::None,
        },
        Mode::Leaderboard => match code {
            KeyCode::Esc | KeyCode::Backspace | KeyCode::Char('b') => Action::Send(Input::Back),
            _ => Action::None,
        },
        _ if session.round_ended() => match code {
            KeyCode::Enter => match session.outcome() {
                Some(Outcome::LevelComplete { .. }) => Action::Send(Input::NextLevel),
                _ => Action::Send(Input::Replay),
            },
            KeyCode::Char('m') | KeyCode::Esc => Action::Send(Input::Exit),
            KeyCode::Tab if session.can_save() => {
                ui.editing = true;
                Action::None
            }
            _ => Action::None,
        },
        Mode::Matching => match code {
            KeyCode::Esc => Action::Send(Input::Exit),
            KeyCode::Char(' ') => pause(),
            KeyCode::Char(_) if session.matching().is_some_and(MatchingGame::is_resolving) => {
                Action::None
            }
            KeyCode::Char(c) => CARD_KEYS
                .iter()
                .position(|&k| k == c)
                .map_or(Action::None, |i| Action::Send(Input::FlipCard(i))),
            _ => Action::None,
        },
        _ => match code {
            KeyCode::Esc => Action::Send(Input::Exit),
            KeyCode::Char(' ') => pause(),
            KeyCode::Char(c) => match NoteName::from_key(c) {
                Some(name) => Action::Send(Input::Guess(name.letter())),
                None if c.is_ascii_uppercase() => Action::Send(Input::Guess(c)),
                None => Action::None,
            },
            _ => Action::None,
        },
    }
}

fn render(session: &Session, ui: &Ui) -> Vec<String> {
    match session.mode() {
        Mode::Menu => menu_lines(),
        Mode::Leaderboard => {
            let mut lines = leaderboard_lines(ui.board.as_deref().unwrap_or(&[]));
            lines.push(String::new());
            lines.push("  Esc: back to menu".to_string());
            lines
        }
        _ => {
            let mut lines = vec![hud_line(session), String::new()];
            if session.round_ended() {
                lines.extend(round_end_lines(session, ui));
            } else if let Some(game) = session.matching() {
                lines.extend(board_lines(game));
                lines.push(String::new());
                lines.push("  Keys q-v flip cards   space: pause   Esc: exit".to_string());
            } else {
                lines.push(feedback_line(session.feedback()));
                if let Some(note) = session.current_note() {
                    let hint = (session.mode() == Mode::Practice).then_some(note.name);
                    lines.extend(staff_lines(note, hint));
                }
                lines.push(String::new());
                lines.push(controls_line());
                lines.push("  space: pause   Esc: exit".to_string());
                if session.streak() > 2 {
                    lines.push(format!("  🔥 {} Streak!", session.streak()));
                }
            }
            if session.is_paused() {
                lines.push(String::new());
                lines.push("  ‖ Paused (space to resume)".to_string());
            }
            lines
        }
    }
}

fn menu_lines() -> Vec<String> {
    [
        "",
        "  ♪ Staff Quest",
        "  Learn to read notes on the treble staff",
        "  ─────────────────────────────────────────",
        "",
        "  1  Practice       chill, with hints",
        "  2  Time Attack    60s",
        "  3  Matching       memory",
        "  4  Level Mode     progress",
        "",
        "  l  Hall of Fame",
        "  q  Quit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn hud_line(session: &Session) -> String {
    let mut hud = format!("  {}   ★ {}", session.mode().label(), session.score());
    match session.mode() {
        Mode::Timed => hud.push_str(&format!("   ⏱ {}s", session.time_remaining())),
        Mode::Levels => hud.push_str(&format!(
            "   LEVEL {}/{}   {} to go",
            session.level(),
            level::count(),
            session.level_config().required_score.saturating_sub(session.score())
        )),
        Mode::Matching => {
            if let Some(game) = session.matching() {
                hud.push_str(&format!(
                    "   ⏱ {}/{}s   round {}",
                    game.time_remaining(),
                    game.duration(),
                    game.round()
                ));
                if game.streak() > 1 {
                    hud.push_str(&format!("   🔥 x{}", game.streak()));
                }
            }
        }
        _ => {}
    }
    hud
}

fn feedback_line(feedback: Feedback) -> String {
    match feedback {
        Feedback::None => String::new(),
        Feedback::Correct => "  Perfect! ♪".to_string(),
        Feedback::Wrong => "  Try Again".to_string(),
    }
}

fn controls_line() -> String {
    let keys: Vec<String> = NoteName::ALL
        .iter()
        .map(|n| format!("{}:{} {}", n.key(), n, n.thai()))
        .collect();
    format!("  {}", keys.join("  "))
}

/// Draw the treble staff with `note` on it, top row first.
fn staff_lines(note: &Note, hint: Option<NoteName>) -> Vec<String> {
    let ledgers = note.ledger_lines();
    let head = note.staff_position;
    // stems hang down on the left of the head or rise on its right
    let (stem_column, stem) = if note.stem_down() {
        (NOTE_COLUMN - 1, head - STEM_LENGTH..head)
    } else {
        (NOTE_COLUMN + 1, head + 1..head + STEM_LENGTH + 1)
    };
    (STAFF_BOTTOM..=STAFF_TOP)
        .rev()
        .map(|pos| {
            let mut row: Vec<char> = if STAFF_LINES.contains(&pos) {
                vec!['─'; STAFF_WIDTH]
            } else {
                vec![' '; STAFF_WIDTH]
            };
            if ledgers.contains(&pos) {
                for c in &mut row[NOTE_COLUMN - 2..=NOTE_COLUMN + 2] {
                    *c = '─';
                }
            }
            if pos == STAFF_LINES[1] {
                row[2] = '𝄞';
            }
            if stem.contains(&pos) {
                row[stem_column] = '│';
            }
            if pos == head {
                row[NOTE_COLUMN] = '●';
            }
            let mut line: String = row.into_iter().collect();
            line.insert_str(0, "  ");
            if let (Some(name), true) = (hint, pos == head) {
                line.push_str(&format!("  ← {} ({} / {})", name, name.solfege(), name.thai()));
            }
            line
        })
        .collect()
}

fn card_face(game: &MatchingGame, index: usize) -> String {
    let card = &game.cards()[index];
    let body = if card.matched {
        "✓".to_string()
    } else if !card.flipped {
        "♫".to_string()
    } else {
        match card.kind {
            CardKind::Staff => format!("♩ {}", card.note.staff_place()),
            CardKind::Label => format!("{} {}", card.match_key(), card.match_key().thai()),
        }
    };
    format!("[{}] {:<14}", CARD_KEYS[index], body)
}

fn board_lines(game: &MatchingGame) -> Vec<String> {
    (0..game.cards().len())
        .collect::<Vec<_>>()
        .chunks(CARD_COLUMNS)
        .map(|row| {
            let cells: Vec<String> = row.iter().map(|&i| card_face(game, i)).collect();
            format!("  {}", cells.join(" "))
        })
        .collect()
}

fn round_end_lines(session: &Session, ui: &Ui) -> Vec<String> {
    let outcome = session.outcome();
    let (title, primary) = match outcome {
        Some(Outcome::LevelComplete { level }) => (format!("Level {} Complete!", level), "Next Level"),
        _ => ("Game Over".to_string(), "Play Again"),
    };
    let mut lines = vec![
        format!("  {}", title),
        String::new(),
        format!("  Final Score: {}", session.score()),
        String::new(),
    ];
    if session.is_saved() {
        lines.push("  ✓ Score Saved!".to_string());
    } else if ui.editing {
        lines.push(format!("  Your name: {}_", ui.name));
        lines.push("  Enter: save   Esc: cancel".to_string());
    } else if session.can_save() {
        lines.push("  Tab: save to leaderboard".to_string());
    }
    lines.push(String::new());
    lines.push(format!("  Enter: {}   m: Menu", primary));
    lines
}

/// The leaderboard: the top three as a podium, then a ranked table.
pub fn leaderboard_lines(scores: &[ScoreRecord]) -> Vec<String> {
    let mut lines = vec!["  🏆 Hall of Fame".to_string(), String::new()];
    if scores.is_empty() {
        lines.push("  No scores yet!".to_string());
        lines.push("  Play a game to set a record.".to_string());
        return lines;
    }
    let (podium, rest) = scores.split_at(scores.len().min(3));
    for (i, record) in podium.iter().enumerate() {
        lines.push(format!(
            "  #{}  {:<12}  {:<11}  {}  {:>5}",
            i + 1,
            record.player_name,
            record.mode.label(),
            short_date(&record.date),
            record.score
        ));
    }
    if !rest.is_empty() {
        lines.push(String::new());
        lines.push(format!(
            "  {:<5} {:<12}  {:<11}  {:>5}",
            "Rank", "Player", "Mode", "Score"
        ));
        for (i, record) in rest.iter().enumerate() {
            lines.push(format!(
                "  #{:<4} {:<12}  {:<11}  {:>5}",
                i + 4,
                record.player_name,
                record.mode.label(),
                record.score
            ));
        }
    }
    lines
}

fn short_date(date: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(date)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| date.to_string())
}

/// One line per level, for `staffquest levels`.
pub fn level_lines() -> Vec<String> {
    level::LEVELS
        .iter()
        .map(|l| {
            let pool = l.pool();
            format!(
                "  Level {}  {:<24} notes {}-{}  clear at {}",
                l.level,
                l.description,
                pool.first().map_or("?", |n| n.id),
                pool.last().map_or("?", |n| n.id),
                l.required_score
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::note;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn session_in(mode: Mode) -> (Session, Pcg32) {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut s = Session::new(Settings::default());
        s.handle(Input::Start(mode), 0, &mut rng);
        s.advance(0, &mut rng);
        (s, rng)
    }

    fn record(name: &str, score: u32) -> ScoreRecord {
        ScoreRecord {
            id: name.to_string(),
            player_name: name.to_string(),
            score,
            mode: Mode::Timed,
            date: "2026-03-01T10:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_menu_keys() {
        let s = Session::new(Settings::default());
        let mut ui = Ui::default();
        assert_eq!(
            route(&s, &mut ui, KeyCode::Char('2')),
            Action::Send(Input::Start(Mode::Timed))
        );
        assert_eq!(
            route(&s, &mut ui, KeyCode::Char('l')),
            Action::Send(Input::ViewLeaderboard)
        );
        assert_eq!(route(&s, &mut ui, KeyCode::Char('q')), Action::Quit);
    }

    #[test]
    fn test_guess_keys() {
        let (s, _) = session_in(Mode::Practice);
        let mut ui = Ui::default();
        assert_eq!(
            route(&s, &mut ui, KeyCode::Char('d')),
            Action::Send(Input::Guess('E'))
        );
        assert_eq!(
            route(&s, &mut ui, KeyCode::Char('X')),
            Action::Send(Input::Guess('X'))
        );
        assert_eq!(route(&s, &mut ui, KeyCode::Char('z')), Action::None);
        assert_eq!(route(&s, &mut ui, KeyCode::Char(' ')), Action::Send(Input::Pause));
        assert_eq!(route(&s, &mut ui, KeyCode::Esc), Action::Send(Input::Exit));
    }

    #[test]
    fn test_card_keys() {
        let (s, _) = session_in(Mode::Matching);
        let mut ui = Ui::default();
        assert_eq!(
            route(&s, &mut ui, KeyCode::Char('q')),
            Action::Send(Input::FlipCard(0))
        );
        assert_eq!(
            route(&s, &mut ui, KeyCode::Char('v')),
            Action::Send(Input::FlipCard(11))
        );
    }

    #[test]
    fn test_name_entry_after_game() {
        let (mut s, mut rng) = session_in(Mode::Timed);
        let c = s.current_note().unwrap().name.letter();
        s.handle(Input::Guess(c), 0, &mut rng);
        s.advance(60_000, &mut rng);
        let mut ui = Ui::default();

        assert_eq!(route(&s, &mut ui, KeyCode::Tab), Action::None);
        assert!(ui.editing);
        for c in "Lee".chars() {
            route(&s, &mut ui, KeyCode::Char(c));
        }
        route(&s, &mut ui, KeyCode::Backspace);
        assert_eq!(ui.name, "Le");
        assert_eq!(
            route(&s, &mut ui, KeyCode::Enter),
            Action::Send(Input::SaveScore("Le".to_string()))
        );
        assert!(!ui.editing);
        assert_eq!(route(&s, &mut ui, KeyCode::Enter), Action::Send(Input::Replay));
    }

    #[test]
    fn test_name_entry_is_bounded_and_needs_text() {
        let (mut s, mut rng) = session_in(Mode::Timed);
        let c = s.current_note().unwrap().name.letter();
        s.handle(Input::Guess(c), 0, &mut rng);
        s.advance(60_000, &mut rng);
        let mut ui = Ui::default();
        route(&s, &mut ui, KeyCode::Tab);
        route(&s, &mut ui, KeyCode::Char(' '));
        assert_eq!(route(&s, &mut ui, KeyCode::Enter), Action::None);
        for _ in 0..20 {
            route(&s, &mut ui, KeyCode::Char('x'));
        }
        assert_eq!(ui.name.chars().count(), MAX_NAME_LEN);
    }

    #[test]
    fn test_level_complete_enter_advances() {
        let (mut s, mut rng) = session_in(Mode::Levels);
        let mut now = 0;
        while !s.round_ended() {
            let c = s.current_note().unwrap().name.letter();
            s.handle(Input::Guess(c), now, &mut rng);
            now += 800;
            s.advance(now, &mut rng);
        }
        let mut ui = Ui::default();
        assert_eq!(route(&s, &mut ui, KeyCode::Enter), Action::Send(Input::NextLevel));
        assert!(render(&s, &ui).iter().any(|l| l.contains("Level 1 Complete!")));
    }

    #[test]
    fn test_staff_draws_note_on_its_row() {
        let e4 = note::find("E4").unwrap();
        let lines = staff_lines(e4, None);
        assert_eq!(lines.len(), 14);
        // top row is position 12, so E4 (position 2) is row 10
        assert!(lines[10].contains('●'));
        assert_eq!(lines.iter().filter(|l| l.contains('●')).count(), 1);
        let staff_rows = lines.iter().filter(|l| l.contains("────────")).count();
        assert_eq!(staff_rows, 5);
    }

    #[test]
    fn test_middle_c_gets_ledger_and_hint() {
        let c4 = note::find("C4").unwrap();
        let lines = staff_lines(c4, Some(NoteName::C));
        let row = &lines[12];
        assert!(row.contains("──●──"));
        assert!(row.contains("← C (Do / โด)"));
    }

    #[test]
    fn test_leaderboard_layout() {
        assert!(leaderboard_lines(&[]).iter().any(|l| l.contains("No scores yet!")));

        let scores: Vec<ScoreRecord> = (0..5).map(|i| record(&format!("p{}", i), 50 - i)).collect();
        let lines = leaderboard_lines(&scores);
        assert!(lines.iter().any(|l| l.starts_with("  #1  p0") && l.contains("2026-03-01")));
        assert!(lines.iter().any(|l| l.contains("Rank")));
        assert!(lines.iter().any(|l| l.starts_with("  #4") && l.contains("p3")));
        assert!(lines.iter().any(|l| l.starts_with("  #5") && l.contains("p4")));
    }

    #[test]
    fn test_matching_board_hides_faces() {
        let (s, _) = session_in(Mode::Matching);
        let lines = render(&s, &Ui::default());
        let board: Vec<&String> = lines.iter().filter(|l| l.contains("[q]")).collect();
        assert_eq!(board.len(), 1);
        assert_eq!(board_lines(s.matching().unwrap()).len(), 3);
        assert_eq!(lines.iter().filter(|l| l.contains('♫')).count(), 3);
    }

    #[test]
    fn test_level_lines() {
        let lines = level_lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("C4-G4"));
        assert!(lines[1].contains("E4-D5"));
    }
}
