mod audio;
mod config;
mod error;
mod level;
mod matching;
mod note;
mod play;
mod scores;
mod selector;
mod session;
mod timer;

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::Settings;
use error::AppError;
use scores::{JsonScoreStore, MemoryScoreStore, ScoreStore};
use session::{Mode, Session};

#[derive(Parser)]
#[command(name = "staffquest", about = "Learn to read notes on the treble staff")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Score table (defaults to the user data directory)
    #[arg(long, global = true)]
    scores: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Play in the terminal
    Play {
        /// Skip the menu and start this mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Seed for note selection and card shuffles
        #[arg(long)]
        seed: Option<u64>,

        /// Run without sound
        #[arg(long)]
        mute: bool,
    },

    /// Print the Hall of Fame
    Scores {
        /// Only show scores from this mode
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
    },

    /// List the levels and their note ranges
    Levels,

    /// List every note with its staff position and frequency
    Notes {
        /// Only show this note, e.g. C4
        id: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Practice,
    Timed,
    Matching,
    Levels,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Practice => Mode::Practice,
            ModeArg::Timed => Mode::Timed,
            ModeArg::Matching => Mode::Matching,
            ModeArg::Levels => Mode::Levels,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Play { mode, seed, mute } => {
            // the terminal belongs to the game, so logs go to a file
            init_logging(log_path().as_deref());
            let settings = load_settings(cli.settings.as_deref());
            let store = open_store(cli.scores);
            let audio = audio::open(mute);
            let seed = seed.unwrap_or_else(rand::random);
            info!(seed, "starting");
            let mut rng = Pcg32::seed_from_u64(seed);
            play::run(
                Session::new(settings),
                mode.map(Mode::from),
                audio.as_ref(),
                store.as_ref(),
                &mut rng,
            )
        }
        Command::Scores { mode } => {
            init_logging(None);
            print_scores(cli.scores, mode.map(Mode::from))
        }
        Command::Levels => {
            for line in play::level_lines() {
                println!("{}", line);
            }
            Ok(())
        }
        Command::Notes { id } => print_notes(id.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Send logs to `file` when given, otherwise to stderr at `warn`.
/// `RUST_LOG` overrides either default.
fn init_logging(file: Option<&Path>) {
    let writer = file.and_then(|path| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        File::options().create(true).append(true).open(path).ok()
    });

    match writer {
        Some(log) => {
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(log))
                .with_ansi(false)
                .init();
        }
        None => {
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

fn log_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("staffquest").join("staffquest.log"))
}

fn load_settings(path: Option<&Path>) -> Settings {
    match path.map(Path::to_path_buf).or_else(Settings::default_path) {
        Some(path) => Settings::load(&path),
        None => Settings::default(),
    }
}

/// The score file, or an in-memory table when there is nowhere to put one.
fn open_store(path: Option<PathBuf>) -> Box<dyn ScoreStore> {
    match path.map(Ok).unwrap_or_else(JsonScoreStore::default_path) {
        Ok(path) => {
            info!("[scores] using {}", path.display());
            Box::new(JsonScoreStore::open(path))
        }
        Err(e) => {
            warn!("{}; scores will not be kept", e);
            Box::new(MemoryScoreStore::default())
        }
    }
}

fn print_scores(path: Option<PathBuf>, mode: Option<Mode>) -> Result<(), AppError> {
    let path = match path {
        Some(path) => path,
        None => JsonScoreStore::default_path()?,
    };
    let store = JsonScoreStore::open(path);
    let scores = match mode {
        Some(mode) => store.by_mode(mode),
        None => store.scores(),
    };
    println!("Scores from {}", store.path().display());
    for line in play::leaderboard_lines(&scores) {
        println!("{}", line);
    }
    Ok(())
}

fn print_notes(id: Option<&str>) -> Result<(), AppError> {
    let notes: Vec<&note::Note> = match id {
        Some(id) => vec![note::find(id).ok_or_else(|| AppError::UnknownNote(id.to_string()))?],
        None => note::CATALOG.iter().collect(),
    };
    println!("Note MIDI        Hz  Key  Staff          Do   Thai");
    for n in notes {
        println!(
            "{:<4} {:>4} {:>9.2}  {:<4} {:<14} {:<4} {}",
            n.id,
            n.name.to_midi(n.octave),
            n.frequency,
            n.name.key(),
            n.staff_place(),
            n.name.solfege(),
            n.name.thai()
        );
    }
    Ok(())
}
