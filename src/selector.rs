use rand::Rng;
use rand::seq::SliceRandom;

use crate::level::LevelConfig;
use crate::note::{CATALOG, Note};
use crate::session::Mode;

/// The notes a mode draws from. Levels mode uses the level's window, every
/// other mode the whole catalog.
pub fn pool(mode: Mode, level: &LevelConfig) -> &'static [Note] {
    match mode {
        Mode::Levels => level.pool(),
        _ => &CATALOG,
    }
}

/// Draw a note uniformly from the mode's pool.
///
/// If the draw repeats `exclude` and the pool has more than one note, one more
/// draw is made and kept whatever it is. Repeats are therefore rare, not
/// impossible.
pub fn next_note<R: Rng + ?Sized>(
    mode: Mode,
    level: &LevelConfig,
    exclude: Option<&str>,
    rng: &mut R,
) -> &'static Note {
    draw(pool(mode, level), exclude, rng)
}

pub fn draw<R: Rng + ?Sized>(
    pool: &'static [Note],
    exclude: Option<&str>,
    rng: &mut R,
) -> &'static Note {
    let mut pick = pool.choose(rng).unwrap_or(&CATALOG[0]);
    if pool.len() > 1 && Some(pick.id) == exclude {
        pick = pool.choose(rng).unwrap_or(pick);
    }
    pick
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::HashMap;

    #[test]
    fn test_levels_mode_stays_in_window() {
        let mut rng = Pcg32::seed_from_u64(7);
        let cfg = level::get(2);
        for _ in 0..500 {
            let n = next_note(Mode::Levels, cfg, None, &mut rng);
            assert!((2..=8).contains(&(n.staff_position as usize)), "{}", n.id);
        }
    }

    #[test]
    fn test_other_modes_use_full_catalog() {
        let mut rng = Pcg32::seed_from_u64(11);
        let mut seen = HashMap::new();
        for _ in 0..2000 {
            let n = next_note(Mode::Timed, level::get(1), None, &mut rng);
            *seen.entry(n.id).or_insert(0) += 1;
        }
        assert_eq!(seen.len(), CATALOG.len());
    }

    #[test]
    fn test_exclusion_biases_against_repeat() {
        let mut rng = Pcg32::seed_from_u64(42);
        let cfg = level::get(1);
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for _ in 0..1000 {
            let n = next_note(Mode::Levels, cfg, Some("E4"), &mut rng);
            *counts.entry(n.id).or_insert(0) += 1;
        }
        // a repeat needs two hits in a row: ~1/25 of draws
        let repeats = counts.get("E4").copied().unwrap_or(0);
        // one retry only: repeats are rare but do happen
        assert!((10..=80).contains(&repeats), "excluded note drawn {} times", repeats);
        for id in ["C4", "D4", "F4", "G4"] {
            let c = counts.get(id).copied().unwrap_or(0);
            assert!((170..=320).contains(&c), "{} drawn {} times", id, c);
        }
    }

    #[test]
    fn test_single_note_pool_returns_it() {
        let mut rng = Pcg32::seed_from_u64(1);
        let pool = &CATALOG[3..=3];
        for _ in 0..10 {
            assert_eq!(draw(pool, Some("F4"), &mut rng).id, "F4");
        }
    }
}
