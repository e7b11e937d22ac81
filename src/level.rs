use crate::note::{CATALOG, Note};

#[derive(Debug, Clone, PartialEq)]
pub struct LevelConfig {
    /// 1-based level number
    pub level: u32,
    /// First catalog index in play (inclusive)
    pub min_note_index: usize,
    /// Last catalog index in play (inclusive)
    pub max_note_index: usize,
    /// Score that clears the level
    pub required_score: u32,
    pub description: &'static str,
}

impl LevelConfig {
    /// The catalog notes this level draws from.
    pub fn pool(&self) -> &'static [Note] {
        &CATALOG[self.min_note_index..=self.max_note_index]
    }

    pub fn has_next(&self) -> bool {
        (self.level as usize) < LEVELS.len()
    }
}

pub const LEVELS: [LevelConfig; 3] = [
    LevelConfig {
        level: 1,
        min_note_index: 0,
        max_note_index: 4,
        required_score: 10,
        description: "Basics: C4 to G4",
    },
    LevelConfig {
        level: 2,
        min_note_index: 2,
        max_note_index: 8,
        required_score: 15,
        description: "Staff Lines: E4 to D5",
    },
    LevelConfig {
        level: 3,
        min_note_index: 0,
        max_note_index: 11,
        required_score: 20,
        description: "Full Range: C4 to G5",
    },
];

/// Look up a level by number. Unknown numbers fall back to level 1.
pub fn get(level: u32) -> &'static LevelConfig {
    LEVELS
        .iter()
        .find(|l| l.level == level)
        .unwrap_or(&LEVELS[0])
}

pub fn count() -> u32 {
    LEVELS.len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_contiguous_and_valid() {
        for (i, cfg) in LEVELS.iter().enumerate() {
            assert_eq!(cfg.level as usize, i + 1);
            assert!(cfg.min_note_index <= cfg.max_note_index);
            assert!(cfg.max_note_index < CATALOG.len());
            assert!(cfg.required_score > 0);
        }
    }

    #[test]
    fn test_pool_bounds() {
        let ids: Vec<&str> = get(1).pool().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["C4", "D4", "E4", "F4", "G4"]);
        assert_eq!(get(2).pool().first().map(|n| n.id), Some("E4"));
        assert_eq!(get(2).pool().last().map(|n| n.id), Some("D5"));
        assert_eq!(get(3).pool().len(), CATALOG.len());
    }

    #[test]
    fn test_out_of_range_falls_back_to_first() {
        assert_eq!(get(0), &LEVELS[0]);
        assert_eq!(get(99), &LEVELS[0]);
    }

    #[test]
    fn test_has_next() {
        assert!(get(1).has_next());
        assert!(get(2).has_next());
        assert!(!get(3).has_next());
        assert_eq!(count(), 3);
    }
}
