use std::fmt;

/// The seven natural pitch classes on the treble staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteName {
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 7] = [
        NoteName::C,
        NoteName::D,
        NoteName::E,
        NoteName::F,
        NoteName::G,
        NoteName::A,
        NoteName::B,
    ];

    /// Semitone within an octave (C=0, B=11)
    pub fn semitone(self) -> u8 {
        match self {
            NoteName::C => 0,
            NoteName::D => 2,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::G => 7,
            NoteName::A => 9,
            NoteName::B => 11,
        }
    }

    /// Convert to MIDI note number given an octave (0-8)
    /// Middle C (C4) = MIDI 60
    pub fn to_midi(self, octave: u8) -> u8 {
        (octave + 1) * 12 + self.semitone()
    }

    pub fn letter(self) -> char {
        match self {
            NoteName::C => 'C',
            NoteName::D => 'D',
            NoteName::E => 'E',
            NoteName::F => 'F',
            NoteName::G => 'G',
            NoteName::A => 'A',
            NoteName::B => 'B',
        }
    }

    /// Parse a pitch-class letter, ignoring case.
    pub fn from_letter(c: char) -> Option<Self> {
        NoteName::ALL
            .into_iter()
            .find(|name| name.letter() == c.to_ascii_uppercase())
    }

    /// Map a home-row key to the pitch class it guesses.
    /// `a s d f g h j` cover C through B, left to right.
    pub fn from_key(c: char) -> Option<Self> {
        match c {
            'a' => Some(NoteName::C),
            's' => Some(NoteName::D),
            'd' => Some(NoteName::E),
            'f' => Some(NoteName::F),
            'g' => Some(NoteName::G),
            'h' => Some(NoteName::A),
            'j' => Some(NoteName::B),
            _ => None,
        }
    }

    pub fn key(self) -> char {
        match self {
            NoteName::C => 'a',
            NoteName::D => 's',
            NoteName::E => 'd',
            NoteName::F => 'f',
            NoteName::G => 'g',
            NoteName::A => 'h',
            NoteName::B => 'j',
        }
    }

    pub fn solfege(self) -> &'static str {
        match self {
            NoteName::C => "Do",
            NoteName::D => "Re",
            NoteName::E => "Mi",
            NoteName::F => "Fa",
            NoteName::G => "Sol",
            NoteName::A => "La",
            NoteName::B => "Ti",
        }
    }

    pub fn thai(self) -> &'static str {
        match self {
            NoteName::C => "โด",
            NoteName::D => "เร",
            NoteName::E => "มี",
            NoteName::F => "ฟา",
            NoteName::G => "ซอล",
            NoteName::A => "ลา",
            NoteName::B => "ที",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A playable note. Staff position 0 is middle C; each step is one line or space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub id: &'static str,
    pub name: NoteName,
    pub octave: u8,
    pub frequency: f64,
    pub staff_position: i8,
}

/// Staff positions of the five lines, bottom (E4) to top (F5).
pub const STAFF_LINES: [i8; 5] = [2, 4, 6, 8, 10];

impl Note {
    /// True when the note head sits on a line rather than in a space.
    pub fn on_line(&self) -> bool {
        self.staff_position % 2 == 0
    }

    /// Positions that need a short ledger line drawn through or below the note.
    pub fn ledger_lines(&self) -> Vec<i8> {
        let pos = self.staff_position;
        if pos < STAFF_LINES[0] {
            // even positions from the note up to middle C's line
            (pos..STAFF_LINES[0]).filter(|p| p % 2 == 0).collect()
        } else if pos > STAFF_LINES[4] {
            (STAFF_LINES[4] + 1..=pos).filter(|p| p % 2 == 0).collect()
        } else {
            Vec::new()
        }
    }

    /// B4 and above are drawn with the stem on the left, pointing down.
    pub fn stem_down(&self) -> bool {
        self.staff_position >= 6
    }

    /// Where the note sits, in words, without naming it.
    /// Lines and spaces are counted from the bottom of the staff.
    pub fn staff_place(&self) -> String {
        let pos = self.staff_position;
        let (bottom, top) = (STAFF_LINES[0], STAFF_LINES[4]);
        if pos < bottom - 1 {
            "ledger below".to_string()
        } else if pos == bottom - 1 {
            "below staff".to_string()
        } else if pos == top + 1 {
            "above staff".to_string()
        } else if pos > top + 1 {
            "ledger above".to_string()
        } else if self.on_line() {
            format!("line {}", (pos - bottom) / 2 + 1)
        } else {
            format!("space {}", (pos - bottom) / 2 + 1)
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id)
    }
}

const fn note(
    id: &'static str,
    name: NoteName,
    octave: u8,
    frequency: f64,
    staff_position: i8,
) -> Note {
    Note {
        id,
        name,
        octave,
        frequency,
        staff_position,
    }
}

/// Every note the game can show, lowest first.
pub const CATALOG: [Note; 12] = [
    note("C4", NoteName::C, 4, 261.63, 0),
    note("D4", NoteName::D, 4, 293.66, 1),
    note("E4", NoteName::E, 4, 329.63, 2),
    note("F4", NoteName::F, 4, 349.23, 3),
    note("G4", NoteName::G, 4, 392.00, 4),
    note("A4", NoteName::A, 4, 440.00, 5),
    note("B4", NoteName::B, 4, 493.88, 6),
    note("C5", NoteName::C, 5, 523.25, 7),
    note("D5", NoteName::D, 5, 587.33, 8),
    note("E5", NoteName::E, 5, 659.25, 9),
    note("F5", NoteName::F, 5, 698.46, 10),
    note("G5", NoteName::G, 5, 783.99, 11),
];

pub fn find(id: &str) -> Option<&'static Note> {
    CATALOG.iter().find(|n| n.id == id)
}

/// All catalog notes sharing a pitch class.
pub fn of_name(name: NoteName) -> impl Iterator<Item = &'static Note> {
    CATALOG.iter().filter(move |n| n.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middle_c_midi() {
        assert_eq!(NoteName::C.to_midi(4), 60);
    }

    fn equal_tempered(name: NoteName, octave: u8) -> f64 {
        let midi = name.to_midi(octave) as f64;
        440.0 * 2.0_f64.powf((midi - 69.0) / 12.0)
    }

    #[test]
    fn test_a4_frequency() {
        assert!((find("A4").unwrap().frequency - 440.0).abs() < 0.01);
        assert!((equal_tempered(NoteName::A, 4) - 440.0).abs() < 0.01);
    }

    #[test]
    fn test_catalog_frequencies_are_equal_tempered() {
        for n in &CATALOG {
            let expected = equal_tempered(n.name, n.octave);
            assert!(
                (n.frequency - expected).abs() < 0.01,
                "{} is {} Hz, expected {:.2}",
                n.id,
                n.frequency,
                expected
            );
        }
    }

    #[test]
    fn test_staff_position_strictly_increasing() {
        for pair in CATALOG.windows(2) {
            assert!(pair[0].staff_position < pair[1].staff_position);
        }
    }

    #[test]
    fn test_pitch_class_cycles() {
        for (i, n) in CATALOG.iter().enumerate() {
            assert_eq!(n.name, NoteName::ALL[i % 7], "{}", n.id);
        }
    }

    #[test]
    fn test_ids_are_unique() {
        for (i, a) in CATALOG.iter().enumerate() {
            assert!(CATALOG[i + 1..].iter().all(|b| b.id != a.id));
            assert_eq!(a.id, format!("{}{}", a.name, a.octave));
        }
    }

    #[test]
    fn test_letter_and_key_mapping() {
        assert_eq!(NoteName::from_letter('c'), Some(NoteName::C));
        assert_eq!(NoteName::from_letter('B'), Some(NoteName::B));
        assert_eq!(NoteName::from_letter('H'), None);
        assert_eq!(NoteName::from_key('a'), Some(NoteName::C));
        assert_eq!(NoteName::from_key('j'), Some(NoteName::B));
        assert_eq!(NoteName::from_key('k'), None);
        for name in NoteName::ALL {
            assert_eq!(NoteName::from_key(name.key()), Some(name));
        }
    }

    #[test]
    fn test_ledger_lines() {
        assert_eq!(find("C4").unwrap().ledger_lines(), vec![0]);
        assert!(find("D4").unwrap().ledger_lines().is_empty());
        assert!(find("F5").unwrap().ledger_lines().is_empty());
        assert!(find("G5").unwrap().ledger_lines().is_empty());
        let a5 = Note {
            staff_position: 12,
            ..CATALOG[5]
        };
        assert_eq!(a5.ledger_lines(), vec![12]);
    }

    #[test]
    fn test_on_line_and_stem() {
        assert!(find("E4").unwrap().on_line());
        assert!(!find("F4").unwrap().on_line());
        assert!(!find("A4").unwrap().stem_down());
        assert!(find("B4").unwrap().stem_down());
    }

    #[test]
    fn test_staff_place() {
        let place = |id| find(id).unwrap().staff_place();
        assert_eq!(place("C4"), "ledger below");
        assert_eq!(place("D4"), "below staff");
        assert_eq!(place("E4"), "line 1");
        assert_eq!(place("F4"), "space 1");
        assert_eq!(place("B4"), "line 3");
        assert_eq!(place("E5"), "space 4");
        assert_eq!(place("F5"), "line 5");
        assert_eq!(place("G5"), "above staff");
    }

    #[test]
    fn test_of_name() {
        let cs: Vec<&str> = of_name(NoteName::C).map(|n| n.id).collect();
        assert_eq!(cs, vec!["C4", "C5"]);
        assert_eq!(of_name(NoteName::A).count(), 1);
    }
}
