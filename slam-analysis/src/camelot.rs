//! Musical keys and Camelot wheel notation for harmonic mixing
//!
//! Maps `(root, mode)` pairs to Camelot notation (1A-12B) and display colors,
//! and provides compatibility checking for harmonic mixing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the 12 pitch classes, C = 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    Db,
    D,
    Eb,
    E,
    F,
    Gb,
    G,
    Ab,
    A,
    Bb,
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order starting at C
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Db,
        PitchClass::D,
        PitchClass::Eb,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Gb,
        PitchClass::G,
        PitchClass::Ab,
        PitchClass::A,
        PitchClass::Bb,
        PitchClass::B,
    ];

    /// Pitch class from an index; wraps modulo 12
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Index 0-11, where 0 = C
    pub fn index(self) -> usize {
        self as usize
    }

    /// Note name using flats for the black keys
    pub fn name(self) -> &'static str {
        use PitchClass::*;
        match self {
            C => "C",
            Db => "Db",
            D => "D",
            Eb => "Eb",
            E => "E",
            F => "F",
            Gb => "Gb",
            G => "G",
            Ab => "Ab",
            A => "A",
            Bb => "Bb",
            B => "B",
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Major or minor tonality
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    /// Camelot letter: B for major, A for minor
    pub fn camelot_letter(self) -> char {
        match self {
            Mode::Major => 'B',
            Mode::Minor => 'A',
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Major => f.write_str("major"),
            Mode::Minor => f.write_str("minor"),
        }
    }
}

/// Musical key (24 possible: 12 major + 12 minor)
///
/// Serializes with its derived Camelot code and color so collaborators
/// don't need to recompute them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "KeyRepr", from = "KeyRepr")]
pub struct MusicalKey {
    pub root: PitchClass,
    pub mode: Mode,
}

impl MusicalKey {
    pub fn new(root: PitchClass, mode: Mode) -> Self {
        Self { root, mode }
    }

    /// Major key rooted on the given pitch class index (0-11)
    pub fn major(pc: usize) -> Self {
        Self::new(PitchClass::from_index(pc), Mode::Major)
    }

    /// Minor key rooted on the given pitch class index (0-11)
    pub fn minor(pc: usize) -> Self {
        Self::new(PitchClass::from_index(pc), Mode::Minor)
    }

    /// All 24 keys: the 12 majors from C, then the 12 minors from C
    pub fn all() -> impl Iterator<Item = MusicalKey> {
        (0..12)
            .map(MusicalKey::major)
            .chain((0..12).map(MusicalKey::minor))
    }

    /// Check if this key is major
    pub fn is_major(&self) -> bool {
        self.mode == Mode::Major
    }

    /// Position on the Camelot wheel
    pub fn camelot(&self) -> CamelotKey {
        CamelotKey::from_musical_key(*self)
    }

    /// Camelot code such as "8B"
    pub fn camelot_code(&self) -> String {
        self.camelot().to_string()
    }

    /// Display color for key badges, keyed by wheel position
    pub fn color(&self) -> &'static str {
        self.camelot().color()
    }
}

impl fmt::Display for MusicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Mode::Major => write!(f, "{}", self.root),
            Mode::Minor => write!(f, "{}m", self.root),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyRepr {
    root: PitchClass,
    mode: Mode,
    #[serde(default)]
    camelot_code: String,
    #[serde(default)]
    color: String,
}

impl From<MusicalKey> for KeyRepr {
    fn from(key: MusicalKey) -> Self {
        KeyRepr {
            root: key.root,
            mode: key.mode,
            camelot_code: key.camelot_code(),
            color: key.color().to_string(),
        }
    }
}

impl From<KeyRepr> for MusicalKey {
    fn from(repr: KeyRepr) -> Self {
        MusicalKey::new(repr.root, repr.mode)
    }
}

/// Wheel offsets so that C major lands on 8B and A minor on 8A
const MAJOR_OFFSET: usize = 7;
const MINOR_OFFSET: usize = 4;

/// Badge colors per wheel number (index 0 = 1), minor (A) then major (B)
const WHEEL_COLORS: [[&str; 2]; 12] = [
    ["#00CCA3", "#00FFCC"],
    ["#29CC7A", "#33FF99"],
    ["#7ACC52", "#99FF66"],
    ["#A3CC29", "#CCFF33"],
    ["#CCA329", "#FFCC33"],
    ["#CC7A29", "#FF9933"],
    ["#CC5252", "#FF6666"],
    ["#CC297A", "#FF3399"],
    ["#A329CC", "#CC33FF"],
    ["#7A52CC", "#9966FF"],
    ["#297ACC", "#3399FF"],
    ["#29A3CC", "#33CCFF"],
];

/// Camelot wheel notation (1A-12B)
///
/// The Camelot wheel is a tool for harmonic mixing that arranges keys
/// in a circle where adjacent keys are harmonically compatible.
/// - Numbers 1-12 represent positions on the wheel
/// - 'A' suffix = minor keys
/// - 'B' suffix = major keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CamelotKey {
    /// Position on the wheel (1-12)
    pub number: u8,
    /// true = B (major), false = A (minor)
    pub is_major: bool,
}

impl CamelotKey {
    /// Create a new Camelot key
    pub fn new(number: u8, is_major: bool) -> Option<Self> {
        if (1..=12).contains(&number) {
            Some(Self { number, is_major })
        } else {
            None
        }
    }

    /// Convert from musical key to Camelot notation
    ///
    /// Successive wheel numbers are a fifth apart (7 semitones), and relative
    /// major/minor share a number.
    pub fn from_musical_key(key: MusicalKey) -> Self {
        let offset = if key.is_major() {
            MAJOR_OFFSET
        } else {
            MINOR_OFFSET
        };
        let number = (key.root.index() * 7 + offset) % 12 + 1;
        CamelotKey {
            number: number as u8,
            is_major: key.is_major(),
        }
    }

    /// Convert to musical key
    pub fn to_musical_key(&self) -> MusicalKey {
        let offset = if self.is_major {
            MAJOR_OFFSET
        } else {
            MINOR_OFFSET
        };
        // 7 is its own inverse modulo 12
        let fifths = (self.number as usize + 11 - offset) % 12;
        let root = PitchClass::from_index(fifths * 7);
        if self.is_major {
            MusicalKey::new(root, Mode::Major)
        } else {
            MusicalKey::new(root, Mode::Minor)
        }
    }

    /// Parse from string (e.g., "8A", "12B")
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.len() < 2 {
            return None;
        }

        let last = s.chars().last()?;
        let is_major = match last.to_ascii_uppercase() {
            'B' => true,
            'A' => false,
            _ => return None,
        };

        let num_part = &s[..s.len() - 1];
        let number: u8 = num_part.parse().ok()?;

        Self::new(number, is_major)
    }

    /// Badge color for this wheel position
    pub fn color(&self) -> &'static str {
        let idx = (self.number.clamp(1, 12) - 1) as usize;
        WHEEL_COLORS[idx][self.is_major as usize]
    }

    /// Check if two keys are harmonically compatible for mixing
    ///
    /// Compatible combinations:
    /// 1. Same key (e.g., 8A ↔ 8A)
    /// 2. Adjacent on wheel, same letter (e.g., 8A ↔ 7A, 8A ↔ 9A)
    /// 3. Same number, different letter (relative major/minor, e.g., 8A ↔ 8B)
    pub fn is_compatible(&self, other: &CamelotKey) -> bool {
        if self.number == other.number {
            return true;
        }

        // Wheel wraps: 12 + 1 = 1, 1 - 1 = 12
        if self.is_major == other.is_major {
            let diff = (self.number as i8 - other.number as i8).abs();
            if diff == 1 || diff == 11 {
                return true;
            }
        }

        false
    }

    /// Get the wheel distance between two keys
    ///
    /// - 0: Same key
    /// - 1: Adjacent (±1) or relative major/minor
    /// - 2+: Less compatible
    pub fn wheel_distance(&self, other: &CamelotKey) -> u8 {
        let num_diff = {
            let d = (self.number as i8 - other.number as i8).abs();
            d.min(12 - d) as u8
        };
        let mode_diff = u8::from(self.is_major != other.is_major);
        num_diff + mode_diff
    }

    /// Get all compatible keys: self, relative, previous, next
    pub fn compatible_keys(&self) -> Vec<CamelotKey> {
        let prev = if self.number == 1 {
            12
        } else {
            self.number - 1
        };
        let next = if self.number == 12 {
            1
        } else {
            self.number + 1
        };

        vec![
            *self,
            CamelotKey {
                number: self.number,
                is_major: !self.is_major,
            },
            CamelotKey {
                number: prev,
                is_major: self.is_major,
            },
            CamelotKey {
                number: next,
                is_major: self.is_major,
            },
        ]
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, if self.is_major { 'B' } else { 'A' })
    }
}
