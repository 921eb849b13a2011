//! In-memory model for the supported MusicXML subset (score-partwise,
//! versions 3.1/4.0): parts → measures → notes with pitch/rest, duration
//! in divisions, type, dots, ties, time-modification, staff, plus
//! per-measure key/time/clef attributes and tempo directions.
//!
//! Unrecognized document content is dropped at parse time and never
//! represented here.

/// A parsed score-partwise document.
#[derive(Debug, Clone, Default)]
pub struct Score {
    /// MusicXML version attribute (e.g., "3.1", "4.0")
    pub version: Option<String>,
    pub parts: Vec<Part>,
}

/// One `<part>`.
#[derive(Debug, Clone)]
pub struct Part {
    /// Part identifier (e.g., "P1")
    pub id: String,
    pub measures: Vec<Measure>,
}

/// One `<measure>`.
#[derive(Debug, Clone)]
pub struct Measure {
    pub number: i32,
    /// Whether this is an implicit measure (pickup/anacrusis)
    pub implicit: bool,
    /// Attributes — only present when they change
    pub attributes: Option<Attributes>,
    pub notes: Vec<Note>,
    /// Tempo declared in this measure via `<direction>`/`<sound>`, if any
    pub tempo: Option<f64>,
}

/// Musical attributes that may change at the start of a measure.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    /// Divisions per quarter note
    pub divisions: Option<i32>,
    pub key: Option<Key>,
    pub time: Option<TimeSignature>,
    /// One clef per staff, tagged with the staff number
    pub clefs: Vec<Clef>,
}

/// Key signature.
#[derive(Debug, Clone)]
pub struct Key {
    /// Sharps (positive) or flats (negative)
    pub fifths: i32,
}

/// Time signature.
#[derive(Debug, Clone, Copy)]
pub struct TimeSignature {
    pub beats: i32,
    pub beat_type: i32,
}

/// Clef definition.
#[derive(Debug, Clone)]
pub struct Clef {
    /// Staff number (1-based)
    pub number: i32,
    /// "G" (treble) or "F" (bass)
    pub sign: String,
    /// Staff line the clef sits on
    pub line: i32,
}

/// A single note or rest.
#[derive(Debug, Clone, Default)]
pub struct Note {
    /// Pitch (None if this is a rest)
    pub pitch: Option<Pitch>,
    /// Duration in divisions
    pub duration: i32,
    /// Note type: "whole", "half", "quarter", "eighth", "16th", "32nd"
    pub note_type: Option<String>,
    /// Number of augmentation dots
    pub dots: u8,
    pub rest: bool,
    /// `<rest measure="yes"/>`
    pub measure_rest: bool,
    /// Sounds together with the previous note
    pub chord: bool,
    /// Staff number (1-based) within a multi-staff part
    pub staff: Option<i32>,
    pub tie_start: bool,
    pub tie_stop: bool,
    /// Tuplet ratio from `<time-modification>`
    pub time_modification: Option<TimeModification>,
}

/// Pitch of a note.
#[derive(Debug, Clone)]
pub struct Pitch {
    /// Note name: A–G
    pub step: String,
    /// Octave number (middle C = C4)
    pub octave: i32,
    /// Chromatic alteration: -1 = flat, 1 = sharp
    pub alter: i32,
}

/// `<time-modification>`: actual notes in the time of normal notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeModification {
    pub actual_notes: i32,
    pub normal_notes: i32,
}

impl Pitch {
    /// Convert pitch to MIDI note number. Middle C (C4) = 60.
    pub fn to_midi(&self) -> i32 {
        crate::pitch::step_alter_octave_to_midi(&self.step, self.alter, self.octave)
            .unwrap_or((self.octave + 1) * 12 + self.alter)
    }
}

impl Score {
    /// Number of measures in the longest part.
    pub fn measure_count(&self) -> usize {
        self.parts.iter().map(|p| p.measures.len()).max().unwrap_or(0)
    }
}
