//! Shared constant tables consulted by both converters. Immutable,
//! initialized at compile time, never touched per conversion.

// ── Duration resolution ─────────────────────────────────────────────
/// Divisions per quarter note used when emitting MusicXML. Divisible by
/// 2^5, 3 and 5, so every supported type/dot/tuplet combination maps to an
/// integral division count.
pub const DIVISIONS_PER_QUARTER: i32 = 480;

/// Tolerance for matching a beat value to a symbolic duration.
pub const DURATION_TOLERANCE: f64 = 1e-3;

// ── Tempo & meter defaults ──────────────────────────────────────────
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;
pub const DEFAULT_TIME_BEATS: i32 = 4;
pub const DEFAULT_TIME_BEAT_TYPE: i32 = 4;

// ── Page geometry (pixels) ──────────────────────────────────────────
pub const DEFAULT_PAGE_WIDTH: f64 = 1069.55;
/// x origin of the first measure.
pub const FIRST_MEASURE_X: f64 = 71.6765;
/// Horizontal space allotted per beat when reconstructing note x positions.
pub const BEAT_SPACING: f64 = 57.95;
/// Horizontal offset between stacked chord members.
pub const CHORD_MEMBER_X_OFFSET: f64 = 5.0;

// ── Measure geometry defaults ───────────────────────────────────────
pub const MEASURE_HEIGHT: f64 = 200.0;
pub const MEASURE_Y: f64 = -150.0;
pub const MIN_MEASURE_WIDTH: f64 = 150.0;
pub const MEASURE_LEFT_MARGIN: f64 = 20.0;
pub const MEASURE_RIGHT_MARGIN: f64 = 40.0;
/// Vertical offset between the two staves of the grand staff.
pub const STAFF_DISTANCE: f64 = 85.0;

// ── Note geometry defaults ──────────────────────────────────────────
pub const NOTE_WIDTH: f64 = 10.0;
pub const NOTE_HEIGHT: f64 = 10.0;

// ── Clef reference points for y reconstruction ──────────────────────
/// Treble staff reference: E4 sits on the bottom line.
pub const TREBLE_BASE_MIDI: i32 = 64;
pub const TREBLE_BASE_Y: f64 = -40.0;
/// Semitone spacing above/below the treble reference. Notes above E4
/// are spaced slightly wider than those below it.
pub const TREBLE_SEMITONE_UP: f64 = 3.0;
pub const TREBLE_SEMITONE_DOWN: f64 = 2.5;

/// Bass staff reference: G2 sits on the bottom line.
pub const BASS_BASE_MIDI: i32 = 43;
pub const BASS_BASE_Y: f64 = -155.74;
pub const BASS_SEMITONE: f64 = 2.5;

// ── MusicXML clef table ─────────────────────────────────────────────
/// (sign, staff line) for the treble clef.
pub const TREBLE_CLEF: (&str, i32) = ("G", 2);
/// (sign, staff line) for the bass clef.
pub const BASS_CLEF: (&str, i32) = ("F", 4);
