//! Error taxonomy for both conversion directions.
//!
//! Fatal conditions abort the document and surface the measure at fault;
//! recoverable conditions are collected as [`Warning`]s on the conversion
//! result so a complete output document is always accompanied by the list
//! of compromises made to produce it.

use thiserror::Error;

/// Fatal conversion errors. Any of these aborts the affected document;
/// no output is written.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Structurally invalid source document. Later measures depend on beat
    /// accumulation from earlier ones, so conversion cannot proceed past
    /// the offending measure.
    #[error("malformed input at measure {measure}: {detail}")]
    MalformedInput { measure: i32, detail: String },

    /// Time signature denominator outside the supported set (2 and 4).
    #[error("unsupported time signature {beats}/{beat_type}")]
    UnsupportedTimeSignature { beats: i32, beat_type: i32 },

    /// Unparseable debug measure filter (expected e.g. "1,3,5-7").
    #[error("invalid measure filter: {0}")]
    InvalidMeasureFilter(String),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MXL archive error: {0}")]
    Mxl(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Recoverable per-measure issues. Conversion continues; the caller gets
/// the full list alongside the output document.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// A beat value matched no symbolic duration within tolerance and was
    /// replaced by the nearest representable one.
    UnsupportedDuration {
        measure: i32,
        beats: f64,
        fallback: &'static str,
    },
    /// A non-rest note carried no pitch; treated as a rest.
    MissingPitch { measure: i32 },
    /// Chord members disagreed on duration; normalized to the first member.
    ChordDurationMismatch { measure: i32 },
    /// A measure could not be converted and was replaced by a whole-measure
    /// rest so the document stays structurally complete.
    MeasureSkipped { measure: i32, detail: String },
}

impl Warning {
    /// Measure number the warning refers to.
    pub fn measure(&self) -> i32 {
        match *self {
            Warning::UnsupportedDuration { measure, .. } => measure,
            Warning::MissingPitch { measure } => measure,
            Warning::ChordDurationMismatch { measure } => measure,
            Warning::MeasureSkipped { measure, .. } => measure,
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::UnsupportedDuration { measure, beats, fallback } => write!(
                f,
                "measure {measure}: no symbolic duration for {beats} beats, using {fallback}"
            ),
            Warning::MissingPitch { measure } => {
                write!(f, "measure {measure}: pitched note without pitch, treated as rest")
            }
            Warning::ChordDurationMismatch { measure } => {
                write!(f, "measure {measure}: chord members with differing durations")
            }
            Warning::MeasureSkipped { measure, detail } => {
                write!(f, "measure {measure} skipped: {detail}")
            }
        }
    }
}
