//! scorebridge — bidirectional converter between a flat JSON sheet-music
//! format and MusicXML (score-partwise 3.1/4.0).
//!
//! The flat format stores every note with absolute timing (beats and
//! seconds) plus layout geometry; MusicXML stores relative durations in
//! divisions with symbolic types. Each direction reconstructs what its
//! target needs: the forward direction infers symbolic durations, fills
//! rests into the gaps and brackets tuplets; the reverse direction
//! accumulates positions, applies the tempo map and rebuilds the layout.
//!
//! Reads both uncompressed MusicXML (.musicxml/.xml) and compressed MXL
//! (.mxl) input.
//!
//! # Example
//! ```no_run
//! use scorebridge::{json_to_musicxml, ConvertOptions};
//!
//! let json = std::fs::read_to_string("score.json").unwrap();
//! let result = json_to_musicxml(&json, &ConvertOptions::default()).unwrap();
//! for warning in &result.warnings {
//!     eprintln!("{warning}");
//! }
//! println!("{}", result.output);
//! ```

pub mod constants;
pub mod duration;
pub mod error;
pub mod forward;
pub mod layout;
pub mod model;
pub mod musicxml;
pub mod mxl;
pub mod parser;
pub mod pitch;
pub mod reverse;

use std::collections::BTreeSet;
use std::path::Path;

pub use error::{ConvertError, Warning};
pub use model::{Measure, Note, NotePitch, Score, Staff, TieType};
pub use mxl::parse_mxl;
pub use parser::parse_musicxml;

/// A conversion output together with the recoverable issues encountered
/// while producing it.
#[derive(Debug, Clone)]
pub struct Conversion<T> {
    pub output: T,
    pub warnings: Vec<Warning>,
}

impl<T> Conversion<T> {
    /// Map the output, keeping the warnings.
    fn map<U>(self, f: impl FnOnce(T) -> U) -> Conversion<U> {
        Conversion {
            output: f(self.output),
            warnings: self.warnings,
        }
    }
}

/// Selection of measures to process, parsed from a spec like `"1,3,5-7"`.
#[derive(Debug, Clone, Default)]
pub struct MeasureFilter {
    selected: BTreeSet<i32>,
}

impl MeasureFilter {
    /// Parse a comma-separated list of measure numbers and inclusive
    /// ranges: `"1,3,5-7"` selects measures 1, 3, 5, 6 and 7.
    pub fn parse(spec: &str) -> Result<MeasureFilter, ConvertError> {
        let mut selected = BTreeSet::new();
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Some((lo, hi)) = part.split_once('-') {
                let lo = parse_measure_number(lo, spec)?;
                let hi = parse_measure_number(hi, spec)?;
                if hi < lo {
                    return Err(ConvertError::InvalidMeasureFilter(spec.to_string()));
                }
                selected.extend(lo..=hi);
            } else {
                selected.insert(parse_measure_number(part, spec)?);
            }
        }
        if selected.is_empty() {
            return Err(ConvertError::InvalidMeasureFilter(spec.to_string()));
        }
        Ok(MeasureFilter { selected })
    }

    pub fn contains(&self, number: i32) -> bool {
        self.selected.contains(&number)
    }
}

fn parse_measure_number(text: &str, spec: &str) -> Result<i32, ConvertError> {
    match text.trim().parse::<i32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ConvertError::InvalidMeasureFilter(spec.to_string())),
    }
}

/// Conversion options. The measure filter only takes effect in debug
/// mode; normal conversions always process the whole score.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Emit per-measure diagnostics via the `log` facade.
    pub debug: bool,
    /// Restrict processing to these measures (debug mode only).
    pub measures: Option<MeasureFilter>,
}

impl ConvertOptions {
    /// Whether the given measure should be processed under these options.
    pub fn wants_measure(&self, number: i32) -> bool {
        if !self.debug {
            return true;
        }
        match &self.measures {
            Some(filter) => filter.contains(number),
            None => true,
        }
    }
}

/// Convert a flat JSON score string to a MusicXML document string.
pub fn json_to_musicxml(
    json: &str,
    options: &ConvertOptions,
) -> Result<Conversion<String>, ConvertError> {
    let score: Score = serde_json::from_str(json)?;
    forward::convert(&score, options)
}

/// Convert a MusicXML document string to a flat JSON score string.
pub fn musicxml_to_json(
    xml: &str,
    options: &ConvertOptions,
) -> Result<Conversion<String>, ConvertError> {
    let score = musicxml_to_score(xml, options)?;
    score_to_json_conversion(score)
}

/// Convert a MusicXML document string to the flat score model.
pub fn musicxml_to_score(
    xml: &str,
    options: &ConvertOptions,
) -> Result<Conversion<Score>, ConvertError> {
    let doc = parser::parse_musicxml(xml)?;
    reverse::convert(&doc, options)
}

/// Convert MusicXML or MXL bytes to a flat JSON score string, with an
/// optional file-extension hint:
/// - `.musicxml` or `.xml` → uncompressed MusicXML
/// - `.mxl` → compressed MXL (ZIP archive)
///
/// Without a hint the format is auto-detected.
pub fn musicxml_bytes_to_json(
    data: &[u8],
    extension: Option<&str>,
    options: &ConvertOptions,
) -> Result<Conversion<String>, ConvertError> {
    let doc = match extension {
        Some("mxl") => mxl::parse_mxl(data)?,
        Some("musicxml") | Some("xml") => {
            let xml = std::str::from_utf8(data)
                .map_err(|e| ConvertError::Xml(format!("invalid UTF-8 in MusicXML input: {e}")))?;
            parser::parse_musicxml(xml)?
        }
        _ => {
            // Auto-detect: try as XML first, then as MXL
            match std::str::from_utf8(data) {
                Ok(xml) if xml.trim_start().starts_with('<') => parser::parse_musicxml(xml)?,
                _ => mxl::parse_mxl(data)?,
            }
        }
    };
    let score = reverse::convert(&doc, options)?;
    score_to_json_conversion(score)
}

fn score_to_json_conversion(
    conversion: Conversion<Score>,
) -> Result<Conversion<String>, ConvertError> {
    let json = serde_json::to_string_pretty(&conversion.output)?;
    Ok(conversion.map(|_| json))
}

/// Convert a file on disk, picking the direction from the input
/// extension: `.json` converts to MusicXML, `.musicxml`/`.xml`/`.mxl`
/// convert to flat JSON. The output file is written only when the whole
/// conversion succeeds.
pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: &ConvertOptions,
) -> Result<Vec<Warning>, ConvertError> {
    let input = input.as_ref();
    let extension = input.extension().and_then(|e| e.to_str());

    let result = match extension {
        Some("json") => {
            let json = std::fs::read_to_string(input)?;
            json_to_musicxml(&json, options)?
        }
        _ => {
            let data = std::fs::read(input)?;
            musicxml_bytes_to_json(&data, extension, options)?
        }
    };

    std::fs::write(output, &result.output)?;
    Ok(result.warnings)
}
