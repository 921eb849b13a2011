//! Duration algebra — converts between symbolic durations (type + dots +
//! tuplet ratio), beat counts, seconds and MusicXML divisions, and infers
//! the symbolic form back from a raw beat value.
//!
//! Beats are quarter-note units throughout: one quarter note = 1.0 beats.

use crate::constants::{DURATION_TOLERANCE, DIVISIONS_PER_QUARTER};

/// The fixed enumeration of note-value categories the flat JSON schema
/// understands. Wire names match the MusicXML `<type>` vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationType {
    Whole,
    Half,
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl DurationType {
    /// Undotted length in beats (quarter-note units).
    pub fn beats(self) -> f64 {
        match self {
            DurationType::Whole => 4.0,
            DurationType::Half => 2.0,
            DurationType::Quarter => 1.0,
            DurationType::Eighth => 0.5,
            DurationType::Sixteenth => 0.25,
            DurationType::ThirtySecond => 0.125,
        }
    }

    /// Wire name, shared by the JSON `durationType` field and the MusicXML
    /// `<type>` element.
    pub fn name(self) -> &'static str {
        match self {
            DurationType::Whole => "whole",
            DurationType::Half => "half",
            DurationType::Quarter => "quarter",
            DurationType::Eighth => "eighth",
            DurationType::Sixteenth => "16th",
            DurationType::ThirtySecond => "32nd",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "whole" => Some(DurationType::Whole),
            "half" => Some(DurationType::Half),
            "quarter" => Some(DurationType::Quarter),
            "eighth" => Some(DurationType::Eighth),
            "16th" => Some(DurationType::Sixteenth),
            "32nd" => Some(DurationType::ThirtySecond),
            _ => None,
        }
    }
}

/// Tuplet ratio: `actual` notes in the time of `normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupletRatio {
    pub actual: i32,
    pub normal: i32,
}

impl TupletRatio {
    pub const TRIPLET: TupletRatio = TupletRatio { actual: 3, normal: 2 };
    pub const QUINTUPLET: TupletRatio = TupletRatio { actual: 5, normal: 4 };

    /// Duration scale factor applied to the written note value.
    pub fn factor(self) -> f64 {
        self.normal as f64 / self.actual as f64
    }
}

/// A fully-qualified symbolic duration: note value, dot count, optional
/// tuplet ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolicDuration {
    pub duration_type: DurationType,
    pub dots: u8,
    pub tuplet: Option<TupletRatio>,
}

impl SymbolicDuration {
    pub const fn plain(duration_type: DurationType) -> Self {
        SymbolicDuration { duration_type, dots: 0, tuplet: None }
    }

    pub const fn dotted(duration_type: DurationType, dots: u8) -> Self {
        SymbolicDuration { duration_type, dots, tuplet: None }
    }

    pub const fn tuplet(duration_type: DurationType, ratio: TupletRatio) -> Self {
        SymbolicDuration { duration_type, dots: 0, tuplet: Some(ratio) }
    }

    /// Length in beats: base × dot multiplier × tuplet factor.
    /// Dots multiply by `2 - 2^-dots`.
    pub fn beats(&self) -> f64 {
        let dot_factor = 2.0 - (0.5f64).powi(self.dots as i32);
        let tuplet_factor = self.tuplet.map_or(1.0, TupletRatio::factor);
        self.duration_type.beats() * dot_factor * tuplet_factor
    }

    /// Wall-clock length at the given tempo.
    pub fn seconds(&self, tempo_bpm: f64) -> f64 {
        beats_to_seconds(self.beats(), tempo_bpm)
    }

    /// MusicXML division count at [`DIVISIONS_PER_QUARTER`] resolution.
    pub fn divisions(&self) -> i32 {
        (self.beats() * DIVISIONS_PER_QUARTER as f64).round() as i32
    }
}

/// `seconds = beats * 60 / tempo`.
pub fn beats_to_seconds(beats: f64, tempo_bpm: f64) -> f64 {
    beats * 60.0 / tempo_bpm
}

/// Ordered inference candidates. Plain forms precede dotted forms, which
/// precede tuplet forms ordered by increasing tuplet denominator, so the
/// first match is always the simplest representation and ties break
/// deterministically.
const CANDIDATES: &[SymbolicDuration] = &[
    // Plain
    SymbolicDuration::plain(DurationType::Whole),
    SymbolicDuration::plain(DurationType::Half),
    SymbolicDuration::plain(DurationType::Quarter),
    SymbolicDuration::plain(DurationType::Eighth),
    SymbolicDuration::plain(DurationType::Sixteenth),
    SymbolicDuration::plain(DurationType::ThirtySecond),
    // Single dot
    SymbolicDuration::dotted(DurationType::Whole, 1),
    SymbolicDuration::dotted(DurationType::Half, 1),
    SymbolicDuration::dotted(DurationType::Quarter, 1),
    SymbolicDuration::dotted(DurationType::Eighth, 1),
    SymbolicDuration::dotted(DurationType::Sixteenth, 1),
    // Double dot
    SymbolicDuration::dotted(DurationType::Half, 2),
    SymbolicDuration::dotted(DurationType::Quarter, 2),
    SymbolicDuration::dotted(DurationType::Eighth, 2),
    // Triplets (3:2)
    SymbolicDuration::tuplet(DurationType::Half, TupletRatio::TRIPLET),
    SymbolicDuration::tuplet(DurationType::Quarter, TupletRatio::TRIPLET),
    SymbolicDuration::tuplet(DurationType::Eighth, TupletRatio::TRIPLET),
    SymbolicDuration::tuplet(DurationType::Sixteenth, TupletRatio::TRIPLET),
    // Quintuplets (5:4)
    SymbolicDuration::tuplet(DurationType::Quarter, TupletRatio::QUINTUPLET),
    SymbolicDuration::tuplet(DurationType::Eighth, TupletRatio::QUINTUPLET),
    SymbolicDuration::tuplet(DurationType::Sixteenth, TupletRatio::QUINTUPLET),
];

/// Infer the symbolic duration reproducing `beats` within tolerance.
/// Returns `None` when no candidate matches; callers recover via
/// [`nearest`].
pub fn infer(beats: f64) -> Option<SymbolicDuration> {
    CANDIDATES
        .iter()
        .find(|c| (c.beats() - beats).abs() < DURATION_TOLERANCE)
        .copied()
}

/// Closest plain or dotted candidate by absolute beat distance. Tuplet
/// candidates are excluded: an approximated value should not invent a
/// bracket. Candidate order breaks exact-distance ties, keeping the
/// fallback deterministic.
pub fn nearest(beats: f64) -> SymbolicDuration {
    let mut best = CANDIDATES[0];
    let mut best_dist = (best.beats() - beats).abs();
    for c in CANDIDATES[1..].iter().filter(|c| c.tuplet.is_none()) {
        let dist = (c.beats() - beats).abs();
        if dist < best_dist {
            best = *c;
            best_dist = dist;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_quarter_beats() {
        let d = SymbolicDuration::dotted(DurationType::Quarter, 1);
        assert!((d.beats() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn double_dot_factor() {
        let d = SymbolicDuration::dotted(DurationType::Half, 2);
        assert!((d.beats() - 3.5).abs() < 1e-12);
    }

    #[test]
    fn triplet_eighth_is_third_of_a_beat() {
        let d = SymbolicDuration::tuplet(DurationType::Eighth, TupletRatio::TRIPLET);
        assert!((d.beats() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn infer_prefers_dot_over_tuplet() {
        // 1.5 beats is both a dotted quarter and a triplet dotted half;
        // the dotted quarter must win.
        let d = infer(1.5).unwrap();
        assert_eq!(d.duration_type, DurationType::Quarter);
        assert_eq!(d.dots, 1);
        assert_eq!(d.tuplet, None);
    }

    #[test]
    fn infer_triplet() {
        let d = infer(1.0 / 3.0).unwrap();
        assert_eq!(d.duration_type, DurationType::Eighth);
        assert_eq!(d.tuplet, Some(TupletRatio::TRIPLET));
    }

    #[test]
    fn infer_rejects_odd_value() {
        assert_eq!(infer(0.7), None);
    }

    #[test]
    fn nearest_falls_back() {
        let d = nearest(0.7);
        // 0.75 (dotted eighth) is the closest plain or dotted value.
        assert_eq!(d.duration_type, DurationType::Eighth);
        assert_eq!(d.dots, 1);
        assert_eq!(d.tuplet, None);
    }

    #[test]
    fn nearest_never_invents_a_tuplet() {
        // 0.68 sits closer to a quarter triplet (2/3) than to a dotted
        // eighth, but the fallback still picks the dotted eighth.
        let d = nearest(0.68);
        assert_eq!(d.duration_type, DurationType::Eighth);
        assert_eq!(d.dots, 1);
        assert_eq!(d.tuplet, None);
    }

    #[test]
    fn divisions_are_integral_for_triplets() {
        let d = SymbolicDuration::tuplet(DurationType::Eighth, TupletRatio::TRIPLET);
        assert_eq!(d.divisions(), 160);
    }
}
