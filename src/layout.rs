//! Geometric layout reconstruction for the reverse converter.
//!
//! MusicXML carries no layout in the flat format's sense, so x/y positions,
//! measure widths and staff spacing are rebuilt heuristically: x spacing is
//! proportional to beat offsets, y follows pitch against a per-clef
//! reference line, and measure width scales with note density. The result
//! is approximate by design and is the primary source of round-trip
//! divergence in the geometric fields.

use crate::constants::*;
use crate::model::{Note, Staff};

/// Running horizontal state: measure origins chain left to right, each
/// offset by the previous measure's computed width.
#[derive(Debug)]
pub struct LayoutState {
    measure_x: f64,
    prev_width: f64,
}

impl LayoutState {
    pub fn new() -> Self {
        LayoutState {
            measure_x: FIRST_MEASURE_X,
            prev_width: BEAT_SPACING * 4.0,
        }
    }

    /// x origin of the next measure.
    pub fn begin_measure(&mut self, number: i32) -> f64 {
        if number > 1 {
            self.measure_x += self.prev_width;
        }
        self.measure_x
    }

    /// Compute the measure's width from its laid-out notes and record it
    /// for the next origin.
    pub fn finish_measure(&mut self, notes: &[Note]) -> f64 {
        let width = measure_width(notes);
        self.prev_width = width;
        width
    }
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::new()
    }
}

/// Note x: measure origin plus beat spacing, with a small sideways offset
/// for stacked chord members.
pub fn note_x(measure_x: f64, beat_offset: f64, chord_index: usize) -> f64 {
    measure_x + BEAT_SPACING * beat_offset + chord_index as f64 * CHORD_MEMBER_X_OFFSET
}

/// Note y from pitch. Each staff anchors its bottom line to a reference
/// pitch; semitones offset from there. Treble notes above the reference
/// are spaced slightly wider than those below it.
pub fn note_y(midi: i32, staff: Staff) -> f64 {
    match staff {
        Staff::Treble => {
            let semitones = (midi - TREBLE_BASE_MIDI) as f64;
            if semitones > 0.0 {
                TREBLE_BASE_Y + semitones * TREBLE_SEMITONE_UP
            } else {
                TREBLE_BASE_Y + semitones * TREBLE_SEMITONE_DOWN
            }
        }
        Staff::Bass => BASS_BASE_Y + (midi - BASS_BASE_MIDI) as f64 * BASS_SEMITONE,
    }
}

/// Measure width from content extent scaled by note density; long note
/// values get a little extra room.
pub fn measure_width(notes: &[Note]) -> f64 {
    if notes.is_empty() {
        return MIN_MEASURE_WIDTH;
    }

    let rightmost = notes
        .iter()
        .map(|n| n.x + n.width)
        .fold(f64::MIN, f64::max);
    let leftmost = notes.iter().map(|n| n.x).fold(f64::MAX, f64::min);
    let content_width = rightmost - leftmost;

    let note_density = notes.len() as f64 / 4.0;
    let density_factor = (note_density / 2.0).clamp(1.0, 1.2);

    let has_long_notes = notes.iter().any(|n| n.duration_beats >= 2.0);
    let type_factor = if has_long_notes { 1.1 } else { 1.0 };

    let width = (content_width + MEASURE_LEFT_MARGIN + MEASURE_RIGHT_MARGIN)
        * density_factor
        * type_factor;

    width.max(MIN_MEASURE_WIDTH)
}
