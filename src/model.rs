//! Data model for the flat sheet-music JSON format.
//!
//! This is the shared vocabulary both converters read and write: a Score
//! owns ordered Measures, each owning ordered time-positioned Notes.
//! No conversion logic lives here — only the data plus the queries both
//! directions need (measure lookup, chord grouping, tie-chain walking).

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_PAGE_WIDTH, DEFAULT_TEMPO_BPM, DEFAULT_TIME_BEATS, DEFAULT_TIME_BEAT_TYPE,
};
use crate::error::ConvertError;

/// Onsets within this distance in beats count as simultaneous.
const ONSET_EPSILON: f64 = 1e-6;

/// A complete score in the flat JSON format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    /// Page width in pixels
    #[serde(default = "default_page_width")]
    pub page_width: f64,
    /// Key signature as a signed count of sharps (positive) or flats (negative)
    #[serde(default)]
    pub key_fifths: i32,
    /// Time signature numerator
    #[serde(default = "default_time_beats")]
    pub time_beats: i32,
    /// Time signature denominator
    #[serde(default = "default_time_beat_type")]
    pub time_beat_type: i32,
    /// Initial tempo in beats per minute
    #[serde(default = "default_tempo")]
    pub tempo_bpm: f64,
    /// Ordered measures, numbered consecutively from 1
    pub measures: Vec<Measure>,
}

fn default_page_width() -> f64 {
    DEFAULT_PAGE_WIDTH
}
fn default_time_beats() -> i32 {
    DEFAULT_TIME_BEATS
}
fn default_time_beat_type() -> i32 {
    DEFAULT_TIME_BEAT_TYPE
}
fn default_tempo() -> f64 {
    DEFAULT_TEMPO_BPM
}

/// A single measure (bar).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measure {
    /// Measure number, unique within the score, starting at 1
    pub number: i32,
    /// Height in pixels
    pub height: f64,
    /// Width in pixels
    pub width: f64,
    /// x origin in pixels
    pub x: f64,
    /// y origin in pixels
    pub y: f64,
    /// Vertical offset between the two staves
    pub staff_distance: f64,
    /// Start position from the score origin, in beats
    pub start_position_beats: f64,
    /// Start position from the score origin, in seconds
    pub start_position_seconds: f64,
    /// Notes in this measure (rests are not persisted)
    pub notes: Vec<Note>,
}

/// Staff assignment in the grand-staff layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Staff {
    Treble,
    Bass,
}

/// Tie role of a note within a tie chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieType {
    /// Begins a tie
    Start,
    /// Ends a tie
    Stop,
    /// Continues a previous tie and begins a new one
    Both,
}

/// A single note. Rests carry `null` pitch fields on the wire; use
/// [`Note::pitch`] to branch on the explicit variant instead of the
/// nullable fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Duration in beats (quarter-note units)
    pub duration_beats: f64,
    /// Duration in seconds at the applicable tempo
    pub duration_seconds: f64,
    /// Symbolic duration type ("whole", "half", "quarter", ...)
    pub duration_type: String,
    /// MIDI note number, or None for a rest
    pub pitch_midi_note: Option<i32>,
    /// Scientific pitch name, or None for a rest
    pub pitch_name: Option<String>,
    /// Onset from the score origin, in beats
    pub position_beats: f64,
    /// Onset from the score origin, in seconds
    pub position_seconds: f64,
    /// Tie role, if any
    pub tie_type: Option<TieType>,
    /// Staff assignment
    pub staff: Staff,
    /// Glyph width in pixels
    pub width: f64,
    /// Glyph height in pixels
    pub height: f64,
    /// x position in pixels
    pub x: f64,
    /// y position in pixels
    pub y: f64,
}

/// Explicit pitch variant of a note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotePitch<'a> {
    Rest,
    Pitched { midi: i32, name: &'a str },
}

impl Note {
    /// The note's pitch as a tagged variant, selected from the nullable
    /// wire fields.
    pub fn pitch(&self) -> NotePitch<'_> {
        match self.pitch_midi_note {
            Some(midi) => NotePitch::Pitched {
                midi,
                name: self.pitch_name.as_deref().unwrap_or(""),
            },
            None => NotePitch::Rest,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.pitch_midi_note.is_none()
    }

    /// Onset plus duration, in beats.
    pub fn end_position_beats(&self) -> f64 {
        self.position_beats + self.duration_beats
    }

    /// Whether this note sounds at the same instant as `other` on the
    /// same staff.
    pub fn is_simultaneous_with(&self, other: &Note) -> bool {
        self.staff == other.staff
            && (self.position_beats - other.position_beats).abs() < ONSET_EPSILON
    }
}

impl Score {
    /// Measure lookup by number. O(1): the numbering invariant makes the
    /// number an index.
    pub fn measure(&self, number: i32) -> Option<&Measure> {
        if number < 1 {
            return None;
        }
        let m = self.measures.get((number - 1) as usize)?;
        debug_assert_eq!(m.number, number);
        Some(m)
    }

    /// Beat capacity of one measure under the score's time signature,
    /// in quarter-note units.
    pub fn beat_capacity(&self) -> f64 {
        self.time_beats as f64 * 4.0 / self.time_beat_type as f64
    }

    /// Check the structural invariants: consecutive measure numbering from 1
    /// and non-decreasing start positions.
    pub fn validate(&self) -> Result<(), ConvertError> {
        let mut prev_start = 0.0;
        for (i, measure) in self.measures.iter().enumerate() {
            let expected = i as i32 + 1;
            if measure.number != expected {
                return Err(ConvertError::MalformedInput {
                    measure: measure.number,
                    detail: format!("expected measure number {expected}"),
                });
            }
            if measure.start_position_beats < prev_start {
                return Err(ConvertError::MalformedInput {
                    measure: measure.number,
                    detail: "start position precedes previous measure".to_string(),
                });
            }
            prev_start = measure.start_position_beats;
        }
        Ok(())
    }

    /// Walk all notes in position order and reconstruct tie chains: runs of
    /// same-pitch, same-staff notes linked start → (both …) → stop.
    pub fn tie_chains(&self) -> Vec<Vec<&Note>> {
        let mut open: Vec<((Staff, i32), Vec<&Note>)> = Vec::new();
        let mut chains = Vec::new();

        for measure in &self.measures {
            for note in measure.notes_in_order() {
                let midi = match note.pitch() {
                    NotePitch::Pitched { midi, .. } => midi,
                    NotePitch::Rest => continue,
                };
                let key = (note.staff, midi);
                match note.tie_type {
                    Some(TieType::Start) => {
                        open.push((key, vec![note]));
                    }
                    Some(TieType::Both) | Some(TieType::Stop) => {
                        if let Some(idx) = open.iter().position(|(k, _)| *k == key) {
                            open[idx].1.push(note);
                            if note.tie_type == Some(TieType::Stop) {
                                chains.push(open.swap_remove(idx).1);
                            }
                        }
                    }
                    None => {}
                }
            }
        }

        chains
    }
}

impl Measure {
    /// Notes ordered by onset, with x as the secondary key for
    /// simultaneous notes.
    pub fn notes_in_order(&self) -> Vec<&Note> {
        let mut ordered: Vec<&Note> = self.notes.iter().collect();
        ordered.sort_by(|a, b| {
            a.position_beats
                .total_cmp(&b.position_beats)
                .then(a.x.total_cmp(&b.x))
        });
        ordered
    }

    /// Group the measure's notes on one staff into chords: notes sharing
    /// an onset form one group, ordered by onset.
    pub fn chord_groups(&self, staff: Staff) -> Vec<Vec<&Note>> {
        let mut groups: Vec<Vec<&Note>> = Vec::new();
        for note in self.notes_in_order() {
            if note.staff != staff {
                continue;
            }
            match groups.last_mut() {
                Some(group) if note.is_simultaneous_with(group[0]) => group.push(note),
                _ => groups.push(vec![note]),
            }
        }
        groups
    }

    /// Beat span occupied by the fuller of the two staves, measured from
    /// the measure start to the end of its last chord group. Used for the
    /// beat-conservation check.
    pub fn occupied_beats(&self) -> f64 {
        let span = |staff: Staff| {
            self.chord_groups(staff)
                .last()
                .map(|g| g[0].end_position_beats() - self.start_position_beats)
                .unwrap_or(0.0)
        };
        span(Staff::Treble).max(span(Staff::Bass))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_note(midi: i32, position: f64, duration: f64) -> Note {
        Note {
            duration_beats: duration,
            duration_seconds: duration * 0.5,
            duration_type: "quarter".to_string(),
            pitch_midi_note: Some(midi),
            pitch_name: None,
            position_beats: position,
            position_seconds: position * 0.5,
            tie_type: None,
            staff: Staff::Treble,
            width: 10.0,
            height: 10.0,
            x: 0.0,
            y: 0.0,
        }
    }

    fn bare_measure(number: i32, start: f64, notes: Vec<Note>) -> Measure {
        Measure {
            number,
            height: 200.0,
            width: 150.0,
            x: 0.0,
            y: -150.0,
            staff_distance: 85.0,
            start_position_beats: start,
            start_position_seconds: start * 0.5,
            notes,
        }
    }

    fn bare_score(measures: Vec<Measure>) -> Score {
        Score {
            page_width: 1069.55,
            key_fifths: 0,
            time_beats: 4,
            time_beat_type: 4,
            tempo_bpm: 120.0,
            measures,
        }
    }

    #[test]
    fn measure_lookup_by_number() {
        let score = bare_score(vec![
            bare_measure(1, 0.0, vec![]),
            bare_measure(2, 4.0, vec![]),
        ]);
        assert_eq!(score.measure(2).unwrap().number, 2);
        assert!(score.measure(0).is_none());
        assert!(score.measure(3).is_none());
    }

    #[test]
    fn validate_catches_numbering_gaps() {
        let score = bare_score(vec![
            bare_measure(1, 0.0, vec![]),
            bare_measure(3, 4.0, vec![]),
        ]);
        assert!(score.validate().is_err());
    }

    #[test]
    fn validate_catches_rewinding_starts() {
        let score = bare_score(vec![
            bare_measure(1, 4.0, vec![]),
            bare_measure(2, 0.0, vec![]),
        ]);
        assert!(score.validate().is_err());
    }

    #[test]
    fn chord_groups_split_on_onset() {
        let measure = bare_measure(
            1,
            0.0,
            vec![
                bare_note(60, 0.0, 1.0),
                bare_note(64, 0.0, 1.0),
                bare_note(62, 1.0, 1.0),
            ],
        );
        let groups = measure.chord_groups(Staff::Treble);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn tie_chain_links_same_pitch() {
        let mut first = bare_note(60, 0.0, 4.0);
        first.tie_type = Some(TieType::Start);
        let mut middle = bare_note(60, 4.0, 4.0);
        middle.tie_type = Some(TieType::Both);
        let mut last = bare_note(60, 8.0, 4.0);
        last.tie_type = Some(TieType::Stop);
        let score = bare_score(vec![
            bare_measure(1, 0.0, vec![first]),
            bare_measure(2, 4.0, vec![middle]),
            bare_measure(3, 8.0, vec![last]),
        ]);

        let chains = score.tie_chains();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].len(), 3);
        assert!(chains[0].iter().all(|n| n.pitch_midi_note == Some(60)));
    }
}
