//! Reverse converter — MusicXML document model → flat JSON score.
//!
//! Walks measures in document order with a running context (divisions,
//! time signature, tempo — each a step function taking effect at its
//! declaring measure), accumulates absolute beat/second positions, and
//! rebuilds the layout geometry the flat format requires.

use log::{debug, warn};

use crate::constants::*;
use crate::duration::{self, beats_to_seconds, DurationType, SymbolicDuration, TupletRatio};
use crate::error::{ConvertError, Warning};
use crate::layout::{self, LayoutState};
use crate::model;
use crate::musicxml;
use crate::{Conversion, ConvertOptions};

/// Running conversion state shared across measures.
struct Context {
    tempo_bpm: f64,
    time: musicxml::TimeSignature,
    key_fifths: i32,
    /// Divisions per quarter, tracked per part
    divisions: Vec<i32>,
    /// Clefs per part: (staff number, is bass clef)
    clefs: Vec<Vec<(i32, bool)>>,
}

impl Context {
    fn beat_capacity(&self) -> f64 {
        self.time.beats as f64 * 4.0 / self.time.beat_type as f64
    }
}

/// Convert a parsed MusicXML document into the flat score model.
pub fn convert(
    doc: &musicxml::Score,
    options: &ConvertOptions,
) -> Result<Conversion<model::Score>, ConvertError> {
    let mut warnings = Vec::new();
    let measure_count = doc.measure_count();

    let mut ctx = Context {
        tempo_bpm: DEFAULT_TEMPO_BPM,
        time: musicxml::TimeSignature {
            beats: DEFAULT_TIME_BEATS,
            beat_type: DEFAULT_TIME_BEAT_TYPE,
        },
        key_fifths: 0,
        divisions: vec![1; doc.parts.len()],
        clefs: vec![Vec::new(); doc.parts.len()],
    };

    let mut score = model::Score {
        page_width: DEFAULT_PAGE_WIDTH,
        key_fifths: 0,
        time_beats: DEFAULT_TIME_BEATS,
        time_beat_type: DEFAULT_TIME_BEAT_TYPE,
        tempo_bpm: DEFAULT_TEMPO_BPM,
        measures: Vec::with_capacity(measure_count),
    };

    let mut layout = LayoutState::new();
    let mut start_beats = 0.0;
    let mut start_seconds = 0.0;
    let mut score_attrs_set = false;

    for idx in 0..measure_count {
        let number = idx as i32 + 1;
        update_context(doc, idx, number, &mut ctx)?;

        if !score_attrs_set {
            score.key_fifths = ctx.key_fifths;
            score.time_beats = ctx.time.beats;
            score.time_beat_type = ctx.time.beat_type;
            score.tempo_bpm = ctx.tempo_bpm;
            score_attrs_set = true;
        }

        let measure_x = layout.begin_measure(number);
        let mut notes: Vec<model::Note> = Vec::new();

        for (part_idx, part) in doc.parts.iter().enumerate() {
            let Some(measure) = part.measures.get(idx) else {
                continue;
            };
            convert_part_measure(
                measure,
                number,
                part_idx,
                doc.parts.len(),
                &ctx,
                start_beats,
                start_seconds,
                measure_x,
                &mut notes,
                &mut warnings,
            )?;
        }

        notes.sort_by(|a, b| {
            a.position_beats
                .total_cmp(&b.position_beats)
                .then(a.y.total_cmp(&b.y))
        });

        let width = layout.finish_measure(&notes);

        if options.wants_measure(number) {
            if options.debug {
                debug_measure(number, &notes, measure_x, width);
            }
            score.measures.push(model::Measure {
                number: score.measures.len() as i32 + 1,
                height: MEASURE_HEIGHT,
                width,
                x: measure_x,
                y: MEASURE_Y,
                staff_distance: STAFF_DISTANCE,
                start_position_beats: start_beats,
                start_position_seconds: start_seconds,
                notes,
            });
        }

        // Advance to the next measure. Pickup measures advance by their
        // actual content rather than the nominal capacity.
        let mut advance = ctx.beat_capacity();
        if let Some(first_part_measure) = doc.parts.first().and_then(|p| p.measures.get(idx)) {
            if first_part_measure.implicit {
                let actual = actual_measure_beats(first_part_measure, ctx.divisions[0]);
                if actual > 0.0 && actual < advance {
                    advance = actual;
                }
            }
        }
        start_beats += advance;
        start_seconds += beats_to_seconds(advance, ctx.tempo_bpm);
    }

    Ok(Conversion {
        output: score,
        warnings,
    })
}

/// Fold measure `idx`'s declarations into the running context. Any part may
/// declare; later parts win within the same measure.
fn update_context(
    doc: &musicxml::Score,
    idx: usize,
    number: i32,
    ctx: &mut Context,
) -> Result<(), ConvertError> {
    for (part_idx, part) in doc.parts.iter().enumerate() {
        let Some(measure) = part.measures.get(idx) else {
            continue;
        };
        if let Some(ref attrs) = measure.attributes {
            if let Some(d) = attrs.divisions {
                if d <= 0 {
                    return Err(ConvertError::MalformedInput {
                        measure: number,
                        detail: format!("non-positive divisions {d}"),
                    });
                }
                ctx.divisions[part_idx] = d;
            }
            if let Some(time) = attrs.time {
                if time.beat_type != 2 && time.beat_type != 4 {
                    return Err(ConvertError::UnsupportedTimeSignature {
                        beats: time.beats,
                        beat_type: time.beat_type,
                    });
                }
                ctx.time = time;
            }
            if let Some(ref key) = attrs.key {
                ctx.key_fifths = key.fifths;
            }
            for clef in &attrs.clefs {
                let slot = &mut ctx.clefs[part_idx];
                slot.retain(|(n, _)| *n != clef.number);
                slot.push((clef.number, clef.sign == "F"));
            }
        }
        if let Some(tempo) = measure.tempo {
            ctx.tempo_bpm = tempo;
        }
    }
    Ok(())
}

/// Convert one part's slice of a measure, appending flat notes.
#[allow(clippy::too_many_arguments)]
fn convert_part_measure(
    measure: &musicxml::Measure,
    number: i32,
    part_idx: usize,
    part_count: usize,
    ctx: &Context,
    start_beats: f64,
    start_seconds: f64,
    measure_x: f64,
    out: &mut Vec<model::Note>,
    warnings: &mut Vec<Warning>,
) -> Result<(), ConvertError> {
    let divisions = ctx.divisions[part_idx];
    let mut cursor = start_beats;
    let mut last_onset = start_beats;
    let mut chord_index = 0usize;

    for note in &measure.notes {
        if note.duration <= 0 && !note.measure_rest {
            return Err(ConvertError::MalformedInput {
                measure: number,
                detail: "note without duration".to_string(),
            });
        }

        let beats = if note.measure_rest && note.duration <= 0 {
            ctx.beat_capacity()
        } else {
            note.duration as f64 / divisions as f64
        };

        let onset = if note.chord {
            chord_index += 1;
            last_onset
        } else {
            chord_index = 0;
            cursor
        };

        if note.rest {
            // The flat format stores only sounding notes; rests just
            // advance the cursor.
            if !note.chord {
                cursor = onset + beats;
            }
            last_onset = onset;
            continue;
        }

        let Some(ref pitch) = note.pitch else {
            warn!("measure {number}: pitched note without pitch, treating as rest");
            warnings.push(Warning::MissingPitch { measure: number });
            if !note.chord {
                cursor = onset + beats;
            }
            last_onset = onset;
            continue;
        };

        let staff = map_staff(note, part_idx, part_count, &ctx.clefs[part_idx]);
        let midi = pitch.to_midi();
        let duration_type = symbolic_name(note, beats, number, warnings);

        let beat_offset = onset - start_beats;
        out.push(model::Note {
            duration_beats: beats,
            duration_seconds: beats_to_seconds(beats, ctx.tempo_bpm),
            duration_type,
            pitch_midi_note: Some(midi),
            pitch_name: Some(spell_pitch(pitch)),
            position_beats: onset,
            position_seconds: start_seconds + beats_to_seconds(beat_offset, ctx.tempo_bpm),
            tie_type: tie_type(note),
            staff,
            width: NOTE_WIDTH,
            height: NOTE_HEIGHT,
            x: layout::note_x(measure_x, beat_offset, chord_index),
            y: layout::note_y(midi, staff),
        });

        if !note.chord {
            cursor = onset + beats;
        }
        last_onset = onset;
    }

    Ok(())
}

/// Staff assignment: the clef declared for the note's staff wins, then
/// part order (first part treble, second bass), then the staff number
/// itself inside an undeclared grand staff.
fn map_staff(
    note: &musicxml::Note,
    part_idx: usize,
    part_count: usize,
    clefs: &[(i32, bool)],
) -> model::Staff {
    let staff_number = note.staff.unwrap_or(1);
    if let Some(&(_, is_bass)) = clefs.iter().find(|(n, _)| *n == staff_number) {
        return if is_bass {
            model::Staff::Bass
        } else {
            model::Staff::Treble
        };
    }
    if part_count >= 2 {
        if part_idx == 0 {
            model::Staff::Treble
        } else {
            model::Staff::Bass
        }
    } else if staff_number == 2 {
        model::Staff::Bass
    } else {
        model::Staff::Treble
    }
}

/// Tie role from the explicit MusicXML tie elements.
fn tie_type(note: &musicxml::Note) -> Option<model::TieType> {
    match (note.tie_start, note.tie_stop) {
        (true, true) => Some(model::TieType::Both),
        (true, false) => Some(model::TieType::Start),
        (false, true) => Some(model::TieType::Stop),
        (false, false) => None,
    }
}

/// Spell the pitch exactly as the document wrote it (step + accidental +
/// octave), rather than respelling from the MIDI number.
fn spell_pitch(pitch: &musicxml::Pitch) -> String {
    let accidental = match pitch.alter {
        1 => "#",
        -1 => "b",
        2 => "##",
        -2 => "bb",
        _ => "",
    };
    format!("{}{}{}", pitch.step, accidental, pitch.octave)
}

/// The symbolic duration the document itself declares: `<type>` scaled by
/// its dots and `<time-modification>`. `None` when no valid `<type>` is
/// present.
fn document_symbolic(note: &musicxml::Note) -> Option<SymbolicDuration> {
    let duration_type = DurationType::from_name(note.note_type.as_deref()?)?;
    let tuplet = note.time_modification.map(|tm| TupletRatio {
        actual: tm.actual_notes,
        normal: tm.normal_notes,
    });
    Some(SymbolicDuration {
        duration_type,
        dots: note.dots,
        tuplet,
    })
}

/// The wire `durationType`: prefer the document's declared symbolic
/// duration when it agrees with the beat value from `<duration>`, fall
/// back to inference otherwise.
fn symbolic_name(
    note: &musicxml::Note,
    beats: f64,
    number: i32,
    warnings: &mut Vec<Warning>,
) -> String {
    if let Some(sym) = document_symbolic(note) {
        if (sym.beats() - beats).abs() < DURATION_TOLERANCE {
            return sym.duration_type.name().to_string();
        }
    }
    match duration::infer(beats) {
        Some(sym) => sym.duration_type.name().to_string(),
        None => {
            let fallback = duration::nearest(beats);
            warn!(
                "measure {number}: no symbolic duration for {beats} beats, using {}",
                fallback.duration_type.name()
            );
            warnings.push(Warning::UnsupportedDuration {
                measure: number,
                beats,
                fallback: fallback.duration_type.name(),
            });
            fallback.duration_type.name().to_string()
        }
    }
}

/// Sum of non-chord note durations, in beats. Used to size pickup measures.
fn actual_measure_beats(measure: &musicxml::Measure, divisions: i32) -> f64 {
    if divisions <= 0 {
        return 0.0;
    }
    let total: i32 = measure
        .notes
        .iter()
        .filter(|n| !n.chord)
        .map(|n| n.duration)
        .sum();
    total as f64 / divisions as f64
}

fn debug_measure(number: i32, notes: &[model::Note], x: f64, width: f64) {
    debug!("measure {number}: x={x:.2} width={width:.2} notes={}", notes.len());
    for note in notes {
        debug!(
            "  {} ({}) pos={:.3} dur={:.3} x={:.2} y={:.1}",
            note.pitch_name.as_deref().unwrap_or("rest"),
            note.duration_type,
            note.position_beats,
            note.duration_beats,
            note.x,
            note.y
        );
    }
}
