//! Forward converter — flat JSON score → MusicXML (score-partwise 4.0).
//!
//! Each staff becomes its own part (P1 treble, P2 bass). Within a
//! measure, chord groups are emitted in onset order with rests filled
//! into the gaps between them, so every emitted measure accounts for its
//! full beat capacity (a shorter pickup first measure is marked
//! `implicit="yes"` and padded only to its own span). Per-measure
//! failures degrade to a whole-measure rest instead of aborting the
//! conversion.

use log::warn;

use crate::constants::*;
use crate::duration::{self, DurationType, SymbolicDuration, TupletRatio};
use crate::error::{ConvertError, Warning};
use crate::model::{Measure, Note, NotePitch, Score, Staff, TieType};
use crate::pitch;
use crate::{Conversion, ConvertOptions};

/// Convert a flat score into a MusicXML document string.
pub fn convert(score: &Score, options: &ConvertOptions) -> Result<Conversion<String>, ConvertError> {
    score.validate()?;
    if score.time_beat_type != 2 && score.time_beat_type != 4 {
        return Err(ConvertError::UnsupportedTimeSignature {
            beats: score.time_beats,
            beat_type: score.time_beat_type,
        });
    }

    let mut warnings = Vec::new();
    let mut xml = XmlWriter::new();

    xml.raw("<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    xml.raw(concat!(
        "<!DOCTYPE score-partwise PUBLIC \"-//Recordare//DTD MusicXML 4.0 Partwise//EN\" ",
        "\"http://www.musicxml.org/dtds/partwise.dtd\">"
    ));
    xml.open_attr("score-partwise", &[("version", "4.0")]);

    xml.open("part-list");
    for (id, name) in [("P1", "Treble"), ("P2", "Bass")] {
        xml.open_attr("score-part", &[("id", id)]);
        xml.elem("part-name", name);
        xml.close("score-part");
    }
    xml.close("part-list");

    for (part_idx, staff) in [Staff::Treble, Staff::Bass].into_iter().enumerate() {
        let id = if part_idx == 0 { "P1" } else { "P2" };
        xml.open_attr("part", &[("id", id)]);
        let mut first_emitted = true;
        for measure in &score.measures {
            if !options.wants_measure(measure.number) {
                continue;
            }
            let span = measure_fill_span(score, measure);
            emit_measure(
                &mut xml,
                score,
                measure,
                staff,
                first_emitted,
                span,
                &mut warnings,
            );
            first_emitted = false;
        }
        xml.close("part");
    }

    xml.close("score-partwise");

    Ok(Conversion {
        output: xml.finish(),
        warnings,
    })
}

/// One timed slot in a measure: either a rest or a chord group, with the
/// symbolic duration to emit.
struct Event<'a> {
    sym: SymbolicDuration,
    chord: Vec<&'a Note>,
    tuplet_start: bool,
    tuplet_stop: bool,
}

impl Event<'_> {
    fn is_rest(&self) -> bool {
        self.chord.is_empty()
    }
}

fn emit_measure(
    xml: &mut XmlWriter,
    score: &Score,
    measure: &Measure,
    staff: Staff,
    first: bool,
    span: f64,
    warnings: &mut Vec<Warning>,
) {
    let capacity = score.beat_capacity();
    let pickup = span < capacity - DURATION_TOLERANCE;

    if pickup {
        xml.open_attr(
            "measure",
            &[("number", &measure.number.to_string()), ("implicit", "yes")],
        );
    } else {
        xml.open_attr("measure", &[("number", &measure.number.to_string())]);
    }

    if first {
        xml.open("attributes");
        xml.elem("divisions", &DIVISIONS_PER_QUARTER.to_string());
        xml.open("key");
        xml.elem("fifths", &score.key_fifths.to_string());
        xml.close("key");
        xml.open("time");
        xml.elem("beats", &score.time_beats.to_string());
        xml.elem("beat-type", &score.time_beat_type.to_string());
        xml.close("time");
        let (sign, line) = if staff == Staff::Treble {
            TREBLE_CLEF
        } else {
            BASS_CLEF
        };
        xml.open("clef");
        xml.elem("sign", sign);
        xml.elem("line", &line.to_string());
        xml.close("clef");
        xml.close("attributes");
        if staff == Staff::Treble {
            emit_tempo(xml, score.tempo_bpm);
        }
    }

    let events = match build_events(measure, staff, span, warnings) {
        Ok(events) => events,
        Err(detail) => {
            warn!("measure {} skipped: {detail}", measure.number);
            warnings.push(Warning::MeasureSkipped {
                measure: measure.number,
                detail,
            });
            emit_measure_rest(xml, span);
            xml.close("measure");
            return;
        }
    };

    if events.is_empty() {
        emit_measure_rest(xml, span);
    } else {
        for event in &events {
            emit_event(xml, event, score.key_fifths);
        }
    }

    xml.close("measure");
}

/// Beat span a measure's rests must fill. A short first measure is a
/// pickup: its span is the distance to the next measure, not the full
/// time-signature capacity.
fn measure_fill_span(score: &Score, measure: &Measure) -> f64 {
    let capacity = score.beat_capacity();
    if measure.number != 1 {
        return capacity;
    }
    let Some(next) = score.measures.get(1) else {
        return capacity;
    };
    let span = next.start_position_beats - measure.start_position_beats;
    if span > DURATION_TOLERANCE && span < capacity - DURATION_TOLERANCE {
        span
    } else {
        capacity
    }
}

/// Build the ordered event list for one staff of one measure: chord groups
/// at their onsets, rests filling the gaps, and tuplet brackets marked
/// over maximal runs of a constant ratio.
fn build_events<'a>(
    measure: &'a Measure,
    staff: Staff,
    span: f64,
    warnings: &mut Vec<Warning>,
) -> Result<Vec<Event<'a>>, String> {
    let groups = measure.chord_groups(staff);
    if groups.is_empty() {
        // Caller emits a whole-measure rest instead of ordinary rests.
        return Ok(Vec::new());
    }

    let mut events = Vec::new();
    let mut cursor = 0.0;

    for group in groups {
        let lead = group[0];
        let rel = lead.position_beats - measure.start_position_beats;
        if !rel.is_finite() || rel < -DURATION_TOLERANCE {
            return Err(format!("note onset {rel} precedes the measure"));
        }
        if rel > span + DURATION_TOLERANCE {
            return Err(format!("note onset {rel} beyond the measure span"));
        }
        let beats = lead.duration_beats;
        if !beats.is_finite() || beats <= 0.0 {
            return Err(format!("non-positive note duration {beats}"));
        }
        if group
            .iter()
            .any(|n| (n.duration_beats - beats).abs() > DURATION_TOLERANCE)
        {
            warnings.push(Warning::ChordDurationMismatch {
                measure: measure.number,
            });
        }

        let gap = rel - cursor;
        if gap > DURATION_TOLERANCE {
            for sym in fill_gap(gap) {
                events.push(Event {
                    sym,
                    chord: Vec::new(),
                    tuplet_start: false,
                    tuplet_stop: false,
                });
            }
        }

        let sym = match duration::infer(beats) {
            Some(sym) => sym,
            None => {
                let fallback = duration::nearest(beats);
                warnings.push(Warning::UnsupportedDuration {
                    measure: measure.number,
                    beats,
                    fallback: fallback.duration_type.name(),
                });
                fallback
            }
        };

        cursor = rel + sym.beats();
        events.push(Event {
            sym,
            chord: group,
            tuplet_start: false,
            tuplet_stop: false,
        });
    }

    let trailing = span - cursor;
    if trailing > DURATION_TOLERANCE {
        for sym in fill_gap(trailing) {
            events.push(Event {
                sym,
                chord: Vec::new(),
                tuplet_start: false,
                tuplet_stop: false,
            });
        }
    }

    mark_tuplets(&mut events);
    Ok(events)
}

/// Split a beat gap into rest durations, largest-first. A residue smaller
/// than the shortest supported duration is dropped.
fn fill_gap(gap: f64) -> Vec<SymbolicDuration> {
    const REST_SHAPES: [SymbolicDuration; 10] = [
        SymbolicDuration::plain(DurationType::Whole),
        SymbolicDuration::dotted(DurationType::Half, 1),
        SymbolicDuration::plain(DurationType::Half),
        SymbolicDuration::dotted(DurationType::Quarter, 1),
        SymbolicDuration::plain(DurationType::Quarter),
        SymbolicDuration::dotted(DurationType::Eighth, 1),
        SymbolicDuration::plain(DurationType::Eighth),
        SymbolicDuration::dotted(DurationType::Sixteenth, 1),
        SymbolicDuration::plain(DurationType::Sixteenth),
        SymbolicDuration::plain(DurationType::ThirtySecond),
    ];

    let mut rests = Vec::new();
    let mut remaining = gap;
    while remaining > DURATION_TOLERANCE {
        let Some(sym) = REST_SHAPES
            .iter()
            .find(|s| s.beats() <= remaining + DURATION_TOLERANCE)
        else {
            break;
        };
        rests.push(*sym);
        remaining -= sym.beats();
    }
    rests
}

/// Bracket maximal runs of two or more consecutive events sharing the
/// same tuplet ratio.
fn mark_tuplets(events: &mut [Event<'_>]) {
    let mut i = 0;
    while i < events.len() {
        let Some(ratio) = events[i].sym.tuplet else {
            i += 1;
            continue;
        };
        let mut j = i + 1;
        while j < events.len() && events[j].sym.tuplet == Some(ratio) {
            j += 1;
        }
        if j - i >= 2 {
            events[i].tuplet_start = true;
            events[j - 1].tuplet_stop = true;
        }
        i = j;
    }
}

fn emit_event(xml: &mut XmlWriter, event: &Event<'_>, fifths: i32) {
    if event.is_rest() {
        xml.open("note");
        xml.empty("rest");
        xml.elem("duration", &event.sym.divisions().to_string());
        xml.elem("voice", "1");
        xml.elem("type", event.sym.duration_type.name());
        for _ in 0..event.sym.dots {
            xml.empty("dot");
        }
        emit_time_modification(xml, event.sym.tuplet);
        xml.close("note");
        return;
    }

    for (member, note) in event.chord.iter().enumerate() {
        xml.open("note");
        if member > 0 {
            xml.empty("chord");
        }
        if let NotePitch::Pitched { midi, name } = note.pitch() {
            if let Some(named_midi) = pitch::parse_name(name) {
                if named_midi != midi {
                    warn!(
                        "pitch name {name} disagrees with midi {midi} ({}), keeping midi",
                        pitch::midi_to_name(midi, fifths)
                    );
                }
            }
            let (step, alter, octave) = pitch::midi_to_step_alter_octave(midi, fifths);
            xml.open("pitch");
            xml.elem("step", step);
            if alter != 0 {
                xml.elem("alter", &alter.to_string());
            }
            xml.elem("octave", &octave.to_string());
            xml.close("pitch");
        }
        xml.elem("duration", &event.sym.divisions().to_string());
        match note.tie_type {
            Some(TieType::Start) => xml.empty_attr("tie", &[("type", "start")]),
            Some(TieType::Stop) => xml.empty_attr("tie", &[("type", "stop")]),
            Some(TieType::Both) => {
                xml.empty_attr("tie", &[("type", "stop")]);
                xml.empty_attr("tie", &[("type", "start")]);
            }
            None => {}
        }
        xml.elem("voice", "1");
        xml.elem("type", event.sym.duration_type.name());
        for _ in 0..event.sym.dots {
            xml.empty("dot");
        }
        emit_time_modification(xml, event.sym.tuplet);
        emit_notations(xml, note, event, member == 0);
        xml.close("note");
    }
}

fn emit_time_modification(xml: &mut XmlWriter, tuplet: Option<TupletRatio>) {
    if let Some(ratio) = tuplet {
        xml.open("time-modification");
        xml.elem("actual-notes", &ratio.actual.to_string());
        xml.elem("normal-notes", &ratio.normal.to_string());
        xml.close("time-modification");
    }
}

/// `<notations>`: tied marks mirroring the tie elements, and tuplet
/// brackets on the lead note of a group.
fn emit_notations(xml: &mut XmlWriter, note: &Note, event: &Event<'_>, lead: bool) {
    let tuplet_start = lead && event.tuplet_start;
    let tuplet_stop = lead && event.tuplet_stop;
    if note.tie_type.is_none() && !tuplet_start && !tuplet_stop {
        return;
    }
    xml.open("notations");
    match note.tie_type {
        Some(TieType::Start) => xml.empty_attr("tied", &[("type", "start")]),
        Some(TieType::Stop) => xml.empty_attr("tied", &[("type", "stop")]),
        Some(TieType::Both) => {
            xml.empty_attr("tied", &[("type", "stop")]);
            xml.empty_attr("tied", &[("type", "start")]);
        }
        None => {}
    }
    if tuplet_start {
        xml.empty_attr("tuplet", &[("type", "start"), ("number", "1")]);
    }
    if tuplet_stop {
        xml.empty_attr("tuplet", &[("type", "stop"), ("number", "1")]);
    }
    xml.close("notations");
}

fn emit_measure_rest(xml: &mut XmlWriter, span: f64) {
    xml.open("note");
    xml.empty_attr("rest", &[("measure", "yes")]);
    let divisions = (span * DIVISIONS_PER_QUARTER as f64).round() as i32;
    xml.elem("duration", &divisions.to_string());
    xml.elem("voice", "1");
    xml.close("note");
}

fn emit_tempo(xml: &mut XmlWriter, bpm: f64) {
    let shown = format_bpm(bpm);
    xml.open_attr("direction", &[("placement", "above")]);
    xml.open("direction-type");
    xml.open("metronome");
    xml.elem("beat-unit", "quarter");
    xml.elem("per-minute", &shown);
    xml.close("metronome");
    xml.close("direction-type");
    xml.empty_attr("sound", &[("tempo", &shown)]);
    xml.close("direction");
}

/// Integral tempos print without a decimal point.
fn format_bpm(bpm: f64) -> String {
    if (bpm - bpm.round()).abs() < 1e-9 {
        format!("{}", bpm.round() as i64)
    } else {
        format!("{bpm}")
    }
}

/// Minimal indenting XML writer. Text content is escaped; attribute
/// values here are numbers and keywords, escaped the same way.
struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        XmlWriter {
            out: String::new(),
            depth: 0,
        }
    }

    fn raw(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }

    fn open(&mut self, tag: &str) {
        self.open_attr(tag, &[]);
    }

    fn open_attr(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attrs {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&xml_escape(value));
            self.out.push('"');
        }
        self.out.push_str(">\n");
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth -= 1;
        self.indent();
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push_str(">\n");
    }

    fn elem(&mut self, tag: &str, value: &str) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push('>');
        self.out.push_str(&xml_escape(value));
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push_str(">\n");
    }

    fn empty(&mut self, tag: &str) {
        self.empty_attr(tag, &[]);
    }

    fn empty_attr(&mut self, tag: &str, attrs: &[(&str, &str)]) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in attrs {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&xml_escape(value));
            self.out.push('"');
        }
        self.out.push_str("/>\n");
    }

    fn finish(self) -> String {
        self.out
    }
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
