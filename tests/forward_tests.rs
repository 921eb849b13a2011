//! JSON → MusicXML conversion tests.

use pretty_assertions::assert_eq;
use scorebridge::error::{ConvertError, Warning};
use scorebridge::model::{Measure, Note, Score, Staff, TieType};
use scorebridge::{forward, ConvertOptions, MeasureFilter};

fn note(midi: i32, name: &str, staff: Staff, position: f64, duration: f64) -> Note {
    Note {
        duration_beats: duration,
        duration_seconds: duration * 0.5,
        duration_type: String::new(),
        pitch_midi_note: Some(midi),
        pitch_name: Some(name.to_string()),
        position_beats: position,
        position_seconds: position * 0.5,
        tie_type: None,
        staff,
        width: 10.0,
        height: 10.0,
        x: 0.0,
        y: 0.0,
    }
}

fn measure(number: i32, start: f64, notes: Vec<Note>) -> Measure {
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

fn score(measures: Vec<Measure>) -> Score {
    Score {
        page_width: 1069.55,
        key_fifths: 0,
        time_beats: 4,
        time_beat_type: 4,
        tempo_bpm: 120.0,
        measures,
    }
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn quarter_note_with_trailing_rests() {
    let s = score(vec![measure(
        1,
        0.0,
        vec![note(60, "C4", Staff::Treble, 0.0, 1.0)],
    )]);
    let result = forward::convert(&s, &ConvertOptions::default()).unwrap();
    let xml = &result.output;

    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert!(xml.contains("<step>C</step>"));
    assert!(xml.contains("<octave>4</octave>"));
    assert!(xml.contains("<duration>480</duration>"));
    assert!(xml.contains("<type>quarter</type>"));
    // Remaining 3 beats become a dotted half rest.
    assert!(xml.contains("<duration>1440</duration>"));
    assert!(xml.contains("<rest/>"));
}

#[test]
fn document_skeleton() {
    let s = score(vec![measure(1, 0.0, vec![])]);
    let xml = forward::convert(&s, &ConvertOptions::default())
        .unwrap()
        .output;

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("<score-partwise version=\"4.0\">"));
    assert!(xml.contains("<divisions>480</divisions>"));
    assert!(xml.contains("<beats>4</beats>"));
    assert!(xml.contains("<beat-type>4</beat-type>"));
    assert!(xml.contains("<sign>G</sign>"));
    assert!(xml.contains("<sign>F</sign>"));
    assert!(xml.contains("<sound tempo=\"120\"/>"));
    // One part per staff, each with the measure.
    assert_eq!(count(&xml, "<part id="), 2);
    assert_eq!(count(&xml, "<rest measure=\"yes\"/>"), 2);
}

#[test]
fn dotted_quarter_gets_a_dot() {
    let s = score(vec![measure(
        1,
        0.0,
        vec![note(60, "C4", Staff::Treble, 0.0, 1.5)],
    )]);
    let xml = forward::convert(&s, &ConvertOptions::default())
        .unwrap()
        .output;

    assert!(xml.contains("<duration>720</duration>"));
    assert!(xml.contains("<type>quarter</type>"));
    assert!(xml.contains("<dot/>"));
}

#[test]
fn triplet_trio_gets_one_bracket() {
    let third = 1.0 / 3.0;
    let s = score(vec![measure(
        1,
        0.0,
        vec![
            note(69, "A4", Staff::Treble, 0.0, third),
            note(71, "B4", Staff::Treble, third, third),
            note(72, "C5", Staff::Treble, 2.0 * third, third),
        ],
    )]);
    let xml = forward::convert(&s, &ConvertOptions::default())
        .unwrap()
        .output;

    assert_eq!(count(&xml, "<time-modification>"), 3);
    assert_eq!(count(&xml, "<actual-notes>3</actual-notes>"), 3);
    assert_eq!(count(&xml, "<normal-notes>2</normal-notes>"), 3);
    assert_eq!(count(&xml, "<tuplet type=\"start\""), 1);
    assert_eq!(count(&xml, "<tuplet type=\"stop\""), 1);
    // 1/3 beat at 480 divisions per quarter.
    assert_eq!(count(&xml, "<duration>160</duration>"), 3);
}

#[test]
fn chord_members_share_a_stem() {
    let s = score(vec![measure(
        1,
        0.0,
        vec![
            note(60, "C4", Staff::Treble, 0.0, 1.0),
            note(64, "E4", Staff::Treble, 0.0, 1.0),
            note(67, "G4", Staff::Treble, 0.0, 1.0),
        ],
    )]);
    let xml = forward::convert(&s, &ConvertOptions::default())
        .unwrap()
        .output;

    // Three pitches, two <chord/> marks (the first member carries none).
    assert_eq!(count(&xml, "<pitch>"), 3);
    assert_eq!(count(&xml, "<chord/>"), 2);
}

#[test]
fn chord_duration_mismatch_is_normalized() {
    let s = score(vec![measure(
        1,
        0.0,
        vec![
            note(60, "C4", Staff::Treble, 0.0, 1.0),
            note(64, "E4", Staff::Treble, 0.0, 2.0),
        ],
    )]);
    let result = forward::convert(&s, &ConvertOptions::default()).unwrap();

    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::ChordDurationMismatch { measure: 1 })));
    // Both members take the first member's duration.
    assert_eq!(count(&result.output, "<duration>480</duration>"), 2);
}

#[test]
fn bass_notes_land_in_the_second_part() {
    let s = score(vec![measure(
        1,
        0.0,
        vec![note(48, "C3", Staff::Bass, 0.0, 4.0)],
    )]);
    let xml = forward::convert(&s, &ConvertOptions::default())
        .unwrap()
        .output;

    let p2_at = xml.find("<part id=\"P2\">").unwrap();
    let step_at = xml.find("<step>C</step>").unwrap();
    assert!(step_at > p2_at, "bass pitch must be in P2");
    // P1 is empty and holds a whole-measure rest.
    assert_eq!(count(&xml, "<rest measure=\"yes\"/>"), 1);
}

#[test]
fn pitch_name_disagreement_keeps_midi() {
    // The name says D4 but the midi number says C4; midi wins.
    let s = score(vec![measure(
        1,
        0.0,
        vec![note(60, "D4", Staff::Treble, 0.0, 4.0)],
    )]);
    let result = forward::convert(&s, &ConvertOptions::default()).unwrap();
    assert!(result.output.contains("<step>C</step>"));
    assert!(!result.output.contains("<step>D</step>"));
}

#[test]
fn pickup_measure_pads_to_its_own_span() {
    // One-beat pickup before a full 4/4 measure.
    let s = score(vec![
        measure(1, 0.0, vec![note(67, "G4", Staff::Treble, 0.0, 1.0)]),
        measure(2, 1.0, vec![note(60, "C4", Staff::Treble, 1.0, 4.0)]),
    ]);
    let result = forward::convert(&s, &ConvertOptions::default()).unwrap();
    let xml = &result.output;

    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert!(xml.contains(r#"<measure number="1" implicit="yes">"#));
    // The pickup holds exactly its one beat, with no padding rest,
    // in both parts.
    assert_eq!(count(xml, "<rest/>"), 0);
    assert_eq!(count(xml, r#"<rest measure="yes"/>"#), 2);
    assert!(xml.contains("<duration>480</duration>"));
    assert!(!xml.contains("<duration>1440</duration>"));
}

#[test]
fn tie_both_emits_stop_then_start() {
    let mut tied = note(60, "C4", Staff::Treble, 4.0, 4.0);
    tied.tie_type = Some(TieType::Both);
    let mut first = note(60, "C4", Staff::Treble, 0.0, 4.0);
    first.tie_type = Some(TieType::Start);
    let s = score(vec![
        measure(1, 0.0, vec![first]),
        measure(2, 4.0, vec![tied]),
    ]);
    let xml = forward::convert(&s, &ConvertOptions::default())
        .unwrap()
        .output;

    assert_eq!(count(&xml, "<tie type=\"start\"/>"), 2);
    assert_eq!(count(&xml, "<tie type=\"stop\"/>"), 1);
    let stop_at = xml.find("<tie type=\"stop\"/>").unwrap();
    let second_start_at = xml.rfind("<tie type=\"start\"/>").unwrap();
    assert!(stop_at < second_start_at);
}

#[test]
fn unsupported_duration_falls_back_to_nearest() {
    let s = score(vec![measure(
        1,
        0.0,
        vec![note(60, "C4", Staff::Treble, 0.0, 0.7)],
    )]);
    let result = forward::convert(&s, &ConvertOptions::default()).unwrap();

    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::UnsupportedDuration { measure: 1, .. })));
    // Nearest supported value is the dotted eighth (0.75 beats).
    assert!(result.output.contains("<type>eighth</type>"));
    assert!(result.output.contains("<dot/>"));
}

#[test]
fn broken_measure_becomes_a_rest() {
    let s = score(vec![
        measure(1, 0.0, vec![note(60, "C4", Staff::Treble, 0.0, -1.0)]),
        measure(2, 4.0, vec![note(62, "D4", Staff::Treble, 4.0, 1.0)]),
    ]);
    let result = forward::convert(&s, &ConvertOptions::default()).unwrap();

    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, Warning::MeasureSkipped { measure: 1, .. })));
    // Measure 1 degrades to a whole-measure rest in P1; measure 2 survives.
    assert!(result.output.contains("<rest measure=\"yes\"/>"));
    assert!(result.output.contains("<step>D</step>"));
}

#[test]
fn rejects_six_eight() {
    let mut s = score(vec![measure(1, 0.0, vec![])]);
    s.time_beats = 6;
    s.time_beat_type = 8;
    let err = forward::convert(&s, &ConvertOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        ConvertError::UnsupportedTimeSignature {
            beats: 6,
            beat_type: 8
        }
    ));
}

#[test]
fn rejects_out_of_order_measures() {
    let s = score(vec![measure(2, 0.0, vec![])]);
    let err = forward::convert(&s, &ConvertOptions::default()).unwrap_err();
    assert!(matches!(err, ConvertError::MalformedInput { .. }));
}

#[test]
fn key_signature_spells_accidentals() {
    let mut s = score(vec![measure(
        1,
        0.0,
        vec![note(63, "Eb4", Staff::Treble, 0.0, 4.0)],
    )]);
    s.key_fifths = -3;
    let xml = forward::convert(&s, &ConvertOptions::default())
        .unwrap()
        .output;

    // Flat keys spell MIDI 63 as E-flat, not D-sharp.
    assert!(xml.contains("<step>E</step>"));
    assert!(xml.contains("<alter>-1</alter>"));
    assert!(xml.contains("<fifths>-3</fifths>"));
}

#[test]
fn debug_filter_restricts_measures() {
    let s = score(vec![
        measure(1, 0.0, vec![note(60, "C4", Staff::Treble, 0.0, 4.0)]),
        measure(2, 4.0, vec![note(62, "D4", Staff::Treble, 4.0, 4.0)]),
        measure(3, 8.0, vec![note(64, "E4", Staff::Treble, 8.0, 4.0)]),
    ]);
    let options = ConvertOptions {
        debug: true,
        measures: Some(MeasureFilter::parse("2").unwrap()),
    };
    let xml = forward::convert(&s, &options).unwrap().output;

    assert!(!xml.contains("<step>C</step>"));
    assert!(xml.contains("<step>D</step>"));
    assert!(!xml.contains("<step>E</step>"));
}

#[test]
fn json_entry_point() {
    let json = r#"{
        "keyFifths": 0,
        "timeBeats": 4,
        "timeBeatType": 4,
        "tempoBpm": 120.0,
        "measures": [{
            "number": 1,
            "height": 200.0, "width": 150.0, "x": 0.0, "y": -150.0,
            "staffDistance": 85.0,
            "startPositionBeats": 0.0, "startPositionSeconds": 0.0,
            "notes": [{
                "durationBeats": 1.0, "durationSeconds": 0.5,
                "durationType": "quarter",
                "pitchMidiNote": 60, "pitchName": "C4",
                "positionBeats": 0.0, "positionSeconds": 0.0,
                "tieType": null, "staff": "treble",
                "width": 10.0, "height": 10.0, "x": 0.0, "y": 0.0
            }]
        }]
    }"#;
    let result = scorebridge::json_to_musicxml(json, &ConvertOptions::default()).unwrap();
    assert!(result.output.contains("<step>C</step>"));
    assert!(result.warnings.is_empty());
}
