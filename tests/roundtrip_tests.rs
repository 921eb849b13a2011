//! Round-trip tests: flat JSON → MusicXML → flat JSON must preserve the
//! musical content (pitches, durations, positions, ties) within the
//! duration tolerance. Layout geometry is reconstructed heuristically and
//! is not compared.

use pretty_assertions::assert_eq;
use scorebridge::constants::DURATION_TOLERANCE;
use scorebridge::model::{Measure, Note, Score, Staff, TieType};
use scorebridge::{forward, parse_musicxml, reverse, ConvertOptions};

fn note(midi: i32, staff: Staff, position: f64, duration: f64) -> Note {
    Note {
        duration_beats: duration,
        duration_seconds: duration * 0.5,
        duration_type: String::new(),
        pitch_midi_note: Some(midi),
        pitch_name: None,
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

fn tied(midi: i32, staff: Staff, position: f64, duration: f64, tie: TieType) -> Note {
    Note {
        tie_type: Some(tie),
        ..note(midi, staff, position, duration)
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

/// Musical content of a note, geometry excluded, position and duration
/// rounded to the comparison tolerance.
fn content_key(n: &Note) -> (i64, u8, i32, i64, u8) {
    let round = |v: f64| (v / DURATION_TOLERANCE).round() as i64;
    let tie = match n.tie_type {
        None => 0,
        Some(TieType::Start) => 1,
        Some(TieType::Stop) => 2,
        Some(TieType::Both) => 3,
    };
    (
        round(n.position_beats),
        n.staff as u8,
        n.pitch_midi_note.unwrap_or(-1),
        round(n.duration_beats),
        tie,
    )
}

fn roundtrip(original: &Score) -> Score {
    let xml = forward::convert(original, &ConvertOptions::default())
        .unwrap()
        .output;
    let doc = parse_musicxml(&xml).unwrap();
    reverse::convert(&doc, &ConvertOptions::default())
        .unwrap()
        .output
}

fn assert_same_content(original: &Score, restored: &Score) {
    assert_eq!(original.measures.len(), restored.measures.len());
    for (a, b) in original.measures.iter().zip(&restored.measures) {
        let mut left: Vec<_> = a.notes.iter().map(content_key).collect();
        let mut right: Vec<_> = b.notes.iter().map(content_key).collect();
        left.sort();
        right.sort();
        assert_eq!(left, right, "measure {}", a.number);
    }
}

#[test]
fn mixed_score_roundtrip() {
    let third = 1.0 / 3.0;
    let original = score(vec![
        measure(
            1,
            0.0,
            vec![
                note(60, Staff::Treble, 0.0, 1.0),
                note(64, Staff::Treble, 1.0, 1.0),
                note(67, Staff::Treble, 1.0, 1.0),
                note(62, Staff::Treble, 2.0, 1.5),
                note(64, Staff::Treble, 3.5, 0.5),
                tied(48, Staff::Bass, 0.0, 4.0, TieType::Start),
            ],
        ),
        measure(
            2,
            4.0,
            vec![
                note(69, Staff::Treble, 4.0, third),
                note(71, Staff::Treble, 4.0 + third, third),
                note(72, Staff::Treble, 4.0 + 2.0 * third, third),
                note(67, Staff::Treble, 6.0, 2.0),
                tied(48, Staff::Bass, 4.0, 4.0, TieType::Stop),
            ],
        ),
    ]);

    let restored = roundtrip(&original);
    assert_same_content(&original, &restored);

    // Tie chain survives intact.
    let chains = restored.tie_chains();
    assert_eq!(chains.len(), 1);
    assert_eq!(chains[0].len(), 2);
    assert_eq!(chains[0][0].pitch_midi_note, Some(48));
}

#[test]
fn pickup_measure_roundtrip() {
    // A one-beat pickup must come back one beat long, with the next
    // measure still starting at beat 1.
    let original = score(vec![
        measure(1, 0.0, vec![note(67, Staff::Treble, 0.0, 1.0)]),
        measure(2, 1.0, vec![note(60, Staff::Treble, 1.0, 4.0)]),
    ]);

    let restored = roundtrip(&original);
    assert!((restored.measures[1].start_position_beats - 1.0).abs() < DURATION_TOLERANCE);
    assert_same_content(&original, &restored);
}

#[test]
fn gap_before_a_note_survives() {
    // Treble is silent for the first beat and a half.
    let original = score(vec![measure(
        1,
        0.0,
        vec![note(60, Staff::Treble, 1.5, 1.0)],
    )]);

    let restored = roundtrip(&original);
    assert_same_content(&original, &restored);
}

#[test]
fn dotted_duration_type_is_reported_as_its_base() {
    let original = score(vec![measure(
        1,
        0.0,
        vec![note(60, Staff::Treble, 0.0, 1.5)],
    )]);

    let restored = roundtrip(&original);
    let n = &restored.measures[0].notes[0];
    assert_eq!(n.duration_type, "quarter");
    assert!((n.duration_beats - 1.5).abs() < DURATION_TOLERANCE);
}

#[test]
fn both_staves_roundtrip_independently() {
    let original = score(vec![measure(
        1,
        0.0,
        vec![
            note(72, Staff::Treble, 0.0, 2.0),
            note(74, Staff::Treble, 2.0, 2.0),
            note(36, Staff::Bass, 0.0, 1.0),
            note(43, Staff::Bass, 1.0, 1.0),
            note(36, Staff::Bass, 2.0, 1.0),
            note(43, Staff::Bass, 3.0, 1.0),
        ],
    )]);

    let restored = roundtrip(&original);
    assert_same_content(&original, &restored);
}

#[test]
fn beat_positions_never_exceed_capacity() {
    let original = score(vec![
        measure(
            1,
            0.0,
            vec![
                note(60, Staff::Treble, 0.0, 1.0),
                note(62, Staff::Treble, 1.0, 1.0),
                note(64, Staff::Treble, 2.0, 2.0),
            ],
        ),
        measure(2, 4.0, vec![note(65, Staff::Treble, 4.0, 4.0)]),
    ]);

    let restored = roundtrip(&original);
    let capacity = restored.beat_capacity();
    for m in &restored.measures {
        for n in &m.notes {
            assert!(
                n.end_position_beats() <= m.start_position_beats + capacity + DURATION_TOLERANCE,
                "note in measure {} overflows",
                m.number
            );
        }
        assert!(m.occupied_beats() <= capacity + DURATION_TOLERANCE);
    }
}

#[test]
fn json_string_level_roundtrip() {
    let original = score(vec![measure(
        1,
        0.0,
        vec![note(60, Staff::Treble, 0.0, 1.0)],
    )]);
    let json = serde_json::to_string(&original).unwrap();

    let xml = scorebridge::json_to_musicxml(&json, &ConvertOptions::default())
        .unwrap()
        .output;
    let restored_json = scorebridge::musicxml_to_json(&xml, &ConvertOptions::default())
        .unwrap()
        .output;

    let value: serde_json::Value = serde_json::from_str(&restored_json).unwrap();
    let restored_note = &value["measures"][0]["notes"][0];
    assert_eq!(restored_note["pitchMidiNote"], 60);
    assert_eq!(restored_note["pitchName"], "C4");
    assert_eq!(restored_note["durationType"], "quarter");
    assert_eq!(restored_note["tieType"], serde_json::Value::Null);
    assert!((restored_note["durationBeats"].as_f64().unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn empty_score_roundtrip() {
    let original = score(vec![measure(1, 0.0, vec![]), measure(2, 4.0, vec![])]);
    let restored = roundtrip(&original);

    assert_eq!(restored.measures.len(), 2);
    assert!(restored.measures.iter().all(|m| m.notes.is_empty()));
    assert!((restored.measures[1].start_position_beats - 4.0).abs() < 1e-9);
}
