//! Pitch conversions: MIDI note numbers, scientific pitch names and the
//! MusicXML step/alter/octave triple. Spelling of chromatic notes follows
//! the key signature — flat keys spell flats, everything else sharps.

/// Pitch classes spelled with sharps, indexed by semitone within the octave.
const SHARP_NAMES: [(&str, i32); 12] = [
    ("C", 0),
    ("C", 1),
    ("D", 0),
    ("D", 1),
    ("E", 0),
    ("F", 0),
    ("F", 1),
    ("G", 0),
    ("G", 1),
    ("A", 0),
    ("A", 1),
    ("B", 0),
];

/// Pitch classes spelled with flats.
const FLAT_NAMES: [(&str, i32); 12] = [
    ("C", 0),
    ("D", -1),
    ("D", 0),
    ("E", -1),
    ("E", 0),
    ("F", 0),
    ("G", -1),
    ("G", 0),
    ("A", -1),
    ("A", 0),
    ("B", -1),
    ("B", 0),
];

fn step_semitone(step: &str) -> Option<i32> {
    match step {
        "C" => Some(0),
        "D" => Some(2),
        "E" => Some(4),
        "F" => Some(5),
        "G" => Some(7),
        "A" => Some(9),
        "B" => Some(11),
        _ => None,
    }
}

/// MusicXML (step, alter, octave) for a MIDI note, spelled per the key
/// signature (`fifths < 0` selects flat spelling).
pub fn midi_to_step_alter_octave(midi: i32, fifths: i32) -> (&'static str, i32, i32) {
    let table = if fifths < 0 { &FLAT_NAMES } else { &SHARP_NAMES };
    let (step, alter) = table[midi.rem_euclid(12) as usize];
    // The octave belongs to the written step: Cb4 is a semitone below C4
    // but still octave 4, so derive it from the step's natural semitone.
    let semitone = midi - alter;
    let octave = semitone / 12 - 1;
    (step, alter, octave)
}

/// Scientific pitch name ("C#4", "Eb3") for a MIDI note.
pub fn midi_to_name(midi: i32, fifths: i32) -> String {
    let (step, alter, octave) = midi_to_step_alter_octave(midi, fifths);
    let accidental = match alter {
        1 => "#",
        -1 => "b",
        _ => "",
    };
    format!("{step}{accidental}{octave}")
}

/// MIDI note from a MusicXML step/alter/octave triple. Middle C (C4) = 60.
pub fn step_alter_octave_to_midi(step: &str, alter: i32, octave: i32) -> Option<i32> {
    Some((octave + 1) * 12 + step_semitone(step)? + alter)
}

/// Parse a scientific pitch name into a MIDI number. Accepts "#" for
/// sharp and either "b" or "-" for flat (some producers write "B-3").
pub fn parse_name(name: &str) -> Option<i32> {
    let mut chars = name.chars();
    let step = chars.next()?.to_ascii_uppercase().to_string();
    let rest: String = chars.collect();

    let mut alter = 0;
    let mut idx = 0;
    for c in rest.chars() {
        match c {
            '#' => alter += 1,
            'b' | '-' => alter -= 1,
            _ => break,
        }
        idx += c.len_utf8();
    }
    let octave: i32 = rest[idx..].parse().ok()?;
    step_alter_octave_to_midi(&step, alter, octave)
}
