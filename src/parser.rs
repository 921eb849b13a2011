//! MusicXML parser — converts MusicXML text into the [`crate::musicxml`]
//! document model. Elements outside the supported subset are ignored.

use roxmltree::{Document, Node};

use crate::error::ConvertError;
use crate::musicxml::*;

/// Parse a MusicXML string into the document model.
pub fn parse_musicxml(xml: &str) -> Result<Score, ConvertError> {
    // MusicXML files include a DOCTYPE declaration, so we must allow DTDs
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = Document::parse_with_options(xml, options)
        .map_err(|e| ConvertError::Xml(e.to_string()))?;
    let root = doc.root_element();

    if root.tag_name().name() != "score-partwise" {
        return Err(ConvertError::Xml(format!(
            "unsupported root element '{}', only 'score-partwise' is supported",
            root.tag_name().name()
        )));
    }

    let mut score = Score {
        version: root.attribute("version").map(String::from),
        parts: Vec::new(),
    };

    for child in root.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "part-list" => parse_part_list(&child, &mut score),
            "part" => parse_part(&child, &mut score),
            _ => {}
        }
    }

    if score.parts.is_empty() {
        return Err(ConvertError::Xml("document contains no parts".to_string()));
    }

    Ok(score)
}

// ─── Part list ───────────────────────────────────────────────────────

fn parse_part_list(node: &Node, score: &mut Score) {
    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "score-part" {
            let id = child.attribute("id").unwrap_or("").to_string();
            score.parts.push(Part {
                id,
                measures: Vec::new(),
            });
        }
    }
}

// ─── Part (measures) ─────────────────────────────────────────────────

fn parse_part(node: &Node, score: &mut Score) {
    let part_id = node.attribute("id").unwrap_or("");

    // Parts may appear without a part-list entry; create one on the fly.
    if !score.parts.iter().any(|p| p.id == part_id) {
        score.parts.push(Part {
            id: part_id.to_string(),
            measures: Vec::new(),
        });
    }
    let part = score
        .parts
        .iter_mut()
        .find(|p| p.id == part_id)
        .expect("part just ensured");

    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "measure" {
            part.measures.push(parse_measure(&child));
        }
    }
}

// ─── Measure ─────────────────────────────────────────────────────────

fn parse_measure(node: &Node) -> Measure {
    let number = node
        .attribute("number")
        .and_then(|n| n.parse::<i32>().ok())
        .unwrap_or(0);
    let implicit = node.attribute("implicit") == Some("yes");

    let mut measure = Measure {
        number,
        implicit,
        attributes: None,
        notes: Vec::new(),
        tempo: None,
    };

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "attributes" => measure.attributes = Some(parse_attributes(&child)),
            "note" => measure.notes.push(parse_note(&child)),
            "direction" => {
                if let Some(tempo) = parse_direction_tempo(&child) {
                    measure.tempo = Some(tempo);
                }
            }
            "sound" => {
                // <sound> can appear directly in <measure> (not inside <direction>)
                if let Some(tempo) = child.attribute("tempo").and_then(|t| t.parse::<f64>().ok()) {
                    measure.tempo = Some(tempo);
                }
            }
            _ => {}
        }
    }

    measure
}

// ─── Attributes ──────────────────────────────────────────────────────

fn parse_attributes(node: &Node) -> Attributes {
    let mut attrs = Attributes::default();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "divisions" => attrs.divisions = parse_i32(&child),
            "key" => attrs.key = Some(parse_key(&child)),
            "time" => attrs.time = Some(parse_time(&child)),
            "clef" => attrs.clefs.push(parse_clef(&child)),
            _ => {}
        }
    }

    attrs
}

fn parse_key(node: &Node) -> Key {
    let mut key = Key { fifths: 0 };
    for child in node.children().filter(|n| n.is_element()) {
        if child.tag_name().name() == "fifths" {
            key.fifths = parse_i32(&child).unwrap_or(0);
        }
    }
    key
}

fn parse_time(node: &Node) -> TimeSignature {
    let mut ts = TimeSignature {
        beats: 4,
        beat_type: 4,
    };
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "beats" => ts.beats = parse_i32(&child).unwrap_or(4),
            "beat-type" => ts.beat_type = parse_i32(&child).unwrap_or(4),
            _ => {}
        }
    }
    ts
}

fn parse_clef(node: &Node) -> Clef {
    let number = node
        .attribute("number")
        .and_then(|n| n.parse::<i32>().ok())
        .unwrap_or(1);
    let mut clef = Clef {
        number,
        sign: "G".to_string(),
        line: 2,
    };
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "sign" => {
                clef.sign = child.text().unwrap_or("G").trim().to_string();
            }
            "line" => clef.line = parse_i32(&child).unwrap_or(2),
            _ => {}
        }
    }
    clef
}

// ─── Note ────────────────────────────────────────────────────────────

fn parse_note(node: &Node) -> Note {
    let mut note = Note::default();

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "pitch" => note.pitch = Some(parse_pitch(&child)),
            "duration" => note.duration = parse_i32(&child).unwrap_or(0),
            "staff" => note.staff = parse_i32(&child),
            "type" => {
                note.note_type = child.text().map(|t| t.trim().to_string());
            }
            "rest" => {
                note.rest = true;
                if child.attribute("measure") == Some("yes") {
                    note.measure_rest = true;
                }
            }
            "chord" => note.chord = true,
            "dot" => note.dots += 1,
            "tie" => match child.attribute("type") {
                Some("start") => note.tie_start = true,
                Some("stop") => note.tie_stop = true,
                _ => {}
            },
            "time-modification" => {
                note.time_modification = Some(parse_time_modification(&child));
            }
            _ => {}
        }
    }

    note
}

fn parse_pitch(node: &Node) -> Pitch {
    let mut pitch = Pitch {
        step: "C".to_string(),
        octave: 4,
        alter: 0,
    };
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "step" => {
                pitch.step = child.text().unwrap_or("C").trim().to_string();
            }
            "octave" => pitch.octave = parse_i32(&child).unwrap_or(4),
            "alter" => {
                // Alter may carry a decimal point in the wild ("1.0")
                pitch.alter = parse_f64(&child).unwrap_or(0.0).round() as i32;
            }
            _ => {}
        }
    }
    pitch
}

fn parse_time_modification(node: &Node) -> TimeModification {
    let mut tm = TimeModification {
        actual_notes: 1,
        normal_notes: 1,
    };
    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "actual-notes" => tm.actual_notes = parse_i32(&child).unwrap_or(1),
            "normal-notes" => tm.normal_notes = parse_i32(&child).unwrap_or(1),
            _ => {}
        }
    }
    tm
}

// ─── Direction (tempo only) ──────────────────────────────────────────

fn parse_direction_tempo(node: &Node) -> Option<f64> {
    let mut sound_tempo = None;
    let mut metronome_tempo = None;

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "sound" => {
                if let Some(t) = child.attribute("tempo").and_then(|t| t.parse::<f64>().ok()) {
                    sound_tempo = Some(t);
                }
            }
            "direction-type" => {
                for dt in child.children().filter(|n| n.is_element()) {
                    if dt.tag_name().name() == "metronome" {
                        metronome_tempo = parse_metronome(&dt);
                    }
                }
            }
            _ => {}
        }
    }

    // <sound tempo> wins over the metronome mark when both exist
    sound_tempo.or(metronome_tempo)
}

fn parse_metronome(node: &Node) -> Option<f64> {
    let mut beat_unit = "quarter".to_string();
    let mut dotted = false;
    let mut per_minute = None;

    for child in node.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "beat-unit" => {
                beat_unit = child.text().unwrap_or("quarter").trim().to_string();
            }
            "beat-unit-dot" => dotted = true,
            "per-minute" => {
                per_minute = child.text().and_then(|t| t.trim().parse::<f64>().ok());
            }
            _ => {}
        }
    }

    // Normalize to quarter-note BPM
    let unit_quarters = match beat_unit.as_str() {
        "whole" => 4.0,
        "half" => 2.0,
        "quarter" => 1.0,
        "eighth" => 0.5,
        "16th" => 0.25,
        _ => 1.0,
    } * if dotted { 1.5 } else { 1.0 };

    per_minute.map(|pm| pm * unit_quarters)
}

// ─── Helpers ─────────────────────────────────────────────────────────

fn parse_i32(node: &Node) -> Option<i32> {
    node.text()?.trim().parse().ok()
}

fn parse_f64(node: &Node) -> Option<f64> {
    node.text()?.trim().parse().ok()
}
