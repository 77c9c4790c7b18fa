//! Note labels
//!
//! Converts between pitch labels such as "C4" or "F#2" and MIDI note
//! numbers. Middle C is "C4" = 60; octaves run from -1 to 9.

/// Pitch label used when a sample has no marker of its own
pub const DEFAULT_NOTE: &str = "C4";

/// MIDI number stored for labels that cannot be parsed
pub const DEFAULT_MIDI_NOTE: u8 = 60;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Parse a note label into a MIDI note number
///
/// Accepts a letter `A`-`G` (either case), an optional `#` or `b`, and an
/// octave number which may be negative. Returns `None` for anything else or
/// for pitches outside 0..=127.
pub fn note_to_midi(label: &str) -> Option<u8> {
    let label = label.trim();
    let mut chars = label.chars();

    let pitch_class: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave_str) = match rest.chars().next() {
        Some('#') => (1, &rest[1..]),
        Some('b') => (-1, &rest[1..]),
        _ => (0, rest),
    };

    let digits = octave_str.strip_prefix('-').unwrap_or(octave_str);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let octave: i32 = octave_str.parse().ok()?;
    if !(-1..=9).contains(&octave) {
        return None;
    }

    let midi = 12 * (octave + 1) + pitch_class + accidental;
    u8::try_from(midi).ok().filter(|&m| m <= 127)
}

/// MIDI number for a label, falling back to middle C
pub fn pitch_byte(label: &str) -> u8 {
    note_to_midi(label).unwrap_or(DEFAULT_MIDI_NOTE)
}

/// Sharp-spelled label for a MIDI note number
pub fn midi_to_note(midi: u8) -> String {
    let octave = (midi / 12) as i32 - 1;
    format!("{}{}", NOTE_NAMES[(midi % 12) as usize], octave)
}

/// Note for a position within the recording, spread across all 128 pitches
///
/// Used by the chromatic note mode: the start of the recording maps to
/// MIDI 0 and the end approaches MIDI 127.
pub fn chromatic_note(time: f64, duration: f64) -> String {
    if duration.is_nan() || duration <= 0.0 || !time.is_finite() {
        return DEFAULT_NOTE.to_string();
    }
    let position = (time / duration).clamp(0.0, 1.0);
    let index = ((position * 128.0).floor() as usize) % 128;
    midi_to_note(index as u8)
}
