//! Camelot Wheel and Open Key notation mapping
//!
//! The Camelot Wheel is a visual representation of musical keys that
//! makes harmonic mixing intuitive for DJs.
//!
//! - Numbers 1-12 represent positions on the wheel
//! - 'A' suffix = minor key, 'B' suffix = major key
//! - Adjacent numbers are harmonically compatible (perfect fifth)
//! - Same number, different letter = relative major/minor

use crate::types::{CamelotKey, Mode, PitchClass};

/// Wheel position of each tonic in chroma order (C, C#, ..., B)
const MAJOR_WHEEL: [u8; 12] = [8, 3, 10, 5, 12, 7, 2, 9, 4, 11, 6, 1];
const MINOR_WHEEL: [u8; 12] = [5, 12, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10];

/// Map a tonic and mode onto the Camelot wheel
///
/// Layout:
/// ```text
///      5A      5B
///    /    \  /    \
///  4A      4B      6B
///  |       |       |
///  3A      3B      7B
///    \    /  \    /
///      2A      8B
///       ...
/// ```
pub fn to_camelot(pitch: PitchClass, mode: Mode) -> CamelotKey {
    let number = match mode {
        Mode::Major => MAJOR_WHEEL[pitch.index()],
        Mode::Minor => MINOR_WHEEL[pitch.index()],
    };
    CamelotKey::Detected { number, mode }
}

/// Inverse of [`to_camelot`]
pub fn tonic(key: CamelotKey) -> Option<(PitchClass, Mode)> {
    let CamelotKey::Detected { number, mode } = key else {
        return None;
    };
    let wheel = match mode {
        Mode::Major => &MAJOR_WHEEL,
        Mode::Minor => &MINOR_WHEEL,
    };
    wheel
        .iter()
        .position(|&n| n == number)
        .map(|index| (PitchClass::from_index(index), mode))
}

/// Open Key notation: same numbers shifted so 1d = C major, 'd' = major, 'm' = minor
pub fn to_open_key(key: CamelotKey) -> Option<String> {
    let CamelotKey::Detected { number, mode } = key else {
        return None;
    };
    // Camelot 8B (C major) is Open Key 1d
    let open = (number + 4) % 12 + 1;
    let suffix = match mode {
        Mode::Major => 'd',
        Mode::Minor => 'm',
    };
    Some(format!("{}{}", open, suffix))
}

/// Standard notation, e.g. "C", "F#m"
pub fn to_standard_notation(key: CamelotKey) -> Option<String> {
    tonic(key).map(|(pitch, mode)| match mode {
        Mode::Major => pitch.to_standard_notation().to_string(),
        Mode::Minor => format!("{}m", pitch.to_standard_notation()),
    })
}

/// Get harmonically compatible keys (for mixing suggestions)
///
/// Returns keys that are safe to mix with the given key, in this order:
/// - Same key
/// - +1 on the wheel (wraps 12 -> 1)
/// - -1 on the wheel (wraps 1 -> 12)
/// - Same number, opposite letter (relative major/minor)
pub fn compatible(key: CamelotKey) -> Vec<CamelotKey> {
    let CamelotKey::Detected { number, mode } = key else {
        return Vec::new();
    };

    let plus_one = number % 12 + 1;
    let minus_one = if number == 1 { 12 } else { number - 1 };

    vec![
        key,
        CamelotKey::Detected { number: plus_one, mode },
        CamelotKey::Detected { number: minus_one, mode },
        CamelotKey::Detected { number, mode: mode.parallel() },
    ]
}

/// String form of [`compatible`]; empty for anything that is not a valid Camelot key
pub fn camelot_compatible(code: &str) -> Vec<String> {
    match code.parse::<CamelotKey>() {
        Ok(key) => compatible(key).into_iter().map(String::from).collect(),
        Err(_) => Vec::new(),
    }
}
