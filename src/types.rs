//! Core data types for djcue
//!
//! These types represent the domain model and flow through the pipeline.

use crate::error::{AnalyzeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Musical primitives
// =============================================================================

/// The 12 pitch classes in Western music
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    Cs, // C#/Db
    D,
    Ds, // D#/Eb
    E,
    F,
    Fs, // F#/Gb
    G,
    Gs, // G#/Ab
    A,
    As, // A#/Bb
    B,
}

impl PitchClass {
    /// All pitch classes in chroma order (index 0 = C)
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Convert from chroma index, wrapping modulo 12 (0 = C, 9 = A)
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 12]
    }

    /// Chroma index (0 = C, 1 = C#, ..., 11 = B)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Standard notation (e.g., "C", "F#")
    pub fn to_standard_notation(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }
}

/// Major or Minor scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    /// Camelot letter: 'B' for major, 'A' for minor
    pub fn camelot_letter(self) -> char {
        match self {
            Mode::Major => 'B',
            Mode::Minor => 'A',
        }
    }

    /// The opposite mode (same Camelot number, other letter)
    pub fn parallel(self) -> Self {
        match self {
            Mode::Major => Mode::Minor,
            Mode::Minor => Mode::Major,
        }
    }
}

/// A key in Camelot notation ("1A" - "12B"), or `N/A` when no estimate was possible
///
/// Serialized as its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CamelotKey {
    /// Wheel position 1-12 plus mode
    Detected { number: u8, mode: Mode },
    /// Buffer too short or silent
    Unknown,
}

impl CamelotKey {
    /// Build a detected key, rejecting wheel numbers outside 1-12
    pub fn new(number: u8, mode: Mode) -> Option<Self> {
        (1..=12)
            .contains(&number)
            .then_some(CamelotKey::Detected { number, mode })
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, CamelotKey::Detected { .. })
    }

    pub fn mode(&self) -> Option<Mode> {
        match self {
            CamelotKey::Detected { mode, .. } => Some(*mode),
            CamelotKey::Unknown => None,
        }
    }
}

impl Default for CamelotKey {
    fn default() -> Self {
        CamelotKey::Unknown
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CamelotKey::Detected { number, mode } => write!(f, "{}{}", number, mode.camelot_letter()),
            CamelotKey::Unknown => f.write_str("N/A"),
        }
    }
}

/// Error returned when a string is not `^\d{1,2}[AB]$` (1-12) or `N/A`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCamelotError(pub String);

impl fmt::Display for ParseCamelotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid Camelot key '{}'", self.0)
    }
}

impl std::error::Error for ParseCamelotError {}

impl FromStr for CamelotKey {
    type Err = ParseCamelotError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s == "N/A" {
            return Ok(CamelotKey::Unknown);
        }
        let invalid = || ParseCamelotError(s.to_string());

        let (digits, mode) = if let Some(digits) = s.strip_suffix('A') {
            (digits, Mode::Minor)
        } else if let Some(digits) = s.strip_suffix('B') {
            (digits, Mode::Major)
        } else {
            return Err(invalid());
        };
        if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let number: u8 = digits.parse().map_err(|_| invalid())?;
        CamelotKey::new(number, mode).ok_or_else(invalid)
    }
}

impl TryFrom<String> for CamelotKey {
    type Error = ParseCamelotError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CamelotKey> for String {
    fn from(key: CamelotKey) -> Self {
        key.to_string()
    }
}

/// Categorical mood label
///
/// Variant order is the tie-break order used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mood {
    #[serde(rename = "Fröhlich")]
    Froehlich,
    #[serde(rename = "Melancholisch")]
    Melancholisch,
    #[serde(rename = "Aggressiv")]
    Aggressiv,
    #[serde(rename = "Entspannt")]
    Entspannt,
    #[serde(rename = "Episch")]
    Episch,
    #[serde(rename = "Mysteriös")]
    Mysterioes,
    #[serde(rename = "Romantisch")]
    Romantisch,
    #[serde(rename = "Düster")]
    Duester,
}

impl Mood {
    pub const ALL: [Mood; 8] = [
        Mood::Froehlich,
        Mood::Melancholisch,
        Mood::Aggressiv,
        Mood::Entspannt,
        Mood::Episch,
        Mood::Mysterioes,
        Mood::Romantisch,
        Mood::Duester,
    ];

    /// Display label as shown in the library UI
    pub fn label(self) -> &'static str {
        match self {
            Mood::Froehlich => "Fröhlich",
            Mood::Melancholisch => "Melancholisch",
            Mood::Aggressiv => "Aggressiv",
            Mood::Entspannt => "Entspannt",
            Mood::Episch => "Episch",
            Mood::Mysterioes => "Mysteriös",
            Mood::Romantisch => "Romantisch",
            Mood::Duester => "Düster",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Cue points and analysis results
// =============================================================================

/// Origin of a cue point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CueSource {
    Manual,
    AutoDrop,
    AutoBuild,
}

/// A cue marker on the track timeline
///
/// Auto-generated markers use IDs from 100 upward so they never collide with
/// the user's hot-cue slots 1-9.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuePoint {
    pub id: u32,
    /// Position in seconds
    pub position: f64,
    pub label: String,
    /// Hex colour, e.g. "#FF0000"
    pub color: String,
    pub source: CueSource,
}

/// Averaged spectral descriptors for a whole track
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectralFeatures {
    /// Mean spectral centroid in Hz
    pub centroid: f32,
    /// Mean 85% rolloff frequency in Hz
    pub rolloff: f32,
    /// Mean zero-crossing rate (crossings per sample)
    pub zero_crossing_rate: f32,
    /// Mean frame RMS
    pub rms: f32,
    /// Pitch-class energy, max bin = 1 (all zero when silent)
    pub chroma_vector: [f32; 12],
}

/// Aggregated output of one full analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 0, or a tempo folded into 60-150
    pub bpm: u32,
    pub key: CamelotKey,
    /// 1-10
    pub energy: u8,
    pub features: SpectralFeatures,
    /// At most 8 markers, ascending, at least 8 s apart
    pub drops: Vec<CuePoint>,
    /// End of the quiet head section (seconds)
    pub intro_time: f64,
    /// Start of the quiet tail section (seconds)
    pub outro_time: f64,
    pub auto_tags: Vec<String>,
    pub mood: Mood,
}

/// A file-backed analysis result as produced by the batch pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedTrack {
    pub path: std::path::PathBuf,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub result: AnalysisResult,
}

// =============================================================================
// Audio buffer types
// =============================================================================

/// Immutable view of decoded mono audio handed to the analyzers
///
/// Construction validates the buffer contract; every analyzer may assume a
/// non-empty buffer with a non-zero sample rate and a finite duration.
#[derive(Debug, Clone, Copy)]
pub struct SampleBuffer<'a> {
    samples: &'a [f32],
    sample_rate: u32,
    duration: f64,
}

impl<'a> SampleBuffer<'a> {
    /// Create a view whose duration is derived from the sample count
    pub fn new(samples: &'a [f32], sample_rate: u32) -> Result<Self> {
        let duration = if sample_rate > 0 {
            samples.len() as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self::with_duration(samples, sample_rate, duration)
    }

    /// Create a view with an explicit duration (decoders may know it more precisely)
    pub fn with_duration(samples: &'a [f32], sample_rate: u32, duration: f64) -> Result<Self> {
        if sample_rate == 0 {
            return Err(AnalyzeError::InvalidInput("sample rate must be non-zero".to_string()));
        }
        if samples.is_empty() {
            return Err(AnalyzeError::InvalidInput("buffer contains no samples".to_string()));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(AnalyzeError::InvalidInput(format!(
                "duration must be a positive finite number of seconds, got {}",
                duration
            )));
        }
        if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
            return Err(AnalyzeError::InvalidInput(format!(
                "non-finite sample at index {}",
                pos
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            duration,
        })
    }

    pub fn samples(&self) -> &'a [f32] {
        self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Nyquist frequency in Hz
    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 / 2.0
    }
}

/// Decoded mono audio owned by the host
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// First-channel samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        // Guard against division by zero - validation happens in as_sample_buffer
        let duration = if sample_rate > 0 {
            samples.len() as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    /// Borrow as a validated analyzer input
    pub fn as_sample_buffer(&self) -> Result<SampleBuffer<'_>> {
        SampleBuffer::with_duration(&self.samples, self.sample_rate, self.duration)
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// =============================================================================
// Supported formats
// =============================================================================

/// Audio container formats the host decoder accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
    Flac,
    Ogg,
    M4a,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "flac" => Some(AudioFormat::Flac),
            "ogg" | "oga" => Some(AudioFormat::Ogg),
            "m4a" | "mp4" => Some(AudioFormat::M4a),
            _ => None,
        }
    }

    /// Check if a path has a supported extension
    pub fn is_supported_path(path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .is_some()
    }
}
