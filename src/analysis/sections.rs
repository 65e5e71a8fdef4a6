//! Intro/outro boundaries from a windowed RMS scan

use crate::config::SectionConfig;
use crate::types::SampleBuffer;
use tracing::debug;

/// Where the quiet head section ends and the quiet tail section begins, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sections {
    pub intro_time: f64,
    pub outro_time: f64,
}

/// Scan non-overlapping RMS windows against a fraction of the loudest window
///
/// `intro_time` is the start of the first window at or above the threshold,
/// `outro_time` the end of the last one (capped at the buffer duration). A
/// silent buffer has no quiet sections to skip: `0` and the full duration.
pub fn detect_sections_with(buffer: &SampleBuffer, config: &SectionConfig) -> Sections {
    let duration = buffer.duration();
    let sample_rate = buffer.sample_rate() as f64;
    let window_len = ((config.window_secs * sample_rate).round() as usize).max(1);

    let window_rms: Vec<f32> = buffer
        .samples()
        .chunks(window_len)
        .map(crate::analysis::features::rms)
        .collect();

    let peak = window_rms.iter().copied().fold(0.0f32, f32::max);
    if !(peak > 0.0) {
        return Sections {
            intro_time: 0.0,
            outro_time: duration,
        };
    }

    let threshold = config.peak_fraction * peak;
    let first = window_rms.iter().position(|&r| r >= threshold).unwrap_or(0);
    let last = window_rms
        .iter()
        .rposition(|&r| r >= threshold)
        .unwrap_or(window_rms.len() - 1);

    let intro_time = (first * window_len) as f64 / sample_rate;
    let outro_time = (((last + 1) * window_len) as f64 / sample_rate).min(duration);
    debug!("Sections: intro ends {:.2}s, outro starts {:.2}s", intro_time, outro_time);

    Sections {
        intro_time: intro_time.min(outro_time),
        outro_time,
    }
}

/// Intro/outro boundaries with default parameters
pub fn detect_sections(buffer: &SampleBuffer) -> Sections {
    detect_sections_with(buffer, &SectionConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded_tone(lead_secs: f32, body_secs: f32, tail_secs: f32, sample_rate: u32) -> Vec<f32> {
        let sr = sample_rate as f32;
        let lead = (lead_secs * sr) as usize;
        let body = (body_secs * sr) as usize;
        let tail = (tail_secs * sr) as usize;
        let mut samples = vec![0.0f32; lead + body + tail];
        for i in 0..body {
            samples[lead + i] = 0.5 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sr).sin();
        }
        samples
    }

    #[test]
    fn test_quiet_head_and_tail() {
        let samples = padded_tone(4.0, 10.0, 6.0, 44100);
        let buffer = SampleBuffer::new(&samples, 44100).unwrap();
        let sections = detect_sections(&buffer);
        assert!((sections.intro_time - 4.0).abs() < 1e-9, "intro {}", sections.intro_time);
        assert!((sections.outro_time - 14.0).abs() < 1e-9, "outro {}", sections.outro_time);
    }

    #[test]
    fn test_loud_throughout() {
        let samples = padded_tone(0.0, 7.25, 0.0, 44100);
        let buffer = SampleBuffer::new(&samples, 44100).unwrap();
        let sections = detect_sections(&buffer);
        assert_eq!(sections.intro_time, 0.0);
        assert!((sections.outro_time - buffer.duration()).abs() < 1e-9);
    }

    #[test]
    fn test_silence_spans_whole_buffer() {
        let samples = vec![0.0f32; 44100 * 30];
        let buffer = SampleBuffer::new(&samples, 44100).unwrap();
        let sections = detect_sections(&buffer);
        assert_eq!(sections.intro_time, 0.0);
        assert_eq!(sections.outro_time, 30.0);
    }

    #[test]
    fn test_tiny_buffer() {
        let samples = vec![0.2f32; 100];
        let buffer = SampleBuffer::new(&samples, 44100).unwrap();
        let sections = detect_sections(&buffer);
        assert_eq!(sections.intro_time, 0.0);
        assert!((sections.outro_time - buffer.duration()).abs() < 1e-12);
    }
}
