//! Integration tests for the djcue engine and pipeline
//!
//! Pipeline tests write WAV fixtures with hound into temp directories and
//! inspect the resulting djcue.json; engine tests exercise the public
//! analyzer API on synthetic buffers.

use djcue::analysis::{camelot_compatible, cosine_similarity};
use djcue::config::{AnalysisConfig, Settings};
use djcue::pipeline::{self, AnalysisRequest, AnalysisResponse, Engine, WorkerPool};
use djcue::{CamelotKey, SampleBuffer};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Write mono 16-bit samples to a WAV file
fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV file");
    for &sample in samples {
        writer
            .write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16)
            .expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize WAV");
}

fn sine(frequency_hz: f32, duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    use std::f32::consts::PI;
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    (0..num_samples)
        .map(|i| 0.5 * (2.0 * PI * frequency_hz * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Short exponentially decaying clicks at the given tempo
fn click_track(bpm: f32, duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let samples_per_beat = (60.0 / bpm * sample_rate as f32) as usize;
    let impulse_samples = (0.005 * sample_rate as f32) as usize;

    (0..num_samples)
        .map(|i| {
            let position_in_beat = i % samples_per_beat;
            if position_in_beat < impulse_samples {
                0.8 * (-5.0 * position_in_beat as f32 / impulse_samples as f32).exp()
            } else {
                0.0
            }
        })
        .collect()
}

/// Create test settings with progress bars disabled
fn create_test_settings(input: &Path, output: &Path) -> Settings {
    Settings {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        analysis: AnalysisConfig::default(),
        analysis_threads: 2,
        recursive: true,
        force: false,
        show_progress: false,
        dry_run: false,
    }
}

fn read_output(output_dir: &Path) -> serde_json::Value {
    let content = fs::read_to_string(output_dir.join("djcue.json")).expect("Failed to read JSON");
    serde_json::from_str(&content).expect("Output should be valid JSON")
}

fn is_camelot(key: &str) -> bool {
    key == "N/A" || key.parse::<CamelotKey>().is_ok()
}

fn is_bpm_match(detected: u64, target: f64, tolerance: f64) -> bool {
    let detected = detected as f64;
    [target, target / 2.0, target * 2.0]
        .iter()
        .any(|t| (detected - t).abs() <= tolerance)
}

// =============================================================================
// Pipeline
// =============================================================================

#[test]
fn test_pipeline_produces_valid_json() {
    let input_dir = TempDir::new().expect("Failed to create input temp dir");
    let output_dir = TempDir::new().expect("Failed to create output temp dir");
    write_wav(&input_dir.path().join("test_track.wav"), &sine(440.0, 5.0, 44100), 44100);

    let settings = create_test_settings(input_dir.path(), output_dir.path());
    let result = pipeline::run(&settings).expect("Pipeline should succeed");

    assert_eq!(result.total_files, 1, "Should find 1 file");
    assert_eq!(result.successful, 1, "Should successfully analyze 1 file");
    assert_eq!(result.failed, 0, "Should have no failures");

    let json = read_output(output_dir.path());
    assert_eq!(json["version"], "1.0");
    assert!(json["metadata"]["exported_at"].is_string());
    assert_eq!(json["metadata"]["track_count"], 1);

    let track = &json["tracks"][0];
    assert!(track["path"].as_str().unwrap().ends_with("test_track.wav"));
    assert_eq!(track["sample_rate"], 44100);
    assert!((track["duration_seconds"].as_f64().unwrap() - 5.0).abs() < 0.01);

    let analysis = &track["analysis"];
    let bpm = analysis["bpm"].as_u64().unwrap();
    assert!(bpm == 0 || (60..=150).contains(&bpm), "bpm {}", bpm);
    assert!(is_camelot(analysis["key"].as_str().unwrap()));
    let energy = analysis["energy"].as_u64().unwrap();
    assert!((1..=10).contains(&energy));
    assert!(analysis["mood"].is_string());
    assert!(analysis["drops"].is_array());
    assert_eq!(analysis["features"]["chroma_vector"].as_array().unwrap().len(), 12);
    // Whole-track chroma of an A4 tone peaks at A
    assert_eq!(analysis["features"]["chroma_vector"][9].as_f64().unwrap(), 1.0);
}

#[test]
fn test_pipeline_handles_empty_directory() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();

    let settings = create_test_settings(input_dir.path(), output_dir.path());
    let result = pipeline::run(&settings).expect("Pipeline should succeed on empty directory");

    assert_eq!(result.total_files, 0);
    assert_eq!(result.successful, 0);
    assert!(!output_dir.path().join("djcue.json").exists());
}

#[test]
fn test_pipeline_multiple_files() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();

    for (i, freq) in [220.0, 440.0, 880.0].iter().enumerate() {
        let path = input_dir.path().join(format!("track_{}.wav", i));
        write_wav(&path, &sine(*freq, 3.0, 22050), 22050);
    }

    let settings = create_test_settings(input_dir.path(), output_dir.path());
    let result = pipeline::run(&settings).expect("Pipeline should succeed");

    assert_eq!(result.total_files, 3);
    assert_eq!(result.successful, 3);

    let json = read_output(output_dir.path());
    let tracks = json["tracks"].as_array().unwrap();
    assert_eq!(tracks.len(), 3);
    let paths: Vec<&str> = tracks.iter().map(|t| t["path"].as_str().unwrap()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted, "tracks should be sorted by path");
}

#[test]
fn test_bpm_detection_120_click_track() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    write_wav(&input_dir.path().join("click_120.wav"), &click_track(120.0, 20.0, 44100), 44100);

    let settings = create_test_settings(input_dir.path(), output_dir.path());
    pipeline::run(&settings).expect("Pipeline should succeed");

    let bpm = read_output(output_dir.path())["tracks"][0]["analysis"]["bpm"]
        .as_u64()
        .unwrap();
    assert!((118..=122).contains(&bpm), "Expected ~120 BPM, got {}", bpm);
}

#[test]
fn test_bpm_detection_various_tempos() {
    for target in [100.0f32, 128.0, 140.0] {
        let samples = click_track(target, 20.0, 44100);
        let buffer = SampleBuffer::new(&samples, 44100).unwrap();
        let bpm = djcue::analysis::detect_bpm(&buffer) as u64;
        assert!(
            is_bpm_match(bpm, target as f64, 2.0),
            "Expected ~{} BPM (or octave), got {}",
            target,
            bpm
        );
    }
}

#[test]
fn test_skips_already_analyzed_unless_forced() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    write_wav(&input_dir.path().join("a.wav"), &sine(330.0, 2.0, 22050), 22050);

    let mut settings = create_test_settings(input_dir.path(), output_dir.path());
    let first = pipeline::run(&settings).unwrap();
    assert_eq!(first.successful, 1);

    // Second run: nothing to do, output untouched
    write_wav(&input_dir.path().join("b.wav"), &sine(660.0, 2.0, 22050), 22050);
    let second = pipeline::run(&settings).unwrap();
    assert_eq!(second.total_files, 2);
    assert_eq!(second.successful, 1);
    assert_eq!(second.skipped, 1);
    assert_eq!(read_output(output_dir.path())["tracks"].as_array().unwrap().len(), 2);

    settings.force = true;
    let forced = pipeline::run(&settings).unwrap();
    assert_eq!(forced.successful, 2);
    assert_eq!(forced.skipped, 0);
    assert_eq!(read_output(output_dir.path())["tracks"].as_array().unwrap().len(), 2);
}

#[test]
fn test_handles_invalid_audio_data() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();

    fs::write(input_dir.path().join("broken.wav"), b"this is not a wav file").unwrap();
    write_wav(&input_dir.path().join("empty.wav"), &[], 44100);
    write_wav(&input_dir.path().join("good.wav"), &sine(440.0, 2.0, 44100), 44100);

    let settings = create_test_settings(input_dir.path(), output_dir.path());
    let result = pipeline::run(&settings).expect("Bad files must not abort the batch");

    assert_eq!(result.total_files, 3);
    assert_eq!(result.successful, 1);
    assert_eq!(result.skipped, 2);
    assert_eq!(result.failed, 0);

    let json = read_output(output_dir.path());
    let tracks = json["tracks"].as_array().unwrap();
    assert_eq!(tracks.len(), 1);
    assert!(tracks[0]["path"].as_str().unwrap().ends_with("good.wav"));
}

#[test]
fn test_handles_nonexistent_input_gracefully() {
    let output_dir = TempDir::new().unwrap();
    let settings = create_test_settings(Path::new("/nonexistent/path/to/music"), output_dir.path());

    let result = pipeline::run(&settings);
    assert!(result.is_err(), "Should fail on missing input");
}

#[test]
fn test_dry_run_writes_nothing() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    write_wav(&input_dir.path().join("a.wav"), &sine(440.0, 1.0, 22050), 22050);

    let mut settings = create_test_settings(input_dir.path(), output_dir.path());
    settings.dry_run = true;
    let result = pipeline::run(&settings).unwrap();

    assert_eq!(result.total_files, 1);
    assert_eq!(result.successful, 0);
    assert!(!output_dir.path().join("djcue.json").exists());
}

#[test]
fn test_analysis_config_file_is_applied() {
    let input_dir = TempDir::new().unwrap();
    let output_dir = TempDir::new().unwrap();
    let config_path = input_dir.path().join("analysis.json");
    fs::write(&config_path, r#"{ "drops": { "first_cue_id": 500 } }"#).unwrap();

    // Loud bursts every 10 s give several well-separated drop candidates
    let sr = 22050;
    let samples: Vec<f32> = (0..sr * 40)
        .map(|i| {
            let t = i as f32 / sr as f32;
            let level = if t % 10.0 > 5.0 { 0.8 } else { 0.0 };
            level * (2.0 * std::f32::consts::PI * 60.0 * t).sin()
        })
        .collect();
    write_wav(&input_dir.path().join("bursts.wav"), &samples, sr as u32);

    let mut settings = create_test_settings(input_dir.path(), output_dir.path());
    settings.analysis = AnalysisConfig::from_json_file(&config_path).unwrap();
    pipeline::run(&settings).unwrap();

    let json = read_output(output_dir.path());
    let drops = json["tracks"][0]["analysis"]["drops"].as_array().unwrap();
    assert!(!drops.is_empty());
    assert_eq!(drops[0]["id"], 500);
}

// =============================================================================
// Engine properties
// =============================================================================

#[test]
fn test_analysis_is_deterministic() {
    let samples = click_track(126.0, 12.0, 44100);
    let buffer = SampleBuffer::new(&samples, 44100).unwrap();
    assert_eq!(djcue::analyze(&buffer), djcue::analyze(&buffer));
}

#[test]
fn test_silence_scenario() {
    let samples = vec![0.0f32; 44100 * 30];
    let result = djcue::analyze(&SampleBuffer::new(&samples, 44100).unwrap());

    assert_eq!(result.bpm, 0);
    assert_eq!(result.key, CamelotKey::Unknown);
    assert_eq!(result.key.to_string(), "N/A");
    assert!(result.energy <= 2);
    assert!(result.drops.is_empty());
    assert_eq!(result.features.chroma_vector, [0.0; 12]);
}

#[test]
fn test_short_buffer_boundary() {
    let samples = sine(440.0, 0.1, 44100);
    let result = djcue::analyze(&SampleBuffer::new(&samples, 44100).unwrap());
    assert_eq!(result.bpm, 0);
    assert_eq!(result.key, CamelotKey::Unknown);
    assert!(result.drops.is_empty());
    assert!((1..=10).contains(&result.energy));
}

#[test]
fn test_gain_changes_nothing_but_loudness() {
    let mut loud = click_track(120.0, 20.0, 44100);
    for (i, s) in sine(330.0, 20.0, 44100).iter().enumerate() {
        loud[i] = 0.5 * loud[i] + 0.5 * s;
    }
    let quiet: Vec<f32> = loud.iter().map(|s| s * 0.5).collect();

    let a = djcue::analyze(&SampleBuffer::new(&loud, 44100).unwrap());
    let b = djcue::analyze(&SampleBuffer::new(&quiet, 44100).unwrap());

    assert_eq!(a.bpm, b.bpm);
    assert_eq!(a.key, b.key);
    assert_eq!(a.features.chroma_vector, b.features.chroma_vector);
}

#[test]
fn test_range_invariants_on_varied_signals() {
    let signals = [
        sine(55.0, 10.0, 44100),
        click_track(174.0, 15.0, 44100),
        (0..44100i64 * 10).map(|i| (((i * 7919) % 2000) as f32 / 1000.0) - 1.0).collect(),
    ];
    for samples in &signals {
        let result = djcue::analyze(&SampleBuffer::new(samples, 44100).unwrap());
        assert!(result.bpm == 0 || (60..=150).contains(&result.bpm), "bpm {}", result.bpm);
        assert!((1..=10).contains(&result.energy));
        assert!(result.drops.len() <= 8);
        for pair in result.drops.windows(2) {
            assert!(pair[1].position - pair[0].position >= 8.0);
        }
        assert!(result.drops.iter().all(|d| d.id >= 100));
        assert!(result.intro_time <= result.outro_time);
        let max = result.features.chroma_vector.iter().copied().fold(0.0f32, f32::max);
        assert!(max == 0.0 || max == 1.0);
    }
}

#[test]
fn test_similarity_helpers() {
    let a = djcue::analyze(&SampleBuffer::new(&sine(440.0, 5.0, 44100), 44100).unwrap());
    let chroma = a.features.chroma_vector;
    assert!((cosine_similarity(&chroma, &chroma) - 1.0).abs() < 1e-6);

    let key = a.key.to_string();
    let compatible = camelot_compatible(&key);
    assert_eq!(compatible.len(), 4);
    assert_eq!(compatible[0], key);
    assert!(camelot_compatible("not a key").is_empty());
}

// =============================================================================
// Worker protocol
// =============================================================================

#[test]
fn test_worker_protocol_round_trip() {
    let engine = Arc::new(Engine::new(AnalysisConfig::default()).unwrap());
    let pool = WorkerPool::spawn(2, Arc::clone(&engine)).unwrap();

    let samples = click_track(120.0, 10.0, 44100);
    pool.submit(AnalysisRequest {
        id: 1,
        sample_data: samples.clone(),
        sample_rate: 44100,
        duration: 10.0,
    })
    .unwrap();
    pool.submit(AnalysisRequest {
        id: 2,
        sample_data: Vec::new(),
        sample_rate: 44100,
        duration: 0.0,
    })
    .unwrap();

    let mut responses: Vec<AnalysisResponse> = pool.shutdown().iter().collect();
    responses.sort_by_key(|r| r.id());
    assert_eq!(responses.len(), 2);

    let direct = engine.analyze(&SampleBuffer::with_duration(&samples, 44100, 10.0).unwrap());
    match responses.remove(0) {
        AnalysisResponse::Completed { id, result } => {
            assert_eq!(id, 1);
            assert_eq!(result, direct);
        }
        other => panic!("expected completion, got {:?}", other),
    }
    assert!(matches!(responses[0], AnalysisResponse::Failed { id: 2, .. }));
}
