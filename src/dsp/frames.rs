//! Overlapping frame extraction
//!
//! Slices a buffer into `fft_size` frames advanced by `hop_size` and hands
//! each frame plus its windowed magnitude spectrum to a callback. Frames that
//! would read past the end of the buffer are never emitted.

use super::fft::SpectrumAnalyzer;

/// Number of whole frames: `floor((len - fft_size) / hop_size)`, or 0 if the
/// buffer is shorter than one frame
pub fn frame_count(len: usize, fft_size: usize, hop_size: usize) -> usize {
    if hop_size == 0 || len < fft_size {
        return 0;
    }
    (len - fft_size) / hop_size
}

/// Run `visit(index, frame_samples, magnitudes)` for every frame
///
/// The magnitude slice is reused between calls; copy it if it must outlive
/// the callback. Returns the number of frames visited.
pub fn for_each_frame<F>(
    samples: &[f32],
    analyzer: &mut SpectrumAnalyzer,
    hop_size: usize,
    mut visit: F,
) -> usize
where
    F: FnMut(usize, &[f32], &[f32]),
{
    let fft_size = analyzer.size();
    let num_frames = frame_count(samples.len(), fft_size, hop_size);
    let mut magnitudes = vec![0.0f32; analyzer.num_bins()];

    for index in 0..num_frames {
        let start = index * hop_size;
        let frame = &samples[start..start + fft_size];
        analyzer.magnitudes(frame, &mut magnitudes);
        visit(index, frame, &magnitudes);
    }

    num_frames
}
