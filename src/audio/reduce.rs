use std::num::NonZeroUsize;
use std::ops::Range;

/// Mean absolute amplitude per circumferential segment.
///
/// Always holds exactly as many entries as the segment count it was reduced
/// with, and every entry is finite and non-negative for finite input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MagnitudeSequence {
    values: Vec<f32>,
}

impl MagnitudeSequence {
    pub fn from_values(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn peak(&self) -> f32 {
        self.values.iter().copied().fold(0.0f32, f32::max)
    }
}

/// Sample range covered by segment `index` when `len` samples are split into
/// `segments` consecutive slices.
///
/// Boundaries are `floor(index * len / segments)`, computed in integers so
/// consecutive ranges always meet exactly and together cover `0..len`.
pub fn segment_range(index: usize, len: usize, segments: NonZeroUsize) -> Range<usize> {
    let segments = segments.get() as u128;
    let boundary = |i: usize| (i as u128 * len as u128 / segments) as usize;
    boundary(index)..boundary(index + 1)
}

/// Reduce a mono sample buffer to one mean absolute amplitude per segment.
///
/// Segments that receive no samples (fewer samples than segments, or an empty
/// buffer) get `0.0`.
pub fn reduce(samples: &[f32], segments: NonZeroUsize) -> MagnitudeSequence {
    if samples.is_empty() {
        log::warn!("Reducing an empty sample buffer; all magnitudes are zero");
    }

    let values = (0..segments.get())
        .map(|i| {
            let slice = &samples[segment_range(i, samples.len(), segments)];
            if slice.is_empty() {
                return 0.0;
            }
            let sum: f64 = slice.iter().map(|s| f64::from(s.abs())).sum();
            (sum / slice.len() as f64) as f32
        })
        .collect();

    let magnitudes = MagnitudeSequence { values };
    log::debug!(
        "Reduced {} samples into {} segments (peak {:.4})",
        samples.len(),
        magnitudes.len(),
        magnitudes.peak()
    );
    magnitudes
}
