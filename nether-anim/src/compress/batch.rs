//! Parallel compression of independent sequences

use hashbrown::HashMap;
use rayon::prelude::*;

use crate::error::Result;
use crate::skeleton::Skeleton;
use crate::tracks::RawAnimation;

use super::{CompressedAnimation, CompressionSettings, compress};

/// Totals over a batch of compressed sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub sequences: usize,
    pub raw_bytes: usize,
    pub compressed_bytes: usize,
    pub worst_error: f32,
    pub worst_sequence: Option<String>,
    /// How often each candidate label produced the kept result
    pub candidate_wins: HashMap<String, usize>,
}

impl BatchSummary {
    pub fn record(&mut self, animation: &CompressedAnimation) {
        self.sequences += 1;
        self.raw_bytes += animation.raw_size;
        self.compressed_bytes += animation.compressed_size();
        if self.worst_sequence.is_none() || animation.error.max_error > self.worst_error {
            self.worst_error = animation.error.max_error;
            self.worst_sequence = Some(animation.name.clone());
        }
        *self
            .candidate_wins
            .entry(animation.candidate.clone())
            .or_insert(0) += 1;
    }

    /// Raw bytes per compressed byte, 0 when nothing was compressed
    pub fn compression_ratio(&self) -> f32 {
        if self.compressed_bytes == 0 {
            0.0
        } else {
            self.raw_bytes as f32 / self.compressed_bytes as f32
        }
    }
}

/// Compress every animation against one skeleton.
///
/// Sequences are compressed in parallel; results keep the input order. The
/// first failure aborts the batch.
pub fn compress_batch(
    animations: &[RawAnimation],
    skeleton: &Skeleton,
    settings: &CompressionSettings,
) -> Result<(Vec<CompressedAnimation>, BatchSummary)> {
    settings.validate()?;

    let compressed: Result<Vec<_>> = animations
        .par_iter()
        .map(|animation| compress(animation, skeleton, settings))
        .collect();
    let compressed = compressed?;

    let mut summary = BatchSummary::default();
    for animation in &compressed {
        summary.record(animation);
    }

    tracing::info!(
        "Compressed {} sequences: {} -> {} bytes ({:.2}x)",
        summary.sequences,
        summary.raw_bytes,
        summary.compressed_bytes,
        summary.compression_ratio()
    );
    if let Some(worst) = &summary.worst_sequence {
        tracing::info!("Worst end effector error: {:.5} in '{}'", summary.worst_error, worst);
    }

    Ok((compressed, summary))
}
