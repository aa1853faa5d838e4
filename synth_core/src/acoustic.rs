//! Symbol-to-features stage: one acoustic frame per phoneme.

use anyhow::Result;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SynthConfig;
use crate::phoneme::Phoneme;
use crate::NORM_EPSILON;

/// One acoustic feature frame: `mel_bands` coefficients for a single symbol.
pub type MelFrame = Array1<f32>;

/// Boundary for the acoustic model. A trained inference engine can replace
/// the built-in placeholder as long as it stays a pure function of symbol
/// identity and returns one frame of the configured band count per call.
/// Implementations are shared across concurrent requests.
pub trait AcousticUnitModel: Send + Sync {
    fn infer(&self, phoneme: Phoneme) -> Result<MelFrame>;
}

/// Placeholder model: a fixed random embedding per symbol pushed through a
/// fixed random projection into mel space. Tables are filled once at
/// construction and never mutated.
pub struct EmbeddingModel {
    embeddings: Array2<f32>,
    projection: Array2<f32>,
}

impl EmbeddingModel {
    pub fn new(config: &SynthConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.weight_seed);
        let embeddings = Array2::from_shape_fn((Phoneme::COUNT, config.embed_dim), |_| {
            rng.gen_range(-1.0f32..1.0)
        });
        let projection = Array2::from_shape_fn((config.embed_dim, config.mel_bands), |_| {
            rng.gen_range(-1.0f32..1.0)
        });
        Self {
            embeddings,
            projection,
        }
    }
}

impl AcousticUnitModel for EmbeddingModel {
    fn infer(&self, phoneme: Phoneme) -> Result<MelFrame> {
        let mut frame = self.embeddings.row(phoneme.index()).dot(&self.projection);
        let peak = frame.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        frame.mapv_inplace(|v| v / peak.max(NORM_EPSILON));
        Ok(frame)
    }
}
