// Synthesis parameters shared by the acoustic model and the vocoder.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Coefficients per acoustic frame.
    pub mel_bands: usize,
    /// Samples per waveform frame (one frame per phoneme).
    pub frame_size: usize,
    /// Width of the per-phoneme embedding vectors.
    pub embed_dim: usize,
    /// Seed for the fixed embedding and projection tables.
    pub weight_seed: u64,
    /// Amplitude of the unvoiced-carrier noise.
    pub noise_gain: f32,
    /// Amplitude of the breath texture mixed into every frame.
    pub texture_gain: f32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            mel_bands: 80,
            frame_size: 512,
            embed_dim: 64,
            weight_seed: 42,
            noise_gain: 0.1,
            texture_gain: 0.01,
        }
    }
}

impl SynthConfig {
    /// Duration of one waveform frame in milliseconds.
    pub fn frame_duration_ms(&self) -> f32 {
        self.frame_size as f32 / self.sample_rate as f32 * 1000.0
    }
}
