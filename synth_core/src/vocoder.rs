//! Features-to-audio stage: a formant-table DSP vocoder.
//!
//! Each phoneme renders as one fixed-size waveform frame: a carrier picked
//! from the formant table, a breath texture, a decay envelope to keep frame
//! boundaries click-free, and a final peak normalization.

use std::f32::consts::PI;

use anyhow::Result;
use rand::Rng;

use crate::acoustic::MelFrame;
use crate::config::SynthConfig;
use crate::phoneme::Phoneme;
use crate::NORM_EPSILON;

/// Base frequency of the fallback oscillator, in Hz.
const FALLBACK_BASE_HZ: f32 = 220.0;
/// Spread of the fallback oscillator around its base, in Hz.
const FALLBACK_SPREAD_HZ: f32 = 500.0;
/// Envelope value at the end of a frame; the start is 1.
const ENVELOPE_FLOOR: f32 = 0.8;

/// Carrier class of one phoneme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Carrier {
    /// Voiced sound: one sine per formant center frequency.
    Voiced(&'static [f32]),
    /// Unvoiced fricative: low-gain random samples.
    Noise,
    /// Word gap.
    Silence,
}

impl Carrier {
    /// Formant-table lookup. `None` sends the symbol to the fallback
    /// oscillator, whose pitch is taken from the acoustic frame.
    pub fn for_phoneme(phoneme: Phoneme) -> Option<Carrier> {
        match phoneme {
            Phoneme::Ah => Some(Carrier::Voiced(&[700.0, 1100.0, 2450.0])),
            Phoneme::Eh => Some(Carrier::Voiced(&[500.0, 1700.0, 2500.0])),
            Phoneme::Ih => Some(Carrier::Voiced(&[400.0, 2000.0, 2550.0])),
            Phoneme::Ow => Some(Carrier::Voiced(&[300.0, 870.0, 2240.0])),
            Phoneme::Uh => Some(Carrier::Voiced(&[350.0, 600.0, 2700.0])),
            Phoneme::Aa => Some(Carrier::Voiced(&[800.0, 1150.0, 2900.0])),
            Phoneme::Sp => Some(Carrier::Silence),
            Phoneme::S | Phoneme::F | Phoneme::Hh => Some(Carrier::Noise),
            _ => None,
        }
    }
}

/// Boundary for the vocoder. A neural vocoder can replace the built-in DSP
/// one as long as it keeps the one-frame-in/one-frame-out contract.
/// Implementations are shared across concurrent requests.
pub trait FrameVocoder: Send + Sync {
    /// Renders one waveform frame: exactly the configured sample count,
    /// every value within [-1, 1].
    fn synthesize(&self, frame: &MelFrame, phoneme: Phoneme) -> Result<Vec<f32>>;
}

pub struct FormantVocoder {
    sample_rate: u32,
    frame_size: usize,
    noise_gain: f32,
    texture_gain: f32,
}

impl FormantVocoder {
    pub fn new(config: &SynthConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            frame_size: config.frame_size,
            noise_gain: config.noise_gain,
            texture_gain: config.texture_gain,
        }
    }

    fn sine(&self, freq: f32, index: usize) -> f32 {
        (2.0 * PI * freq * index as f32 / self.sample_rate as f32).sin()
    }

    fn carrier_samples(&self, carrier: Option<Carrier>, frame: &MelFrame) -> Vec<f32> {
        match carrier {
            Some(Carrier::Voiced(freqs)) => {
                let count = freqs.len() as f32;
                (0..self.frame_size)
                    .map(|i| freqs.iter().map(|&f| self.sine(f, i)).sum::<f32>() / count)
                    .collect()
            }
            Some(Carrier::Noise) => {
                let mut rng = rand::thread_rng();
                (0..self.frame_size)
                    .map(|_| self.noise_gain * rng.gen_range(-1.0f32..1.0))
                    .collect()
            }
            Some(Carrier::Silence) => vec![0.0; self.frame_size],
            None => {
                // Pitch from the first coefficient, kept bounded by tanh.
                let first = frame.first().copied().unwrap_or(0.0);
                let freq = FALLBACK_BASE_HZ + FALLBACK_SPREAD_HZ * first.tanh();
                (0..self.frame_size).map(|i| self.sine(freq, i)).collect()
            }
        }
    }
}

impl FrameVocoder for FormantVocoder {
    fn synthesize(&self, frame: &MelFrame, phoneme: Phoneme) -> Result<Vec<f32>> {
        let mut samples = self.carrier_samples(Carrier::for_phoneme(phoneme), frame);

        // Breath texture on every frame, voiced or not.
        let mut rng = rand::thread_rng();
        for s in &mut samples {
            *s += self.texture_gain * rng.gen_range(-1.0f32..1.0);
        }

        // Linear taper toward the frame boundary.
        let n = samples.len();
        let step = if n > 1 {
            (1.0 - ENVELOPE_FLOOR) / (n - 1) as f32
        } else {
            0.0
        };
        for (i, s) in samples.iter_mut().enumerate() {
            *s *= 1.0 - step * i as f32;
        }

        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let div = peak.max(NORM_EPSILON);
        for s in &mut samples {
            *s /= div;
        }
        Ok(samples)
    }
}
