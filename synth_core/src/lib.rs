//! Frame-synchronous speech synthesis: text is phonemized per character,
//! each symbol becomes one acoustic frame, each acoustic frame becomes one
//! waveform frame, and frames are handed out lazily so transport layers can
//! start delivering audio after the first unit.

pub mod acoustic;
pub mod config;
pub mod phoneme;
pub mod stream;
pub mod vocoder;
pub mod wav;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

pub use crate::acoustic::{AcousticUnitModel, EmbeddingModel, MelFrame};
pub use crate::config::SynthConfig;
pub use crate::phoneme::{phonemize, Phoneme};
pub use crate::stream::frame_stream;
pub use crate::vocoder::{Carrier, FormantVocoder, FrameVocoder};

/// Guard for peak normalization so an all-zero frame divides cleanly.
pub(crate) const NORM_EPSILON: f32 = 1e-6;

/// Synthesis failures, split so transports can tell client mistakes from
/// pipeline faults.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("text is empty")]
    EmptyText,
    #[error("acoustic model failed: {0}")]
    AcousticModel(#[source] anyhow::Error),
    #[error("vocoder failed: {0}")]
    Vocoder(#[source] anyhow::Error),
}

impl SynthesisError {
    /// True when the failure is the caller's input rather than a pipeline
    /// fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SynthesisError::EmptyText)
    }
}

/// Drives phonemizer, acoustic model, and vocoder in lock-step, one frame
/// per phoneme. Engines are built once at startup and shared read-only
/// across requests.
pub struct SynthEngine {
    config: SynthConfig,
    model: Arc<dyn AcousticUnitModel>,
    vocoder: Arc<dyn FrameVocoder>,
}

impl std::fmt::Debug for SynthEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SynthEngine {
    /// Engine with the built-in placeholder model and DSP vocoder.
    pub fn new(config: SynthConfig) -> Self {
        let model = Arc::new(EmbeddingModel::new(&config));
        let vocoder = Arc::new(FormantVocoder::new(&config));
        Self {
            config,
            model,
            vocoder,
        }
    }

    /// Engine with caller-supplied boundary implementations, e.g. a trained
    /// acoustic model or a neural vocoder.
    pub fn with_components(
        config: SynthConfig,
        model: Arc<dyn AcousticUnitModel>,
        vocoder: Arc<dyn FrameVocoder>,
    ) -> Self {
        Self {
            config,
            model,
            vocoder,
        }
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Lazy per-phoneme synthesis. Frames come out in input order, one per
    /// character; the first failed unit ends the sequence. Blank text is
    /// rejected before any phonemization.
    pub fn synthesize_stream(&self, text: &str) -> Result<FrameIter<'_>, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::EmptyText);
        }
        Ok(FrameIter {
            model: self.model.as_ref(),
            vocoder: self.vocoder.as_ref(),
            phonemes: phonemize(text).into_iter(),
            failed: false,
        })
    }

    /// Eager variant: the sample-for-sample concatenation of everything
    /// `synthesize_stream` yields.
    pub fn synthesize_whole(&self, text: &str) -> Result<Vec<f32>, SynthesisError> {
        let iter = self.synthesize_stream(text)?;
        let mut samples = Vec::with_capacity(iter.len() * self.config.frame_size);
        for frame in iter {
            samples.extend(frame?);
        }
        Ok(samples)
    }
}

/// Pull-based frame sequence for one request. Finite, ordered, not
/// restartable; fuses after the first error.
pub struct FrameIter<'a> {
    model: &'a dyn AcousticUnitModel,
    vocoder: &'a dyn FrameVocoder,
    phonemes: std::vec::IntoIter<Phoneme>,
    failed: bool,
}

impl FrameIter<'_> {
    /// Frames remaining.
    pub fn len(&self) -> usize {
        if self.failed {
            0
        } else {
            self.phonemes.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Iterator for FrameIter<'_> {
    type Item = Result<Vec<f32>, SynthesisError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let phoneme = self.phonemes.next()?;
        let result = self
            .model
            .infer(phoneme)
            .map_err(SynthesisError::AcousticModel)
            .and_then(|frame| {
                self.vocoder
                    .synthesize(&frame, phoneme)
                    .map_err(SynthesisError::Vocoder)
            });
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}

/// Language-keyed engines, built once at startup and shared read-only.
pub struct EngineRegistry {
    engines: HashMap<String, Arc<SynthEngine>>,
    default_language: String,
}

impl EngineRegistry {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            engines: HashMap::new(),
            default_language: default_language.into(),
        }
    }

    pub fn insert(&mut self, language: impl Into<String>, engine: SynthEngine) {
        self.engines.insert(language.into(), Arc::new(engine));
    }

    /// Resolve an engine for a language key; `None` means the default key.
    pub fn engine_for(&self, lang_opt: Option<&str>) -> anyhow::Result<Arc<SynthEngine>> {
        let lang = lang_opt.unwrap_or(&self.default_language);
        self.engines
            .get(lang)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Unknown language key: {lang}. Use /voices to list."))
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Supported language keys, sorted.
    pub fn list_languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = self.engines.keys().cloned().collect();
        langs.sort();
        langs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> SynthConfig {
        SynthConfig {
            noise_gain: 0.0,
            texture_gain: 0.0,
            ..SynthConfig::default()
        }
    }

    #[test]
    fn rejects_empty_and_blank_text() {
        let engine = SynthEngine::new(quiet_config());
        assert!(matches!(
            engine.synthesize_stream(""),
            Err(SynthesisError::EmptyText)
        ));
        assert!(matches!(
            engine.synthesize_whole("   \t\n"),
            Err(SynthesisError::EmptyText)
        ));
        assert!(SynthesisError::EmptyText.is_client_error());
    }

    #[test]
    fn one_frame_per_character() {
        let engine = SynthEngine::new(quiet_config());
        let text = "hello world";
        let frames: Vec<_> = engine
            .synthesize_stream(text)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(frames.len(), text.chars().count());
        for frame in &frames {
            assert_eq!(frame.len(), engine.config().frame_size);
        }
    }

    #[test]
    fn whole_equals_streamed_concatenation() {
        let engine = SynthEngine::new(quiet_config());
        let text = "stream me";
        let whole = engine.synthesize_whole(text).unwrap();
        let mut streamed = Vec::new();
        for frame in engine.synthesize_stream(text).unwrap() {
            streamed.extend(frame.unwrap());
        }
        assert_eq!(whole, streamed);
    }

    #[test]
    fn repeated_synthesis_is_deterministic_without_noise() {
        let engine = SynthEngine::new(quiet_config());
        let a = engine.synthesize_whole("determinism").unwrap();
        let b = engine.synthesize_whole("determinism").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn all_symbols_render_bounded_frames() {
        let config = SynthConfig::default();
        let model = EmbeddingModel::new(&config);
        let vocoder = FormantVocoder::new(&config);
        for p in Phoneme::ALL {
            let frame = model.infer(p).unwrap();
            let samples = vocoder.synthesize(&frame, p).unwrap();
            assert_eq!(samples.len(), config.frame_size);
            assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
        }
    }

    #[test]
    fn unmapped_only_input_synthesizes_silently() {
        let engine = SynthEngine::new(SynthConfig::default());
        let frames: Vec<_> = engine
            .synthesize_stream("!?.")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(frames.len(), 3);
    }

    #[test]
    fn two_phoneme_scenario() {
        // "ab": one voiced formant frame, one fallback-oscillator frame.
        let config = SynthConfig {
            sample_rate: 16,
            frame_size: 4,
            ..SynthConfig::default()
        };
        let engine = SynthEngine::new(config);
        assert_eq!(phonemize("ab"), vec![Phoneme::Ah, Phoneme::B]);

        let frames: Vec<_> = engine
            .synthesize_stream("ab")
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(frames.len(), 2);
        for frame in &frames {
            assert_eq!(frame.len(), 4);
            let peak = frame.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            assert!((peak - 1.0).abs() <= 1e-6, "peak {peak}");
        }
    }

    #[test]
    fn iterator_reports_remaining_frames() {
        let engine = SynthEngine::new(quiet_config());
        let mut iter = engine.synthesize_stream("abc").unwrap();
        assert_eq!(iter.len(), 3);
        assert!(iter.next().is_some());
        assert_eq!(iter.len(), 2);
        assert_eq!(iter.size_hint(), (2, Some(2)));
    }

    #[test]
    fn registry_resolves_default_and_rejects_unknown() {
        let mut registry = EngineRegistry::new("en");
        registry.insert("en", SynthEngine::new(quiet_config()));

        assert!(registry.engine_for(None).is_ok());
        assert!(registry.engine_for(Some("en")).is_ok());
        let err = registry.engine_for(Some("xx")).unwrap_err();
        assert!(err.to_string().contains("Unknown language key"));
        assert_eq!(registry.list_languages(), vec!["en".to_string()]);
    }

    struct FailingModel;

    impl AcousticUnitModel for FailingModel {
        fn infer(&self, _phoneme: Phoneme) -> anyhow::Result<MelFrame> {
            Err(anyhow::anyhow!("inference backend unavailable"))
        }
    }

    #[test]
    fn failed_unit_aborts_the_stream() {
        let config = quiet_config();
        let vocoder = Arc::new(FormantVocoder::new(&config));
        let engine = SynthEngine::with_components(config, Arc::new(FailingModel), vocoder);

        let mut iter = engine.synthesize_stream("abc").unwrap();
        let err = iter.next().unwrap().unwrap_err();
        assert!(matches!(err, SynthesisError::AcousticModel(_)));
        assert!(!err.is_client_error());
        assert!(iter.next().is_none(), "stream must fuse after a failure");
    }
}
