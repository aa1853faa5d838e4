// Configuration constants for the server

use std::time::Duration;

use synth_core::SynthConfig;

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub synth_sample_rate: Option<u32>,
    pub synth_frame_size: Option<usize>,
    pub synth_seed: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            rate_limit_per_minute: 60,
            request_timeout_secs: 60,
            max_body_bytes: 64 * 1024,
            cors_allowed_origins: None,
            synth_sample_rate: None,
            synth_frame_size: None,
            synth_seed: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8085);

        let rate_limit_per_minute = std::env::var("RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        let max_body_bytes = std::env::var("REQUEST_BODY_LIMIT_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(64 * 1024);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect()
            });

        let synth_sample_rate = std::env::var("SYNTH_SAMPLE_RATE")
            .ok()
            .and_then(|v| v.parse().ok());

        let synth_frame_size = std::env::var("SYNTH_FRAME_SIZE")
            .ok()
            .and_then(|v| v.parse().ok());

        let synth_seed = std::env::var("SYNTH_SEED")
            .ok()
            .and_then(|v| v.parse().ok());

        Self {
            port,
            rate_limit_per_minute,
            request_timeout_secs,
            max_body_bytes,
            cors_allowed_origins,
            synth_sample_rate,
            synth_frame_size,
            synth_seed,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Synthesis parameters with environment overrides applied
    pub fn synth_config(&self) -> SynthConfig {
        let mut config = SynthConfig::default();
        if let Some(sample_rate) = self.synth_sample_rate {
            config.sample_rate = sample_rate;
        }
        if let Some(frame_size) = self.synth_frame_size {
            config.frame_size = frame_size;
        }
        if let Some(seed) = self.synth_seed {
            config.weight_seed = seed;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_synth_core() {
        let config = ServerConfig::default();
        let synth = config.synth_config();
        assert_eq!(synth.sample_rate, SynthConfig::default().sample_rate);
        assert_eq!(synth.frame_size, SynthConfig::default().frame_size);
    }

    #[test]
    fn overrides_take_precedence() {
        let config = ServerConfig {
            synth_sample_rate: Some(16_000),
            synth_frame_size: Some(256),
            synth_seed: Some(7),
            ..ServerConfig::default()
        };
        let synth = config.synth_config();
        assert_eq!(synth.sample_rate, 16_000);
        assert_eq!(synth.frame_size, 256);
        assert_eq!(synth.weight_seed, 7);
    }

    #[test]
    fn request_timeout_converts_to_duration() {
        let config = ServerConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
    }
}
