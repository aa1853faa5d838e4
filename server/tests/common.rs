//! Common utilities for integration tests

use axum::Router;

use server::config::ServerConfig;
use server::{build_router, AppState};
use synth_core::{EngineRegistry, SynthConfig, SynthEngine};

/// Create a test app with a single default voice
pub fn create_test_app() -> Router {
    create_test_app_with(SynthConfig::default())
}

/// Create a test app with custom synthesis parameters
pub fn create_test_app_with(config: SynthConfig) -> Router {
    let mut registry = EngineRegistry::new("en");
    registry.insert("en", SynthEngine::new(config));
    build_router(AppState::new(registry, ServerConfig::default()))
}
