//! Inference engine boundary.
//!
//! The engine owns the loaded model and one generation context. The context
//! is mutated during generation, so `generate` takes `&mut self`: a second
//! overlapping call cannot be expressed. Exclusive access is arbitrated by
//! the request serializer, which owns the sole engine instance.

pub mod mock;

#[cfg(feature = "candle-backend")]
mod gguf;

pub use mock::MockEngine;

#[cfg(feature = "candle-backend")]
pub use gguf::GgufEngine;

use crate::{config::AppConfig, error::ServiceError};

/// Fixed sampling parameters for one deployment.
#[derive(Debug, Clone, Copy)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_tokens: usize,
}

pub trait InferenceEngine: Send {
    /// Produce a completion for `prompt`. Long-running and not reentrant.
    fn generate(&mut self, prompt: &str, cfg: &GenerationConfig) -> Result<String, ServiceError>;
}

/// Load the model backend once, before the server starts accepting
/// connections. A load failure is fatal to startup.
#[cfg(feature = "candle-backend")]
pub fn load_engine(config: &AppConfig) -> Result<Box<dyn InferenceEngine>, ServiceError> {
    let engine = GgufEngine::load(&config.model_path(), &config.tokenizer_path)?;
    Ok(Box::new(engine))
}

#[cfg(not(feature = "candle-backend"))]
pub fn load_engine(_config: &AppConfig) -> Result<Box<dyn InferenceEngine>, ServiceError> {
    Err(ServiceError::ModelLoad(
        "built without an inference backend; rebuild with the candle-backend feature".into(),
    ))
}
