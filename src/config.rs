use std::{
    env,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use crate::engine::GenerationConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub models_dir: PathBuf,
    pub model_file: String,
    pub tokenizer_path: PathBuf,
    pub temperature: f64,
    pub max_tokens: usize,
    pub queue_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);
        let listen_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);

        let models_dir =
            PathBuf::from(env::var("MODELS_DIR").unwrap_or_else(|_| "models".to_string()));
        let model_file =
            env::var("MODEL_FILE").unwrap_or_else(|_| "gemma-2b-q8.gguf".to_string());
        let tokenizer_path = PathBuf::from(
            env::var("TOKENIZER_PATH").unwrap_or_else(|_| "models/tokenizer.json".to_string()),
        );

        let temperature = env::var("TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.05);
        let max_tokens = env::var("MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        let queue_capacity = env::var("QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(32);

        anyhow::ensure!(
            (0.0..=1.0).contains(&temperature),
            "TEMPERATURE must be within [0, 1], got {temperature}"
        );
        anyhow::ensure!(max_tokens >= 1, "MAX_TOKENS must be at least 1");
        anyhow::ensure!(queue_capacity >= 1, "QUEUE_CAPACITY must be at least 1");

        Ok(Self {
            listen_addr,
            models_dir,
            model_file,
            tokenizer_path,
            temperature,
            max_tokens,
            queue_capacity,
        })
    }

    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(&self.model_file)
    }

    /// Sampling parameters are deployment configuration, not per-request input.
    pub fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}
