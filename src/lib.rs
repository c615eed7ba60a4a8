pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod prompt;
pub mod serializer;
pub mod server;

pub use config::AppConfig;
pub use engine::{GenerationConfig, InferenceEngine, MockEngine, load_engine};
pub use error::ServiceError;
pub use serializer::RequestSerializer;
pub use server::build_router;
