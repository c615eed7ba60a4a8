//! GGUF model backend on candle.

use std::fs::File;
use std::path::Path;
use std::time::Instant;

use candle_core::quantized::gguf_file;
use candle_core::{Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama::{MAX_SEQ_LEN, ModelWeights};
use tokenizers::Tokenizer;

use crate::engine::{GenerationConfig, InferenceEngine};
use crate::error::ServiceError;

const SAMPLING_SEED: u64 = 299792458;

/// Next KV position for a generation needing `needed` tokens: continue from
/// `ctx_len`, or restart at 0 when the window would overflow.
fn start_pos(ctx_len: usize, needed: usize, max_seq_len: usize) -> usize {
    if ctx_len + needed > max_seq_len {
        0
    } else {
        ctx_len
    }
}

pub struct GgufEngine {
    model: ModelWeights,
    tokenizer: Tokenizer,
    device: Device,
    eos_token: Option<u32>,
    // KV cache position; the context advances across calls, matching a
    // single long-lived chat session.
    ctx_len: usize,
}

impl GgufEngine {
    pub fn load(model_path: &Path, tokenizer_path: &Path) -> Result<Self, ServiceError> {
        if !model_path.exists() {
            return Err(ServiceError::ModelLoad(format!(
                "model artifact missing: {}",
                model_path.display()
            )));
        }
        let device = Device::Cpu;

        let mut file = File::open(model_path)?;
        let content = gguf_file::Content::read(&mut file)
            .map_err(|e| ServiceError::ModelLoad(e.to_string()))?;
        let model = ModelWeights::from_gguf(content, &mut file, &device)
            .map_err(|e| ServiceError::ModelLoad(e.to_string()))?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| ServiceError::ModelLoad(e.to_string()))?;
        let eos_token = tokenizer
            .token_to_id("<eos>")
            .or_else(|| tokenizer.token_to_id("</s>"));

        Ok(Self {
            model,
            tokenizer,
            device,
            eos_token,
            ctx_len: 0,
        })
    }

    fn forward_one(&mut self, tokens: &[u32], index_pos: usize) -> Result<Tensor, ServiceError> {
        let input = Tensor::new(tokens, &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| ServiceError::Generation(e.to_string()))?;
        let logits = self
            .model
            .forward(&input, index_pos)
            .map_err(|e| ServiceError::Generation(e.to_string()))?;
        logits
            .squeeze(0)
            .map_err(|e| ServiceError::Generation(e.to_string()))
    }
}

impl InferenceEngine for GgufEngine {
    fn generate(&mut self, prompt: &str, cfg: &GenerationConfig) -> Result<String, ServiceError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| ServiceError::Generation(e.to_string()))?;
        let prompt_tokens = encoding.get_ids().to_vec();
        if prompt_tokens.is_empty() {
            return Err(ServiceError::Generation("prompt tokenized to nothing".into()));
        }

        let temperature = (cfg.temperature > 0.0).then_some(cfg.temperature);
        let mut sampler = LogitsProcessor::new(SAMPLING_SEED, temperature, None);

        // The model forward treats position 0 as the start of a fresh
        // sequence, so a reset discards the accumulated context instead of
        // failing every request once the window fills up.
        let pos = start_pos(
            self.ctx_len,
            prompt_tokens.len() + cfg.max_tokens,
            MAX_SEQ_LEN,
        );
        if pos == 0 && self.ctx_len != 0 {
            tracing::debug!(
                ctx_len = self.ctx_len,
                "context window exhausted, starting a fresh session"
            );
        }
        self.ctx_len = pos;

        let start = Instant::now();

        let logits = self.forward_one(&prompt_tokens, self.ctx_len)?;
        self.ctx_len += prompt_tokens.len();
        let mut next = sampler
            .sample(&logits)
            .map_err(|e| ServiceError::Generation(e.to_string()))?;

        let mut generated = Vec::with_capacity(cfg.max_tokens);
        for _ in 0..cfg.max_tokens {
            if Some(next) == self.eos_token {
                break;
            }
            generated.push(next);

            let logits = self.forward_one(&[next], self.ctx_len)?;
            self.ctx_len += 1;
            next = sampler
                .sample(&logits)
                .map_err(|e| ServiceError::Generation(e.to_string()))?;
        }

        let completion = self
            .tokenizer
            .decode(&generated, true)
            .map_err(|e| ServiceError::Generation(e.to_string()))?;

        tracing::debug!(
            tokens = generated.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generation finished"
        );

        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::start_pos;

    #[test]
    fn context_continues_while_window_has_room() {
        assert_eq!(start_pos(0, 10, 4096), 0);
        assert_eq!(start_pos(100, 10, 4096), 100);
        assert_eq!(start_pos(4086, 10, 4096), 4086);
    }

    #[test]
    fn exhausted_window_restarts_the_session() {
        assert_eq!(start_pos(4090, 10, 4096), 0);
        assert_eq!(start_pos(4096, 1, 4096), 0);
    }
}
