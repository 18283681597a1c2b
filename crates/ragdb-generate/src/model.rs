//! Seq2seq answer generation with a local T5-family checkpoint.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::t5::{Config as T5Config, T5ForConditionalGeneration};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use ragdb_core::traits::Generator;
use ragdb_core::{Error, Result};

use crate::device::select_device;
use crate::tokenize::encode_prompt;
use crate::{build_prompt, question_tail};

/// Longest encoder input, in tokens.
pub const MAX_INPUT_TOKENS: usize = 512;

fn gen_err(context: &str) -> impl Fn(candle_core::Error) -> Error + '_ {
    move |e| Error::Generation(format!("{context}: {e}"))
}

/// Greedy decoding over a T5 checkpoint directory holding `config.json`,
/// `tokenizer.json` and `model.safetensors` (or `pytorch_model.bin`).
pub struct ModelGenerator {
    name: String,
    model: Mutex<T5ForConditionalGeneration>,
    config: T5Config,
    tokenizer: Tokenizer,
    device: Device,
    max_new_tokens: usize,
}

impl ModelGenerator {
    pub fn load(model_dir: &Path, max_new_tokens: usize) -> Result<Self> {
        let start = Instant::now();
        if !model_dir.is_dir() {
            return Err(Error::Generation(format!("model directory {} does not exist", model_dir.display())));
        }
        let device = select_device();

        let tokenizer_path = require(model_dir, "tokenizer.json")?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Generation(format!("loading tokenizer {}: {e}", tokenizer_path.display())))?;

        let config_path = require(model_dir, "config.json")?;
        let raw = fs::read_to_string(&config_path)
            .map_err(|e| Error::Generation(format!("reading {}: {e}", config_path.display())))?;
        let config: T5Config = serde_json::from_str(&raw)
            .map_err(|e| Error::Generation(format!("parsing {}: {e}", config_path.display())))?;

        let vb = load_weights(model_dir, &device)?;
        let model = T5ForConditionalGeneration::load(vb, &config).map_err(gen_err("building model"))?;
        let name = model_dir.file_name().map_or_else(|| "t5".to_string(), |n| n.to_string_lossy().to_string());
        info!(model = %name, elapsed_ms = start.elapsed().as_millis() as u64, "loaded generation model");
        Ok(Self { name, model: Mutex::new(model), config, tokenizer, device, max_new_tokens })
    }

    fn decode_greedy(&self, model: &mut T5ForConditionalGeneration, input: &Tensor) -> Result<Vec<u32>> {
        let encoded = model.encode(input).map_err(gen_err("encoding prompt"))?;
        let start_token = self.config.decoder_start_token_id.unwrap_or(self.config.pad_token_id) as u32;
        let eos = self.config.eos_token_id as u32;

        let mut output = vec![start_token];
        for step in 0..self.max_new_tokens {
            let feed: &[u32] = if step == 0 || !self.config.use_cache { &output } else { &output[output.len() - 1..] };
            let decoder_ids = Tensor::new(feed, &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(gen_err("building decoder input"))?;
            let next = model
                .decode(&decoder_ids, &encoded)
                .and_then(|logits| logits.squeeze(0))
                .and_then(|logits| logits.argmax(0))
                .and_then(|t| t.to_scalar::<u32>())
                .map_err(gen_err("decoding"))?;
            if next == eos {
                break;
            }
            output.push(next);
        }
        Ok(output)
    }
}

impl Generator for ModelGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, question: &str, context: &str) -> Result<String> {
        let start = Instant::now();
        let prompt = build_prompt(question, context);
        let input = encode_prompt(&self.tokenizer, &prompt, &question_tail(question), MAX_INPUT_TOKENS, &self.device)?;

        let mut model = self.model.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let result = self.decode_greedy(&mut model, &input);
        model.clear_kv_cache();
        let ids = result?;

        let text = self
            .tokenizer
            .decode(&ids[1..], true)
            .map_err(|e| Error::Generation(format!("detokenization failed: {e}")))?;
        let generated = ids.len() - 1;
        if generated == self.max_new_tokens {
            warn!(max_new_tokens = self.max_new_tokens, "answer truncated at token limit");
        }
        debug!(tokens = generated, elapsed_ms = start.elapsed().as_millis() as u64, "generated answer");
        Ok(text.trim().to_string())
    }
}

fn require(model_dir: &Path, file: &str) -> Result<PathBuf> {
    let path = model_dir.join(file);
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::Generation(format!("missing {} in {}", file, model_dir.display())))
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let dtype = DType::F32;
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.is_file() {
        // SAFETY: the file is mapped read-only and not modified while the model lives.
        return unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], dtype, device) }
            .map_err(gen_err("mapping model.safetensors"));
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    if !weights_path.is_file() {
        return Err(Error::Generation(format!(
            "no model.safetensors or pytorch_model.bin in {}",
            model_dir.display()
        )));
    }
    let weights = candle_core::pickle::read_all(&weights_path).map_err(gen_err("reading pytorch_model.bin"))?;
    let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, dtype, device))
}
