use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

use ragdb_core::{Error, Result};

/// Encode `prompt` into a `(1, n)` id tensor of at most `max_len` tokens.
///
/// Over-long prompts lose the end of their context, never the trailing
/// `tail` (the question and end-of-sequence marker).
pub fn encode_prompt(tokenizer: &Tokenizer, prompt: &str, tail: &str, max_len: usize, device: &Device) -> Result<Tensor> {
    let ids = encode(tokenizer, prompt, true)?;
    let tail_len = if ids.len() > max_len { encode(tokenizer, tail, true)?.len() } else { 0 };
    let ids = truncate_keeping_tail(ids, max_len, tail_len);
    Tensor::new(ids.as_slice(), device)
        .and_then(|t| t.unsqueeze(0))
        .map_err(|e| Error::Generation(format!("building input tensor: {e}")))
}

fn encode(tokenizer: &Tokenizer, text: &str, special: bool) -> Result<Vec<u32>> {
    let enc = tokenizer.encode(text, special).map_err(|e| Error::Generation(format!("tokenization failed: {e}")))?;
    Ok(enc.get_ids().to_vec())
}

/// Cut `ids` down to `max_len` by dropping tokens just before the last `tail_len`.
pub fn truncate_keeping_tail(mut ids: Vec<u32>, max_len: usize, tail_len: usize) -> Vec<u32> {
    if ids.len() <= max_len { return ids; }
    let tail_len = tail_len.min(max_len);
    let tail_start = ids.len() - tail_len;
    ids.drain(max_len - tail_len..tail_start);
    ids
}

#[cfg(test)]
mod tests {
    use super::truncate_keeping_tail;

    #[test]
    fn short_input_is_untouched() {
        assert_eq!(truncate_keeping_tail(vec![1, 2, 3], 5, 2), vec![1, 2, 3]);
    }

    #[test]
    fn keeps_head_and_tail() {
        let ids: Vec<u32> = (0..10).collect();
        assert_eq!(truncate_keeping_tail(ids, 6, 2), vec![0, 1, 2, 3, 8, 9]);
    }

    #[test]
    fn tail_longer_than_budget_keeps_the_end() {
        let ids: Vec<u32> = (0..10).collect();
        assert_eq!(truncate_keeping_tail(ids, 3, 7), vec![7, 8, 9]);
    }
}
