//! The language-model boundary.
//!
//! The pipeline speaks to the model through this narrow contract only:
//! `complete(prompt) -> text`, optionally `complete_stream` for chunked
//! delivery. Adapters receive the caller's cancellation token and are
//! expected to stop work and return [`LmError::Cancelled`] once it fires.

use crate::CancelToken;
use thiserror::Error;

/// Failure reported by an LM adapter.
#[derive(Debug, Error)]
pub enum LmError {
    #[error("completion failed: {0}")]
    Completion(String),
    #[error("cancelled")]
    Cancelled,
}

/// A single-shot (and optionally streaming) language model.
pub trait LmAdapter: Send + Sync {
    /// Complete `prompt`, returning the full output text.
    fn complete(&self, prompt: &str, cancel: &CancelToken) -> Result<String, LmError>;

    /// Whether [`complete_stream`](Self::complete_stream) delivers native
    /// chunks. When `false` the pipeline simulates streaming by splitting
    /// the single-shot output on whitespace.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Stream the completion, forwarding each chunk in order, and return
    /// the full output. The default forwards the single-shot completion as
    /// one chunk.
    fn complete_stream(
        &self,
        prompt: &str,
        cancel: &CancelToken,
        on_chunk: &mut dyn FnMut(&str),
    ) -> Result<String, LmError> {
        let output = self.complete(prompt, cancel)?;
        on_chunk(&output);
        Ok(output)
    }
}
