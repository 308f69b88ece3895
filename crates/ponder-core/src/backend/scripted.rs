//! Deterministic scripted backend for tests and offline demos.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::{ChatMessage, GenerateParams, GenerationBackend, GenerationResult};
use crate::error::Result;

/// A [`GenerationBackend`] that replays scripted responses.
///
/// `generate` pops the next scripted batch, falling back to the default
/// batch once the script is exhausted (or when no script was given).
/// `chat` behaves the same way over scripted replies. Call counters allow
/// tests to assert how many round trips an algorithm performed.
pub struct ScriptedBackend {
    default_batch: Vec<GenerationResult>,
    batches: Mutex<VecDeque<Vec<GenerationResult>>>,
    default_chat_reply: String,
    chat_replies: Mutex<VecDeque<String>>,
    generate_calls: Mutex<usize>,
    chat_calls: Mutex<usize>,
}

impl ScriptedBackend {
    /// Create a backend that always returns `default_batch`.
    pub fn new(default_batch: Vec<GenerationResult>) -> Self {
        Self {
            default_batch,
            batches: Mutex::new(VecDeque::new()),
            default_chat_reply: "5".to_string(),
            chat_replies: Mutex::new(VecDeque::new()),
            generate_calls: Mutex::new(0),
            chat_calls: Mutex::new(0),
        }
    }

    /// Queue batches to be returned, in order, before the default batch.
    pub fn with_batches(self, batches: Vec<Vec<GenerationResult>>) -> Self {
        *self.batches.lock() = batches.into();
        self
    }

    /// Set the reply returned by every `chat` call.
    pub fn with_chat_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_chat_reply = reply.into();
        self
    }

    /// Queue chat replies to be returned, in order, before the default.
    pub fn with_chat_replies(self, replies: Vec<String>) -> Self {
        *self.chat_replies.lock() = replies.into();
        self
    }

    /// Number of `generate` calls made so far.
    pub fn generate_calls(&self) -> usize {
        *self.generate_calls.lock()
    }

    /// Number of `chat` calls made so far.
    pub fn chat_calls(&self) -> usize {
        *self.chat_calls.lock()
    }
}

impl GenerationBackend for ScriptedBackend {
    fn generate(&self, _prompt: &str, _params: &GenerateParams) -> Result<Vec<GenerationResult>> {
        *self.generate_calls.lock() += 1;
        let scripted = self.batches.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| self.default_batch.clone()))
    }

    fn chat(&self, _messages: &[ChatMessage], _temperature: f64, _max_tokens: u32) -> Result<String> {
        *self.chat_calls.lock() += 1;
        let scripted = self.chat_replies.lock().pop_front();
        Ok(scripted.unwrap_or_else(|| self.default_chat_reply.clone()))
    }
}
