//! Shared fixtures for SCRIB tests
//!
//! - [`ScriptedGenerator`]: canned-response stand-in for the generation
//!   backend, with failure injection
//! - Corpus fixture builders

use scrib_capability::{GenerationError, GenerationOptions, TextGenerator};
use scrib_corpus::{Excerpt, ExcerptStore};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// One scripted backend step
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return this text
    Reply(String),
    /// Fail with this error
    Fail(GenerationError),
}

/// Scripted text generator
///
/// Pops one step per call. An exhausted script repeats its fallback
/// reply so open-ended loops keep running.
#[derive(Debug)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<ScriptStep>>,
    fallback: String,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    /// Create a generator from scripted steps
    #[must_use]
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            fallback: "scripted fallback response".to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Generator that always replies with `text`
    #[must_use]
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: text.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replace the fallback reply used once the script is exhausted
    #[must_use]
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = text.into();
        self
    }

    /// Prompts received so far, in call order
    pub async fn prompts(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    /// Number of calls made
    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        self.calls.lock().await.push(prompt.to_string());
        match self.script.lock().await.pop_front() {
            Some(ScriptStep::Reply(text)) => Ok(text),
            Some(ScriptStep::Fail(err)) => Err(err),
            None => Ok(self.fallback.clone()),
        }
    }
}

/// Build an excerpt with a deterministic embedding
#[must_use]
pub fn excerpt(id: &str, author: &str, year: u16, embedding: Vec<f32>) -> Excerpt {
    Excerpt::new(
        id,
        vec![author.to_string()],
        year,
        format!("Study {id}"),
        "Journal of Synthetic Scholarship",
        format!("Summary of study {id}."),
        embedding,
    )
}

/// Small three-excerpt store clustered around the x axis
#[must_use]
pub fn small_store() -> Arc<ExcerptStore> {
    Arc::new(
        ExcerptStore::build(vec![
            excerpt("lit-a", "Adler", 2019, vec![1.0, 0.0]),
            excerpt("lit-b", "Brandt", 2020, vec![0.95, 0.1]),
            excerpt("lit-c", "Cheng", 2021, vec![0.9, 0.2]),
        ])
        .expect("fixture store"),
    )
}
