//! In-process completion provider for engine and service tests.

use std::sync::Mutex;

use async_trait::async_trait;
use indexmap::IndexMap;
use reportsmith_shared::{ContentRecord, ExtractedFileContent, FileType};

use crate::ai::{CompletionError, CompletionProvider};

type Responder = Box<dyn Fn(&str) -> Result<String, CompletionError> + Send + Sync>;

/// Answers each prompt through a closure and records every prompt seen.
pub(crate) struct ScriptedProvider {
    respond: Responder,
    models: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(
        respond: impl Fn(&str) -> Result<String, CompletionError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            models: Vec::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with `text`.
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Always fail with the error built by `make`.
    pub fn failing(make: fn() -> CompletionError) -> Self {
        Self::new(move |_| Err(make()))
    }

    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn model(&self) -> &str {
        "scripted/model"
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.respond)(prompt)
    }

    async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        Ok(self.models.clone())
    }
}

/// One extracted PDF with two pages, keyed by filename.
pub(crate) fn sample_sources() -> IndexMap<String, ExtractedFileContent> {
    let mut report = ExtractedFileContent::new(FileType::Pdf, "report.pdf");
    report.content = vec![
        ContentRecord::Page {
            page: 1,
            text: "Revenue grew 12% year over year.".into(),
        },
        ContentRecord::Page {
            page: 2,
            text: "Churn fell to 3%.".into(),
        },
    ];
    IndexMap::from([("report.pdf".to_string(), report)])
}
