#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use harvest_engine::{FailureKind, FetchError, FetchOutput, Fetcher};

/// Serves canned responses and remembers every URL it was asked for.
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Result<FetchOutput, FetchError>>,
    calls: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, html: &str) -> Self {
        self.bytes(url, html.as_bytes(), "text/html; charset=utf-8")
    }

    pub fn bytes(mut self, url: &str, bytes: &[u8], content_type: &str) -> Self {
        let output = FetchOutput::from_bytes(url, bytes.to_vec(), Some(content_type));
        self.responses.insert(url.to_string(), Ok(output));
        self
    }

    pub fn failing(mut self, url: &str, kind: FailureKind) -> Self {
        self.responses
            .insert(url.to_string(), Err(FetchError::new(kind, "canned failure")));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        self.responses.get(url).cloned().unwrap_or_else(|| {
            Err(FetchError::new(FailureKind::HttpStatus(404), "no canned response"))
        })
    }
}

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-png-data";

pub fn config_json(root: &std::path::Path, fields: &str) -> String {
    format!(
        r#"{{"project_root": {}, "fields": {fields}}}"#,
        serde_json::to_string(&root.to_string_lossy()).unwrap()
    )
}
