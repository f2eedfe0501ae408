//! Mock inference service for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{InferenceError, InferredMetadata, MetadataService};

/// A configurable mock response for [`MockService`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Simulate a parsed response.
    Metadata(InferredMetadata),
    /// Simulate raw model content, run through the real JSON parsing.
    Raw(String),
    /// Simulate a request timeout.
    Timeout,
    /// Simulate an HTTP error status.
    Status(u16),
}

/// A hand-rolled mock implementing [`MetadataService`] for tests.
///
/// Returns responses in order, repeating the last one once the sequence is
/// exhausted, and records every prompt text it receives.
pub struct MockService {
    responses: Mutex<Vec<MockResponse>>,
    fallback: MockResponse,
    seen: Mutex<Vec<String>>,
    call_count: AtomicUsize,
}

impl MockService {
    /// Create a mock that always returns `response`.
    pub fn new(response: MockResponse) -> Self {
        Self::with_sequence(vec![response])
    }

    /// Create a mock that returns responses in order, repeating the last one.
    pub fn with_sequence(mut responses: Vec<MockResponse>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one response"
        );
        // Reverse so we can pop() from the front cheaply.
        responses.reverse();
        let fallback = responses.first().cloned().unwrap();
        Self {
            responses: Mutex::new(responses),
            fallback,
            seen: Mutex::new(Vec::new()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Convenience: always answer with these fields.
    pub fn answering(title: &str, authors: &[&str], year: &str) -> Self {
        Self::new(MockResponse::Metadata(InferredMetadata {
            title: Some(title.to_string()),
            authors: Some(authors.iter().map(|a| a.to_string()).collect()),
            year: Some(year.to_string()),
        }))
    }

    /// How many times `infer()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Texts passed to `infer()`, in call order.
    pub fn seen_texts(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn next_response(&self) -> MockResponse {
        let mut seq = self.responses.lock().unwrap();
        if let Some(resp) = seq.pop() {
            resp
        } else {
            self.fallback.clone()
        }
    }
}

impl MetadataService for MockService {
    fn name(&self) -> &str {
        "mock"
    }

    fn infer<'a>(
        &'a self,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<InferredMetadata, InferenceError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(text.to_string());
        let response = self.next_response();

        Box::pin(async move {
            match response {
                MockResponse::Metadata(meta) => Ok(meta),
                MockResponse::Raw(content) => super::parse_metadata_json(&content),
                MockResponse::Timeout => Err(InferenceError::Timeout),
                MockResponse::Status(code) => Err(InferenceError::Status {
                    code,
                    body: String::new(),
                }),
            }
        })
    }
}
