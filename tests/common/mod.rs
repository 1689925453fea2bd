//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use gemini_relay::{
    FetchedMedia, GeminiAdaptor, GeminiSettings, MediaFetcher, RelayError, RelayInfo,
    ResponseWriter, StreamHandler, StreamKind, UpstreamResponse, Usage,
};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

pub const BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Returns a fixed JPEG payload and records every URL it was asked for.
#[derive(Debug, Default)]
pub struct StubFetcher {
    pub urls: Mutex<Vec<String>>,
}

#[async_trait]
impl MediaFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> gemini_relay::Result<FetchedMedia> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(FetchedMedia {
            mime_type: "image/jpeg".to_string(),
            base64_data: "/9j/4AAQ".to_string(),
        })
    }
}

/// Records the stream kind and emits a terminal SSE frame.
#[derive(Debug, Default)]
pub struct RecordingStreamHandler {
    pub kinds: Mutex<Vec<StreamKind>>,
}

#[async_trait]
impl StreamHandler for RecordingStreamHandler {
    async fn handle_stream(
        &self,
        kind: StreamKind,
        response: UpstreamResponse,
        _info: &RelayInfo,
        writer: &mut dyn ResponseWriter,
    ) -> Result<Usage, RelayError> {
        self.kinds.lock().unwrap().push(kind);
        let status = response.status();
        let _ = response.read_body().await?;
        writer.write_head(status, "text/event-stream");
        writer
            .write_body(b"data: [DONE]\n\n")
            .map_err(|e| RelayError::internal(gemini_relay::Error::Io(e), "write_response_failed"))?;
        Ok(Usage::new(3, 4))
    }
}

pub struct Harness {
    pub adaptor: GeminiAdaptor,
    pub fetcher: Arc<StubFetcher>,
    pub streams: Arc<RecordingStreamHandler>,
}

pub fn harness(settings: GeminiSettings) -> Harness {
    init_tracing();
    let fetcher = Arc::new(StubFetcher::default());
    let streams = Arc::new(RecordingStreamHandler::default());
    let adaptor = GeminiAdaptor::builder()
        .settings(settings)
        .media_fetcher(fetcher.clone())
        .stream_handler(streams.clone())
        .build()
        .expect("adaptor");
    Harness {
        adaptor,
        fetcher,
        streams,
    }
}

pub fn thinking_harness() -> Harness {
    harness(GeminiSettings::default().with_thinking_adapter(true))
}
