//! Benchmarks for request conversion
//!
//! Measures unified → Gemini conversion and body encoding for chat requests of
//! growing history length, plus model directive parsing.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;

use async_trait::async_trait;
use gemini_relay::types::{ChatRequest, Message};
use gemini_relay::{
    FetchedMedia, GeminiAdaptor, GeminiSettings, MediaFetcher, ModelDirective, RelayAdaptor,
    RelayInfo, UnifiedRequest,
};

#[derive(Debug)]
struct OfflineFetcher;

#[async_trait]
impl MediaFetcher for OfflineFetcher {
    async fn fetch(&self, _url: &str) -> gemini_relay::Result<FetchedMedia> {
        Err(gemini_relay::Error::decode("offline"))
    }
}

fn chat_request(turns: usize) -> UnifiedRequest {
    let mut messages = vec![Message::system("You are a helpful assistant.")];
    for i in 0..turns {
        messages.push(Message::user(format!("Question number {}?", i)));
        messages.push(Message::assistant(format!("Answer number {}.", i)));
    }
    UnifiedRequest::Chat(ChatRequest::new("gemini-2.5-flash-thinking-1024", messages))
}

fn bench_directive_parse(c: &mut Criterion) {
    c.bench_function("directive_parse", |b| {
        b.iter(|| ModelDirective::parse(black_box("gemini-2.5-flash-thinking-1024"), true))
    });
}

fn bench_chat_conversion(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let adaptor = GeminiAdaptor::builder()
        .settings(GeminiSettings::default().with_thinking_adapter(true))
        .media_fetcher(Arc::new(OfflineFetcher))
        .build()
        .unwrap();

    let mut group = c.benchmark_group("chat_conversion");
    for turns in [1usize, 10, 100] {
        let request = chat_request(turns);
        let mut info = RelayInfo::for_request(&request, "https://generativelanguage.googleapis.com");
        adaptor.init(&mut info);

        group.throughput(Throughput::Elements((turns * 2 + 1) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(turns), &request, |b, request| {
            b.to_async(&rt).iter(|| async {
                let payload = adaptor.convert_request(&info, black_box(request)).await.unwrap();
                black_box(payload.to_body().unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_directive_parse, bench_chat_conversion);
criterion_main!(benches);
