//! Benchmarks for dispatch and full pipeline runs.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use intraflow::config::PipelineConfig;
use intraflow::dispatch::{DispatchMode, Dispatcher};
use intraflow::events::NoOpEventSink;
use intraflow::handlers::data_capabilities;
use intraflow::market::MarketData;
use intraflow::pipeline::IntradayPipeline;
use intraflow::testing::{aapl_surge_request, news_request, prices_request};
use std::sync::Arc;

fn dispatch_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let items: Vec<_> = ["AAPL", "MSFT", "NVDA", "TSLA", "AMZN", "META"]
        .iter()
        .map(|t| prices_request(t, "1min", 390))
        .collect();
    let data = Arc::new(MarketData::new());

    for mode in [DispatchMode::Sequential, DispatchMode::Concurrent] {
        let dispatcher = Dispatcher::new("fetch", data_capabilities().unwrap()).with_mode(mode);
        c.bench_function(&format!("dispatch_prices_{mode:?}"), |b| {
            b.iter(|| runtime.block_on(dispatcher.dispatch(black_box(&items), &data)));
        });
    }
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let pipeline = IntradayPipeline::standard_builder(&PipelineConfig::default())
        .unwrap()
        .with_event_sink(Arc::new(NoOpEventSink))
        .build()
        .unwrap();
    let request = aapl_surge_request()
        .with_data_request(news_request(&["AAPL"], 10))
        .with_pattern("news_correlation")
        .with_pattern("time_of_day_volatility");

    c.bench_function("pipeline_full_run", |b| {
        b.iter(|| runtime.block_on(pipeline.run(black_box(request.clone()))).unwrap());
    });
}

criterion_group!(benches, dispatch_benchmark, pipeline_benchmark);
criterion_main!(benches);
