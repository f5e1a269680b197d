//! Pipeline benchmark suite.
//!
//! Benchmarks chain construction and first-use resolution at different
//! chain lengths, and the routing handler's fallback path.
//!
//! Run with: cargo bench --bench pipeline
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use devicelink::{
    DefaultDelegatingHandler, Error, HandlerRef, LockToken, Message, PipelineBuilder,
    PipelineContext, ProtocolRoutingHandler, Result, Transport, TransportConnector,
    TransportHandler, TransportSettings, TransportType,
};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const CHAIN_LENGTHS: &[usize] = &[1, 4, 16, 64];

// ============================================================================
// Benchmark: Build
// ============================================================================

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let context = PipelineContext::new();

    for &length in CHAIN_LENGTHS {
        let builder = pass_through_chain(length);
        group.bench_with_input(BenchmarkId::new("head", length), &builder, |b, builder| {
            b.iter(|| black_box(builder.build(&context).unwrap()));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Open Through Chain
// ============================================================================

fn bench_open_chain(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("open_chain");
    let context = &PipelineContext::new();

    for &length in CHAIN_LENGTHS {
        let builder = pass_through_chain(length);
        group.bench_with_input(BenchmarkId::new("resolve", length), &builder, |b, builder| {
            b.to_async(&rt).iter(|| async move {
                let head = builder.build(&context).unwrap();
                head.open(true).await.unwrap();
                black_box(head)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Routing Fallback
// ============================================================================

fn bench_fallback(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("fallback");

    for &refused in &[0usize, 1, 3] {
        let mut types = vec![TransportType::AmqpTcp; refused];
        types.push(TransportType::AmqpWebSocket);
        let context = PipelineContext::new().with(TransportSettings::fallback_chain(types));

        let builder = PipelineBuilder::new()
            .with(ProtocolRoutingHandler::factory())
            .with(TransportHandler::factory(connector()));

        group.bench_with_input(
            BenchmarkId::new("refused_before_success", refused),
            &(builder, context),
            |b, (builder, context)| {
                b.to_async(&rt).iter(|| async move {
                    let head: HandlerRef = builder.build(context).unwrap();
                    head.open(true).await.unwrap();
                    head.close().await.unwrap();
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Helper Functions
// ============================================================================

fn pass_through_chain(length: usize) -> PipelineBuilder {
    (0..length).fold(PipelineBuilder::new(), |builder, _| {
        builder.with(DefaultDelegatingHandler::factory())
    })
}

/// TCP transports refuse to connect; WebSocket transports succeed.
fn connector() -> TransportConnector {
    Arc::new(|settings| {
        Ok(Box::new(LoopbackTransport {
            refuse: !settings.transport_type.is_web_socket(),
        }) as Box<dyn Transport>)
    })
}

struct LoopbackTransport {
    refuse: bool,
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn connect(&self, _explicit: bool) -> Result<()> {
        if self.refuse {
            return Err(Error::communication("refused"));
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn receive(&self, _timeout: Duration) -> Result<Option<Message>> {
        Ok(None)
    }

    async fn complete(&self, _token: &LockToken) -> Result<()> {
        Ok(())
    }

    async fn abandon(&self, _token: &LockToken) -> Result<()> {
        Ok(())
    }

    async fn reject(&self, _token: &LockToken) -> Result<()> {
        Ok(())
    }

    async fn send(&self, _message: Message) -> Result<()> {
        Ok(())
    }
}

criterion_group!(benches, bench_build, bench_open_chain, bench_fallback);
criterion_main!(benches);
