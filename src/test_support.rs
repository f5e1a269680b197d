//! Scripted test doubles for handler and transport tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;
use crate::identifiers::LockToken;
use crate::pipeline::{ContinuationFactory, DelegatingHandler, HandlerCore, HandlerRef, PipelineContext};
use crate::protocol::Message;
use crate::transport::Transport;

/// Outcome of the n-th call (1-based) to a scripted operation.
type Script = Box<dyn Fn(usize) -> Result<()> + Send + Sync>;

/// Routes `tracing` output to the test harness; honours `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MockHandler
// ============================================================================

/// Terminal handler that counts calls and answers from scripts.
///
/// `open` yields once before answering, so callers always observe a real
/// suspension point.
pub(crate) struct MockHandler {
    core: HandlerCore,
    open_script: Script,
    close_script: Script,
    open_calls: AtomicUsize,
    close_calls: AtomicUsize,
    dispose_calls: AtomicUsize,
    sent: Mutex<Vec<Message>>,
    settled: Mutex<Vec<String>>,
    incoming: Mutex<VecDeque<Message>>,
}

pub(crate) struct MockHandlerBuilder {
    open_script: Script,
    close_script: Script,
}

impl MockHandlerBuilder {
    pub(crate) fn open_with(mut self, script: impl Fn(usize) -> Result<()> + Send + Sync + 'static) -> Self {
        self.open_script = Box::new(script);
        self
    }

    pub(crate) fn close_with(mut self, script: impl Fn(usize) -> Result<()> + Send + Sync + 'static) -> Self {
        self.close_script = Box::new(script);
        self
    }

    pub(crate) fn build(self) -> Arc<MockHandler> {
        Arc::new(MockHandler {
            core: HandlerCore::new(PipelineContext::new()),
            open_script: self.open_script,
            close_script: self.close_script,
            open_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            dispose_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            settled: Mutex::new(Vec::new()),
            incoming: Mutex::new(VecDeque::new()),
        })
    }
}

impl MockHandler {
    pub(crate) fn builder() -> MockHandlerBuilder {
        MockHandlerBuilder {
            open_script: Box::new(|_| Ok(())),
            close_script: Box::new(|_| Ok(())),
        }
    }

    /// A handler whose every operation succeeds.
    pub(crate) fn new() -> Arc<Self> {
        Self::builder().build()
    }

    /// A factory that hands out this same instance on every call.
    pub(crate) fn factory(self: &Arc<Self>) -> ContinuationFactory {
        let this = Arc::clone(self);
        Arc::new(move |_| Ok(Arc::clone(&this) as HandlerRef))
    }

    pub(crate) fn push_incoming(&self, message: Message) {
        self.incoming.lock().push_back(message);
    }

    pub(crate) fn open_count(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn dispose_count(&self) -> usize {
        self.dispose_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub(crate) fn settled(&self) -> Vec<String> {
        self.settled.lock().clone()
    }
}

#[async_trait]
impl DelegatingHandler for MockHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    async fn open(&self, _explicit: bool) -> Result<()> {
        let call = self.open_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::task::yield_now().await;
        (self.open_script)(call)
    }

    async fn close(&self) -> Result<()> {
        let call = self.close_calls.fetch_add(1, Ordering::SeqCst) + 1;
        (self.close_script)(call)
    }

    async fn receive(&self) -> Result<Option<Message>> {
        Ok(self.incoming.lock().pop_front())
    }

    async fn receive_with_timeout(&self, _timeout: Duration) -> Result<Option<Message>> {
        Ok(self.incoming.lock().pop_front())
    }

    async fn complete(&self, token: &LockToken) -> Result<()> {
        self.settled.lock().push(format!("complete:{token}"));
        Ok(())
    }

    async fn abandon(&self, token: &LockToken) -> Result<()> {
        self.settled.lock().push(format!("abandon:{token}"));
        Ok(())
    }

    async fn reject(&self, token: &LockToken) -> Result<()> {
        self.settled.lock().push(format!("reject:{token}"));
        Ok(())
    }

    async fn send_event(&self, message: Message) -> Result<()> {
        self.sent.lock().push(message);
        Ok(())
    }

    async fn send_events(&self, messages: Vec<Message>) -> Result<()> {
        self.sent.lock().extend(messages);
        Ok(())
    }

    fn dispose(&self) {
        self.dispose_calls.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// MockTransport
// ============================================================================

/// Transport that records every call in order.
#[derive(Default)]
pub(crate) struct MockTransport {
    calls: Mutex<Vec<String>>,
    incoming: Mutex<VecDeque<Message>>,
    sent: Mutex<Vec<Message>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push_incoming(&self, message: Message) {
        self.incoming.lock().push_back(message);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub(crate) fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().push(call.into());
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, explicit: bool) -> Result<()> {
        self.record(format!("connect:{explicit}"));
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.record("disconnect");
        Ok(())
    }

    async fn receive(&self, timeout: Duration) -> Result<Option<Message>> {
        self.record(format!("receive:{}ms", timeout.as_millis()));
        Ok(self.incoming.lock().pop_front())
    }

    async fn complete(&self, token: &LockToken) -> Result<()> {
        self.record(format!("complete:{token}"));
        Ok(())
    }

    async fn abandon(&self, token: &LockToken) -> Result<()> {
        self.record(format!("abandon:{token}"));
        Ok(())
    }

    async fn reject(&self, token: &LockToken) -> Result<()> {
        self.record(format!("reject:{token}"));
        Ok(())
    }

    async fn send(&self, message: Message) -> Result<()> {
        self.record("send");
        self.sent.lock().push(message);
        Ok(())
    }
}

/// Lets a shared mock serve as the boxed transport of a handler.
#[async_trait]
impl Transport for Arc<MockTransport> {
    async fn connect(&self, explicit: bool) -> Result<()> {
        self.as_ref().connect(explicit).await
    }

    async fn disconnect(&self) -> Result<()> {
        self.as_ref().disconnect().await
    }

    async fn receive(&self, timeout: Duration) -> Result<Option<Message>> {
        self.as_ref().receive(timeout).await
    }

    async fn complete(&self, token: &LockToken) -> Result<()> {
        self.as_ref().complete(token).await
    }

    async fn abandon(&self, token: &LockToken) -> Result<()> {
        self.as_ref().abandon(token).await
    }

    async fn reject(&self, token: &LockToken) -> Result<()> {
        self.as_ref().reject(token).await
    }

    async fn send(&self, message: Message) -> Result<()> {
        self.as_ref().send(message).await
    }
}
