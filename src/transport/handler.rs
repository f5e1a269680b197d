//! Terminal pipeline node wrapping a concrete transport.
//!
//! The byte-moving client (AMQP link, MQTT session, HTTP poller) lives behind
//! the [`Transport`] trait. [`TransportHandler`] adapts it to the pipeline:
//! it reads the [`TransportSettings`] exposed in its context and applies
//! their default receive timeout when `receive()` is called without one.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::identifiers::LockToken;
use crate::pipeline::{ContinuationFactory, DelegatingHandler, HandlerCore, HandlerRef, PipelineContext};
use crate::protocol::Message;

use super::settings::TransportSettings;

// ============================================================================
// Types
// ============================================================================

/// Creates the transport for the selected settings.
pub type TransportConnector =
    Arc<dyn Fn(&TransportSettings) -> Result<Box<dyn Transport>> + Send + Sync>;

// ============================================================================
// Transport
// ============================================================================

/// A protocol client that moves messages to and from the cloud.
///
/// Errors should use the retryable variants ([`Error::Timeout`],
/// [`Error::Socket`], [`Error::Communication`]) for transient network
/// conditions so the routing handler can fall back to another transport.
///
/// [`Error::Timeout`]: crate::Error::Timeout
/// [`Error::Socket`]: crate::Error::Socket
/// [`Error::Communication`]: crate::Error::Communication
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establishes the session.
    async fn connect(&self, explicit: bool) -> Result<()>;

    /// Tears the session down.
    async fn disconnect(&self) -> Result<()>;

    /// Waits up to `timeout` for a message; `None` if none arrived.
    async fn receive(&self, timeout: Duration) -> Result<Option<Message>>;

    /// Settles a received message as processed.
    async fn complete(&self, token: &LockToken) -> Result<()>;

    /// Releases a received message for redelivery.
    async fn abandon(&self, token: &LockToken) -> Result<()>;

    /// Dead-letters a received message.
    async fn reject(&self, token: &LockToken) -> Result<()>;

    /// Sends one message.
    async fn send(&self, message: Message) -> Result<()>;

    /// Sends a batch of messages, one after another by default.
    async fn send_batch(&self, messages: Vec<Message>) -> Result<()> {
        for message in messages {
            self.send(message).await?;
        }
        Ok(())
    }
}

// ============================================================================
// TransportHandler
// ============================================================================

/// Pipeline node that terminates the chain at a [`Transport`].
pub struct TransportHandler {
    core: HandlerCore,
    settings: TransportSettings,
    transport: Box<dyn Transport>,
}

impl fmt::Debug for TransportHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandler")
            .field("settings", &self.settings)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl TransportHandler {
    /// Creates a handler for the settings stored in `context`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the context holds no
    /// [`TransportSettings`] or they fail validation.
    pub fn new(context: PipelineContext, transport: Box<dyn Transport>) -> Result<Self> {
        let settings: TransportSettings = context.require()?;
        settings.validate()?;

        Ok(Self {
            core: HandlerCore::new(context),
            settings,
            transport,
        })
    }

    /// Returns a factory that connects a transport for the settings in the
    /// factory's context.
    #[must_use]
    pub fn factory(connector: TransportConnector) -> ContinuationFactory {
        Arc::new(move |context| {
            let settings: TransportSettings = context.require()?;
            let transport = connector(&settings)?;
            debug!(transport = %settings.transport_type, "Transport created");
            Ok(Arc::new(Self::new(context.clone(), transport)?) as HandlerRef)
        })
    }

    /// Returns the settings this handler was built for.
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }
}

#[async_trait]
impl DelegatingHandler for TransportHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    async fn inner_handler(&self) -> Result<Option<HandlerRef>> {
        self.core.ensure_live()?;
        Ok(None)
    }

    async fn open(&self, explicit: bool) -> Result<()> {
        self.core.ensure_live()?;
        self.transport.connect(explicit).await?;
        self.core.mark_open();
        debug!(transport = %self.settings.transport_type, explicit, "Transport opened");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.core.is_closed() || self.core.is_disposed() {
            return Ok(());
        }
        self.transport.disconnect().await?;
        self.core.mark_closed();
        debug!(transport = %self.settings.transport_type, "Transport closed");
        Ok(())
    }

    async fn receive(&self) -> Result<Option<Message>> {
        self.receive_with_timeout(self.settings.default_receive_timeout)
            .await
    }

    async fn receive_with_timeout(&self, timeout: Duration) -> Result<Option<Message>> {
        self.core.ensure_live()?;
        self.transport.receive(timeout).await
    }

    async fn complete(&self, token: &LockToken) -> Result<()> {
        self.core.ensure_live()?;
        self.transport.complete(token).await
    }

    async fn abandon(&self, token: &LockToken) -> Result<()> {
        self.core.ensure_live()?;
        self.transport.abandon(token).await
    }

    async fn reject(&self, token: &LockToken) -> Result<()> {
        self.core.ensure_live()?;
        self.transport.reject(token).await
    }

    async fn send_event(&self, message: Message) -> Result<()> {
        self.core.ensure_live()?;
        self.transport.send(message).await
    }

    async fn send_events(&self, messages: Vec<Message>) -> Result<()> {
        self.core.ensure_live()?;
        self.transport.send_batch(messages).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;
    use crate::test_support::MockTransport;
    use crate::transport::TransportType;

    fn context_for(transport_type: TransportType, timeout: Duration) -> PipelineContext {
        PipelineContext::new()
            .with(TransportSettings::new(transport_type).with_default_receive_timeout(timeout))
    }

    fn handler_over(mock: &Arc<MockTransport>, context: PipelineContext) -> TransportHandler {
        TransportHandler::new(context, Box::new(Arc::clone(mock))).expect("handler")
    }

    #[test]
    fn test_new_requires_settings() {
        let result = TransportHandler::new(PipelineContext::new(), Box::new(MockTransport::new()));
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_new_validates_settings() {
        let context = context_for(TransportType::AmqpTcp, Duration::ZERO);
        let result = TransportHandler::new(context, Box::new(MockTransport::new()));
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_receive_uses_default_timeout() {
        let mock = MockTransport::new();
        let handler = handler_over(
            &mock,
            context_for(TransportType::MqttTcp, Duration::from_millis(250)),
        );

        assert!(handler.receive().await.expect("receive").is_none());
        handler
            .receive_with_timeout(Duration::from_millis(5))
            .await
            .expect("receive");

        assert_eq!(mock.calls(), vec!["receive:250ms", "receive:5ms"]);
    }

    #[tokio::test]
    async fn test_operations_reach_transport() {
        let mock = MockTransport::new();
        mock.push_incoming(Message::new("c2d").with_lock_token(LockToken::new("t")));
        let handler = handler_over(&mock, context_for(TransportType::AmqpTcp, Duration::from_secs(1)));

        handler.open(true).await.expect("open");
        let message = handler.receive().await.expect("receive").expect("message");
        let token = message.lock_token.expect("token");
        handler.complete(&token).await.expect("complete");
        handler.abandon(&token).await.expect("abandon");
        handler.reject(&token).await.expect("reject");
        handler.send_event(Message::new("d2c")).await.expect("send");
        handler
            .send_events(vec![Message::new("a"), Message::new("b")])
            .await
            .expect("send batch");
        handler.close().await.expect("close");
        handler.close().await.expect("second close");

        assert_eq!(
            mock.calls(),
            vec![
                "connect:true",
                "receive:1000ms",
                "complete:t",
                "abandon:t",
                "reject:t",
                "send",
                "send",
                "send",
                "disconnect",
            ]
        );
        assert_eq!(mock.sent_count(), 3);
    }

    #[tokio::test]
    async fn test_disposed_handler_rejects_operations() {
        let mock = MockTransport::new();
        let handler = handler_over(&mock, context_for(TransportType::Http1, Duration::from_secs(1)));

        handler.dispose();

        assert!(matches!(handler.open(false).await, Err(Error::Disposed)));
        assert!(matches!(
            handler.send_event(Message::new("x")).await,
            Err(Error::Disposed)
        ));
        handler.close().await.expect("close after dispose is a no-op");
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_factory_uses_context_settings() {
        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let connector: TransportConnector = Arc::new(move |settings| {
            seen_clone.lock().push(settings.transport_type);
            Ok(Box::new(MockTransport::new()) as Box<dyn Transport>)
        });

        let factory = TransportHandler::factory(connector);
        let handler = factory(&context_for(TransportType::MqttWebSocket, Duration::from_secs(3)))
            .expect("handler");

        handler.open(true).await.expect("open");
        assert_eq!(*seen.lock(), vec![TransportType::MqttWebSocket]);
        assert!(factory(&PipelineContext::new()).is_err());
    }
}
