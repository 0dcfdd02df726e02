use crate::config::ClientConfig;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use xmppcore::node::node::Node;

/// An event produced by the transport layer.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Stream negotiation (TLS, SASL, bind) finished; the session is usable.
    Connected,
    /// One top-level stanza, delivered in arrival order.
    StanzaReceived(Node),
    /// A connection-level problem. Does not by itself end the session.
    Error(String),
    /// The connection was lost.
    Disconnected,
}

/// An established connection. Framing and the XML codec live behind it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Writes one stanza. Writes are ordered.
    async fn send(&self, unit: &Node) -> Result<(), anyhow::Error>;

    async fn disconnect(&self);
}

/// Opens a new transport for each connection attempt.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create_transport(
        &self,
        config: &ClientConfig,
    ) -> Result<(Arc<dyn Transport>, mpsc::Receiver<TransportEvent>), anyhow::Error>;
}

/// An in-process transport whose server side is driven by hand. Used by the
/// test suites and handy for embedding the client behind a custom pipe.
pub mod memory {
    use super::*;
    use anyhow::bail;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use tokio::sync::{Mutex, watch};

    const EVENT_BUFFER: usize = 64;

    pub struct MemoryTransport {
        sent: watch::Sender<Vec<Node>>,
        events: mpsc::Sender<TransportEvent>,
        closed: AtomicBool,
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(&self, unit: &Node) -> Result<(), anyhow::Error> {
            if self.closed.load(Ordering::SeqCst) {
                bail!("transport is closed");
            }
            self.sent.send_modify(|sent| sent.push(unit.clone()));
            Ok(())
        }

        async fn disconnect(&self) {
            if !self.closed.swap(true, Ordering::SeqCst) {
                let _ = self.events.send(TransportEvent::Disconnected).await;
            }
        }
    }

    /// The server end of one [`MemoryTransport`].
    pub struct MemoryConnection {
        transport: Arc<MemoryTransport>,
        sent: watch::Receiver<Vec<Node>>,
    }

    impl MemoryConnection {
        pub async fn connected(&self) {
            self.emit(TransportEvent::Connected).await;
        }

        pub async fn receive(&self, unit: Node) {
            self.emit(TransportEvent::StanzaReceived(unit)).await;
        }

        pub async fn error(&self, message: impl Into<String>) {
            self.emit(TransportEvent::Error(message.into())).await;
        }

        /// Drops the connection from the server side.
        pub async fn close(&self) {
            self.transport.disconnect().await;
        }

        pub fn is_closed(&self) -> bool {
            self.transport.closed.load(Ordering::SeqCst)
        }

        /// Everything the client has written so far.
        pub fn sent(&self) -> Vec<Node> {
            self.sent.borrow().clone()
        }

        /// Waits until at least `count` units have been written.
        pub async fn wait_for_sent(&self, count: usize) -> Vec<Node> {
            let mut sent = self.sent.clone();
            match sent.wait_for(|units| units.len() >= count).await {
                Ok(units) => units.clone(),
                Err(_) => self.sent(),
            }
        }

        async fn emit(&self, event: TransportEvent) {
            let _ = self.transport.events.send(event).await;
        }
    }

    pub struct MemoryTransportFactory {
        connections_tx: mpsc::UnboundedSender<MemoryConnection>,
        connections_rx: Mutex<mpsc::UnboundedReceiver<MemoryConnection>>,
        refuse_next: AtomicU32,
    }

    impl MemoryTransportFactory {
        pub fn new() -> Arc<Self> {
            let (connections_tx, connections_rx) = mpsc::unbounded_channel();
            Arc::new(Self {
                connections_tx,
                connections_rx: Mutex::new(connections_rx),
                refuse_next: AtomicU32::new(0),
            })
        }

        /// Makes the next `count` connection attempts fail.
        pub fn refuse_next(&self, count: u32) {
            self.refuse_next.store(count, Ordering::SeqCst);
        }

        /// Waits for the client's next connection attempt.
        pub async fn next_connection(&self) -> Option<MemoryConnection> {
            self.connections_rx.lock().await.recv().await
        }
    }

    #[async_trait]
    impl TransportFactory for MemoryTransportFactory {
        async fn create_transport(
            &self,
            config: &ClientConfig,
        ) -> Result<(Arc<dyn Transport>, mpsc::Receiver<TransportEvent>), anyhow::Error> {
            let refused = self
                .refuse_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if refused {
                bail!("connection to {}:{} refused", config.host(), config.port);
            }

            let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
            let (sent_tx, sent_rx) = watch::channel(Vec::new());
            let transport = Arc::new(MemoryTransport {
                sent: sent_tx,
                events: events_tx,
                closed: AtomicBool::new(false),
            });

            let connection = MemoryConnection {
                transport: transport.clone(),
                sent: sent_rx,
            };
            if self.connections_tx.send(connection).is_err() {
                bail!("memory transport factory has been dropped");
            }
            Ok((transport, events_rx))
        }
    }
}
