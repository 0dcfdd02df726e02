use super::traits::StanzaHandler;
use crate::client::Client;
use crate::session::DispatchContext;
use std::collections::HashMap;
use std::sync::Arc;
use xmppcore::node::node::Node;

/// Routes inbound stanzas to the handler registered for their tag.
pub(crate) struct StanzaRouter {
    handlers: HashMap<&'static str, Arc<dyn StanzaHandler>>,
}

impl StanzaRouter {
    pub(crate) fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// # Panics
    /// Panics if a handler is already registered for the same tag.
    pub(crate) fn register(&mut self, handler: Arc<dyn StanzaHandler>) {
        let tag = handler.tag();
        if self.handlers.insert(tag, handler).is_some() {
            panic!("Handler for tag '{}' already registered", tag);
        }
    }

    /// Returns `false` if no handler took the node.
    pub(crate) async fn dispatch(
        &self,
        client: &Client,
        ctx: &mut DispatchContext<'_>,
        node: &Node,
    ) -> bool {
        match self.handlers.get(node.tag.as_str()) {
            Some(handler) => handler.handle(client, ctx, node).await,
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for StanzaRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::session::SessionCore;
    use crate::transport::memory::MemoryTransportFactory;
    use std::sync::atomic::{AtomicBool, Ordering};
    use xmppcore::node::builder::NodeBuilder;

    struct MockHandler {
        tag: &'static str,
        handled: AtomicBool,
    }

    impl MockHandler {
        fn new(tag: &'static str) -> Self {
            Self {
                tag,
                handled: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl StanzaHandler for MockHandler {
        fn tag(&self) -> &'static str {
            self.tag
        }

        async fn handle(&self, _client: &Client, _ctx: &mut DispatchContext<'_>, _node: &Node) -> bool {
            self.handled.store(true, Ordering::SeqCst);
            true
        }
    }

    fn client() -> Arc<Client> {
        Client::new(
            ClientConfig::new("juliet@capulet.lit".parse().unwrap(), "secret"),
            MemoryTransportFactory::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_router_registration() {
        let mut router = StanzaRouter::new();
        router.register(Arc::new(MockHandler::new("test")));
        assert_eq!(router.handler_count(), 1);
    }

    #[test]
    #[should_panic(expected = "Handler for tag 'test' already registered")]
    fn test_router_double_registration_panics() {
        let mut router = StanzaRouter::new();
        router.register(Arc::new(MockHandler::new("test")));
        router.register(Arc::new(MockHandler::new("test")));
    }

    #[tokio::test]
    async fn test_router_dispatch() {
        let mut router = StanzaRouter::new();
        let handler = Arc::new(MockHandler::new("test"));
        router.register(handler.clone());

        let client = client();
        let mut core = SessionCore::default();
        let mut ctx = DispatchContext::new(&mut core);

        let known = NodeBuilder::new("test").build();
        assert!(router.dispatch(&client, &mut ctx, &known).await);
        assert!(handler.handled.load(Ordering::SeqCst));

        let unknown = NodeBuilder::new("stream:features").build();
        assert!(!router.dispatch(&client, &mut ctx, &unknown).await);
    }
}
