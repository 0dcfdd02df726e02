use crate::stanza::error::StanzaError;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use xmppcore_node::builder::NodeBuilder;
use xmppcore_node::jid::Jid;
use xmppcore_node::node::{Node, NodeContent};

/// IQ request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoQueryType {
    Get,
    Set,
}

impl InfoQueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoQueryType::Get => "get",
            InfoQueryType::Set => "set",
        }
    }
}

/// An outbound IQ request. `to: None` addresses the user's own server.
#[derive(Debug, Clone)]
pub struct InfoQuery {
    pub query_type: InfoQueryType,
    pub to: Option<Jid>,
    pub id: Option<String>,
    pub content: Option<NodeContent>,
    pub timeout: Option<Duration>,
}

impl InfoQuery {
    pub fn get(to: Option<Jid>, content: Option<NodeContent>) -> Self {
        Self {
            query_type: InfoQueryType::Get,
            to,
            id: None,
            content,
            timeout: None,
        }
    }

    pub fn set(to: Option<Jid>, content: Option<NodeContent>) -> Self {
        Self {
            query_type: InfoQueryType::Set,
            to,
            id: None,
            content,
            timeout: None,
        }
    }

    /// A request carrying a single `<query xmlns="..."/>` payload.
    pub fn query(query_type: InfoQueryType, to: Option<Jid>, namespace: &str) -> Self {
        let payload = NodeBuilder::new("query").attr("xmlns", namespace).build();
        Self {
            query_type,
            to,
            id: None,
            content: Some(NodeContent::Nodes(vec![payload])),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum IqError {
    #[error("IQ request timed out")]
    Timeout,
    #[error("session closed before a response arrived")]
    SessionClosed,
    #[error("server returned an error: {0}")]
    ServerError(StanzaError),
    #[error("request id '{0}' is already in flight")]
    DuplicateId(String),
    #[error("internal channel closed unexpectedly")]
    InternalChannelClosed,
    #[error("failed to parse response: {0}")]
    Parse(String),
}

/// Session-scoped id source. Each client gets its own random prefix and
/// counter, so ids never collide across sessions living in one process.
pub struct RequestUtils {
    unique_id: String,
    id_counter: Arc<AtomicU64>,
}

impl RequestUtils {
    pub fn new(unique_id: String) -> Self {
        Self {
            unique_id,
            id_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_random_prefix() -> Self {
        let mut bytes = [0u8; 4];
        rand::rng().fill_bytes(&mut bytes);
        let prefix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Self::new(prefix)
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn generate_request_id(&self) -> String {
        let count = self.id_counter.fetch_add(1, Ordering::Relaxed);
        format!(
            "{unique_id}-{count}",
            unique_id = self.unique_id,
            count = count
        )
    }

    pub fn build_iq_node(&self, query: &InfoQuery, req_id: Option<String>) -> Node {
        let id = req_id.unwrap_or_else(|| self.generate_request_id());

        NodeBuilder::new("iq")
            .attr("id", id)
            .attr("type", query.query_type.as_str())
            .opt_attr("to", query.to.as_ref().map(Jid::to_string))
            .apply_content(query.content.clone())
            .build()
    }
}

/// Turns a correlated `<iq type="result|error">` into the value handed to
/// the waiting callback.
pub fn parse_iq_response(response_node: Node) -> Result<Node, IqError> {
    if response_node.get_attr("type") == Some("error") {
        let error = response_node
            .get_optional_child("error")
            .map(StanzaError::from_node)
            .unwrap_or_else(StanzaError::malformed);
        return Err(IqError::ServerError(error));
    }
    Ok(response_node)
}

/// In-flight request table: id → callback.
///
/// A callback is removed before it is handed back to the caller, so a
/// duplicated response can never invoke it twice.
pub struct PendingRequests<C> {
    waiters: HashMap<String, C>,
}

impl<C> Default for PendingRequests<C> {
    fn default() -> Self {
        Self {
            waiters: HashMap::new(),
        }
    }
}

impl<C> PendingRequests<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under `id`. If the id is still outstanding the
    /// callback is handed back untouched.
    pub fn register(&mut self, id: String, callback: C) -> Result<(), C> {
        if self.waiters.contains_key(&id) {
            return Err(callback);
        }
        self.waiters.insert(id, callback);
        Ok(())
    }

    pub fn take(&mut self, id: &str) -> Option<C> {
        self.waiters.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.waiters.contains_key(id)
    }

    pub fn drain(&mut self) -> Vec<(String, C)> {
        self.waiters.drain().collect()
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
