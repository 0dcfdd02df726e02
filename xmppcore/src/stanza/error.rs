use crate::ns;
use serde::Serialize;
use std::fmt;
use xmppcore_node::builder::NodeBuilder;
use xmppcore_node::node::Node;

/// A normalized `<error/>` child of a message, presence or iq stanza.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StanzaError {
    /// `cancel`, `continue`, `modify`, `auth` or `wait`.
    pub kind: String,
    /// Defined condition element name, e.g. `item-not-found`.
    pub condition: String,
    pub text: Option<String>,
    /// Legacy numeric code, still sent by some servers.
    pub code: Option<u16>,
}

impl StanzaError {
    pub fn new(kind: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            condition: condition.into(),
            text: None,
            code: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn service_unavailable() -> Self {
        Self::new("cancel", "service-unavailable")
    }

    pub fn malformed() -> Self {
        Self::new("cancel", "undefined-condition").with_text("malformed error response")
    }

    pub fn from_node(error_node: &Node) -> Self {
        let mut parser = error_node.attrs();
        let kind = parser.optional_string("type").unwrap_or("cancel").to_string();
        let code = parser.optional_u64("code").and_then(|c| u16::try_from(c).ok());

        let children = error_node.children().unwrap_or_default();
        let condition = children
            .iter()
            .find(|c| c.tag != "text" && c.namespace() == Some(ns::STANZAS))
            .or_else(|| children.iter().find(|c| c.tag != "text"))
            .map(|c| c.tag.clone())
            .unwrap_or_else(|| "undefined-condition".to_string());

        let text = error_node
            .get_optional_child("text")
            .and_then(Node::text)
            .map(str::to_string)
            .or_else(|| error_node.text().map(str::to_string));

        Self {
            kind,
            condition,
            text,
            code,
        }
    }

    pub fn to_node(&self) -> Node {
        let mut children = vec![
            NodeBuilder::new(self.condition.as_str())
                .attr("xmlns", ns::STANZAS)
                .build(),
        ];
        if let Some(text) = &self.text {
            children.push(
                NodeBuilder::new("text")
                    .attr("xmlns", ns::STANZAS)
                    .string_content(text.as_str())
                    .build(),
            );
        }
        NodeBuilder::new("error")
            .attr("type", self.kind.as_str())
            .opt_attr("code", self.code.map(|c| c.to_string()))
            .children(children)
            .build()
    }
}

impl fmt::Display for StanzaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.condition, self.kind)?;
        if let Some(text) = &self.text {
            write!(f, ": {text}")?;
        }
        Ok(())
    }
}
