use super::error::StanzaError;
use crate::ns;
use crate::request::InfoQueryType;
use crate::roster::{RosterEntry, parse_roster_items};
use xmppcore_node::builder::NodeBuilder;
use xmppcore_node::jid::Jid;
use xmppcore_node::node::Node;

/// An inbound `<iq/>` that did not match an outstanding request.
#[derive(Debug, Clone, PartialEq)]
pub enum IqStanza {
    RosterPush {
        id: String,
        from: Option<Jid>,
        items: Vec<RosterEntry>,
    },
    Ping {
        id: String,
        from: Option<Jid>,
    },
    /// A `get`/`set` nobody here serves. Must be answered with an error.
    UnhandledRequest {
        id: String,
        from: Option<Jid>,
        query_type: InfoQueryType,
        payload: Option<String>,
    },
    /// A `result`/`error` whose id has no pending entry.
    UnmatchedResponse { id: Option<String> },
    Malformed(&'static str),
}

impl IqStanza {
    pub fn decode(node: &Node) -> Self {
        let mut parser = node.attrs();
        let from = parser.optional_jid("from");
        let id = parser.optional_string("id").map(str::to_string);

        let query_type = match parser.optional_string("type") {
            Some("get") => InfoQueryType::Get,
            Some("set") => InfoQueryType::Set,
            Some("result") | Some("error") => return IqStanza::UnmatchedResponse { id },
            _ => return IqStanza::Malformed("iq without a valid type"),
        };
        let Some(id) = id else {
            return IqStanza::Malformed("iq request without id");
        };

        if query_type == InfoQueryType::Set
            && let Some(query) = node.get_child_ns("query", ns::ROSTER)
        {
            return IqStanza::RosterPush {
                id,
                from,
                items: parse_roster_items(query),
            };
        }

        if query_type == InfoQueryType::Get && node.get_child_ns("ping", ns::PING).is_some() {
            return IqStanza::Ping { id, from };
        }

        let payload = node
            .children()
            .and_then(|c| c.first())
            .map(|c| c.namespace().unwrap_or(c.tag.as_str()).to_string());
        IqStanza::UnhandledRequest {
            id,
            from,
            query_type,
            payload,
        }
    }
}

/// Empty `result` reply, used to acknowledge pushes and answer pings.
pub fn build_iq_result(id: &str, to: Option<&Jid>) -> Node {
    NodeBuilder::new("iq")
        .attr("type", "result")
        .attr("id", id)
        .opt_attr("to", to.map(Jid::to_string))
        .build()
}

pub fn build_iq_error(id: &str, to: Option<&Jid>, error: &StanzaError) -> Node {
    NodeBuilder::new("iq")
        .attr("type", "error")
        .attr("id", id)
        .opt_attr("to", to.map(Jid::to_string))
        .children([error.to_node()])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_roster_push() {
        let node = NodeBuilder::new("iq")
            .attr("type", "set")
            .attr("id", "push1")
            .children([NodeBuilder::new("query")
                .attr("xmlns", ns::ROSTER)
                .children([NodeBuilder::new("item")
                    .attr("jid", "nurse@example.com")
                    .attr("subscription", "none")
                    .build()])
                .build()])
            .build();

        match IqStanza::decode(&node) {
            IqStanza::RosterPush { id, from, items } => {
                assert_eq!(id, "push1");
                assert!(from.is_none());
                assert_eq!(items.len(), 1);
                assert_eq!(items[0].subscription, "none");
            }
            other => panic!("expected roster push, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_ping() {
        let node = NodeBuilder::new("iq")
            .attr("type", "get")
            .attr("id", "p1")
            .attr("from", "capulet.lit")
            .children([NodeBuilder::new("ping").attr("xmlns", ns::PING).build()])
            .build();
        assert!(matches!(IqStanza::decode(&node), IqStanza::Ping { id, .. } if id == "p1"));
    }

    #[test]
    fn test_decode_roster_get_is_unhandled() {
        let node = NodeBuilder::new("iq")
            .attr("type", "get")
            .attr("id", "r1")
            .children([NodeBuilder::new("query").attr("xmlns", ns::ROSTER).build()])
            .build();
        match IqStanza::decode(&node) {
            IqStanza::UnhandledRequest {
                query_type,
                payload,
                ..
            } => {
                assert_eq!(query_type, InfoQueryType::Get);
                assert_eq!(payload.as_deref(), Some(ns::ROSTER));
            }
            other => panic!("expected unhandled request, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_responses_and_malformed() {
        let result = NodeBuilder::new("iq").attr("type", "result").attr("id", "x").build();
        assert_eq!(
            IqStanza::decode(&result),
            IqStanza::UnmatchedResponse {
                id: Some("x".into())
            }
        );

        let no_type = NodeBuilder::new("iq").attr("id", "x").build();
        assert!(matches!(IqStanza::decode(&no_type), IqStanza::Malformed(_)));

        let no_id = NodeBuilder::new("iq").attr("type", "get").build();
        assert!(matches!(IqStanza::decode(&no_id), IqStanza::Malformed(_)));
    }

    #[test]
    fn test_build_replies() {
        let to: Jid = "capulet.lit".parse().unwrap();
        let ack = build_iq_result("push1", Some(&to));
        assert_eq!(ack.get_attr("type"), Some("result"));
        assert_eq!(ack.get_attr("id"), Some("push1"));
        assert!(ack.children().is_none());

        let err = build_iq_error("q1", None, &StanzaError::service_unavailable());
        assert_eq!(err.get_attr("to"), None);
        let child = err.get_optional_child("error").unwrap();
        assert!(child.get_child_ns("service-unavailable", ns::STANZAS).is_some());
    }
}
