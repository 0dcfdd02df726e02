use crate::iq::spec::IqSpec;
use crate::ns;
use crate::request::{InfoQuery, InfoQueryType};
use crate::roster::{RosterEntry, parse_roster_iq};
use xmppcore_node::node::Node;

/// Full roster fetch (RFC 6121 §2.2), addressed to the user's own server.
#[derive(Debug, Clone, Default)]
pub struct RosterGetSpec;

impl RosterGetSpec {
    pub fn new() -> Self {
        Self
    }
}

impl IqSpec for RosterGetSpec {
    type Response = Vec<RosterEntry>;

    fn build_iq(&self) -> InfoQuery {
        InfoQuery::query(InfoQueryType::Get, None, ns::ROSTER)
    }

    fn parse_response(&self, response: &Node) -> Result<Self::Response, anyhow::Error> {
        Ok(parse_roster_iq(response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmppcore_node::builder::NodeBuilder;

    #[test]
    fn test_roster_get_targets_own_server() {
        let iq = RosterGetSpec::new().build_iq();
        assert_eq!(iq.query_type, InfoQueryType::Get);
        assert!(iq.to.is_none());
    }

    #[test]
    fn test_parse_response() {
        let response = NodeBuilder::new("iq")
            .attr("type", "result")
            .children([NodeBuilder::new("query")
                .attr("xmlns", ns::ROSTER)
                .children([NodeBuilder::new("item")
                    .attr("jid", "a@x")
                    .attr("subscription", "both")
                    .build()])
                .build()])
            .build();
        let items = RosterGetSpec::new().parse_response(&response).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].jid.to_string(), "a@x");
    }
}
