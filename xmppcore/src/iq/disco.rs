//! Service discovery (XEP-0030) `disco#info` query.
//!
//! ```xml
//! <iq type="get" to="romeo@montague.lit/orchard" id="...">
//!   <query xmlns="http://jabber.org/protocol/disco#info"/>
//! </iq>
//!
//! <iq type="result" from="romeo@montague.lit/orchard" id="...">
//!   <query xmlns="http://jabber.org/protocol/disco#info">
//!     <identity category="client" type="pc" name="Exodus"/>
//!     <feature var="urn:xmpp:ping"/>
//!   </query>
//! </iq>
//! ```

use crate::iq::spec::IqSpec;
use crate::ns;
use crate::request::InfoQuery;
use anyhow::anyhow;
use serde::Serialize;
use xmppcore_node::builder::NodeBuilder;
use xmppcore_node::jid::Jid;
use xmppcore_node::node::{Node, NodeContent};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: Option<String>,
}

/// What an entity advertised in its `disco#info` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub identities: Vec<Identity>,
    pub features: Vec<String>,
}

impl Capabilities {
    pub fn has_feature(&self, var: &str) -> bool {
        self.features.iter().any(|f| f == var)
    }
}

#[derive(Debug, Clone)]
pub struct DiscoInfoSpec {
    pub target: Jid,
    /// Caps node, queried as `node#ver` when following up a caps hash.
    pub node: Option<String>,
}

impl DiscoInfoSpec {
    pub fn new(target: Jid) -> Self {
        Self { target, node: None }
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }
}

impl IqSpec for DiscoInfoSpec {
    type Response = Capabilities;

    fn build_iq(&self) -> InfoQuery {
        let payload = NodeBuilder::new("query")
            .attr("xmlns", ns::DISCO_INFO)
            .opt_attr("node", self.node.clone())
            .build();
        InfoQuery::get(
            Some(self.target.clone()),
            Some(NodeContent::Nodes(vec![payload])),
        )
    }

    fn parse_response(&self, response: &Node) -> Result<Self::Response, anyhow::Error> {
        let query = response
            .get_child_ns("query", ns::DISCO_INFO)
            .ok_or_else(|| anyhow!("disco#info result without <query/>"))?;

        let identities = query
            .get_children_by_tag("identity")
            .filter_map(|node| {
                let mut attrs = node.attrs();
                Some(Identity {
                    category: attrs.optional_string("category")?.to_string(),
                    kind: attrs.optional_string("type")?.to_string(),
                    name: attrs.optional_string("name").map(str::to_string),
                })
            })
            .collect();

        let features = query
            .get_children_by_tag("feature")
            .filter_map(|node| node.get_attr("var"))
            .map(str::to_string)
            .collect();

        Ok(Capabilities {
            identities,
            features,
        })
    }
}
