use crate::request::InfoQuery;
use xmppcore_node::node::Node;

/// Pairs an IQ request builder with the parser for its `result`.
///
/// Sending, correlation and timeouts are the client's business; a spec only
/// knows the wire shape of one exchange.
pub trait IqSpec {
    type Response;

    fn build_iq(&self) -> InfoQuery;

    fn parse_response(&self, response: &Node) -> Result<Self::Response, anyhow::Error>;
}
