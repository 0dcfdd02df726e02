use crate::client::Client;
use crate::session::DispatchContext;
use async_trait::async_trait;
use xmppcore::node::node::Node;

/// Handles one kind of top-level stanza (`message`, `presence`, `iq`).
///
/// Handlers run with the session lock held, so everything they read and
/// write through `ctx` is consistent for the whole unit. Anything meant for
/// the application goes through `ctx.emit` / `ctx.call` and runs after the
/// lock is released.
#[async_trait]
pub(crate) trait StanzaHandler: Send + Sync {
    fn tag(&self) -> &'static str;

    /// Returns `false` if the node was not understood and should be logged
    /// as unhandled.
    async fn handle(&self, client: &Client, ctx: &mut DispatchContext<'_>, node: &Node) -> bool;
}
