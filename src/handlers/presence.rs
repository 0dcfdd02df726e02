use super::traits::StanzaHandler;
use crate::client::Client;
use crate::session::DispatchContext;
use async_trait::async_trait;
use log::{debug, warn};
use xmppcore::node::node::Node;
use xmppcore::presence::{PresenceOutcome, PresenceStanza, SubscriptionKind};
use xmppcore::types::events::{
    ErrorEvent, Event, PresenceUpdate, SharedData, SubscriptionUpdate,
};

/// Handler for `<presence>` stanzas.
///
/// Availability updates land in the presence table and are then either
/// claimed by a pending probe or broadcast as [`Event::Presence`].
/// Subscription traffic never touches the table.
#[derive(Default)]
pub(crate) struct PresenceHandler;

#[async_trait]
impl StanzaHandler for PresenceHandler {
    fn tag(&self) -> &'static str {
        "presence"
    }

    async fn handle(&self, _client: &Client, ctx: &mut DispatchContext<'_>, node: &Node) -> bool {
        match PresenceStanza::decode(node) {
            PresenceStanza::Update { from, entry } => {
                match ctx.session.presence.apply(from, entry) {
                    PresenceOutcome::ProbeResolved { from, entry } => {
                        let callbacks = ctx.session.probes.remove(&from).unwrap_or_default();
                        debug!(target: "Client/Presence", "Probe for {from} answered: {}", entry.state);
                        for (_, callback) in callbacks {
                            let entry = entry.clone();
                            ctx.call(move || callback(entry));
                        }
                    }
                    PresenceOutcome::Broadcast { from, entry } => {
                        let table = SharedData::new(ctx.session.presence.snapshot());
                        ctx.emit(Event::Presence(PresenceUpdate { from, entry, table }));
                    }
                }
            }
            PresenceStanza::Subscription { from, kind } => {
                let update = SubscriptionUpdate { from, kind };
                if kind == SubscriptionKind::Subscribe {
                    ctx.emit(Event::SubscriptionRequest(update));
                } else {
                    ctx.emit(Event::SubscriptionChanged(update));
                }
            }
            PresenceStanza::Probe => {
                debug!(target: "Client/Presence", "Ignoring inbound presence probe");
            }
            PresenceStanza::Error { from, error } => {
                ctx.emit(Event::Error(ErrorEvent::Stanza {
                    from,
                    id: node.get_attr("id").map(str::to_string),
                    error,
                }));
            }
            PresenceStanza::Malformed(reason) => {
                warn!(target: "Client/Presence", "Dropping presence: {reason}");
            }
        }
        true
    }
}
