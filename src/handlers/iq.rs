use super::traits::StanzaHandler;
use crate::client::Client;
use crate::session::{DispatchContext, PendingRequest};
use async_trait::async_trait;
use log::{debug, info, warn};
use xmppcore::iq::IqSpec;
use xmppcore::iq::roster::RosterGetSpec;
use xmppcore::node::node::Node;
use xmppcore::request::{IqError, parse_iq_response};
use xmppcore::roster::check_push_sender;
use xmppcore::stanza::iq::{build_iq_error, build_iq_result};
use xmppcore::stanza::{IqStanza, StanzaError, StanzaKind};
use xmppcore::types::events::{Event, RosterUpdate, SharedData};
use xmppcore::xml::DisplayableNode;

/// Handler for `<iq>` stanzas.
///
/// Responses are matched against the pending request table first. Requests
/// from the server are roster pushes and pings; anything else gets a
/// `service-unavailable` error so the sender isn't left waiting.
#[derive(Default)]
pub(crate) struct IqHandler;

#[async_trait]
impl StanzaHandler for IqHandler {
    fn tag(&self) -> &'static str {
        "iq"
    }

    async fn handle(&self, client: &Client, ctx: &mut DispatchContext<'_>, node: &Node) -> bool {
        if StanzaKind::of(node) == StanzaKind::Response
            && let Some(id) = node.get_attr("id")
            && let Some(request) = ctx.session.pending.take(id)
        {
            resolve_response(ctx, request, node);
            return true;
        }

        match IqStanza::decode(node) {
            IqStanza::RosterPush { id, from, items } => {
                if let Err(e) = check_push_sender(from.as_ref(), &client.config.jid) {
                    warn!(target: "Client/Roster", "Ignoring roster push: {e}");
                    return true;
                }
                info!(target: "Client/Roster", "Roster push with {} items", items.len());
                ctx.session.roster.apply_push(items);
                ctx.session
                    .enqueue_or_send(build_iq_result(&id, from.as_ref()))
                    .await;
                let roster = SharedData::new(ctx.session.roster.snapshot());
                ctx.emit(Event::Roster(RosterUpdate {
                    roster,
                    pushed: true,
                }));
            }
            IqStanza::Ping { id, from } => {
                debug!(target: "Client/IQ", "Answering ping {id}");
                ctx.session
                    .enqueue_or_send(build_iq_result(&id, from.as_ref()))
                    .await;
            }
            IqStanza::UnhandledRequest {
                id,
                from,
                query_type,
                payload,
            } => {
                debug!(
                    target: "Client/IQ",
                    "Refusing {} request {id} for {}",
                    query_type.as_str(),
                    payload.as_deref().unwrap_or("<empty>")
                );
                let reply = build_iq_error(&id, from.as_ref(), &StanzaError::service_unavailable());
                ctx.session.enqueue_or_send(reply).await;
            }
            IqStanza::UnmatchedResponse { id } => {
                warn!(target: "Client/IQ", "Dropping response with unknown id {id:?}: {}", DisplayableNode(node));
            }
            IqStanza::Malformed(reason) => {
                warn!(target: "Client/IQ", "Dropping iq ({reason}): {}", DisplayableNode(node));
            }
        }
        true
    }
}

/// Delivers a correlated response. The entry has already been removed from
/// the pending table, so this runs at most once per request.
fn resolve_response(ctx: &mut DispatchContext<'_>, request: PendingRequest, node: &Node) {
    let result = parse_iq_response(node.clone());
    match request {
        PendingRequest::Callback(callback) => ctx.call(move || callback(result)),
        PendingRequest::Roster(callback) => {
            let items = result.and_then(|response| {
                RosterGetSpec::new()
                    .parse_response(&response)
                    .map_err(|e| IqError::Parse(e.to_string()))
            });
            match &items {
                Ok(items) => {
                    info!(target: "Client/Roster", "Loaded roster with {} items", items.len());
                    ctx.session.roster.apply_result(items.clone());
                    let roster = SharedData::new(ctx.session.roster.snapshot());
                    ctx.emit(Event::Roster(RosterUpdate {
                        roster,
                        pushed: false,
                    }));
                }
                Err(e) => warn!(target: "Client/Roster", "Roster fetch failed: {e}"),
            }
            if let Some(callback) = callback {
                ctx.call(move || callback(items));
            }
        }
    }
}
