use crate::client::Client;
use xmppcore::iq::disco::{Capabilities, DiscoInfoSpec};
use xmppcore::node::jid::Jid;
use xmppcore::request::IqError;

/// Feature handle for service discovery.
pub struct Disco<'a> {
    client: &'a Client,
}

impl<'a> Disco<'a> {
    pub(crate) fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Queries what `jid` supports; `callback` gets the parsed result.
    pub async fn discover_capabilities<F>(&self, jid: &Jid, callback: F) -> Result<String, IqError>
    where
        F: FnOnce(Result<Capabilities, IqError>) + Send + 'static,
    {
        self.client
            .execute_with(DiscoInfoSpec::new(jid.clone()), callback)
            .await
    }

    pub async fn capabilities(&self, jid: &Jid) -> Result<Capabilities, IqError> {
        self.client.execute(DiscoInfoSpec::new(jid.clone())).await
    }

    /// Follows up an entity-caps advertisement by querying `node#ver`.
    pub async fn capabilities_for_caps(
        &self,
        jid: &Jid,
        node: &str,
        ver: &str,
    ) -> Result<Capabilities, IqError> {
        let spec = DiscoInfoSpec::new(jid.clone()).with_node(format!("{node}#{ver}"));
        self.client.execute(spec).await
    }
}

impl Client {
    /// Access service discovery.
    pub fn disco(&self) -> Disco<'_> {
        Disco::new(self)
    }
}
