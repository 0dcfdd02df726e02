use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JidError {
    Empty,
    EmptyLocal(String),
    EmptyDomain(String),
    EmptyResource(String),
    InvalidLocal(String),
}

impl fmt::Display for JidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JidError::Empty => write!(f, "JID is empty"),
            JidError::EmptyLocal(s) => write!(f, "JID has an empty local part: {s}"),
            JidError::EmptyDomain(s) => write!(f, "JID has an empty domain: {s}"),
            JidError::EmptyResource(s) => write!(f, "JID has an empty resource: {s}"),
            JidError::InvalidLocal(s) => write!(f, "JID has more than one '@' before the resource: {s}"),
        }
    }
}

impl std::error::Error for JidError {}

/// An XMPP address: `local@domain/resource`.
///
/// Only `domain` is mandatory. Local part and domain are stored lowercased so
/// addresses compare the way servers route them. The bare form (`local@domain`) is what presence
/// and roster state are keyed by; the resource only matters for routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Jid {
    pub local: Option<String>,
    pub domain: String,
    pub resource: Option<String>,
}

impl Jid {
    pub fn new(local: impl Into<String>, domain: impl Into<String>) -> Self {
        let local = local.into().to_lowercase();
        Self {
            local: (!local.is_empty()).then_some(local),
            domain: domain.into().to_lowercase(),
            resource: None,
        }
    }

    pub fn domain_only(domain: impl Into<String>) -> Self {
        Self {
            local: None,
            domain: domain.into().to_lowercase(),
            resource: None,
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        let resource = resource.into();
        self.resource = (!resource.is_empty()).then_some(resource);
        self
    }

    pub fn is_bare(&self) -> bool {
        self.resource.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.domain.is_empty()
    }

    /// Strips the resource, leaving `local@domain`.
    pub fn to_bare(&self) -> Jid {
        Jid {
            local: self.local.clone(),
            domain: self.domain.clone(),
            resource: None,
        }
    }

    pub fn is_same_bare_as(&self, other: &Jid) -> bool {
        self.local == other.local && self.domain == other.domain
    }
}

impl FromStr for Jid {
    type Err = JidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(JidError::Empty);
        }

        // The resource may itself contain '@' and '/', so split on the first '/' only.
        let (addr, resource) = match s.split_once('/') {
            Some((addr, resource)) => {
                if resource.is_empty() {
                    return Err(JidError::EmptyResource(s.to_string()));
                }
                (addr, Some(resource.to_string()))
            }
            None => (s, None),
        };

        let (local, domain) = match addr.split_once('@') {
            Some((local, domain)) => {
                if local.is_empty() {
                    return Err(JidError::EmptyLocal(s.to_string()));
                }
                if domain.contains('@') {
                    return Err(JidError::InvalidLocal(s.to_string()));
                }
                (Some(local.to_lowercase()), domain)
            }
            None => (None, addr),
        };

        if domain.is_empty() {
            return Err(JidError::EmptyDomain(s.to_string()));
        }

        Ok(Jid {
            local,
            domain: domain.to_lowercase(),
            resource,
        })
    }
}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(local) = &self.local {
            write!(f, "{local}@")?;
        }
        write!(f, "{}", self.domain)?;
        if let Some(resource) = &self.resource {
            write!(f, "/{resource}")?;
        }
        Ok(())
    }
}

/// Serialized in its string form so a `Jid` can key a JSON map.
#[cfg(feature = "serde")]
impl serde::Serialize for Jid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Jid {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl From<Jid> for String {
    fn from(jid: Jid) -> Self {
        jid.to_string()
    }
}

impl From<&Jid> for String {
    fn from(jid: &Jid) -> Self {
        jid.to_string()
    }
}
