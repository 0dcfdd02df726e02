use std::str::FromStr;

use crate::error::{NodeError, Result};
use crate::jid::Jid;
use crate::node::{Attrs, Node};

/// Collects attribute lookups and records every failure, so a caller can
/// parse a whole element and check `ok()` / `finish()` once at the end.
pub struct AttrParser<'a> {
    pub attrs: &'a Attrs,
    pub errors: Vec<NodeError>,
}

impl<'a> AttrParser<'a> {
    pub fn new(node: &'a Node) -> Self {
        Self {
            attrs: &node.attrs,
            errors: Vec::new(),
        }
    }

    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(&self) -> Result<()> {
        if self.ok() {
            Ok(())
        } else {
            Err(NodeError::AttrList(self.errors.clone()))
        }
    }

    fn get_raw(&mut self, key: &str, require: bool) -> Option<&'a str> {
        let val = self.attrs.get(key);
        if require && val.is_none() {
            self.errors.push(NodeError::AttrParse(format!(
                "Required attribute '{key}' not found"
            )));
        }
        val
    }

    pub fn optional_string(&mut self, key: &str) -> Option<&'a str> {
        self.get_raw(key, false)
    }

    /// Get a required string attribute, returning an error if missing.
    pub fn required_string(&mut self, key: &str) -> Result<&'a str> {
        self.optional_string(key)
            .ok_or_else(|| NodeError::MissingAttr(key.to_string()))
    }

    /// Parse the attribute as a JID. A malformed value is recorded as an error
    /// and reported as absent.
    pub fn optional_jid(&mut self, key: &str) -> Option<Jid> {
        let raw = self.get_raw(key, false)?;
        match Jid::from_str(raw) {
            Ok(jid) => Some(jid),
            Err(e) => {
                self.errors.push(NodeError::AttrParse(format!(
                    "Invalid JID '{raw}' for key '{key}': {e}"
                )));
                None
            }
        }
    }

    pub fn required_jid(&mut self, key: &str) -> Result<Jid> {
        let raw = self.required_string(key)?;
        Ok(Jid::from_str(raw)?)
    }

    pub fn optional_u64(&mut self, key: &str) -> Option<u64> {
        self.optional_parse(key)
    }

    pub fn optional_bool(&mut self, key: &str) -> bool {
        match self.get_raw(key, false) {
            Some("true") | Some("1") => true,
            Some("false") | Some("0") | None => false,
            Some(other) => {
                self.errors.push(NodeError::AttrParse(format!(
                    "Failed to parse bool from '{other}' for key '{key}'"
                )));
                false
            }
        }
    }

    fn optional_parse<T>(&mut self, key: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.get_raw(key, false)?;
        match raw.parse::<T>() {
            Ok(val) => Some(val),
            Err(e) => {
                self.errors.push(NodeError::AttrParse(format!(
                    "Failed to parse '{raw}' for key '{key}': {e}"
                )));
                None
            }
        }
    }
}
