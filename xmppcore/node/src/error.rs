use std::fmt;

use crate::jid::JidError;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeError {
    AttrParse(String),
    MissingAttr(String),
    MissingChild(String),
    UnexpectedTag { expected: String, found: String },
    Jid(JidError),
    AttrList(Vec<NodeError>),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::AttrParse(s) => write!(f, "Attribute parsing failed: {s}"),
            NodeError::MissingAttr(s) => write!(f, "Missing required attribute: {s}"),
            NodeError::MissingChild(s) => write!(f, "Missing required child <{s}>"),
            NodeError::UnexpectedTag { expected, found } => {
                write!(f, "Expected <{expected}> but found <{found}>")
            }
            NodeError::Jid(e) => write!(f, "JID parsing error: {e}"),
            NodeError::AttrList(list) => write!(f, "Multiple attribute parsing errors: {list:?}"),
        }
    }
}

impl std::error::Error for NodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NodeError::Jid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<JidError> for NodeError {
    fn from(err: JidError) -> Self {
        NodeError::Jid(err)
    }
}

pub type Result<T> = std::result::Result<T, NodeError>;
