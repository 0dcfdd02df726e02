pub mod attrs;
pub mod builder;
pub mod error;
pub mod jid;
pub mod node;

pub use attrs::AttrParser;
pub use error::{NodeError, Result};
pub use jid::{Jid, JidError};
pub use node::{Attrs, Node, NodeContent};
