pub(crate) mod iq;
pub(crate) mod message;
pub(crate) mod presence;
pub(crate) mod router;
pub(crate) mod traits;
