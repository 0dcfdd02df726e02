pub mod disco;
pub mod roster;
pub mod spec;

pub use spec::IqSpec;
