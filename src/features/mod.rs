mod disco;
mod presence;
mod roster;

pub use disco::Disco;

pub use presence::Presence;

pub use roster::Roster;
