pub mod events;

pub use events::{CoreEventBus, Event, EventHandler};
