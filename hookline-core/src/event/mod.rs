pub mod channel;

pub use channel::{EventFilter, InterceptionEvent, InterceptionEventChannel, InterceptionEventKind};
