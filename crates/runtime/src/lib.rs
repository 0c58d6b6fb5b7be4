pub mod debounce;
pub mod event_bus;
pub mod generation;
pub mod metrics;
pub mod timers;

pub use debounce::*;
pub use event_bus::*;
pub use generation::*;
pub use metrics::*;
pub use timers::*;
