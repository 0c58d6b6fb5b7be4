pub mod bounds;
pub mod geo;
pub mod handles;
pub mod ids;
pub mod mercator;
pub mod time;

// Foundation crate: small, well-tested primitives only.
pub use bounds::*;
pub use geo::*;
pub use handles::*;
pub use ids::*;
pub use time::*;
