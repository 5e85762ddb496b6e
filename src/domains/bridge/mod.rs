pub mod actors;
pub mod agent;
pub mod direction;
pub mod events;
pub mod gate;
pub mod projections;

pub use actors::*;
pub use agent::*;
pub use direction::*;
pub use events::*;
pub use gate::*;
pub use projections::*;
