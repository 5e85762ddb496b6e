pub mod bridge;
pub mod logger;

pub use bridge::*;
pub use logger::*;
