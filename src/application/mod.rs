pub mod arrival;
pub mod crossing;
pub mod simulation_service;

pub use arrival::*;
pub use crossing::*;
pub use simulation_service::*;
