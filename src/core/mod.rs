// src/core/mod.rs — Session coordination

pub mod coordinator;
pub mod registry;
pub mod types;

pub use coordinator::SessionCoordinator;
pub use registry::SessionRegistry;
