//! Folder lifecycle and its collaborator ports.

pub mod lifecycle;
pub mod ports;

pub use lifecycle::{FolderLifecycleController, FolderPorts, ValidationOutcome};
