//! # Paper Broker Events
//!
//! This crate defines the notifications the broker engine pushes to its host UI:
//! order, position and execution updates plus per-symbol profit ticks.
//!
//! As a Layer 0 crate, it depends only on `core-types` and provides the definitive
//! language for all host-side state synchronization.

// Declare the modules that make up this crate.
pub mod error;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use messages::{HostEvent, PlUpdate, OrderPartialUpdate, PositionPartialUpdate, StampedEvent};
