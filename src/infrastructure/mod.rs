//! Adapters implementing the domain ports.

pub mod aead;
pub mod clock;
pub mod executor;
pub mod in_memory;
