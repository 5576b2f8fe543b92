//! Card data rules and the ports the application layer depends on.
//!
//! Nothing in this module performs I/O or reads the wall clock.

pub mod brand;
pub mod digits;
pub mod ports;
pub mod request;
pub mod validation;
