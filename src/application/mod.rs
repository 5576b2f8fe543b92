//! Application layer orchestrating validation and encryption.
//!
//! This module defines the `EncryptionOrchestrator`, the entry point for
//! encrypting card data. It keeps a single-flight task slot guarded by a
//! mutex and hands results to a serial callback executor.

pub mod orchestrator;
