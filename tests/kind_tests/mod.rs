//! Integration tests for the identity controller
//!
//! These tests run the Service informer against a real API server (kind) and
//! tell the story of how annotated Services become registry entries.
//!
//! # Test Organization
//!
//! - `identity_registry`: Stories about Services being created, changed and
//!   removed while the controller watches them
//!
//! # Running These Tests
//!
//! ```bash
//! cargo test --test kind -- --ignored --nocapture
//! ```

mod helpers;
mod identity_registry;
