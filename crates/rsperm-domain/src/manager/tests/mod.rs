//! Tests for the authorization manager façade.
//!
//! Organized by functionality:
//! - Permission grant/revoke and idempotence
//! - Inheritance management and cycle rejection
//! - Post-commit cache invalidation and rollback behavior
//! - Store failure propagation
