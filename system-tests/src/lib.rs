// system-tests/src/lib.rs
// ============================================================================
// Module: APK Probe System Tests Library
// Description: Shared configuration for the system-test binaries.
// Purpose: Resolve run roots, timeout floors, and live targets in one place.
// Dependencies: url
// ============================================================================

//! ## Overview
//! This crate hosts shared configuration used by the APK Probe system-test
//! binaries in `system-tests/tests`. Suites run against an in-process stub of
//! the conversion service unless a live base URL is configured.
//! Security posture: environment inputs are untrusted and fail closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
