// crates/apk-probe-cli/src/lib.rs
// ============================================================================
// Module: APK Probe CLI Library
// Description: Shared helpers for the `apk-probe` binary.
// Purpose: Expose the message catalog to the binary and its tests.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! Library half of the `apk-probe` CLI. The binary routes every user-facing
//! string through [`i18n`] and the [`t!`] macro.

pub mod i18n;

#[cfg(test)]
#[path = "tests/i18n.rs"]
mod i18n_tests;
