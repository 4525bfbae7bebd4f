//! Unit tests for the record module.
//!
//! Covers the closed enumerations, identifier validation, log appending, the
//! document codec and body templates.

mod codec_tests;
mod status_tests;
