//! Step definitions for delegation scenarios.

pub mod given;
pub mod then;
pub mod when;
pub mod world;
