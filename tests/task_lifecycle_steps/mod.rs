//! Step definitions for task lifecycle scenarios.

mod when;
pub mod world;
