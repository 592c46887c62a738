//! CLI command implementations.

pub mod common;
pub mod executors;
pub mod outbox;
pub mod run;
pub mod select;
pub mod sync;
