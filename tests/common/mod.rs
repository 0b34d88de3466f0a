//! Common test utilities for reqflow integration tests

#[allow(dead_code)]
pub mod fixtures;
#[allow(dead_code)]
pub mod recorder;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use recorder::*;
