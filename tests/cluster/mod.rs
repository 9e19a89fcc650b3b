//! In-memory ensemble for integration tests
//!
//! Every unit runs a real `ReconciliationDriver` against one shared peer
//! document. Workloads are fakes that record what they were started with.

pub mod harness;

pub use harness::*;
