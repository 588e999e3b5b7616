//! parframe driver library: configuration, workloads, and dispatch for the
//! `parframe` binary.

pub mod app;
pub mod config;
pub mod errors;
pub mod workload;
