//! XScan Library
//!
//! This library provides the core functionality of the xscan CLI: running
//! containerized security scanners through a container-orchestration CLI,
//! streaming their output live, and summarizing the results.

pub mod config;
pub mod console;
pub mod logging;
pub mod registry;
pub mod scan;
