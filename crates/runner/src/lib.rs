#![forbid(unsafe_code)]

pub mod error;
pub mod http;
pub mod supervisor;

pub use error::SupervisorError;
pub use http::{configure, start_server};
pub use supervisor::{SupervisorConfig, TestSupervisor, build_command};
