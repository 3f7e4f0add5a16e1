mod cli;
mod command;
mod config;
mod runner;
mod sipp_binary;
mod types;
mod init;
mod monitor;
mod progress;

pub mod prelude {
    pub use crate::cli::SipSurgeCli;
    pub use crate::command::build_command;
    pub use crate::config::{RunConfiguration, RunConfigurationBuilder, Transport};
    pub use crate::init::init;
    pub use crate::runner::SippRunner;
    pub use crate::sipp_binary::{sipp_path, SIP_SURGE_SIPP_PATH_ENV};
    pub use crate::types::SurgeResult;

    /// Re-export of the `sip_surge_core` prelude.
    ///
    /// This is for convenience so that callers can depend on a single crate for the runner.
    pub use sip_surge_core::prelude::*;
}
