use crate::cli::SipSurgeCli;
use clap::Parser;

/// Initialise logging and parse the command line for the sip-surge runner.
pub fn init() -> SipSurgeCli {
    env_logger::init();

    SipSurgeCli::parse()
}
