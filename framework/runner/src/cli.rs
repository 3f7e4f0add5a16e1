use std::path::PathBuf;

use clap::Parser;

use crate::config::{RunConfiguration, Transport};

/// Drive a SIPp load test and report how it went.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct SipSurgeCli {
    /// Address of the target system, as `host` or `host:port`
    #[clap(short, long)]
    pub destination: String,

    /// Path to the SIPp scenario file to play
    #[clap(short = 'f', long)]
    pub scenario_file: PathBuf,

    /// Local address to advertise in the SIP signalling
    #[clap(long)]
    pub source: Option<String>,

    /// Local port to send signalling from
    #[clap(long, default_value = "8836")]
    pub source_port: u16,

    /// User part of the destination URI
    #[clap(short = 's', long)]
    pub to_user: Option<String>,

    /// CSV file of per-call variables to inject into the scenario
    #[clap(long)]
    pub injection_file: Option<PathBuf>,

    /// Number of calls to start per second
    #[clap(short = 'r', long, default_value = "10")]
    pub calls_per_second: u32,

    /// Periodically raise the call rate by this many calls per second
    #[clap(long)]
    pub rate_increase: Option<u32>,

    /// Stop raising the call rate once it reaches this value.
    ///
    /// Only makes sense together with `--rate-increase`.
    #[clap(long)]
    pub rate_max: Option<u32>,

    /// Maximum number of simultaneous calls
    #[clap(short = 'l', long, default_value = "10")]
    pub max_concurrent: u32,

    /// Total number of calls to place before the test ends
    #[clap(short = 'm', long, default_value = "10")]
    pub number_of_calls: u32,

    /// Write cumulative call statistics to this CSV file
    #[clap(long)]
    pub stats_file: Option<PathBuf>,

    /// Seconds between statistics dumps
    #[clap(long, default_value = "1")]
    pub stats_interval: u32,

    /// Transport to use for the SIP signalling
    #[clap(long, value_enum, default_value = "udp")]
    pub transport: Transport,

    /// Base port for RTP media
    #[clap(long)]
    pub media_port: Option<u16>,

    /// Ask SIPp to keep its own error log file
    #[clap(long, default_value = "false")]
    pub trace_errors: bool,

    /// Relay everything SIPp writes to its error stream to this terminal while the test runs
    #[clap(long, default_value = "false")]
    pub full_sipp_output: bool,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Path to the SIPp executable, instead of looking it up in PATH
    #[clap(long)]
    pub sipp_path: Option<PathBuf>,
}

impl TryFrom<SipSurgeCli> for RunConfiguration {
    type Error = anyhow::Error;

    fn try_from(cli: SipSurgeCli) -> Result<Self, Self::Error> {
        let mut builder = RunConfiguration::builder()
            .with_destination(cli.destination)
            .with_scenario_file(cli.scenario_file)
            .with_source_port(cli.source_port)
            .with_calls_per_second(cli.calls_per_second)
            .with_max_concurrent(cli.max_concurrent)
            .with_number_of_calls(cli.number_of_calls)
            .with_stats_interval(cli.stats_interval)
            .with_transport(cli.transport)
            .with_trace_errors(cli.trace_errors)
            .with_full_sipp_output(cli.full_sipp_output)
            .with_no_progress(cli.no_progress);

        if let Some(source) = cli.source {
            builder = builder.with_source(source);
        }
        if let Some(to_user) = cli.to_user {
            builder = builder.with_to_user(to_user);
        }
        if let Some(injection_file) = cli.injection_file {
            builder = builder.with_injection_file(injection_file);
        }
        if let Some(rate_increase) = cli.rate_increase {
            builder = builder.with_rate_increase(rate_increase);
        }
        if let Some(rate_max) = cli.rate_max {
            builder = builder.with_rate_max(rate_max);
        }
        if let Some(stats_file) = cli.stats_file {
            builder = builder.with_stats_file(stats_file);
        }
        if let Some(media_port) = cli.media_port {
            builder = builder.with_media_port(media_port);
        }
        if let Some(sipp_path) = cli.sipp_path {
            builder = builder.with_sipp_path(sipp_path);
        }

        builder.build()
    }
}
