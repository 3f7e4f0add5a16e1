use std::path::PathBuf;

use anyhow::bail;

use crate::types::SurgeResult;

const DEFAULT_SOURCE_PORT: u16 = 8836;
const DEFAULT_CALLS_PER_SECOND: u32 = 10;
const DEFAULT_MAX_CONCURRENT: u32 = 10;
const DEFAULT_NUMBER_OF_CALLS: u32 = 10;
const DEFAULT_STATS_INTERVAL: u32 = 1;

/// Transport mode for SIP signalling, passed to SIPp's `-t` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Transport {
    /// UDP with one socket (`u1`)
    #[default]
    Udp,
    /// TCP with one socket (`t1`)
    Tcp,
}

impl Transport {
    pub(crate) fn flag_value(&self) -> &'static str {
        match self {
            Transport::Udp => "u1",
            Transport::Tcp => "t1",
        }
    }
}

/// The full parameter set for one SIPp run.
///
/// Immutable once built. Construct through [`RunConfiguration::builder`], which applies defaults
/// and validates the combination of options.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    /// Address of the target system, as `host` or `host:port`.
    pub destination: String,
    /// The SIPp scenario to play (`-sf`).
    pub scenario_file: PathBuf,
    /// Local address to advertise in the signalling (`-i`).
    pub source: Option<String>,
    /// Local port to send signalling from (`-p`).
    pub source_port: u16,
    /// User part of the destination URI (`-s`).
    pub to_user: Option<String>,
    /// CSV file of per-call variables injected into the scenario (`-inf`).
    pub injection_file: Option<PathBuf>,
    /// Number of calls to start per second (`-r`).
    pub calls_per_second: u32,
    /// Periodically raise the call rate by this many calls per second (`-rate_increase`).
    pub rate_increase: Option<u32>,
    /// Stop raising the call rate once it reaches this value (`-rate_max`).
    pub rate_max: Option<u32>,
    /// Cap on simultaneous calls (`-l`).
    pub max_concurrent: u32,
    /// Total number of calls to place before the test ends (`-m`).
    pub number_of_calls: u32,
    /// Where SIPp should write its cumulative statistics (`-trace_stat -stf`).
    pub stats_file: Option<PathBuf>,
    /// Seconds between statistics dumps (`-fd`). Only used together with `stats_file`.
    pub stats_interval: u32,
    /// Transport mode for the signalling (`-t`).
    pub transport: Transport,
    /// Base port for RTP media (`-mp`).
    pub media_port: Option<u16>,
    /// Ask SIPp to keep its own error log file (`-trace_err`).
    pub trace_errors: bool,
    /// Relay everything SIPp writes to its error stream to our own stderr while the test runs.
    pub full_sipp_output: bool,
    /// Do not show a progress bar while the test runs.
    pub no_progress: bool,
    /// Explicit path to the SIPp executable, bypassing the `PATH` lookup.
    pub sipp_path: Option<PathBuf>,
}

impl RunConfiguration {
    pub fn builder() -> RunConfigurationBuilder {
        RunConfigurationBuilder::default()
    }
}

/// Builder for [`RunConfiguration`], applying the overrides and defaults where appropriate.
#[derive(Debug, Clone, Default)]
pub struct RunConfigurationBuilder {
    destination: Option<String>,
    scenario_file: Option<PathBuf>,
    source: Option<String>,
    source_port: Option<u16>,
    to_user: Option<String>,
    injection_file: Option<PathBuf>,
    calls_per_second: Option<u32>,
    rate_increase: Option<u32>,
    rate_max: Option<u32>,
    max_concurrent: Option<u32>,
    number_of_calls: Option<u32>,
    stats_file: Option<PathBuf>,
    stats_interval: Option<u32>,
    transport: Option<Transport>,
    media_port: Option<u16>,
    trace_errors: bool,
    full_sipp_output: bool,
    no_progress: bool,
    sipp_path: Option<PathBuf>,
}

impl RunConfigurationBuilder {
    /// Set the address of the target system, as `host` or `host:port`.
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Set the scenario file for SIPp to play.
    pub fn with_scenario_file(mut self, scenario_file: impl Into<PathBuf>) -> Self {
        self.scenario_file = Some(scenario_file.into());
        self
    }

    /// Set the local address to advertise in the signalling.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the local port to send signalling from.
    pub fn with_source_port(mut self, source_port: u16) -> Self {
        self.source_port = Some(source_port);
        self
    }

    /// Set the user part of the destination URI.
    pub fn with_to_user(mut self, to_user: impl Into<String>) -> Self {
        self.to_user = Some(to_user.into());
        self
    }

    /// Set the CSV file of per-call variables to inject into the scenario.
    pub fn with_injection_file(mut self, injection_file: impl Into<PathBuf>) -> Self {
        self.injection_file = Some(injection_file.into());
        self
    }

    /// Set the number of calls to start per second.
    pub fn with_calls_per_second(mut self, calls_per_second: u32) -> Self {
        self.calls_per_second = Some(calls_per_second);
        self
    }

    /// Periodically raise the call rate by this many calls per second.
    pub fn with_rate_increase(mut self, rate_increase: u32) -> Self {
        self.rate_increase = Some(rate_increase);
        self
    }

    /// Stop raising the call rate once it reaches this value.
    pub fn with_rate_max(mut self, rate_max: u32) -> Self {
        self.rate_max = Some(rate_max);
        self
    }

    /// Set the cap on simultaneous calls.
    pub fn with_max_concurrent(mut self, max_concurrent: u32) -> Self {
        self.max_concurrent = Some(max_concurrent);
        self
    }

    /// Set the total number of calls to place before the test ends.
    pub fn with_number_of_calls(mut self, number_of_calls: u32) -> Self {
        self.number_of_calls = Some(number_of_calls);
        self
    }

    /// Have SIPp write its cumulative statistics to this CSV file.
    pub fn with_stats_file(mut self, stats_file: impl Into<PathBuf>) -> Self {
        self.stats_file = Some(stats_file.into());
        self
    }

    /// Set the number of seconds between statistics dumps.
    pub fn with_stats_interval(mut self, stats_interval: u32) -> Self {
        self.stats_interval = Some(stats_interval);
        self
    }

    /// Set the transport mode for the signalling.
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the base port for RTP media.
    pub fn with_media_port(mut self, media_port: u16) -> Self {
        self.media_port = Some(media_port);
        self
    }

    /// Ask SIPp to keep its own error log file.
    pub fn with_trace_errors(mut self, trace_errors: bool) -> Self {
        self.trace_errors = trace_errors;
        self
    }

    /// Relay everything SIPp writes to its error stream to our own stderr while the test runs.
    pub fn with_full_sipp_output(mut self, full_sipp_output: bool) -> Self {
        self.full_sipp_output = full_sipp_output;
        self
    }

    /// Do not show a progress bar while the test runs.
    pub fn with_no_progress(mut self, no_progress: bool) -> Self {
        self.no_progress = no_progress;
        self
    }

    /// Override the path to the SIPp executable instead of looking it up.
    pub fn with_sipp_path(mut self, sipp_path: impl Into<PathBuf>) -> Self {
        self.sipp_path = Some(sipp_path.into());
        self
    }

    /// Build a [`RunConfiguration`], applying the defaults where appropriate.
    ///
    /// Returns an error if required fields are not set or the combination of options makes no
    /// sense.
    pub fn build(self) -> SurgeResult<RunConfiguration> {
        let destination = match self.destination {
            Some(destination) if !destination.is_empty() => destination,
            _ => bail!("A destination to send calls to is required"),
        };
        let scenario_file = match self.scenario_file {
            Some(scenario_file) if !scenario_file.as_os_str().is_empty() => scenario_file,
            _ => bail!("A scenario file is required"),
        };

        let calls_per_second = self.calls_per_second.unwrap_or(DEFAULT_CALLS_PER_SECOND);
        if calls_per_second == 0 {
            bail!("The call rate must be at least one call per second");
        }
        if self.rate_max.is_some() && self.rate_increase.is_none() {
            bail!("A maximum call rate only makes sense together with a rate increase");
        }

        Ok(RunConfiguration {
            destination,
            scenario_file,
            source: self.source,
            source_port: self.source_port.unwrap_or(DEFAULT_SOURCE_PORT),
            to_user: self.to_user,
            injection_file: self.injection_file,
            calls_per_second,
            rate_increase: self.rate_increase,
            rate_max: self.rate_max,
            max_concurrent: self.max_concurrent.unwrap_or(DEFAULT_MAX_CONCURRENT),
            number_of_calls: self.number_of_calls.unwrap_or(DEFAULT_NUMBER_OF_CALLS),
            stats_file: self.stats_file,
            stats_interval: self.stats_interval.unwrap_or(DEFAULT_STATS_INTERVAL),
            transport: self.transport.unwrap_or_default(),
            media_port: self.media_port,
            trace_errors: self.trace_errors,
            full_sipp_output: self.full_sipp_output,
            no_progress: self.no_progress,
            sipp_path: self.sipp_path,
        })
    }
}
