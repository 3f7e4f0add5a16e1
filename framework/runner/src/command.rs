use crate::config::RunConfiguration;
use crate::sipp_binary::sipp_path;
use crate::types::SurgeResult;

/// Assemble the full SIPp command line for the given configuration.
///
/// The binary path comes from the configuration override when set and from [`sipp_path`]
/// otherwise. The returned string is treated as opaque by the runner and handed to the shell
/// unchanged, with the destination as the final argument.
pub fn build_command(config: &RunConfiguration) -> SurgeResult<String> {
    let sipp = match &config.sipp_path {
        Some(path) => path.clone(),
        None => sipp_path()?,
    };

    let mut parts = vec![sipp.display().to_string()];

    if let Some(source) = &config.source {
        parts.push(format!("-i {source}"));
    }
    parts.push(format!("-p {}", config.source_port));
    parts.push(format!("-sf {}", config.scenario_file.display()));
    parts.push(format!("-t {}", config.transport.flag_value()));
    parts.push(format!("-r {}", config.calls_per_second));
    if let Some(rate_increase) = config.rate_increase {
        parts.push(format!("-rate_increase {rate_increase}"));
    }
    if let Some(rate_max) = config.rate_max {
        parts.push(format!("-rate_max {rate_max}"));
    }
    parts.push(format!("-l {}", config.max_concurrent));
    parts.push(format!("-m {}", config.number_of_calls));
    if let Some(to_user) = &config.to_user {
        parts.push(format!("-s {to_user}"));
    }
    if let Some(injection_file) = &config.injection_file {
        parts.push(format!("-inf {}", injection_file.display()));
    }
    if let Some(stats_file) = &config.stats_file {
        parts.push(format!(
            "-trace_stat -stf {} -fd {}",
            stats_file.display(),
            config.stats_interval
        ));
    }
    if let Some(media_port) = config.media_port {
        parts.push(format!("-mp {media_port}"));
    }
    if config.trace_errors {
        parts.push("-trace_err".to_string());
    }
    parts.push(config.destination.clone());

    Ok(parts.join(" "))
}
