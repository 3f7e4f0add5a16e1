use std::env;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;

use crate::types::SurgeResult;

/// Environment variable to override the path to the SIPp binary used to drive tests.
pub const SIP_SURGE_SIPP_PATH_ENV: &str = "SIP_SURGE_SIPP_PATH";

/// Get the path to the SIPp binary.
///
/// If the [`SIP_SURGE_SIPP_PATH_ENV`] environment variable is set, its value is used as the path
/// to the SIPp binary. If it is not set, the binary is looked up as `sipp` in the user's `PATH`.
pub fn sipp_path() -> SurgeResult<PathBuf> {
    match env::var(SIP_SURGE_SIPP_PATH_ENV).ok().as_deref() {
        Some("") => {
            bail!("'{SIP_SURGE_SIPP_PATH_ENV}' set to empty string");
        }
        Some("sipp") | None => {
            log::debug!("Looking for 'sipp' in the user's PATH");
            which::which("sipp").with_context(|| {
                format!(
                    "SIPp binary not found in PATH. Please install SIPp or set '{SIP_SURGE_SIPP_PATH_ENV}' to the correct path."
                )
            })
        }
        Some(path) => {
            let sipp_path = PathBuf::from(path);
            if !sipp_path.exists() {
                bail!(
                    "Path to SIPp binary overwritten with '{SIP_SURGE_SIPP_PATH_ENV}={path}' but that path doesn't exist",
                    path = sipp_path.display()
                );
            }
            Ok(sipp_path)
        }
    }
}
