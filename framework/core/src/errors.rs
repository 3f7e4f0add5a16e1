use thiserror::Error;

/// Classification of a failed SIPp run, keyed by the exit code SIPp reports.
///
/// Every variant except [`SippError::TerminatedBySignal`] carries the text that SIPp wrote to its
/// error stream, and displays as exactly that text so that operators see SIPp's own complaint
/// rather than a wrapper message.
#[derive(Error, Debug)]
pub enum SippError {
    /// SIPp stopped on an internal command (exit code 97).
    #[error("{0}")]
    ExitOnInternalCommand(String),

    /// The test ended without a single call being processed (exit code 99).
    #[error("{0}")]
    NoCallsProcessed(String),

    /// SIPp could not bind its signalling socket (exit code 254).
    #[error("{0}")]
    FatalSocketBindingError(String),

    /// SIPp aborted with a fatal error (exit code 255).
    #[error("{0}")]
    FatalError(String),

    /// Any other non-zero exit code that SIPp does not document.
    #[error("{output}")]
    Generic { code: i32, output: String },

    /// The SIPp process was killed by a signal and never reported an exit code. This is what a
    /// run that was stopped mid-flight reports.
    #[error("SIPp was terminated by signal {signal}")]
    TerminatedBySignal { signal: i32, output: String },
}

impl SippError {
    /// Map a non-zero exit code to its error category.
    ///
    /// Exit codes 0 and 1 are not errors and must be handled before calling this. Undocumented
    /// codes fall through to [`SippError::Generic`].
    pub fn from_exit_code(code: i32, output: String) -> Self {
        match code {
            97 => Self::ExitOnInternalCommand(output),
            99 => Self::NoCallsProcessed(output),
            254 => Self::FatalSocketBindingError(output),
            255 => Self::FatalError(output),
            code => Self::Generic { code, output },
        }
    }
}
