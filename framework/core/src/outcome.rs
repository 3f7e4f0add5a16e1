use std::fmt;

/// The outcome of a test run that the harness itself completed.
///
/// A run in which some of the simulated calls failed is still a completed run. SIPp reports it
/// with exit code 1 and it is surfaced as [`TestOutcome::PartialFailure`] rather than an error, so
/// that callers can distinguish it from a clean pass without having to handle it as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    /// Every simulated call succeeded.
    Passed,
    /// The test ran to completion but some calls failed.
    PartialFailure,
}

impl TestOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestOutcome::Passed => write!(f, "passed"),
            TestOutcome::PartialFailure => write!(f, "passed with failed calls"),
        }
    }
}
