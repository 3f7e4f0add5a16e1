use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{bail, Context};
use parking_lot::Mutex;
use sip_surge_core::prelude::{SippError, TestOutcome};

use crate::command::build_command;
use crate::config::RunConfiguration;
use crate::monitor::start_monitor;
use crate::progress::start_progress;
use crate::types::SurgeResult;

/// Where the runner is in the lifecycle of its child process.
///
/// The PID is held only while the child is running. A completed [`SippRunner::run`] moves the
/// state to [`ProcessState::Terminated`]; [`SippRunner::stop`] never touches the state, so
/// stopping always races against natural exit and the caller of `stop` owns the outcome of that
/// race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessState {
    Idle,
    Running(u32),
    Terminated,
}

/// Supervises a single SIPp invocation.
///
/// One runner owns at most one child process at a time. [`SippRunner::run`] blocks the calling
/// thread until SIPp exits and classifies the exit status; [`SippRunner::stop`] may be called
/// from another thread to kill the test mid-flight. A runner can be reused for another run once
/// the previous one has completed, but never for two runs at the same time.
pub struct SippRunner {
    config: RunConfiguration,
    state: Mutex<ProcessState>,
}

impl SippRunner {
    pub fn new(config: RunConfiguration) -> Self {
        Self {
            config,
            state: Mutex::new(ProcessState::Idle),
        }
    }

    /// Run the test to completion.
    ///
    /// Blocks until SIPp exits. Exit code 0 is a pass and exit code 1 a partial failure; both are
    /// values, not errors. Every other way for the child to end becomes a [`SippError`] carrying
    /// whatever SIPp wrote to its error stream. A failure to create the process at all propagates
    /// as the underlying [`std::io::Error`].
    pub fn run(&self) -> SurgeResult<TestOutcome> {
        let command = build_command(&self.config)?;

        log::info!("Preparing to run {command}");

        let (mut child, child_pid) = {
            let mut state = self.state.lock();
            if let ProcessState::Running(pid) = *state {
                bail!("A SIPp process is already running with PID {pid}");
            }

            let mut cmd = Command::new("sh");
            cmd.arg("-c")
                .arg(&command)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped());

            // A separate process group keeps SIPp's terminal handling away from ours.
            #[cfg(unix)]
            {
                use std::os::unix::process::CommandExt;
                cmd.process_group(0);
            }

            let child = cmd.spawn()?;
            let pid = child.id();
            *state = ProcessState::Running(pid);
            (child, pid)
        };

        let stderr = child
            .stderr
            .take()
            .context("Failed to capture the SIPp error stream")?;

        // The error stream must be drained on its own thread while we wait for the exit status,
        // otherwise a chatty SIPp fills the pipe buffer and both sides deadlock.
        let relay = self.config.full_sipp_output;
        let (captured_tx, captured_rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("sipp-stderr".to_string())
            .spawn(move || {
                let mut stderr = stderr;
                let mut captured = Vec::new();
                let mut buf = [0u8; 8192];
                loop {
                    match stderr.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if relay {
                                let _ = std::io::stderr().write_all(&buf[..n]);
                            }
                            captured.extend_from_slice(&buf[..n]);
                        }
                        Err(e) => {
                            log::warn!("Failed to read from the SIPp error stream: {e}");
                            break;
                        }
                    }
                }
                // The receiver is gone if the run bailed out early, which is fine.
                let _ = captured_tx.send(String::from_utf8_lossy(&captured).into_owned());
            })
            .expect("Failed to start the error stream reader thread");

        let (monitor_done, monitor_done_rx) = mpsc::channel();
        start_monitor(child_pid, monitor_done_rx);

        let mut progress_done = None;
        if !self.config.full_sipp_output && !self.config.no_progress {
            let estimated = Duration::from_secs(
                u64::from(self.config.number_of_calls)
                    .div_ceil(u64::from(self.config.calls_per_second)),
            );
            let (tx, rx) = mpsc::channel();
            start_progress(estimated, rx);
            progress_done = Some(tx);
        }

        let wait_result = child.wait();

        *self.state.lock() = ProcessState::Terminated;
        drop(monitor_done);
        drop(progress_done);

        let status = wait_result.context("Failed to wait for the SIPp process to exit")?;
        let output = captured_rx.recv().unwrap_or_default();

        if let Some(stats_file) = &self.config.stats_file {
            let stats_path = std::path::absolute(stats_file).unwrap_or_else(|_| stats_file.clone());
            log::info!("Statistics logged at {}", stats_path.display());
        }

        match status.code() {
            Some(0) => {
                log::info!("Test completed successfully");
                Ok(TestOutcome::Passed)
            }
            Some(1) => {
                log::info!("Test completed successfully but some calls failed.");
                Ok(TestOutcome::PartialFailure)
            }
            Some(code) => Err(SippError::from_exit_code(code, output).into()),
            None => {
                #[cfg(unix)]
                let signal = {
                    use std::os::unix::process::ExitStatusExt;
                    status.signal().unwrap_or_default()
                };
                #[cfg(not(unix))]
                let signal = 0;

                Err(SippError::TerminatedBySignal { signal, output }.into())
            }
        }
    }

    /// Kill the running SIPp process.
    ///
    /// A no-op when no process is recorded. Delivery errors are returned to the caller untouched,
    /// including the "no such process" that means SIPp exited just before the signal was sent;
    /// whether that race matters is the caller's decision.
    pub fn stop(&self) -> SurgeResult<()> {
        let pid = match *self.state.lock() {
            ProcessState::Running(pid) => pid,
            ProcessState::Idle | ProcessState::Terminated => return Ok(()),
        };

        log::info!("Stopping the SIPp process with PID {pid}");

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            kill(Pid::from_raw(pid as i32), Signal::SIGKILL)?;
        }

        #[cfg(not(unix))]
        bail!("Stopping a running test is only supported on unix");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt as _;
    use std::path::PathBuf;
    use std::sync::{Arc, Once};

    use serial_test::serial;
    use tempfile::TempDir;

    use super::*;

    struct CapturingLogger;

    static LOG_LINES: std::sync::Mutex<Vec<String>> = std::sync::Mutex::new(Vec::new());
    static LOGGER: CapturingLogger = CapturingLogger;

    impl log::Log for CapturingLogger {
        fn enabled(&self, _metadata: &log::Metadata) -> bool {
            true
        }

        fn log(&self, record: &log::Record) {
            LOG_LINES.lock().unwrap().push(format!("{}", record.args()));
        }

        fn flush(&self) {}
    }

    fn init_log_capture() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            log::set_logger(&LOGGER).expect("failed to install test logger");
            log::set_max_level(log::LevelFilter::Debug);
        });
        LOG_LINES.lock().unwrap().clear();
    }

    fn logged_lines() -> Vec<String> {
        LOG_LINES.lock().unwrap().clone()
    }

    /// Writes an executable standing in for SIPp that behaves per the given script.
    fn fake_sipp(dir: &TempDir, script: &str) -> PathBuf {
        let path = dir.path().join("sipp");
        std::fs::write(&path, script).expect("failed to write fake sipp");
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn config_for(sipp: PathBuf) -> crate::config::RunConfigurationBuilder {
        RunConfiguration::builder()
            .with_destination("127.0.0.1:5060")
            .with_scenario_file("scenario.xml")
            .with_sipp_path(sipp)
            .with_no_progress(true)
    }

    fn wait_until_running(runner: &SippRunner) {
        for _ in 0..500 {
            if matches!(*runner.state.lock(), ProcessState::Running(_)) {
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("the test process never reached the running state");
    }

    #[test]
    #[serial]
    fn test_should_pass_when_sipp_exits_cleanly() {
        init_log_capture();
        let temp = TempDir::new().expect("failed to create temp dir");
        let sipp = fake_sipp(&temp, "#!/bin/sh\nexit 0\n");

        let runner = SippRunner::new(config_for(sipp).build().unwrap());
        let outcome = runner.run().expect("run failed");

        assert_eq!(outcome, TestOutcome::Passed);
        assert!(outcome.is_passed());
        assert_eq!(*runner.state.lock(), ProcessState::Terminated);

        let lines = logged_lines();
        assert!(lines.iter().any(|l| l.starts_with("Preparing to run ")));
        assert!(lines.iter().any(|l| l == "Test completed successfully"));
        assert!(!lines.iter().any(|l| l.contains("Statistics logged at")));
    }

    #[test]
    #[serial]
    fn test_should_report_partial_failure_when_some_calls_fail() {
        init_log_capture();
        let temp = TempDir::new().expect("failed to create temp dir");
        let sipp = fake_sipp(&temp, "#!/bin/sh\nexit 1\n");

        let runner = SippRunner::new(config_for(sipp).build().unwrap());
        let outcome = runner.run().expect("run failed");

        assert_eq!(outcome, TestOutcome::PartialFailure);
        assert!(!outcome.is_passed());
        assert!(logged_lines()
            .iter()
            .any(|l| l == "Test completed successfully but some calls failed."));
    }

    #[test]
    #[serial]
    fn test_should_fail_with_the_documented_error_kinds() {
        let cases = [
            (97, SippError::ExitOnInternalCommand(String::new())),
            (99, SippError::NoCallsProcessed(String::new())),
            (254, SippError::FatalSocketBindingError(String::new())),
            (255, SippError::FatalError(String::new())),
        ];

        for (code, expected) in cases {
            let temp = TempDir::new().expect("failed to create temp dir");
            let sipp = fake_sipp(
                &temp,
                &format!("#!/bin/sh\nprintf 'the server exploded' >&2\nexit {code}\n"),
            );

            let runner = SippRunner::new(config_for(sipp).build().unwrap());
            let err = runner.run().expect_err("run should have failed");
            let err = err
                .downcast::<SippError>()
                .expect("the error was not a SippError");

            assert_eq!(
                std::mem::discriminant(&err),
                std::mem::discriminant(&expected),
                "wrong error kind for exit code {code}"
            );
            assert_eq!(err.to_string(), "the server exploded");
        }
    }

    #[test]
    #[serial]
    fn test_should_fail_with_a_generic_error_for_an_undocumented_code() {
        init_log_capture();
        let temp = TempDir::new().expect("failed to create temp dir");
        let sipp = fake_sipp(&temp, "#!/bin/sh\nprintf 'Some error' >&2\nexit 128\n");
        let stats_file = temp.path().join("stats.csv");

        let runner = SippRunner::new(
            config_for(sipp)
                .with_stats_file(&stats_file)
                .build()
                .unwrap(),
        );
        let err = runner.run().expect_err("run should have failed");
        let err = err
            .downcast::<SippError>()
            .expect("the error was not a SippError");

        match &err {
            SippError::Generic { code, output } => {
                assert_eq!(*code, 128);
                assert_eq!(output, "Some error");
            }
            other => panic!("expected a generic error, got {other:?}"),
        }
        assert_eq!(err.to_string(), "Some error");

        // The statistics location is still announced when the child ran but failed.
        let expected = format!("Statistics logged at {}", stats_file.display());
        assert!(logged_lines().iter().any(|l| l == &expected));
    }

    #[test]
    #[serial]
    fn test_should_log_the_statistics_file_location() {
        init_log_capture();
        let temp = TempDir::new().expect("failed to create temp dir");
        let sipp = fake_sipp(&temp, "#!/bin/sh\nexit 0\n");
        let stats_file = temp.path().join("stats.csv");

        let runner = SippRunner::new(
            config_for(sipp)
                .with_stats_file(&stats_file)
                .build()
                .unwrap(),
        );
        runner.run().expect("run failed");

        // The temp dir path is already absolute, so the message must name it verbatim.
        let expected = format!("Statistics logged at {}", stats_file.display());
        assert!(logged_lines().iter().any(|l| l == &expected));
    }

    #[test]
    #[serial]
    fn test_should_capture_output_verbatim_while_relaying_it() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let sipp = fake_sipp(
            &temp,
            "#!/bin/sh\nprintf 'line one\\nline two\\n' >&2\nexit 255\n",
        );

        let runner = SippRunner::new(
            config_for(sipp)
                .with_full_sipp_output(true)
                .build()
                .unwrap(),
        );
        let err = runner.run().expect_err("run should have failed");

        assert_eq!(err.to_string(), "line one\nline two\n");
    }

    #[test]
    #[serial]
    fn test_should_report_a_missing_binary_as_a_generic_failure() {
        let runner = SippRunner::new(
            RunConfiguration::builder()
                .with_destination("127.0.0.1:5060")
                .with_scenario_file("scenario.xml")
                .with_sipp_path("/non/existent/path/to/sipp")
                .with_no_progress(true)
                .build()
                .unwrap(),
        );

        // The shell starts fine and then reports the missing command with exit code 127.
        let err = runner.run().expect_err("run should have failed");
        match err.downcast::<SippError>() {
            Ok(SippError::Generic { code, .. }) => assert_eq!(code, 127),
            other => panic!("expected a generic error, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn test_should_propagate_a_spawn_failure_unchanged() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let sipp = fake_sipp(&temp, "#!/bin/sh\nexit 0\n");

        // Point PATH at an empty directory so the shell itself cannot be found.
        let empty = TempDir::new().expect("failed to create temp dir");
        let saved_path = std::env::var("PATH").ok();
        std::env::set_var("PATH", empty.path());

        let runner = SippRunner::new(config_for(sipp).build().unwrap());
        let result = runner.run();

        if let Some(saved_path) = saved_path {
            std::env::set_var("PATH", saved_path);
        }

        let err = result.expect_err("run should have failed");
        assert!(err.downcast_ref::<std::io::Error>().is_some());
        // The child was never started, so no PID may be recorded.
        assert_eq!(*runner.state.lock(), ProcessState::Idle);
    }

    #[test]
    #[serial]
    fn test_should_do_nothing_when_stopping_with_no_process() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let sipp = fake_sipp(&temp, "#!/bin/sh\nexit 0\n");

        let runner = SippRunner::new(config_for(sipp).build().unwrap());
        runner.stop().expect("stop should be a no-op");
        assert_eq!(*runner.state.lock(), ProcessState::Idle);
    }

    #[test]
    #[serial]
    fn test_should_error_when_stopping_a_process_that_no_longer_exists() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let sipp = fake_sipp(&temp, "#!/bin/sh\nexit 0\n");

        // A child that has already been reaped gives us a PID that is no longer in use.
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("exit 0")
            .spawn()
            .expect("failed to spawn child");
        let stale_pid = child.id();
        child.wait().expect("failed to wait for child");

        let runner = SippRunner::new(config_for(sipp).build().unwrap());
        *runner.state.lock() = ProcessState::Running(stale_pid);

        let err = runner.stop().expect_err("stop should have failed");
        assert_eq!(
            err.downcast_ref::<nix::errno::Errno>(),
            Some(&nix::errno::Errno::ESRCH)
        );
        // Stopping never rewrites the recorded state.
        assert_eq!(*runner.state.lock(), ProcessState::Running(stale_pid));
    }

    #[test]
    #[serial]
    fn test_should_kill_a_running_test() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let sipp = fake_sipp(&temp, "#!/bin/sh\nsleep 30\n");

        let runner = Arc::new(SippRunner::new(config_for(sipp).build().unwrap()));
        let handle = {
            let runner = runner.clone();
            std::thread::spawn(move || runner.run())
        };

        wait_until_running(&runner);
        runner.stop().expect("stop failed");

        let result = handle.join().expect("run thread panicked");
        let err = result.expect_err("run should have reported the kill");
        match err.downcast::<SippError>() {
            Ok(SippError::TerminatedBySignal { signal, .. }) => assert_eq!(signal, 9),
            other => panic!("expected a terminated-by-signal error, got {other:?}"),
        }
        assert_eq!(*runner.state.lock(), ProcessState::Terminated);
    }

    #[test]
    #[serial]
    fn test_should_reject_overlapping_runs() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let sipp = fake_sipp(&temp, "#!/bin/sh\nsleep 30\n");

        let runner = Arc::new(SippRunner::new(config_for(sipp).build().unwrap()));
        let handle = {
            let runner = runner.clone();
            std::thread::spawn(move || runner.run())
        };

        wait_until_running(&runner);

        let err = runner.run().expect_err("a second run should be rejected");
        assert!(err.to_string().contains("already running"));

        runner.stop().expect("stop failed");
        let _ = handle.join().expect("run thread panicked");
    }

    #[test]
    #[serial]
    fn test_should_allow_sequential_reuse() {
        let temp = TempDir::new().expect("failed to create temp dir");
        let sipp = fake_sipp(&temp, "#!/bin/sh\nexit 0\n");

        let runner = SippRunner::new(config_for(sipp).build().unwrap());
        assert!(runner.run().expect("first run failed").is_passed());
        assert!(runner.run().expect("second run failed").is_passed());
    }
}
