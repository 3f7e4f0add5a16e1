use std::sync::Arc;

use anyhow::Context;
use sip_surge_runner::prelude::*;

fn main() -> SurgeResult<()> {
    let cli = init();
    let config = RunConfiguration::try_from(cli)?;

    let runner = Arc::new(SippRunner::new(config));

    // A Ctrl-C while the test is in flight kills the SIPp process; the run call below then
    // reports the test as terminated by a signal.
    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    {
        let runner = runner.clone();
        runtime.spawn(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to receive Ctrl-C signal");
            println!("Received shutdown signal, stopping the test...");
            if let Err(e) = runner.stop() {
                // Losing the race with natural exit shows up here as "no such process".
                log::warn!("Failed to stop the SIPp process: {e}");
            }
        });
    }

    match runner.run() {
        Ok(TestOutcome::Passed) => Ok(()),
        Ok(TestOutcome::PartialFailure) => std::process::exit(1),
        Err(e) => {
            log::error!("Test failed: {e:#}");
            std::process::exit(2);
        }
    }
}
