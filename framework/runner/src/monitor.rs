use std::sync::mpsc::{Receiver, TryRecvError};

use sysinfo::{Pid, ProcessRefreshKind, System};

/// Monitor the resource usage of the SIPp process and report high usage.
///
/// Note that this won't stop the test proceeding, it will just warn the user that the load
/// generator itself is saturated, in which case the measured rates understate what the target can
/// handle.
///
/// The CPU usage for the process is collected every [sysinfo::MINIMUM_CPU_UPDATE_INTERVAL] and
/// checked. The thread ends when the `done` channel is closed or the process disappears.
pub(crate) fn start_monitor(child_pid: u32, done: Receiver<()>) {
    std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            let pid = Pid::from_u32(child_pid);
            let mut sys = System::new();

            loop {
                match done.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => break,
                    Err(TryRecvError::Empty) => {}
                }

                if !sys.refresh_process_specifics(pid, ProcessRefreshKind::new().with_cpu()) {
                    // The process has gone away, there is nothing left to watch.
                    break;
                }

                let Some(process) = sys.process(pid) else {
                    break;
                };

                let usage = process.cpu_usage();
                if usage > 90.0 {
                    log::warn!("SIPp is using {usage:.2}% of a CPU core. The load generator may be saturated and the measured call rates unreliable");
                }

                std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            }
        })
        .expect("Failed to start monitor thread");
}
