use std::cmp::min;
use std::fmt::Write;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressState, ProgressStyle};

/// Displays a progress bar while the test is running to show the user how long is left.
///
/// The runtime is only an estimate derived from the requested call count and rate, so the bar
/// parks at the end rather than finishing if SIPp takes longer. It is cleared as soon as the
/// `done` channel is closed.
pub(crate) fn start_progress(estimated_runtime: Duration, done: Receiver<()>) {
    std::thread::Builder::new()
        .name("progress".to_string())
        .spawn(move || {
            let start_time = Instant::now();
            let total = estimated_runtime.as_secs();

            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} [{wide_bar:.cyan/blue}] [{elapsed_precise} / {estimated_runtime}]",
                )
                .expect("Failed to set progress style")
                .with_key("estimated_runtime", move |_state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
                        .expect("Could not write estimated_runtime")
                })
                .progress_chars("#>-"),
            );

            loop {
                match done.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => {
                        pb.finish_and_clear();
                        break;
                    }
                    Err(TryRecvError::Empty) => {}
                }

                pb.set_position(min(start_time.elapsed().as_secs(), total));
                std::thread::sleep(Duration::from_millis(250));
            }
        })
        .expect("Failed to start progress thread");
}
