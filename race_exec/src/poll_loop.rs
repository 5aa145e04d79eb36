//! # Polling loops
//!
//! A polling loop runs a task periodically in a background thread until it is stopped. The run
//! flag is checked once per cycle when the loop wakes up, so stopping never interrupts a task
//! part way through.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{Arc, atomic::{AtomicBool, Ordering}},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};
use log::{debug, warn};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Handle to a running polling loop. Dropping the handle stops the loop.
pub struct PollLoop {
    name: String,

    run: Arc<AtomicBool>,

    jh: Option<JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl PollLoop {
    /// Spawn a new loop running `task` every `period`.
    ///
    /// If a cycle takes longer than the period the next cycle starts immediately.
    pub fn spawn<F>(name: &str, period: Duration, mut task: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static
    {
        let run = Arc::new(AtomicBool::new(true));
        let run_clone = run.clone();
        let thread_name = name.to_string();

        let jh = thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                while run_clone.load(Ordering::Relaxed) {
                    let cycle_start = Instant::now();

                    task();

                    match period.checked_sub(cycle_start.elapsed()) {
                        Some(d) => thread::sleep(d),
                        None => warn!(
                            "{} cycle overran by {:.03} s",
                            thread_name,
                            (cycle_start.elapsed() - period).as_secs_f64()
                        ),
                    }
                }
            })?;

        debug!("{} loop started", name);

        Ok(Self {
            name: name.into(),
            run,
            jh: Some(jh),
        })
    }

    /// True until the loop has been asked to stop.
    pub fn is_running(&self) -> bool {
        self.run.load(Ordering::Relaxed)
    }

    /// Ask the loop to stop and wait for the current cycle to finish.
    ///
    /// A loop whose task panicked is reported and otherwise ignored.
    pub fn stop(&mut self) {
        self.run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.jh.take() {
            if jh.join().is_err() {
                warn!("{} loop panicked", self.name);
            } else {
                debug!("{} loop stopped", self.name);
            }
        }
    }
}

impl Drop for PollLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_loop_runs_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();

        let mut l = PollLoop::spawn("test", Duration::from_millis(1), move || {
            count_clone.fetch_add(1, Ordering::Relaxed);
        }).unwrap();

        thread::sleep(Duration::from_millis(50));
        assert!(l.is_running());
        l.stop();
        assert!(!l.is_running());

        let stopped_at = count.load(Ordering::Relaxed);
        assert!(stopped_at > 0);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::Relaxed), stopped_at);
    }

    #[test]
    fn test_stop_finishes_current_cycle() {
        let finished = Arc::new(AtomicBool::new(false));
        let finished_clone = finished.clone();

        let mut l = PollLoop::spawn("slow", Duration::from_millis(1), move || {
            thread::sleep(Duration::from_millis(30));
            finished_clone.store(true, Ordering::Relaxed);
        }).unwrap();

        thread::sleep(Duration::from_millis(5));
        l.stop();

        assert!(finished.load(Ordering::Relaxed));
    }
}
