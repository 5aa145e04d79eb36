//! Session management
//!
//! A session is one execution of a racer executable. It owns the directory that the log file,
//! the archives, the run log and any saved snapshots are written into, and the epoch all log
//! timestamps are measured from.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use erased_serde::Serialize;
use log::{info, warn};
use std::ffi::OsStr;
use std::fs;
use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which diplays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// How long the save thread waits for new data before checking if it should exit.
const SAVE_POLL_PERIOD: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

type SaveItem = (PathBuf, Box<dyn Serialize + Send>);

/// A struct storing information about the current session
#[derive(Clone)]
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The root directory for this session's archives
    pub arch_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,

    save_sender: Sender<SaveItem>,

    save_jh: Arc<Mutex<Option<JoinHandle<()>>>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (RACER_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}` inside
    /// `$RACER_SW_ROOT/{sessions_dir}`.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let root = crate::host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        Self::new_in(exec_name, root.join(sessions_dir))
    }

    /// Start a new session inside an explicit parent directory.
    pub fn new_in<P: AsRef<Path>>(exec_name: &str, parent: P) -> Result<Self, SessionError> {
        // The epoch is shared by every session created in this process
        SESSION_EPOCH.try_init_once(Utc::now).ok();
        if SESSION_EPOCH.get().is_none() {
            return Err(SessionError::CannotGetEpoch);
        }

        let timestamp = Utc::now().format(TIMESTAMP_FORMAT);

        // Create the session directory and the archive dir within it
        let path = parent.as_ref().join(format!("{}_{}", exec_name, timestamp));
        let arch_path = path.join("arch");
        fs::create_dir_all(&arch_path).map_err(SessionError::CannotCreateDir)?;

        let log_file_path = path.join(format!("{}.log", exec_name));

        // Spawn the background save thread
        let (tx, rx) = channel();
        let session_root = path.clone();
        let save_jh = thread::spawn(move || save_thread(session_root, rx));

        Ok(Session {
            session_root: path,
            arch_root: arch_path,
            log_file_path,
            save_sender: tx,
            save_jh: Arc::new(Mutex::new(Some(save_jh))),
        })
    }

    /// Exit the session, waiting for the save thread to finish any pending actions.
    ///
    /// Clones of the session hold the save channel open, so they must be dropped before calling
    /// this or the save thread will only be stopped once they are.
    pub fn exit(self) {
        info!("Stopping save thread");

        let jh = match self.save_jh.lock() {
            Ok(mut g) => g.take(),
            Err(_) => None,
        };

        // Dropping our sender disconnects the channel once all clones are gone
        drop(self.save_sender);

        if let Some(jh) = jh {
            if jh.join().is_err() {
                warn!("Save thread panicked");
            }
        }

        info!("Save thread exited");
    }

    /// Saves the given data to the given session-relative path in a background thread.
    ///
    /// Only `.json` paths are supported.
    pub fn save<P: AsRef<Path>, T: Serialize + Send + 'static>(&self, path: P, data: T) {
        if let Err(e) = self
            .save_sender
            .send((path.as_ref().to_path_buf(), Box::new(data)))
        {
            warn!(
                "Could not send data to be saved to path {:?}: {}",
                path.as_ref(),
                e
            )
        }
    }

    /// Saves the given data to the path, appending a timestamp before the path's extension.
    pub fn save_with_timestamp<P: AsRef<Path>, T: Serialize + Send + 'static>(
        &self,
        path: P,
        data: T,
    ) {
        self.save(timestamped_path(path.as_ref()), data);
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// # Panics
/// - This function will panic if the session epoch has not been
///   initialised, which is performed on creating a new Session instance.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => {
            let elapsed = Utc::now() - *e;
            time::duration_to_seconds(elapsed).unwrap_or(std::f64::NAN)
        }
        None => panic!("Cannot get the session epoch!"),
    }
}

/// Return a reference to the session's epoch.
///
/// # Panics
/// - This function will panic if the session epoch has not been
///   initialised, which is performed on creating a new Session instance.
pub fn get_epoch() -> &'static DateTime<Utc> {
    match SESSION_EPOCH.get() {
        Some(e) => e,
        None => panic!("Cannot get the session epoch!"),
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn timestamped_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or(OsStr::new(""));

    let mut file_name = stem.to_os_string();
    file_name.push("_");
    file_name.push(Utc::now().format(TIMESTAMP_FORMAT).to_string());

    if let Some(ext) = path.extension() {
        file_name.push(".");
        file_name.push(ext);
    }

    path.with_file_name(file_name)
}

fn save_thread(session_root: PathBuf, receiver: Receiver<SaveItem>) {
    loop {
        let (path, data) = match receiver.recv_timeout(SAVE_POLL_PERIOD) {
            Ok(item) => item,
            Err(RecvTimeoutError::Timeout) => continue,
            // All senders dropped, nothing left to save
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let full_path = session_root.join(path);
        match full_path.extension().and_then(|s| s.to_str()) {
            Some("json") => {
                if let Some(parent) = full_path.parent() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        warn!("Couldn't create parent directory for {:?}: {}", full_path, e);
                        continue;
                    }
                }

                let file = match OpenOptions::new()
                    .write(true)
                    .truncate(true)
                    .create(true)
                    .open(&full_path)
                {
                    Ok(f) => f,
                    Err(e) => {
                        warn!("Couldn't create file {:?}: {}", full_path, e);
                        continue;
                    }
                };

                if let Err(e) = serde_json::to_writer_pretty(&file, &data) {
                    warn!("Couldn't serialize data for file {:?}: {}", full_path, e);
                }
            }
            ext => warn!(
                "Unrecognised file path extension for {:?} (got {:?})",
                full_path, ext
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_timestamped_path() {
        let p = timestamped_path(Path::new("hyper_opt/best.json"));
        let name = p.file_name().unwrap().to_str().unwrap().to_string();

        assert_eq!(p.parent(), Some(Path::new("hyper_opt")));
        assert!(name.starts_with("best_"));
        assert!(name.ends_with(".json"));
    }
}
