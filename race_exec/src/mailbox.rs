//! # Single slot mailbox
//!
//! A mailbox carries values from one producer thread to one consumer thread where only the most
//! recent value matters. The producer never blocks, and the consumer always sees a whole value,
//! never a partially written one. Older values that were never read are discarded.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::mpsc::{channel, Receiver, Sender};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Producer half of a mailbox.
pub struct MailboxSender<T> {
    tx: Sender<T>,
}

/// Consumer half of a mailbox.
pub struct MailboxReceiver<T> {
    rx: Receiver<T>,

    latest: Option<T>,

    /// Set once the sender has been dropped
    closed: bool,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Create a new, empty mailbox.
pub fn mailbox<T>() -> (MailboxSender<T>, MailboxReceiver<T>) {
    let (tx, rx) = channel();

    (
        MailboxSender { tx },
        MailboxReceiver {
            rx,
            latest: None,
            closed: false,
        },
    )
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T> MailboxSender<T> {
    /// Publish a new value, replacing whatever the consumer hasn't read yet.
    ///
    /// Returns `false` if the receiver has been dropped.
    pub fn publish(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

impl<T> MailboxReceiver<T> {
    /// Get the most recently published value.
    ///
    /// The value stays available until a newer one is published. Returns `None` if nothing has
    /// been published yet.
    pub fn latest(&mut self) -> Option<&T> {
        self.drain();
        self.latest.as_ref()
    }

    /// Take the most recently published value, leaving the mailbox empty.
    pub fn take(&mut self) -> Option<T> {
        self.drain();
        self.latest.take()
    }

    /// True once the sender has been dropped. Values published before that can still be read.
    pub fn is_closed(&mut self) -> bool {
        self.drain();
        self.closed
    }

    fn drain(&mut self) {
        use std::sync::mpsc::TryRecvError;

        loop {
            match self.rx.try_recv() {
                Ok(v) => self.latest = Some(v),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
    }
}
