use std::cell::RefCell;
use std::rc::Rc;

use goldspin_shared::{Notice, NoticeLevel};
use tracing::{info, warn};

/// Where transient player messages go.
pub trait Notifier {
    fn notify(&mut self, notice: Notice);

    fn success(&mut self, message: &str) {
        self.notify(Notice::success(message));
    }

    fn error(&mut self, message: &str) {
        self.notify(Notice::error(message));
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!(target: "goldspin::notice", "{}", notice.message),
            NoticeLevel::Error => warn!(target: "goldspin::notice", "{}", notice.message),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&mut self, _notice: Notice) {}
}

/// Keeps every notice. Clones share one log, so a test can hold a handle
/// while the machine owns another.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    log: Rc<RefCell<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.log.borrow().clone()
    }

    /// Removes and returns everything recorded so far.
    pub fn drain(&self) -> Vec<Notice> {
        self.log.borrow_mut().drain(..).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, notice: Notice) {
        self.log.borrow_mut().push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_handles_share_log() {
        let handle = RecordingNotifier::new();
        let mut owned = handle.clone();
        owned.error("Insufficient balance!");
        owned.success("You won 5,000!");
        assert_eq!(
            handle.notices(),
            vec![
                Notice::error("Insufficient balance!"),
                Notice::success("You won 5,000!")
            ]
        );
        assert_eq!(handle.drain().len(), 2);
        assert!(owned.notices().is_empty());
    }
}
