use crossbeam_channel::Sender;
use winmigrate_engine::ProgressCallback;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressUpdate {
    Progress { bytes_copied: u64, total_bytes: u64 },
    RetryWait { seconds_remaining: u64 },
}

/// A ProgressCallback implementation that sends updates to the GUI via a channel.
pub struct GuiProgressCallback {
    sender: Sender<ProgressUpdate>,
}

impl GuiProgressCallback {
    pub fn new(sender: Sender<ProgressUpdate>) -> Self {
        GuiProgressCallback { sender }
    }
}

impl ProgressCallback for GuiProgressCallback {
    fn on_progress(&self, bytes_copied: u64, total_bytes: u64) {
        // The window may already be gone; nothing to report to.
        let _ = self.sender.send(ProgressUpdate::Progress {
            bytes_copied,
            total_bytes,
        });
    }

    fn on_retry_wait(&self, seconds_remaining: u64) {
        let _ = self
            .sender
            .send(ProgressUpdate::RetryWait { seconds_remaining });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_updates_arrive_in_order() {
        let (tx, rx) = unbounded();
        let callback = GuiProgressCallback::new(tx);

        callback.on_progress(10, 100);
        callback.on_retry_wait(2);
        callback.on_progress(100, 100);

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            received,
            vec![
                ProgressUpdate::Progress { bytes_copied: 10, total_bytes: 100 },
                ProgressUpdate::RetryWait { seconds_remaining: 2 },
                ProgressUpdate::Progress { bytes_copied: 100, total_bytes: 100 },
            ]
        );
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (tx, rx) = unbounded();
        drop(rx);
        let callback = GuiProgressCallback::new(tx);
        callback.on_progress(1, 2);
    }
}
