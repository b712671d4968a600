use notify_rust::Notification;

const NOTIFICATION_TITLE: &str = "Screen Time Monitor";

/// Fire-and-forget user notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Desktop notifications through the OS notification service
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, message: &str) {
        let message = message.to_owned();
        spawn_delivery(move || {
            if let Err(e) = Notification::new()
                .summary(NOTIFICATION_TITLE)
                .body(&message)
                .show()
            {
                log::warn!("Failed to show notification: {e}");
            }
        });
    }
}

/// Run a blocking delivery off the async workers. `show()` waits for the
/// notification server's reply, which must not hold up the tick loop.
fn spawn_delivery<F>(deliver: F)
where
    F: FnOnce() + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn_blocking(deliver);
        }
        Err(_) => deliver(),
    }
}

/// Writes notifications to the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str) {
        log::info!("[notify] {message}");
    }
}

/// Format seconds as `HH:MM:SS`
#[must_use]
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
