use std::sync::Arc;

use tokio::sync::Notify;

/// Wraps a `ctrlc` handler in an async-friendly signal so `main` can just
/// `.wait()` on it. SIGINT and SIGTERM both trigger the same graceful
/// shutdown path.
pub struct ShutdownSignal {
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

pub fn install() -> ShutdownSignal {
    let notify = Arc::new(Notify::new());
    let handler_notify = Arc::clone(&notify);
    if let Err(e) = ctrlc::set_handler(move || {
        handler_notify.notify_one();
    }) {
        log::warn!("failed to install signal handler: {e}");
    }
    ShutdownSignal { notify }
}
