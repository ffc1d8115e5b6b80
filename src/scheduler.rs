use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::helpers::epoch_now;
use crate::transport::{TextOptions, Transport};

struct ReminderTask {
    chat: String,
    text: String,
    due_at: i64,
    handle: JoinHandle<()>,
}

/// In-memory reminder scheduler. Each reminder is a tracked tokio task;
/// `shutdown` aborts everything so no timer outlives the process teardown.
pub(crate) struct ReminderScheduler {
    next_id: AtomicU64,
    tasks: DashMap<u64, ReminderTask>,
}

impl ReminderScheduler {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(ReminderScheduler {
            next_id: AtomicU64::new(0),
            tasks: DashMap::new(),
        })
    }

    pub(crate) fn schedule(
        self: &Arc<Self>,
        transport: Arc<dyn Transport>,
        chat: &str,
        text: &str,
        delay: Duration,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let due_at = epoch_now() + delay.as_secs() as i64;
        let handle = tokio::spawn({
            let scheduler = Arc::clone(self);
            let chat = chat.to_string();
            let text = text.to_string();
            async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = transport
                    .send_text(&chat, &format!("*REMINDER:* {text}"), TextOptions::default())
                    .await
                {
                    error!(chat = %chat, "Failed to deliver reminder #{id}: {e}");
                }
                scheduler.tasks.remove(&id);
            }
        });
        self.tasks.insert(
            id,
            ReminderTask {
                chat: chat.to_string(),
                text: text.to_string(),
                due_at,
                handle,
            },
        );
        id
    }

    /// Cancel a reminder; only the chat that created it may cancel it.
    pub(crate) fn cancel(&self, id: u64, chat: &str) -> bool {
        match self.tasks.remove_if(&id, |_, task| task.chat == chat) {
            Some((_, task)) => {
                task.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Pending reminders for one chat as (id, text, due_at), soonest first.
    pub(crate) fn pending_for(&self, chat: &str) -> Vec<(u64, String, i64)> {
        let mut out: Vec<_> = self
            .tasks
            .iter()
            .filter(|entry| entry.value().chat == chat)
            .map(|entry| (*entry.key(), entry.value().text.clone(), entry.value().due_at))
            .collect();
        out.sort_by_key(|&(id, _, due_at)| (due_at, id));
        out
    }

    pub(crate) fn shutdown(&self) {
        let count = self.tasks.len();
        for entry in self.tasks.iter() {
            entry.value().handle.abort();
        }
        self.tasks.clear();
        if count > 0 {
            info!("Cancelled {count} pending reminders");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use std::sync::Mutex;

    fn recording_transport() -> (Arc<dyn Transport>, Arc<Mutex<Vec<String>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut mock = MockTransport::new();
        let log = Arc::clone(&sent);
        mock.expect_send_text().returning(move |_, text, _| {
            log.lock().expect("lock").push(text.to_string());
            Ok(())
        });
        (Arc::new(mock), sent)
    }

    #[tokio::test]
    async fn test_reminder_fires_and_cleans_up() {
        let (transport, sent) = recording_transport();
        let scheduler = ReminderScheduler::new();
        scheduler.schedule(transport, "chat", "check the oven", Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        let sent = sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], "*REMINDER:* check the oven");
        assert!(scheduler.pending_for("chat").is_empty());
    }

    #[tokio::test]
    async fn test_cancel_prevents_delivery() {
        let (transport, sent) = recording_transport();
        let scheduler = ReminderScheduler::new();
        let id = scheduler.schedule(transport, "chat", "later", Duration::from_secs(60));
        assert!(scheduler.cancel(id, "chat"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sent.lock().expect("lock").is_empty());
        assert!(scheduler.pending_for("chat").is_empty());
    }

    #[tokio::test]
    async fn test_cancel_requires_owning_chat() {
        let (transport, _sent) = recording_transport();
        let scheduler = ReminderScheduler::new();
        let id = scheduler.schedule(transport, "chat-a", "mine", Duration::from_secs(60));
        assert!(!scheduler.cancel(id, "chat-b"));
        assert_eq!(scheduler.pending_for("chat-a").len(), 1);
        assert!(scheduler.cancel(id, "chat-a"));
    }

    #[tokio::test]
    async fn test_pending_lists_only_own_chat() {
        let (transport, _sent) = recording_transport();
        let scheduler = ReminderScheduler::new();
        scheduler.schedule(Arc::clone(&transport), "a", "one", Duration::from_secs(60));
        scheduler.schedule(Arc::clone(&transport), "b", "two", Duration::from_secs(60));
        scheduler.schedule(transport, "a", "three", Duration::from_secs(120));
        let pending = scheduler.pending_for("a");
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].1, "one");
        assert_eq!(pending[1].1, "three");
    }

    #[tokio::test]
    async fn test_shutdown_aborts_everything() {
        let (transport, sent) = recording_transport();
        let scheduler = ReminderScheduler::new();
        scheduler.schedule(Arc::clone(&transport), "a", "one", Duration::from_millis(20));
        scheduler.schedule(transport, "b", "two", Duration::from_millis(20));
        scheduler.shutdown();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(sent.lock().expect("lock").is_empty());
        assert!(scheduler.pending_for("a").is_empty());
        assert!(scheduler.pending_for("b").is_empty());
    }
}
