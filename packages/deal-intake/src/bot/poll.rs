//! Long-polling loop feeding chat updates to the bot.
//!
//! ```text
//! UpdatePoller
//!     │
//!     ├─► fetch updates after the last seen id
//!     ├─► DealBot::handle, one event at a time
//!     └─► advance the offset past every fetched update
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use telegram_client::Update;
use tracing::{debug, error, info};

use super::event::InboundEvent;
use super::handler::DealBot;
use super::transport::TelegramTransport;
use crate::error::TransportError;

/// Where updates come from.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Updates with an id of at least `offset`, waiting for some to arrive.
    async fn fetch(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError>;
}

#[async_trait]
impl UpdateSource for TelegramTransport {
    async fn fetch(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError> {
        self.service()
            .get_updates(offset)
            .await
            .map_err(|err| TransportError(err.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Pause after a failed fetch.
    pub error_backoff: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            error_backoff: Duration::from_secs(1),
        }
    }
}

pub struct UpdatePoller {
    source: Arc<dyn UpdateSource>,
    bot: DealBot,
    config: PollerConfig,
    offset: Option<i64>,
    shutdown: Arc<AtomicBool>,
}

impl UpdatePoller {
    pub fn new(source: Arc<dyn UpdateSource>, bot: DealBot) -> Self {
        Self {
            source,
            bot,
            config: PollerConfig::default(),
            offset: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    /// Call `store(true, Ordering::SeqCst)` on the returned flag to stop
    /// after the current batch.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn offset(&self) -> Option<i64> {
        self.offset
    }

    pub fn bot(&self) -> &DealBot {
        &self.bot
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Fetch and handle one batch of updates, returning how many arrived.
    pub async fn poll_once(&mut self) -> Result<usize, TransportError> {
        let updates = self.source.fetch(self.offset).await?;
        let count = updates.len();

        for update in updates {
            self.offset = Some(self.offset.map_or(update.update_id + 1, |offset| {
                offset.max(update.update_id + 1)
            }));

            match InboundEvent::from_update(update) {
                Some(event) => self.bot.handle(event, Utc::now()).await,
                None => debug!("Skipping update without text or button"),
            }
        }
        Ok(count)
    }

    /// Poll until shutdown is requested.
    pub async fn run(mut self) -> Result<()> {
        info!("Deal bot polling for updates");

        while !self.is_shutdown_requested() {
            if let Err(err) = self.poll_once().await {
                error!(error = %err, "Failed to fetch updates");
                tokio::time::sleep(self.config.error_backoff).await;
            }
        }

        info!("Deal bot stopped");
        Ok(())
    }

    /// Run until Ctrl+C.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let shutdown = self.shutdown_handle();

        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
            shutdown.store(true, Ordering::SeqCst);
        });

        self.run().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::SellingMarkup;
    use crate::testing::{MockDealStore, RecordingTransport};
    use std::sync::Mutex;

    struct ScriptedSource {
        batches: Mutex<Vec<Result<Vec<Update>, TransportError>>>,
        offsets: Mutex<Vec<Option<i64>>>,
    }

    #[async_trait]
    impl UpdateSource for ScriptedSource {
        async fn fetch(&self, offset: Option<i64>) -> Result<Vec<Update>, TransportError> {
            self.offsets.lock().unwrap().push(offset);
            self.batches.lock().unwrap().remove(0)
        }
    }

    fn update(raw: serde_json::Value) -> Update {
        serde_json::from_value(raw).unwrap()
    }

    #[tokio::test]
    async fn test_offset_advances_past_every_update() {
        let now = Utc::now().timestamp();
        let source = Arc::new(ScriptedSource {
            batches: Mutex::new(vec![
                Ok(vec![
                    update(serde_json::json!({"update_id": 10})),
                    update(serde_json::json!({
                        "update_id": 11,
                        "message": {"message_id": 1, "date": now, "chat": {"id": 3}, "text": "/start"}
                    })),
                ]),
                Err(TransportError("timeout".into())),
            ]),
            offsets: Mutex::new(Vec::new()),
        });
        let transport = RecordingTransport::new();
        let bot = DealBot::new(
            Arc::new(transport.clone()),
            Arc::new(MockDealStore::new()),
            SellingMarkup::default(),
            Duration::from_secs(60),
        );
        let mut poller = UpdatePoller::new(source.clone(), bot);

        assert_eq!(poller.poll_once().await, Ok(2));
        assert_eq!(poller.offset(), Some(12));
        assert!(poller.poll_once().await.is_err());
        assert_eq!(poller.offset(), Some(12));

        assert_eq!(*source.offsets.lock().unwrap(), vec![None, Some(12)]);
        assert_eq!(transport.sent().len(), 1);
    }
}
