use super::events::{UpdateEvent, UpdateListener};
use super::executor::UpdateExecutor;
use crate::error::UpdateError;
use crate::models::{UpdateReport, UpdateResult};
use crate::profile::Profile;
use std::sync::Arc;
use tokio::sync::watch;

/// Cancellation token wrapper.
///
/// Only checked between batch items; a running update always finishes.
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// A token paired with the sender that cancels it.
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self::new(rx))
    }

    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self::channel().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Runs the executor over a selection of reports, one at a time.
pub struct BatchCoordinator {
    executor: Arc<UpdateExecutor>,
    listener: Arc<dyn UpdateListener>,
}

impl BatchCoordinator {
    pub fn new(executor: Arc<UpdateExecutor>, listener: Arc<dyn UpdateListener>) -> Self {
        Self { executor, listener }
    }

    /// Update every report in order and return one result per report.
    ///
    /// A failed item never stops the batch. After cancellation the remaining
    /// items are reported as cancelled instead of being dropped.
    pub async fn update_many(
        &self,
        reports: &[UpdateReport],
        profile: &Profile,
        cancel: &CancelToken,
    ) -> Vec<UpdateResult> {
        let total = reports.len();
        let mut results = Vec::with_capacity(total);
        log::info!(
            "[BatchCoordinator] Updating {} mods in profile {}",
            total,
            profile.id
        );

        for (index, report) in reports.iter().enumerate() {
            let name = report.name().to_string();

            if cancel.is_cancelled() {
                log::info!("[BatchCoordinator] Cancelled before {}", name);
                results.push(UpdateResult::Failed {
                    name,
                    error: UpdateError::Cancelled,
                });
                continue;
            }

            self.listener.on_event(UpdateEvent::BatchUpdateProgress {
                current: index + 1,
                total,
                name: name.clone(),
            });

            let result = match self.executor.update(report, profile).await {
                Ok(updated) => UpdateResult::Updated(updated),
                Err(error) => UpdateResult::Failed { name, error },
            };
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        log::info!(
            "[BatchCoordinator] Batch finished: {} succeeded, {} failed",
            succeeded,
            total - succeeded
        );
        self.listener.on_event(UpdateEvent::BatchUpdateCompleted {
            results: results.clone(),
        });

        results
    }
}
