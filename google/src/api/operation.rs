//! Polling for long-running operations
//!
//! Resource Manager, Service Usage and Compute each return their own
//! operation shape. All of them implement [`LongRunning`] so one
//! [`OperationWaiter`] can drive any of them to completion.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use super::common::Operation;
use super::error::ApiError;

/// Where an operation currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum OperationState {
    Running,
    Done,
    Failed { code: i32, message: String },
}

pub trait LongRunning {
    fn name(&self) -> &str;
    fn state(&self) -> OperationState;
}

impl LongRunning for Operation {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> OperationState {
        match (&self.error, self.done) {
            (Some(status), _) => OperationState::Failed {
                code: status.code,
                message: status.message.clone(),
            },
            (None, true) => OperationState::Done,
            (None, false) => OperationState::Running,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperationWaiter {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for OperationWaiter {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            timeout: Duration::from_secs(4 * 60),
        }
    }
}

impl OperationWaiter {
    /// Polls `refresh` until the operation is done or failed, or the timeout
    /// elapses. `activity` names the wait in error messages.
    pub async fn wait<O, F, Fut>(
        &self,
        initial: O,
        activity: &str,
        refresh: F,
    ) -> Result<O, ApiError>
    where
        O: LongRunning,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<O, ApiError>>,
    {
        let deadline = Instant::now() + self.timeout;
        let mut op = initial;

        loop {
            match op.state() {
                OperationState::Done => {
                    tracing::debug!("operation {} for {} is done", op.name(), activity);
                    return Ok(op);
                }
                OperationState::Failed { code, message } => {
                    return Err(ApiError::OperationFailed {
                        activity: activity.to_string(),
                        name: op.name().to_string(),
                        code,
                        message,
                    });
                }
                OperationState::Running => {}
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(ApiError::OperationTimeout {
                    activity: activity.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }

            tokio::time::sleep(self.poll_interval).await;
            tracing::debug!("polling operation {} for {}", op.name(), activity);
            op = refresh(op.name().to_string()).await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::common::Status;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn running(name: &str) -> Operation {
        Operation {
            name: name.to_string(),
            done: false,
            error: None,
        }
    }

    fn fast_waiter() -> OperationWaiter {
        OperationWaiter {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn returns_immediately_when_already_done() {
        let op = Operation {
            done: true,
            ..running("operations/1")
        };
        let result = fast_waiter()
            .wait(op, "project to create", |_| async {
                // a poll would fail the wait
                Err::<Operation, _>(ApiError::ServiceUnavailable)
            })
            .await
            .unwrap();
        assert!(result.done);
    }

    #[tokio::test]
    async fn polls_until_done() {
        let polls = AtomicUsize::new(0);
        let result = fast_waiter()
            .wait(running("operations/2"), "project to create", |name| {
                let n = polls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    Ok(Operation {
                        name,
                        done: n >= 3,
                        error: None,
                    })
                }
            })
            .await
            .unwrap();

        assert!(result.done);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn surfaces_operation_error() {
        let err = fast_waiter()
            .wait(running("operations/3"), "project to create", |name| async move {
                Ok(Operation {
                    name,
                    done: true,
                    error: Some(Status {
                        code: 6,
                        message: "already exists".to_string(),
                    }),
                })
            })
            .await
            .unwrap_err();

        match err {
            ApiError::OperationFailed { code, message, .. } => {
                assert_eq!(code, 6);
                assert_eq!(message, "already exists");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn times_out() {
        let waiter = OperationWaiter {
            poll_interval: Duration::from_millis(5),
            timeout: Duration::from_millis(20),
        };
        let err = waiter
            .wait(running("operations/4"), "firewall to delete", |name| async move {
                Ok(running(&name))
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::OperationTimeout { .. }));
    }

    #[tokio::test]
    async fn refresh_errors_propagate() {
        let err = fast_waiter()
            .wait(running("operations/5"), "project to create", |_| async {
                Err::<Operation, _>(ApiError::ServiceUnavailable)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable));
    }
}
