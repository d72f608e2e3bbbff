//! Confirmation polling
//!
//! The waiter moves from `Waiting` to `Found` or `TimedOut`. "Not found yet"
//! is the expected answer while waiting and is retried after a fixed
//! interval; a node error ends the wait at once. A `CancellationToken` stops
//! the wait during a sleep or an in-flight search.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::error::WalletError;
use crate::config::ConfirmationConfig;
use crate::core::{MessageRef, MsgLookup};
use crate::rpc::NodeApi;

/// State of a confirmation wait
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaitState {
    Waiting { attempts: u32 },
    Found(MsgLookup),
    TimedOut { attempts: u32 },
}

pub struct ConfirmationWaiter<'a, N: NodeApi + ?Sized> {
    node: &'a N,
    interval: Duration,
    max_attempts: u32,
}

impl<'a, N: NodeApi + ?Sized> ConfirmationWaiter<'a, N> {
    pub fn new(node: &'a N, config: &ConfirmationConfig) -> Self {
        Self::with_schedule(node, config.interval(), config.max_attempts)
    }

    pub fn with_schedule(node: &'a N, interval: Duration, max_attempts: u32) -> Self {
        Self {
            node,
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Issue one search and advance the state machine
    pub async fn poll(
        &self,
        message: &MessageRef,
        state: WaitState,
    ) -> Result<WaitState, WalletError> {
        let attempts = match state {
            WaitState::Waiting { attempts } => attempts + 1,
            terminal => return Ok(terminal),
        };

        let found = self
            .node
            .search_message(message)
            .await
            .map_err(WalletError::QueryFailed)?;

        Ok(match found {
            Some(lookup) => WaitState::Found(lookup),
            None if attempts >= self.max_attempts => WaitState::TimedOut { attempts },
            None => {
                log::debug!(
                    "Message {} not found yet ({}/{})",
                    message,
                    attempts,
                    self.max_attempts
                );
                WaitState::Waiting { attempts }
            }
        })
    }

    /// Wait until `message` is on chain, the attempt cap is reached or `cancel` fires
    pub async fn wait(
        &self,
        message: &MessageRef,
        cancel: &CancellationToken,
    ) -> Result<MsgLookup, WalletError> {
        let mut state = WaitState::Waiting { attempts: 0 };
        loop {
            match state {
                WaitState::Waiting { .. } => {
                    let step = async move {
                        tokio::time::sleep(self.interval).await;
                        self.poll(message, state).await
                    };
                    state = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            log::warn!("Stopped waiting for message {}", message);
                            return Err(WalletError::Cancelled { message: *message });
                        }
                        next = step => next?,
                    };
                }
                WaitState::Found(lookup) => return check_receipt(lookup),
                WaitState::TimedOut { attempts } => {
                    return Err(WalletError::ConfirmationTimeout {
                        message: *message,
                        attempts,
                    })
                }
            }
        }
    }
}

/// Turn a nonzero exit code into `ActorExecutionFailed`
pub fn check_receipt(lookup: MsgLookup) -> Result<MsgLookup, WalletError> {
    if lookup.receipt.is_success() {
        log::info!("Message {} included at height {}", lookup.message, lookup.height);
        Ok(lookup)
    } else {
        Err(WalletError::ActorExecutionFailed {
            message: lookup.message,
            code: lookup.receipt.exit_code,
        })
    }
}
