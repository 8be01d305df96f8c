//! Capability interfaces the binder consumes.
//!
//! A binding never talks to a node directly: reads go through a
//! [`ContractCaller`], writes through a [`ContractTransactor`] and log
//! access through a [`ContractFilterer`]. Each is optional, so a read-only
//! binding only needs a caller.

use alloy::eips::BlockId;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::{BackendError, Error};

/// Executes read-only calls against contract state.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// Returns the code deployed at `contract`, empty if there is none.
    async fn code_at(&self, contract: Address, block: BlockId) -> Result<Bytes, BackendError>;

    /// Runs `call` without creating a transaction and returns the raw output.
    async fn call_contract(
        &self,
        call: TransactionRequest,
        block: BlockId,
    ) -> Result<Bytes, BackendError>;
}

/// Signs and broadcasts transactions. It never waits for inclusion.
#[async_trait]
pub trait ContractTransactor: Send + Sync {
    async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<SubmittedTransaction, BackendError>;
}

/// Historical log queries and live log subscriptions.
#[async_trait]
pub trait ContractFilterer: Send + Sync {
    async fn filter_logs(&self, filter: Filter) -> Result<Vec<Log>, BackendError>;

    async fn subscribe_filter_logs(&self, filter: Filter) -> Result<LogSubscription, BackendError>;
}

/// A client providing all three capabilities.
pub trait ContractBackend: ContractCaller + ContractTransactor + ContractFilterer {}

impl<T> ContractBackend for T where T: ContractCaller + ContractTransactor + ContractFilterer {}

/// A transaction accepted by the transactor.
#[derive(Debug, Clone)]
pub struct SubmittedTransaction {
    pub hash: TxHash,
    pub from: Address,
    pub nonce: u64,
    pub request: TransactionRequest,
}

impl SubmittedTransaction {
    /// Address a contract-creation transaction deploys to.
    pub fn created_address(&self) -> Address {
        self.from.create(self.nonce)
    }
}

type Unsubscribe = Box<dyn FnOnce() + Send + Sync>;

/// Handle to a running producer of events.
///
/// `err()` resolves once with the producer's terminal error, or `None`
/// when it completed cleanly; afterwards it keeps returning `None`.
/// `unsubscribe()` tells the producer to stop and may be called any number
/// of times. Dropping the handle unsubscribes.
pub struct Subscription {
    err: mpsc::Receiver<Error>,
    unsubscribe: Option<Unsubscribe>,
}

/// Producer side of a [`Subscription`]. Dropping it without calling
/// [`SubscriptionErrorSink::fail`] signals clean completion.
#[derive(Debug)]
pub struct SubscriptionErrorSink {
    err: mpsc::Sender<Error>,
}

impl SubscriptionErrorSink {
    pub fn fail(self, err: Error) {
        let _ = self.err.try_send(err);
    }

    /// Resolves when the consumer side has been dropped.
    pub async fn closed(&self) {
        self.err.closed().await
    }
}

impl Subscription {
    pub fn new<F>(on_unsubscribe: F) -> (Self, SubscriptionErrorSink)
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::channel(1);
        (
            Self {
                err: rx,
                unsubscribe: Some(Box::new(on_unsubscribe)),
            },
            SubscriptionErrorSink { err: tx },
        )
    }

    /// A subscription whose producer has already finished.
    pub fn completed() -> Self {
        let (sub, sink) = Self::new(|| {});
        drop(sink);
        sub
    }

    /// Waits for the producer to terminate.
    pub async fn err(&mut self) -> Option<Error> {
        self.err.recv().await
    }

    /// Returns a pending terminal error without waiting.
    pub fn try_err(&mut self) -> Option<Error> {
        self.err.try_recv().ok()
    }

    pub fn unsubscribe(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    pub fn is_unsubscribed(&self) -> bool {
        self.unsubscribe.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("unsubscribed", &self.is_unsubscribed())
            .finish()
    }
}

/// Raw logs from a filterer paired with the subscription producing them.
#[derive(Debug)]
pub struct LogSubscription {
    pub logs: mpsc::Receiver<Log>,
    pub sub: Subscription,
}

impl LogSubscription {
    /// Wraps an already-fetched batch of logs in a completed subscription.
    pub fn from_logs(logs: Vec<Log>) -> Self {
        let (tx, rx) = mpsc::channel(logs.len().max(1));
        for log in logs {
            // capacity covers the whole batch
            let _ = tx.try_send(log);
        }
        Self {
            logs: rx,
            sub: Subscription::completed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unsubscribe_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let (mut sub, _sink) = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sub.unsubscribe();
        sub.unsubscribe();
        drop(sub);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_err_reports_failure_then_none() {
        let (mut sub, sink) = Subscription::new(|| {});
        sink.fail(Error::Subscription(BackendError::other("connection reset")));

        assert!(matches!(sub.err().await, Some(Error::Subscription(_))));
        assert!(sub.err().await.is_none());
    }

    #[tokio::test]
    async fn test_completed_subscription_has_no_error() {
        let mut sub = Subscription::completed();
        assert!(sub.err().await.is_none());
    }

    #[tokio::test]
    async fn test_from_logs_delivers_batch_then_closes() {
        let mut logs = LogSubscription::from_logs(vec![Log::default(), Log::default()]);
        assert!(logs.logs.recv().await.is_some());
        assert!(logs.logs.recv().await.is_some());
        assert!(logs.logs.recv().await.is_none());
    }
}
