//! In-process chain double implementing every binder capability.

use alloy::eips::BlockId;
use alloy::primitives::{keccak256, Address, Bytes, LogData, Selector, B256};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use super::backend::{
    ContractCaller, ContractFilterer, ContractTransactor, LogSubscription, SubmittedTransaction,
    Subscription, SubscriptionErrorSink,
};
use super::error::{BackendError, Error};

const FEED_CAPACITY: usize = 16;

/// Scripted backend for exercising bindings without a node.
///
/// Calls are answered from responses registered per function selector,
/// unknown selectors return empty output. Transactions are accepted with
/// sequential per-sender nonces and recorded. Historical queries return the
/// stored logs emitted by the filter's address; live subscriptions receive
/// whatever is passed to [`MockBackend::emit`].
#[derive(Debug)]
pub struct MockBackend {
    sender: Address,
    state: Mutex<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    code: HashMap<Address, Bytes>,
    responses: HashMap<Selector, Result<Bytes, Bytes>>,
    calls: Vec<(TransactionRequest, BlockId)>,
    nonces: HashMap<Address, u64>,
    transactions: Vec<SubmittedTransaction>,
    reject_transactions: Option<String>,
    logs: Vec<Log>,
    filters: Vec<Filter>,
    feeds: Vec<LiveFeed>,
}

#[derive(Debug)]
struct LiveFeed {
    filter: Filter,
    logs: Option<mpsc::Sender<Log>>,
    errors: Option<SubscriptionErrorSink>,
    unsubscribed: Arc<AtomicBool>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(Address::repeat_byte(0x11))
    }
}

impl MockBackend {
    /// Creates a backend that signs with `sender` when a transaction does
    /// not name one.
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn sender(&self) -> Address {
        self.sender
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_code(&self, address: Address, code: impl Into<Bytes>) {
        self.state().code.insert(address, code.into());
    }

    /// Answers calls whose calldata starts with `selector` with `output`.
    pub fn respond(&self, selector: Selector, output: impl Into<Bytes>) {
        self.state().responses.insert(selector, Ok(output.into()));
    }

    /// Makes calls to `selector` revert with `data`.
    pub fn revert(&self, selector: Selector, data: impl Into<Bytes>) {
        self.state().responses.insert(selector, Err(data.into()));
    }

    /// Rejects every following transaction with `reason`.
    pub fn reject_transactions(&self, reason: impl Into<String>) {
        self.state().reject_transactions = Some(reason.into());
    }

    /// Every call made so far, with the block it was executed at.
    pub fn calls(&self) -> Vec<(TransactionRequest, BlockId)> {
        self.state().calls.clone()
    }

    pub fn transactions(&self) -> Vec<SubmittedTransaction> {
        self.state().transactions.clone()
    }

    /// Stores a log returned by later historical queries.
    pub fn push_log(&self, log: Log) {
        self.state().logs.push(log);
    }

    /// Filters received by historical queries and subscriptions, in order.
    pub fn filters(&self) -> Vec<Filter> {
        self.state().filters.clone()
    }

    /// Number of live subscriptions nobody has unsubscribed from yet.
    pub fn active_feeds(&self) -> usize {
        self.state()
            .feeds
            .iter()
            .filter(|feed| !feed.unsubscribed.load(Ordering::SeqCst))
            .count()
    }

    /// Whether the `index`-th live subscription was released.
    pub fn feed_unsubscribed(&self, index: usize) -> bool {
        self.state()
            .feeds
            .get(index)
            .map(|feed| feed.unsubscribed.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Delivers `log` to every open live subscription watching its address.
    /// Returns how many subscriptions received it.
    pub async fn emit(&self, log: Log) -> usize {
        let senders: Vec<mpsc::Sender<Log>> = self
            .state()
            .feeds
            .iter()
            .filter(|feed| !feed.unsubscribed.load(Ordering::SeqCst))
            .filter(|feed| feed.filter.address.matches(&log.address()))
            .filter_map(|feed| feed.logs.clone())
            .collect();

        let mut delivered = 0;
        for sender in senders {
            if sender.send(log.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Terminates every open live subscription with `reason`.
    pub fn fail_feeds(&self, reason: &str) {
        let mut state = self.state();
        for feed in state.feeds.iter_mut() {
            if let Some(errors) = feed.errors.take() {
                errors.fail(Error::Subscription(BackendError::other(reason)));
            }
        }
    }

    /// Completes every live subscription without an error.
    pub fn close_feeds(&self) {
        let mut state = self.state();
        for feed in state.feeds.iter_mut() {
            feed.logs = None;
            feed.errors = None;
        }
    }
}

/// Builds a mined-looking log emitted by `address`.
pub fn log(address: Address, topics: Vec<B256>, data: Bytes) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address,
            data: LogData::new_unchecked(topics, data),
        },
        ..Default::default()
    }
}

#[async_trait]
impl ContractCaller for MockBackend {
    async fn code_at(&self, contract: Address, _block: BlockId) -> Result<Bytes, BackendError> {
        Ok(self.state().code.get(&contract).cloned().unwrap_or_default())
    }

    async fn call_contract(
        &self,
        call: TransactionRequest,
        block: BlockId,
    ) -> Result<Bytes, BackendError> {
        let selector = call
            .input
            .input()
            .filter(|input| input.len() >= 4)
            .map(|input| Selector::from_slice(&input[..4]));

        let mut state = self.state();
        state.calls.push((call, block));
        match selector.and_then(|selector| state.responses.get(&selector)) {
            Some(Ok(output)) => Ok(output.clone()),
            Some(Err(data)) => Err(BackendError::Reverted(data.clone())),
            None => Ok(Bytes::new()),
        }
    }
}

#[async_trait]
impl ContractTransactor for MockBackend {
    async fn send_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<SubmittedTransaction, BackendError> {
        let mut state = self.state();
        if let Some(reason) = &state.reject_transactions {
            return Err(BackendError::other(reason.clone()));
        }

        let from = tx.from.unwrap_or(self.sender);
        let next = state.nonces.entry(from).or_default();
        let nonce = tx.nonce.unwrap_or(*next);
        *next = (*next).max(nonce + 1);

        let mut preimage = from.to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let submitted = SubmittedTransaction {
            hash: keccak256(preimage),
            from,
            nonce,
            request: tx,
        };
        state.transactions.push(submitted.clone());
        Ok(submitted)
    }
}

#[async_trait]
impl ContractFilterer for MockBackend {
    async fn filter_logs(&self, filter: Filter) -> Result<Vec<Log>, BackendError> {
        let mut state = self.state();
        let logs = state
            .logs
            .iter()
            .filter(|log| filter.address.matches(&log.address()))
            .cloned()
            .collect();
        state.filters.push(filter);
        Ok(logs)
    }

    async fn subscribe_filter_logs(&self, filter: Filter) -> Result<LogSubscription, BackendError> {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        let unsubscribed = Arc::new(AtomicBool::new(false));
        let flag = unsubscribed.clone();
        let (sub, errors) = Subscription::new(move || flag.store(true, Ordering::SeqCst));

        let mut state = self.state();
        state.filters.push(filter.clone());
        state.feeds.push(LiveFeed {
            filter,
            logs: Some(tx),
            errors: Some(errors),
            unsubscribed,
        });
        Ok(LogSubscription { logs: rx, sub })
    }
}
