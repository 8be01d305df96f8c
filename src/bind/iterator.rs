use alloy::rpc::types::Log;
use std::marker::PhantomData;
use tokio::sync::mpsc;

use super::backend::{LogSubscription, Subscription};
use super::bound::{BoundContract, ContractEvent};
use super::error::{Error, Result};
use super::opts::FilterOpts;

use alloy::dyn_abi::DynSolValue;

/// Queries the historical logs of `E` on `contract` and wraps them in an
/// iterator.
pub async fn filter_event<E: ContractEvent>(
    contract: &BoundContract,
    opts: &FilterOpts,
    rules: Vec<Vec<DynSolValue>>,
) -> Result<LogIterator<E>> {
    let logs = contract.filter_logs(opts, E::NAME, rules).await?;
    Ok(LogIterator::new(contract.clone(), logs))
}

/// Pull cursor over the logs of one event, decoding each on demand.
///
/// Returned by the `filter_*` methods of the typed bindings. A decode or
/// subscription failure is terminal: `next` returns `false` from then on
/// and `error` reports what went wrong. The sequence is single-pass; issue a
/// new filter call to scan again.
pub struct LogIterator<E> {
    event: Option<E>,
    contract: BoundContract,
    logs: mpsc::Receiver<Log>,
    sub: Subscription,
    done: bool,
    fail: Option<Error>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: ContractEvent> LogIterator<E> {
    pub fn new(contract: BoundContract, logs: LogSubscription) -> Self {
        Self {
            event: None,
            contract,
            logs: logs.logs,
            sub: logs.sub,
            done: false,
            fail: None,
            _marker: PhantomData,
        }
    }

    /// Advances to the next event. Returns `false` once the logs are
    /// exhausted or an error occurred.
    pub async fn next(&mut self) -> bool {
        if self.fail.is_some() {
            return false;
        }
        if self.done {
            return self.drain();
        }

        tokio::select! {
            biased;

            log = self.logs.recv() => match log {
                Some(log) => self.decode(log),
                None => {
                    self.done = true;
                    self.fail = self.sub.try_err();
                    false
                }
            },
            err = self.sub.err() => {
                self.done = true;
                self.fail = err;
                if self.fail.is_some() {
                    return false;
                }
                self.drain()
            }
        }
    }

    // The producer finished: deliver whatever is still buffered.
    fn drain(&mut self) -> bool {
        match self.logs.try_recv() {
            Ok(log) => self.decode(log),
            Err(_) => false,
        }
    }

    fn decode(&mut self, log: Log) -> bool {
        match self.contract.unpack_log::<E>(log) {
            Ok(event) => {
                self.event = Some(event);
                true
            }
            Err(err) => {
                self.event = None;
                self.fail = Some(err);
                false
            }
        }
    }

    /// The event decoded by the last successful `next`.
    pub fn event(&self) -> Option<&E> {
        self.event.as_ref()
    }

    /// Takes ownership of the current event.
    pub fn take_event(&mut self) -> Option<E> {
        self.event.take()
    }

    /// Any retrieval or decoding error that stopped the iteration.
    pub fn error(&self) -> Option<&Error> {
        self.fail.as_ref()
    }

    /// Releases the underlying subscription. Safe to call more than once;
    /// already decoded events stay available.
    pub fn close(&mut self) {
        self.sub.unsubscribe();
    }

    /// Drains the remaining events, stopping at the first error.
    pub async fn collect(mut self) -> Result<Vec<E>> {
        let mut events = Vec::new();
        while self.next().await {
            if let Some(event) = self.take_event() {
                events.push(event);
            }
        }
        self.close();
        match self.fail.take() {
            Some(err) => Err(err),
            None => Ok(events),
        }
    }
}

impl<E> Drop for LogIterator<E> {
    fn drop(&mut self) {
        self.sub.unsubscribe();
    }
}

impl<E> std::fmt::Debug for LogIterator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogIterator")
            .field("contract", &self.contract.address())
            .field("done", &self.done)
            .field("fail", &self.fail)
            .finish()
    }
}
