use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::backend::{LogSubscription, Subscription};
use super::bound::{BoundContract, ContractEvent};
use super::error::{Error, Result};
use super::opts::WatchOpts;

use alloy::dyn_abi::DynSolValue;

/// Subscribes to `E` on `contract` and forwards decoded events to `sink`.
pub async fn watch_event<E: ContractEvent>(
    contract: &BoundContract,
    opts: &WatchOpts,
    rules: Vec<Vec<DynSolValue>>,
    sink: mpsc::Sender<E>,
) -> Result<Subscription> {
    let logs = contract.watch_logs(opts, E::NAME, rules).await?;
    Ok(spawn_watcher(contract.clone(), logs, sink))
}

/// Runs the decode-and-forward loop for one subscription on its own task.
///
/// The task races three things: the next log, a terminal error from the
/// upstream subscription, and cancellation through the returned handle.
/// Decoded events reach `sink` in arrival order. A decode or upstream error
/// ends the task and is reported by [`Subscription::err`] on the returned
/// handle; cancellation ends it cleanly. The upstream subscription is
/// released before the task exits.
pub fn spawn_watcher<E: ContractEvent>(
    contract: BoundContract,
    logs: LogSubscription,
    sink: mpsc::Sender<E>,
) -> Subscription {
    let (quit_tx, quit_rx) = oneshot::channel::<()>();
    let (sub, errors) = Subscription::new(move || {
        let _ = quit_tx.send(());
    });

    tokio::spawn(async move {
        let LogSubscription { logs, sub: mut upstream } = logs;
        let result = forward(&contract, logs, &mut upstream, sink, quit_rx).await;
        upstream.unsubscribe();

        match result {
            Ok(()) => debug!("Stopped watching {} logs of {:?}", E::NAME, contract.address()),
            Err(err) => {
                warn!("Watching {} logs of {:?} failed: {}", E::NAME, contract.address(), err);
                errors.fail(err);
            }
        }
    });

    sub
}

async fn forward<E: ContractEvent>(
    contract: &BoundContract,
    mut logs: mpsc::Receiver<alloy::rpc::types::Log>,
    upstream: &mut Subscription,
    sink: mpsc::Sender<E>,
    mut quit: oneshot::Receiver<()>,
) -> Result<()> {
    loop {
        tokio::select! {
            log = logs.recv() => {
                let Some(log) = log else {
                    // Log source finished; its subscription carries the reason.
                    tokio::select! {
                        err = upstream.err() => return upstream_result(err),
                        _ = &mut quit => return Ok(()),
                    }
                };
                let event = contract.unpack_log::<E>(log)?;

                tokio::select! {
                    sent = sink.send(event) => {
                        if sent.is_err() {
                            // Nobody is listening anymore.
                            return Ok(());
                        }
                    }
                    err = upstream.err() => return upstream_result(err),
                    _ = &mut quit => return Ok(()),
                }
            }
            err = upstream.err() => return upstream_result(err),
            _ = &mut quit => return Ok(()),
        }
    }
}

fn upstream_result(err: Option<Error>) -> Result<()> {
    match err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::offchain_aggregator::{AnswerUpdated, OFFCHAIN_AGGREGATOR_ABI};
    use alloy::primitives::Address;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unsubscribe_after_log_source_closed() {
        let contract = BoundContract::from_json(
            Address::repeat_byte(0x0a),
            OFFCHAIN_AGGREGATOR_ABI,
            None,
            None,
            None,
        )
        .unwrap();

        // Log sender gone, upstream still alive and silent.
        let (logs_tx, logs_rx) = mpsc::channel(1);
        drop(logs_tx);
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        let (upstream, _errors) = Subscription::new(move || flag.store(true, Ordering::SeqCst));

        let (sink, mut events) = mpsc::channel::<AnswerUpdated>(1);
        let mut sub = spawn_watcher(
            contract,
            LogSubscription {
                logs: logs_rx,
                sub: upstream,
            },
            sink,
        );
        sub.unsubscribe();

        let closed = tokio::time::timeout(Duration::from_secs(1), events.recv()).await;
        assert!(matches!(closed, Ok(None)), "watch task kept running");
        assert!(released.load(Ordering::SeqCst));
        assert!(sub.err().await.is_none());
    }
}
