//! Aggregator whose reads are gated by an allow list.

use alloy::primitives::{Address, Bytes};
use std::sync::Arc;

use crate::bind::{
    deploy_contract, CallOpts, ContractBackend, IntoSolValue, Result, SubmittedTransaction,
    TransactOpts,
};
use crate::contracts::offchain_aggregator::AggregatorArgs;
use crate::{bind_contract, contract_event, event_bindings};

pub const ACCESS_CONTROLLED_OFFCHAIN_AGGREGATOR_ABI: &str =
    include_str!("../../abi/access_controlled_offchain_aggregator.json");

contract_event! {
    pub struct AddedAccess("AddedAccess") {
        pub user: Address,
    }
}

contract_event! {
    pub struct RemovedAccess("RemovedAccess") {
        pub user: Address,
    }
}

contract_event! {
    pub struct CheckAccessEnabled("CheckAccessEnabled") {}
}

contract_event! {
    pub struct CheckAccessDisabled("CheckAccessDisabled") {}
}

bind_contract! {
    /// [`OffchainAggregator`](crate::contracts::offchain_aggregator::OffchainAggregator)
    /// with an allow list on its read methods. Offchain callers (no
    /// contract code at `tx.origin`) are always allowed.
    pub struct AccessControlledOffchainAggregator(ACCESS_CONTROLLED_OFFCHAIN_AGGREGATOR_ABI);
}

impl AccessControlledOffchainAggregator {
    pub async fn deploy<B>(
        opts: &TransactOpts,
        backend: Arc<B>,
        bytecode: Bytes,
        args: AggregatorArgs,
    ) -> Result<(Address, SubmittedTransaction, Self)>
    where
        B: ContractBackend + 'static,
    {
        let (address, tx, contract) =
            deploy_contract(opts, Self::abi()?, bytecode, args.into_args(), backend).await?;
        Ok((address, tx, contract.into()))
    }

    pub async fn check_enabled(&self, opts: &CallOpts) -> Result<bool> {
        self.contract.call_values(opts, "checkEnabled", vec![]).await?.take()
    }

    /// Whether `user` may read the feed with `calldata`.
    pub async fn has_access(&self, opts: &CallOpts, user: Address, calldata: Bytes) -> Result<bool> {
        let args = vec![user.into_sol_value(), calldata.into_sol_value()];
        self.contract.call_values(opts, "hasAccess", args).await?.take()
    }

    pub async fn add_access(&self, opts: &TransactOpts, user: Address) -> Result<SubmittedTransaction> {
        self.contract
            .transact(opts, "addAccess", vec![user.into_sol_value()])
            .await
    }

    pub async fn remove_access(
        &self,
        opts: &TransactOpts,
        user: Address,
    ) -> Result<SubmittedTransaction> {
        self.contract
            .transact(opts, "removeAccess", vec![user.into_sol_value()])
            .await
    }

    pub async fn enable_access_check(&self, opts: &TransactOpts) -> Result<SubmittedTransaction> {
        self.contract.transact(opts, "enableAccessCheck", vec![]).await
    }

    pub async fn disable_access_check(&self, opts: &TransactOpts) -> Result<SubmittedTransaction> {
        self.contract.transact(opts, "disableAccessCheck", vec![]).await
    }

    event_bindings!(AddedAccess, filter_added_access, watch_added_access, parse_added_access);

    event_bindings!(
        RemovedAccess,
        filter_removed_access,
        watch_removed_access,
        parse_removed_access,
    );

    event_bindings!(
        CheckAccessEnabled,
        filter_check_access_enabled,
        watch_check_access_enabled,
        parse_check_access_enabled,
    );

    event_bindings!(
        CheckAccessDisabled,
        filter_check_access_disabled,
        watch_check_access_disabled,
        parse_check_access_disabled,
    );

    aggregator_methods!();
}
