//! Test harness exposing the aggregator's internal state and helpers. It
//! inherits the whole aggregator surface.

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, FixedBytes, U256};
use std::sync::Arc;

use crate::bind::{
    deploy_contract, CallOpts, ContractBackend, IntoSolValue, Result, SubmittedTransaction,
    TransactOpts, Values,
};
use crate::bind_contract;

pub const TEST_OFFCHAIN_AGGREGATOR_ABI: &str =
    include_str!("../../abi/test_offchain_aggregator.json");

/// Number of oracle slots tracked by the aggregator.
pub const MAX_ORACLES: usize = 32;

/// State read and written on every transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HotVars {
    pub latest_config_digest: FixedBytes<16>,
    /// Epoch in the upper 32 bits, round in the lowest 8 (`uint40`).
    pub latest_epoch_and_round: u64,
    pub threshold: u8,
    pub latest_aggregator_round_id: u32,
}

impl HotVars {
    fn from_values(mut values: Values) -> Result<Self> {
        Ok(Self {
            latest_config_digest: values.take()?,
            latest_epoch_and_round: values.take()?,
            threshold: values.take()?,
            latest_aggregator_round_id: values.take()?,
        })
    }
}

impl IntoSolValue for HotVars {
    fn into_sol_value(self) -> DynSolValue {
        DynSolValue::Tuple(vec![
            self.latest_config_digest.into_sol_value(),
            self.latest_epoch_and_round.into_sol_value(),
            self.threshold.into_sol_value(),
            self.latest_aggregator_round_id.into_sol_value(),
        ])
    }
}

bind_contract! {
    pub struct TestOffchainAggregator(TEST_OFFCHAIN_AGGREGATOR_ABI);
}

impl TestOffchainAggregator {
    pub async fn deploy<B>(
        opts: &TransactOpts,
        backend: Arc<B>,
        bytecode: Bytes,
    ) -> Result<(Address, SubmittedTransaction, Self)>
    where
        B: ContractBackend + 'static,
    {
        let (address, tx, contract) =
            deploy_contract(opts, Self::abi()?, bytecode, vec![], backend).await?;
        Ok((address, tx, contract.into()))
    }

    pub async fn hot_vars(&self, opts: &CallOpts) -> Result<HotVars> {
        let mut values = self.contract.call_values(opts, "hotVars", vec![]).await?;
        HotVars::from_values(values.take_tuple()?)
    }

    pub async fn oracle_observation_counts(&self, opts: &CallOpts) -> Result<[u16; MAX_ORACLES]> {
        self.contract
            .call_values(opts, "oracleObservationCounts", vec![])
            .await?
            .take()
    }

    pub async fn test_implied_gas_price(
        &self,
        opts: &CallOpts,
        tx_gas_price: U256,
        reasonable_gas_price: U256,
        maximum_gas_price: U256,
    ) -> Result<U256> {
        let args = vec![
            tx_gas_price.into_sol_value(),
            reasonable_gas_price.into_sol_value(),
            maximum_gas_price.into_sol_value(),
        ];
        self.contract
            .call_values(opts, "testImpliedGasPrice", args)
            .await?
            .take()
    }

    pub async fn test_payee(&self, opts: &CallOpts, transmitter: Address) -> Result<Address> {
        self.contract
            .call_values(opts, "testPayee", vec![transmitter.into_sol_value()])
            .await?
            .take()
    }

    pub async fn test_saturating_add_uint16(&self, opts: &CallOpts, x: u16, y: u16) -> Result<u16> {
        let args = vec![x.into_sol_value(), y.into_sol_value()];
        self.contract
            .call_values(opts, "testSaturatingAddUint16", args)
            .await?
            .take()
    }

    pub async fn test_total_link_due(&self, opts: &CallOpts) -> Result<U256> {
        self.contract
            .call_values(opts, "testTotalLinkDue", vec![])
            .await?
            .take()
    }

    pub async fn test_set_gas_reimbursements(
        &self,
        opts: &TransactOpts,
        transmitter: Address,
        amount_link_wei: U256,
    ) -> Result<SubmittedTransaction> {
        let args = vec![transmitter.into_sol_value(), amount_link_wei.into_sol_value()];
        self.contract
            .transact(opts, "testSetGasReimbursements", args)
            .await
    }

    pub async fn test_set_hot_vars(
        &self,
        opts: &TransactOpts,
        hot_vars: HotVars,
    ) -> Result<SubmittedTransaction> {
        self.contract
            .transact(opts, "testSetHotVars", vec![hot_vars.into_sol_value()])
            .await
    }

    pub async fn test_set_oracle_observation_counts(
        &self,
        opts: &TransactOpts,
        counts: [u16; MAX_ORACLES],
    ) -> Result<SubmittedTransaction> {
        self.contract
            .transact(opts, "testSetOracleObservationCounts", vec![counts.into_sol_value()])
            .await
    }

    aggregator_methods!();
}
