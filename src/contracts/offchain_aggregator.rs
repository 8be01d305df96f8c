//! Binding for the OCR1 `OffchainAggregator` price feed contract.
//!
//! The compiled aggregator is not shipped with this crate; deployment takes
//! the creation bytecode from a build artifact (see
//! [`Artifact`](crate::ethereum::artifact::Artifact)).

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, FixedBytes, B256, I256, U256};
use std::sync::Arc;

use crate::bind::{
    deploy_contract, ContractBackend, IntoSolValue, Result, SubmittedTransaction, TransactOpts,
    Values,
};
use crate::{bind_contract, contract_event};

pub const OFFCHAIN_AGGREGATOR_ABI: &str = include_str!("../../abi/offchain_aggregator.json");

/// Gas and LINK reimbursement parameters, as returned by `getBilling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Billing {
    pub maximum_gas_price: u32,
    pub reasonable_gas_price: u32,
    pub micro_link_per_eth: u32,
    pub link_gwei_per_observation: u32,
    pub link_gwei_per_transmission: u32,
}

impl Billing {
    pub(crate) fn from_values(values: &mut Values) -> Result<Self> {
        Ok(Self {
            maximum_gas_price: values.take()?,
            reasonable_gas_price: values.take()?,
            micro_link_per_eth: values.take()?,
            link_gwei_per_observation: values.take()?,
            link_gwei_per_transmission: values.take()?,
        })
    }

    pub(crate) fn into_args(self) -> Vec<DynSolValue> {
        vec![
            self.maximum_gas_price.into_sol_value(),
            self.reasonable_gas_price.into_sol_value(),
            self.micro_link_per_eth.into_sol_value(),
            self.link_gwei_per_observation.into_sol_value(),
            self.link_gwei_per_transmission.into_sol_value(),
        ]
    }
}

/// One round of the feed, shaped like `AggregatorV3Interface`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundData {
    pub round_id: U256,
    pub answer: I256,
    pub started_at: U256,
    pub updated_at: U256,
    pub answered_in_round: U256,
}

impl RoundData {
    pub(crate) fn from_values(mut values: Values) -> Result<Self> {
        Ok(Self {
            round_id: values.take()?,
            answer: values.take()?,
            started_at: values.take()?,
            updated_at: values.take()?,
            answered_in_round: values.take()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatestConfigDetails {
    pub config_count: u32,
    pub block_number: u32,
    pub config_digest: FixedBytes<16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmissionDetails {
    pub config_digest: FixedBytes<16>,
    pub epoch: u32,
    pub round: u8,
    pub latest_answer: I256,
    pub latest_timestamp: u64,
}

/// Constructor arguments shared by every aggregator flavour.
#[derive(Debug, Clone)]
pub struct AggregatorArgs {
    pub billing: Billing,
    pub link: Address,
    pub min_answer: I256,
    pub max_answer: I256,
    pub billing_access_controller: Address,
    pub requester_access_controller: Address,
    pub decimals: u8,
    pub description: String,
}

impl AggregatorArgs {
    /// Arguments in constructor declaration order.
    pub fn into_args(self) -> Vec<DynSolValue> {
        let mut args = self.billing.into_args();
        args.extend([
            self.link.into_sol_value(),
            self.min_answer.into_sol_value(),
            self.max_answer.into_sol_value(),
            self.billing_access_controller.into_sol_value(),
            self.requester_access_controller.into_sol_value(),
            self.decimals.into_sol_value(),
            self.description.into_sol_value(),
        ]);
        args
    }
}

contract_event! {
    pub struct AnswerUpdated("AnswerUpdated") {
        pub current: I256,
        pub round_id: U256,
        pub updated_at: U256,
    }
}

contract_event! {
    pub struct BillingAccessControllerSet("BillingAccessControllerSet") {
        pub old: Address,
        pub current: Address,
    }
}

contract_event! {
    pub struct BillingSet("BillingSet") {
        pub maximum_gas_price: u32,
        pub reasonable_gas_price: u32,
        pub micro_link_per_eth: u32,
        pub link_gwei_per_observation: u32,
        pub link_gwei_per_transmission: u32,
    }
}

contract_event! {
    /// New oracle set and offchain configuration.
    pub struct ConfigSet("ConfigSet") {
        pub previous_config_block_number: u32,
        pub config_count: u64,
        pub signers: Vec<Address>,
        pub transmitters: Vec<Address>,
        pub threshold: u8,
        pub encoded_config_version: u64,
        pub encoded: Bytes,
    }
}

contract_event! {
    pub struct LinkTokenSet("LinkTokenSet") {
        pub old_link_token: Address,
        pub new_link_token: Address,
    }
}

contract_event! {
    pub struct NewRound("NewRound") {
        pub round_id: U256,
        pub started_by: Address,
        pub started_at: U256,
    }
}

contract_event! {
    /// A report was accepted on chain.
    pub struct NewTransmission("NewTransmission") {
        pub aggregator_round_id: u32,
        pub answer: I256,
        pub transmitter: Address,
        pub observations: Vec<I256>,
        /// One byte per observation: the index of the oracle that made it.
        pub observers: Bytes,
        pub raw_report_context: B256,
    }
}

contract_event! {
    pub struct OraclePaid("OraclePaid") {
        pub transmitter: Address,
        pub payee: Address,
        pub amount: U256,
        pub link_token: Address,
    }
}

contract_event! {
    pub struct PayeeshipTransferRequested("PayeeshipTransferRequested") {
        pub transmitter: Address,
        pub current: Address,
        pub proposed: Address,
    }
}

contract_event! {
    pub struct PayeeshipTransferred("PayeeshipTransferred") {
        pub transmitter: Address,
        pub previous: Address,
        pub current: Address,
    }
}

contract_event! {
    pub struct RequesterAccessControllerSet("RequesterAccessControllerSet") {
        pub old: Address,
        pub current: Address,
    }
}

contract_event! {
    pub struct RoundRequested("RoundRequested") {
        pub requester: Address,
        pub config_digest: FixedBytes<16>,
        pub epoch: u32,
        pub round: u8,
    }
}

contract_event! {
    pub struct ValidatorUpdated("ValidatorUpdated") {
        pub previous: Address,
        pub current: Address,
    }
}

/// Methods and events of the base aggregator, for every binding whose ABI
/// extends it.
macro_rules! aggregator_methods {
    () => {
        pub async fn billing_access_controller(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<::alloy::primitives::Address> {
            self.contract
                .call_values(opts, "billingAccessController", vec![])
                .await?
                .take()
        }

        pub async fn decimals(&self, opts: &$crate::bind::CallOpts) -> $crate::bind::Result<u8> {
            self.contract.call_values(opts, "decimals", vec![]).await?.take()
        }

        pub async fn description(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<String> {
            self.contract.call_values(opts, "description", vec![]).await?.take()
        }

        pub async fn get_answer(
            &self,
            opts: &$crate::bind::CallOpts,
            round_id: ::alloy::primitives::U256,
        ) -> $crate::bind::Result<::alloy::primitives::I256> {
            use $crate::bind::IntoSolValue;
            self.contract
                .call_values(opts, "getAnswer", vec![round_id.into_sol_value()])
                .await?
                .take()
        }

        pub async fn get_billing(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<$crate::contracts::offchain_aggregator::Billing> {
            let mut values = self.contract.call_values(opts, "getBilling", vec![]).await?;
            $crate::contracts::offchain_aggregator::Billing::from_values(&mut values)
        }

        pub async fn get_link_token(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<::alloy::primitives::Address> {
            self.contract.call_values(opts, "getLinkToken", vec![]).await?.take()
        }

        /// Round data of `round_id`, which must fit in 80 bits.
        pub async fn get_round_data(
            &self,
            opts: &$crate::bind::CallOpts,
            round_id: ::alloy::primitives::U256,
        ) -> $crate::bind::Result<$crate::contracts::offchain_aggregator::RoundData> {
            use $crate::bind::IntoSolValue;
            let values = self
                .contract
                .call_values(opts, "getRoundData", vec![round_id.into_sol_value()])
                .await?;
            $crate::contracts::offchain_aggregator::RoundData::from_values(values)
        }

        pub async fn get_timestamp(
            &self,
            opts: &$crate::bind::CallOpts,
            round_id: ::alloy::primitives::U256,
        ) -> $crate::bind::Result<::alloy::primitives::U256> {
            use $crate::bind::IntoSolValue;
            self.contract
                .call_values(opts, "getTimestamp", vec![round_id.into_sol_value()])
                .await?
                .take()
        }

        pub async fn latest_answer(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<::alloy::primitives::I256> {
            self.contract.call_values(opts, "latestAnswer", vec![]).await?.take()
        }

        pub async fn latest_config_details(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<$crate::contracts::offchain_aggregator::LatestConfigDetails> {
            let mut values = self
                .contract
                .call_values(opts, "latestConfigDetails", vec![])
                .await?;
            Ok($crate::contracts::offchain_aggregator::LatestConfigDetails {
                config_count: values.take()?,
                block_number: values.take()?,
                config_digest: values.take()?,
            })
        }

        pub async fn latest_round(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<::alloy::primitives::U256> {
            self.contract.call_values(opts, "latestRound", vec![]).await?.take()
        }

        pub async fn latest_round_data(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<$crate::contracts::offchain_aggregator::RoundData> {
            let values = self.contract.call_values(opts, "latestRoundData", vec![]).await?;
            $crate::contracts::offchain_aggregator::RoundData::from_values(values)
        }

        pub async fn latest_timestamp(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<::alloy::primitives::U256> {
            self.contract.call_values(opts, "latestTimestamp", vec![]).await?.take()
        }

        pub async fn latest_transmission_details(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<$crate::contracts::offchain_aggregator::TransmissionDetails> {
            let mut values = self
                .contract
                .call_values(opts, "latestTransmissionDetails", vec![])
                .await?;
            Ok($crate::contracts::offchain_aggregator::TransmissionDetails {
                config_digest: values.take()?,
                epoch: values.take()?,
                round: values.take()?,
                latest_answer: values.take()?,
                latest_timestamp: values.take()?,
            })
        }

        /// LINK balance minus what is owed to oracles; negative when
        /// underfunded.
        pub async fn link_available_for_payment(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<::alloy::primitives::I256> {
            self.contract
                .call_values(opts, "linkAvailableForPayment", vec![])
                .await?
                .take()
        }

        pub async fn max_answer(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<::alloy::primitives::I256> {
            self.contract.call_values(opts, "maxAnswer", vec![]).await?.take()
        }

        pub async fn min_answer(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<::alloy::primitives::I256> {
            self.contract.call_values(opts, "minAnswer", vec![]).await?.take()
        }

        pub async fn oracle_observation_count(
            &self,
            opts: &$crate::bind::CallOpts,
            signer_or_transmitter: ::alloy::primitives::Address,
        ) -> $crate::bind::Result<u16> {
            use $crate::bind::IntoSolValue;
            self.contract
                .call_values(
                    opts,
                    "oracleObservationCount",
                    vec![signer_or_transmitter.into_sol_value()],
                )
                .await?
                .take()
        }

        pub async fn owed_payment(
            &self,
            opts: &$crate::bind::CallOpts,
            transmitter: ::alloy::primitives::Address,
        ) -> $crate::bind::Result<::alloy::primitives::U256> {
            use $crate::bind::IntoSolValue;
            self.contract
                .call_values(opts, "owedPayment", vec![transmitter.into_sol_value()])
                .await?
                .take()
        }

        pub async fn requester_access_controller(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<::alloy::primitives::Address> {
            self.contract
                .call_values(opts, "requesterAccessController", vec![])
                .await?
                .take()
        }

        pub async fn transmitters(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<Vec<::alloy::primitives::Address>> {
            self.contract.call_values(opts, "transmitters", vec![]).await?.take()
        }

        pub async fn type_and_version(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<String> {
            self.contract.call_values(opts, "typeAndVersion", vec![]).await?.take()
        }

        pub async fn validator(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<::alloy::primitives::Address> {
            self.contract.call_values(opts, "validator", vec![]).await?.take()
        }

        pub async fn version(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<::alloy::primitives::U256> {
            self.contract.call_values(opts, "version", vec![]).await?.take()
        }

        pub async fn accept_payeeship(
            &self,
            opts: &$crate::bind::TransactOpts,
            transmitter: ::alloy::primitives::Address,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            use $crate::bind::IntoSolValue;
            self.contract
                .transact(opts, "acceptPayeeship", vec![transmitter.into_sol_value()])
                .await
        }

        pub async fn request_new_round(
            &self,
            opts: &$crate::bind::TransactOpts,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            self.contract.transact(opts, "requestNewRound", vec![]).await
        }

        pub async fn set_billing(
            &self,
            opts: &$crate::bind::TransactOpts,
            billing: $crate::contracts::offchain_aggregator::Billing,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            self.contract
                .transact(opts, "setBilling", billing.into_args())
                .await
        }

        pub async fn set_billing_access_controller(
            &self,
            opts: &$crate::bind::TransactOpts,
            controller: ::alloy::primitives::Address,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            use $crate::bind::IntoSolValue;
            self.contract
                .transact(opts, "setBillingAccessController", vec![controller.into_sol_value()])
                .await
        }

        /// Installs a new oracle set. `encoded` is the offchain
        /// configuration blob tagged with `encoded_config_version`.
        pub async fn set_config(
            &self,
            opts: &$crate::bind::TransactOpts,
            signers: Vec<::alloy::primitives::Address>,
            transmitters: Vec<::alloy::primitives::Address>,
            threshold: u8,
            encoded_config_version: u64,
            encoded: ::alloy::primitives::Bytes,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            use $crate::bind::IntoSolValue;
            let args = vec![
                signers.into_sol_value(),
                transmitters.into_sol_value(),
                threshold.into_sol_value(),
                encoded_config_version.into_sol_value(),
                encoded.into_sol_value(),
            ];
            self.contract.transact(opts, "setConfig", args).await
        }

        /// Switches the LINK token, sending the remaining balance of the old
        /// one to `recipient`.
        pub async fn set_link_token(
            &self,
            opts: &$crate::bind::TransactOpts,
            link_token: ::alloy::primitives::Address,
            recipient: ::alloy::primitives::Address,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            use $crate::bind::IntoSolValue;
            let args = vec![link_token.into_sol_value(), recipient.into_sol_value()];
            self.contract.transact(opts, "setLinkToken", args).await
        }

        pub async fn set_payees(
            &self,
            opts: &$crate::bind::TransactOpts,
            transmitters: Vec<::alloy::primitives::Address>,
            payees: Vec<::alloy::primitives::Address>,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            use $crate::bind::IntoSolValue;
            let args = vec![transmitters.into_sol_value(), payees.into_sol_value()];
            self.contract.transact(opts, "setPayees", args).await
        }

        pub async fn set_requester_access_controller(
            &self,
            opts: &$crate::bind::TransactOpts,
            controller: ::alloy::primitives::Address,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            use $crate::bind::IntoSolValue;
            self.contract
                .transact(opts, "setRequesterAccessController", vec![controller.into_sol_value()])
                .await
        }

        pub async fn set_validator(
            &self,
            opts: &$crate::bind::TransactOpts,
            new_validator: ::alloy::primitives::Address,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            use $crate::bind::IntoSolValue;
            self.contract
                .transact(opts, "setValidator", vec![new_validator.into_sol_value()])
                .await
        }

        pub async fn transfer_payeeship(
            &self,
            opts: &$crate::bind::TransactOpts,
            transmitter: ::alloy::primitives::Address,
            proposed: ::alloy::primitives::Address,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            use $crate::bind::IntoSolValue;
            let args = vec![transmitter.into_sol_value(), proposed.into_sol_value()];
            self.contract.transact(opts, "transferPayeeship", args).await
        }

        /// Submits a signed report. `raw_vs` packs the recovery ids of
        /// every signature.
        pub async fn transmit(
            &self,
            opts: &$crate::bind::TransactOpts,
            report: ::alloy::primitives::Bytes,
            rs: Vec<::alloy::primitives::B256>,
            ss: Vec<::alloy::primitives::B256>,
            raw_vs: ::alloy::primitives::B256,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            use $crate::bind::IntoSolValue;
            let args = vec![
                report.into_sol_value(),
                rs.into_sol_value(),
                ss.into_sol_value(),
                raw_vs.into_sol_value(),
            ];
            self.contract.transact(opts, "transmit", args).await
        }

        pub async fn withdraw_funds(
            &self,
            opts: &$crate::bind::TransactOpts,
            recipient: ::alloy::primitives::Address,
            amount: ::alloy::primitives::U256,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            use $crate::bind::IntoSolValue;
            let args = vec![recipient.into_sol_value(), amount.into_sol_value()];
            self.contract.transact(opts, "withdrawFunds", args).await
        }

        pub async fn withdraw_payment(
            &self,
            opts: &$crate::bind::TransactOpts,
            transmitter: ::alloy::primitives::Address,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            use $crate::bind::IntoSolValue;
            self.contract
                .transact(opts, "withdrawPayment", vec![transmitter.into_sol_value()])
                .await
        }

        ownable_methods!();

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::AnswerUpdated,
            filter_answer_updated,
            watch_answer_updated,
            parse_answer_updated,
            current: ::alloy::primitives::I256,
            round_id: ::alloy::primitives::U256,
        );

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::BillingAccessControllerSet,
            filter_billing_access_controller_set,
            watch_billing_access_controller_set,
            parse_billing_access_controller_set,
        );

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::BillingSet,
            filter_billing_set,
            watch_billing_set,
            parse_billing_set,
        );

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::ConfigSet,
            filter_config_set,
            watch_config_set,
            parse_config_set,
        );

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::LinkTokenSet,
            filter_link_token_set,
            watch_link_token_set,
            parse_link_token_set,
            old_link_token: ::alloy::primitives::Address,
            new_link_token: ::alloy::primitives::Address,
        );

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::NewRound,
            filter_new_round,
            watch_new_round,
            parse_new_round,
            round_id: ::alloy::primitives::U256,
            started_by: ::alloy::primitives::Address,
        );

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::NewTransmission,
            filter_new_transmission,
            watch_new_transmission,
            parse_new_transmission,
            aggregator_round_id: u32,
        );

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::OraclePaid,
            filter_oracle_paid,
            watch_oracle_paid,
            parse_oracle_paid,
            transmitter: ::alloy::primitives::Address,
            payee: ::alloy::primitives::Address,
            link_token: ::alloy::primitives::Address,
        );

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::PayeeshipTransferRequested,
            filter_payeeship_transfer_requested,
            watch_payeeship_transfer_requested,
            parse_payeeship_transfer_requested,
            transmitter: ::alloy::primitives::Address,
            current: ::alloy::primitives::Address,
            proposed: ::alloy::primitives::Address,
        );

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::PayeeshipTransferred,
            filter_payeeship_transferred,
            watch_payeeship_transferred,
            parse_payeeship_transferred,
            transmitter: ::alloy::primitives::Address,
            previous: ::alloy::primitives::Address,
            current: ::alloy::primitives::Address,
        );

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::RequesterAccessControllerSet,
            filter_requester_access_controller_set,
            watch_requester_access_controller_set,
            parse_requester_access_controller_set,
        );

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::RoundRequested,
            filter_round_requested,
            watch_round_requested,
            parse_round_requested,
            requester: ::alloy::primitives::Address,
        );

        $crate::event_bindings!(
            $crate::contracts::offchain_aggregator::ValidatorUpdated,
            filter_validator_updated,
            watch_validator_updated,
            parse_validator_updated,
            previous: ::alloy::primitives::Address,
            current: ::alloy::primitives::Address,
        );
    };
}

bind_contract! {
    /// OCR1 aggregator: oracles agree offchain on a report and a single
    /// transmitter posts the median answer.
    pub struct OffchainAggregator(OFFCHAIN_AGGREGATOR_ABI);
}

impl OffchainAggregator {
    /// Deploys `bytecode` with the given constructor arguments.
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

    aggregator_methods!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::mock::{log, MockBackend};
    use crate::bind::{BoundContract, CallOpts, Error, FilterOpts, WatchOpts};
    use alloy::dyn_abi::{DynSolType, JsonAbiExt};
    use std::time::Duration;
    use tokio::sync::mpsc;

    const FEED: Address = Address::repeat_byte(0x0f);

    fn eth_usd() -> AggregatorArgs {
        AggregatorArgs {
            billing: Billing {
                maximum_gas_price: 42,
                reasonable_gas_price: 7,
                micro_link_per_eth: 1_000_000,
                link_gwei_per_observation: 100,
                link_gwei_per_transmission: 200,
            },
            link: Address::repeat_byte(0x0a),
            min_answer: I256::try_from(1i64).unwrap(),
            max_answer: I256::try_from(1_000_000_000_000i64).unwrap(),
            billing_access_controller: Address::repeat_byte(0x0b),
            requester_access_controller: Address::repeat_byte(0x0c),
            decimals: 8,
            description: "ETH/USD".to_string(),
        }
    }

    fn answer_updated_log(current: i64, round_id: u64, updated_at: u64) -> alloy::rpc::types::Log {
        let abi = OffchainAggregator::abi().unwrap();
        let event = &abi.event("AnswerUpdated").unwrap()[0];
        let current = I256::try_from(current).unwrap();
        log(
            FEED,
            vec![
                event.selector(),
                B256::from(current.into_raw()),
                B256::from(U256::from(round_id)),
            ],
            DynSolValue::Uint(U256::from(updated_at), 256).abi_encode().into(),
        )
    }

    #[tokio::test]
    async fn test_deploy_encodes_constructor_arguments_in_order() {
        let backend = Arc::new(MockBackend::default());
        let bytecode = Bytes::from(vec![0x60, 0x80, 0x60, 0x40]);

        let (address, tx, aggregator) =
            OffchainAggregator::deploy(&TransactOpts::default(), backend.clone(), bytecode.clone(), eth_usd())
                .await
                .unwrap();

        assert_eq!(address, backend.sender().create(0));
        assert_eq!(aggregator.address(), address);
        assert_eq!(backend.transactions().len(), 1);

        let input = tx.request.input.input().unwrap();
        assert_eq!(&input[..bytecode.len()], bytecode.as_ref());

        let abi = OffchainAggregator::abi().unwrap();
        let constructor = abi.constructor().unwrap();
        let decoded = constructor
            .abi_decode_input(&input[bytecode.len()..], true)
            .unwrap();
        assert_eq!(decoded.len(), 12);
        assert_eq!(decoded[0], DynSolValue::Uint(U256::from(42), 32));
        assert_eq!(decoded[5], DynSolValue::Address(Address::repeat_byte(0x0a)));
        assert_eq!(decoded[10], DynSolValue::Uint(U256::from(8), 8));
        assert_eq!(decoded[11], DynSolValue::String("ETH/USD".to_string()));
    }

    #[tokio::test]
    async fn test_latest_round_data_keeps_field_order() {
        let backend = Arc::new(MockBackend::default());
        let abi = OffchainAggregator::abi().unwrap();
        let output = DynSolValue::Tuple(vec![
            DynSolValue::Uint(U256::from(5), 80),
            DynSolValue::Int(I256::try_from(200_000_000_000i64).unwrap(), 256),
            DynSolValue::Uint(U256::from(1_700_000_000u64), 256),
            DynSolValue::Uint(U256::from(1_700_000_100u64), 256),
            DynSolValue::Uint(U256::from(5), 80),
        ])
        .abi_encode_params();
        backend.respond(abi.function("latestRoundData").unwrap()[0].selector(), output);

        let aggregator = OffchainAggregator::new(FEED, backend.clone()).unwrap();
        let round = aggregator
            .latest_round_data(&CallOpts::default())
            .await
            .unwrap();

        assert_eq!(
            round,
            RoundData {
                round_id: U256::from(5),
                answer: I256::try_from(200_000_000_000i64).unwrap(),
                started_at: U256::from(1_700_000_000u64),
                updated_at: U256::from(1_700_000_100u64),
                answered_in_round: U256::from(5),
            }
        );
    }

    #[tokio::test]
    async fn test_call_at_historical_block() {
        let backend = Arc::new(MockBackend::default());
        let abi = OffchainAggregator::abi().unwrap();
        backend.respond(
            abi.function("description").unwrap()[0].selector(),
            DynSolValue::Tuple(vec![DynSolValue::String("ETH/USD".into())]).abi_encode_params(),
        );

        let aggregator = OffchainAggregator::new_caller(FEED, backend.clone()).unwrap();
        let description = aggregator
            .description(&CallOpts::at_block(1234))
            .await
            .unwrap();

        assert_eq!(description, "ETH/USD");
        let (request, block) = &backend.calls()[0];
        assert_eq!(request.to, Some(FEED.into()));
        assert_eq!(*block, alloy::eips::BlockId::number(1234));
    }

    #[tokio::test]
    async fn test_empty_output_without_code_is_no_code() {
        let backend = Arc::new(MockBackend::default());
        let aggregator = OffchainAggregator::new(FEED, backend.clone()).unwrap();

        let err = aggregator.decimals(&CallOpts::default()).await.unwrap_err();
        assert!(matches!(err, Error::NoCode));

        backend.set_code(FEED, vec![0x60, 0x80]);
        let err = aggregator.decimals(&CallOpts::default()).await.unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn test_reverted_call_surfaces_as_call_error() {
        let backend = Arc::new(MockBackend::default());
        let abi = OffchainAggregator::abi().unwrap();
        backend.revert(abi.function("latestAnswer").unwrap()[0].selector(), Bytes::new());

        let aggregator = OffchainAggregator::new(FEED, backend.clone()).unwrap();
        let err = aggregator.latest_answer(&CallOpts::default()).await.unwrap_err();
        assert!(matches!(err, Error::Call { ref method, .. } if method == "latestAnswer"));
    }

    #[tokio::test]
    async fn test_read_only_binding_cannot_transact() {
        let backend = Arc::new(MockBackend::default());
        let aggregator = OffchainAggregator::new_caller(FEED, backend.clone()).unwrap();

        let err = aggregator
            .request_new_round(&TransactOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCapability(_)));
        assert!(backend.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_transaction_is_submission_error() {
        let backend = Arc::new(MockBackend::default());
        backend.reject_transactions("nonce too low");
        let aggregator = OffchainAggregator::new(FEED, backend.clone()).unwrap();

        let err = aggregator
            .request_new_round(&TransactOpts::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Submission(_)));
        assert!(err.to_string().contains("nonce too low"));

        let err = OffchainAggregator::deploy(
            &TransactOpts::default(),
            backend.clone(),
            Bytes::from(vec![0x60, 0x80]),
            eth_usd(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Submission(_)));
        assert!(backend.transactions().is_empty());
    }

    #[tokio::test]
    async fn test_transfer_carries_value_without_calldata() {
        let backend = Arc::new(MockBackend::default());
        let aggregator = OffchainAggregator::new(FEED, backend.clone()).unwrap();
        let opts = TransactOpts {
            value: Some(U256::from(1_000_000_000u64)),
            ..Default::default()
        };

        let tx = aggregator.bound().transfer(&opts).await.unwrap();

        assert_eq!(tx.request.to, Some(FEED.into()));
        assert_eq!(tx.request.value, Some(U256::from(1_000_000_000u64)));
        assert!(tx.request.input.input().map_or(true, |input| input.is_empty()));
        assert_eq!(backend.transactions().len(), 1);
    }

    #[tokio::test]
    async fn test_set_config_round_trips_through_abi() {
        let backend = Arc::new(MockBackend::default());
        let aggregator = OffchainAggregator::new(FEED, backend.clone()).unwrap();
        let signers = vec![Address::repeat_byte(1), Address::repeat_byte(2)];
        let transmitters = vec![Address::repeat_byte(3), Address::repeat_byte(4)];

        let tx = aggregator
            .set_config(
                &TransactOpts::default(),
                signers.clone(),
                transmitters.clone(),
                1,
                2,
                Bytes::from_static(b"offchain"),
            )
            .await
            .unwrap();

        let abi = OffchainAggregator::abi().unwrap();
        let function = &abi.function("setConfig").unwrap()[0];
        let input = tx.request.input.input().unwrap();
        assert_eq!(&input[..4], function.selector().as_slice());
        let decoded = function.abi_decode_input(&input[4..], true).unwrap();
        assert_eq!(decoded[0], signers.into_sol_value());
        assert_eq!(decoded[1], transmitters.into_sol_value());
        assert_eq!(decoded[4], DynSolValue::Bytes(b"offchain".to_vec()));
    }

    #[tokio::test]
    async fn test_round_id_overflowing_uint80_is_rejected() {
        let backend = Arc::new(MockBackend::default());
        let aggregator = OffchainAggregator::new(FEED, backend.clone()).unwrap();

        let err = aggregator
            .get_round_data(&CallOpts::default(), U256::from(1u128 << 80))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Encode { .. }));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_filter_skips_nothing_and_stops_at_foreign_topic() {
        let backend = Arc::new(MockBackend::default());
        backend.push_log(answer_updated_log(100, 1, 10));
        backend.push_log(answer_updated_log(-5, 2, 20));
        let mut foreign = answer_updated_log(7, 3, 30);
        foreign.inner.data = alloy::primitives::LogData::new_unchecked(
            vec![B256::repeat_byte(0xee)],
            Bytes::new(),
        );
        backend.push_log(foreign);

        let aggregator = OffchainAggregator::new(FEED, backend.clone()).unwrap();
        let mut iter = aggregator
            .filter_answer_updated(&FilterOpts::range(1, 100), &[], &[U256::from(1), U256::from(2)])
            .await
            .unwrap();

        assert!(iter.next().await);
        assert_eq!(iter.event().unwrap().current, I256::try_from(100).unwrap());
        assert!(iter.next().await);
        let second = iter.event().unwrap();
        assert_eq!(second.current, I256::try_from(-5).unwrap());
        assert_eq!(second.round_id, U256::from(2));
        assert_eq!(second.updated_at, U256::from(20));

        // The third log carries another event's topic and is never yielded.
        assert!(!iter.next().await);
        assert!(matches!(iter.error(), Some(Error::EventSignatureMismatch)));
        assert!(!iter.next().await);

        iter.close();
        iter.close();

        let filter = &backend.filters()[0];
        assert!(filter.topics[1].is_empty());
        assert!(filter.topics[2].matches(&B256::from(U256::from(2))));
    }

    #[tokio::test]
    async fn test_exhausted_iterator_stays_exhausted() {
        let backend = Arc::new(MockBackend::default());
        backend.push_log(answer_updated_log(1, 1, 1));

        let aggregator = OffchainAggregator::new(FEED, backend.clone()).unwrap();
        let mut iter = aggregator
            .filter_answer_updated(&FilterOpts::default(), &[], &[])
            .await
            .unwrap();

        assert!(iter.next().await);
        assert!(!iter.next().await);
        assert!(!iter.next().await);
        assert!(iter.error().is_none());
    }

    #[tokio::test]
    async fn test_watch_forwards_events_until_unsubscribed() {
        let backend = Arc::new(MockBackend::default());
        let aggregator = OffchainAggregator::new(FEED, backend.clone()).unwrap();
        let (tx, mut rx) = mpsc::channel(4);

        let mut sub = aggregator
            .watch_answer_updated(&WatchOpts::default(), tx, &[], &[])
            .await
            .unwrap();

        backend.emit(answer_updated_log(10, 1, 100)).await;
        backend.emit(answer_updated_log(11, 2, 200)).await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.round_id, U256::from(1));
        assert_eq!(second.round_id, U256::from(2));

        sub.unsubscribe();
        tokio::time::timeout(Duration::from_secs(1), async {
            while backend.active_feeds() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert!(backend.feed_unsubscribed(0));
        assert!(sub.err().await.is_none());
        // The watcher dropped its sender on exit.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_watch_reports_upstream_failure() {
        let backend = Arc::new(MockBackend::default());
        let aggregator = OffchainAggregator::new(FEED, backend.clone()).unwrap();
        let (tx, _rx) = mpsc::channel(1);

        let mut sub = aggregator
            .watch_new_transmission(&WatchOpts::default(), tx, &[7])
            .await
            .unwrap();
        backend.fail_feeds("connection reset");

        let err = tokio::time::timeout(Duration::from_secs(1), sub.err())
            .await
            .unwrap();
        assert!(matches!(err, Some(Error::Subscription(_))));
        assert!(backend.feed_unsubscribed(0));
    }

    #[tokio::test]
    async fn test_watch_stops_on_undecodable_log() {
        let backend = Arc::new(MockBackend::default());
        let aggregator = OffchainAggregator::new(FEED, backend.clone()).unwrap();
        let (tx, _rx) = mpsc::channel(1);

        let mut sub = aggregator
            .watch_answer_updated(&WatchOpts::default(), tx, &[], &[])
            .await
            .unwrap();
        backend
            .emit(log(FEED, vec![B256::repeat_byte(0xee)], Bytes::new()))
            .await;

        let err = tokio::time::timeout(Duration::from_secs(1), sub.err())
            .await
            .unwrap();
        assert!(matches!(err, Some(Error::EventSignatureMismatch)));
    }

    #[test]
    fn test_binding_fails_only_on_malformed_abi() {
        let backend = Arc::new(MockBackend::default());
        assert!(BoundContract::with_backend(FEED, OFFCHAIN_AGGREGATOR_ABI, backend.clone()).is_ok());
        assert!(BoundContract::with_backend(FEED, "[]", backend.clone()).is_ok());
        let err = BoundContract::with_backend(FEED, "{not json", backend).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_round_id_type_is_uint80() {
        let abi = OffchainAggregator::abi().unwrap();
        let outputs = &abi.function("latestRoundData").unwrap()[0].outputs;
        assert_eq!(outputs[0].ty, "uint80");
        assert_eq!(DynSolType::parse(&outputs[1].ty).unwrap(), DynSolType::Int(256));
    }
}
