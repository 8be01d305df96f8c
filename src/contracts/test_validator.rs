//! Answer validators hooked into the aggregator after each new round.

use alloy::primitives::{Address, I256, U256};
use std::sync::Arc;

use crate::bind::{
    decode_bytecode, deploy_contract, CallOpts, ContractBackend, IntoSolValue, Result,
    SubmittedTransaction, TransactOpts,
};
use crate::bind_contract;

pub const AGGREGATOR_VALIDATOR_INTERFACE_ABI: &str =
    include_str!("../../abi/aggregator_validator_interface.json");
pub const TEST_VALIDATOR_ABI: &str = include_str!("../../abi/test_validator.json");
pub const TEST_VALIDATOR_BIN: &str = include_str!("../../abi/test_validator.bin");

/// Arguments of `validate`: the previous and the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validation {
    pub previous_round_id: U256,
    pub previous_answer: I256,
    pub current_round_id: U256,
    pub current_answer: I256,
}

impl Validation {
    fn into_args(self) -> Vec<alloy::dyn_abi::DynSolValue> {
        vec![
            self.previous_round_id.into_sol_value(),
            self.previous_answer.into_sol_value(),
            self.current_round_id.into_sol_value(),
            self.current_answer.into_sol_value(),
        ]
    }
}

bind_contract! {
    /// Interface the aggregator calls into; `validate` is state-mutating.
    pub struct AggregatorValidatorInterface(AGGREGATOR_VALIDATOR_INTERFACE_ABI);
}

impl AggregatorValidatorInterface {
    pub async fn validate(
        &self,
        opts: &TransactOpts,
        validation: Validation,
    ) -> Result<SubmittedTransaction> {
        self.contract
            .transact(opts, "validate", validation.into_args())
            .await
    }
}

bind_contract! {
    /// Validator that accepts every answer without side effects.
    pub struct TestValidator(TEST_VALIDATOR_ABI);
}

impl TestValidator {
    pub async fn deploy<B>(
        opts: &TransactOpts,
        backend: Arc<B>,
    ) -> Result<(Address, SubmittedTransaction, Self)>
    where
        B: ContractBackend + 'static,
    {
        let bytecode = decode_bytecode(TEST_VALIDATOR_BIN)?;
        let (address, tx, contract) =
            deploy_contract(opts, Self::abi()?, bytecode, vec![], backend).await?;
        Ok((address, tx, contract.into()))
    }

    pub async fn validate(&self, opts: &CallOpts, validation: Validation) -> Result<bool> {
        self.contract
            .call_values(opts, "validate", validation.into_args())
            .await?
            .take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::mock::MockBackend;
    use alloy::dyn_abi::{DynSolValue, JsonAbiExt};

    fn validation() -> Validation {
        Validation {
            previous_round_id: U256::from(1),
            previous_answer: I256::try_from(-100i64).unwrap(),
            current_round_id: U256::from(2),
            current_answer: I256::try_from(250i64).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_deploy_uses_embedded_bytecode() {
        let backend = Arc::new(MockBackend::default());
        let (_, tx, _) = TestValidator::deploy(&TransactOpts::default(), backend.clone())
            .await
            .unwrap();

        let bytecode = decode_bytecode(TEST_VALIDATOR_BIN).unwrap();
        assert_eq!(tx.request.input.input().unwrap(), &bytecode);
    }

    #[tokio::test]
    async fn test_validate_call_round_trip() {
        let backend = Arc::new(MockBackend::default());
        let abi = TestValidator::abi().unwrap();
        let function = &abi.function("validate").unwrap()[0];
        backend.respond(function.selector(), DynSolValue::Bool(true).abi_encode());

        let validator = TestValidator::new(Address::repeat_byte(0x05), backend.clone()).unwrap();
        assert!(validator
            .validate(&CallOpts::default(), validation())
            .await
            .unwrap());

        let (request, _) = &backend.calls()[0];
        let input = request.input.input().unwrap();
        let args = function.abi_decode_input(&input[4..], true).unwrap();
        assert_eq!(args[1], DynSolValue::Int(I256::try_from(-100i64).unwrap(), 256));
        assert_eq!(args[3], DynSolValue::Int(I256::try_from(250i64).unwrap(), 256));
    }

    #[tokio::test]
    async fn test_interface_validate_is_a_transaction() {
        let backend = Arc::new(MockBackend::default());
        let interface =
            AggregatorValidatorInterface::new_transactor(Address::repeat_byte(0x05), backend.clone())
                .unwrap();

        interface
            .validate(&TransactOpts::default(), validation())
            .await
            .unwrap();
        assert_eq!(backend.transactions().len(), 1);
        assert!(backend.calls().is_empty());
    }
}
