//! OCR3 attestation verifiers: the demo consumers that accept attested
//! reports, the BLS and ECDSA verifier bases, and the dynamically dispatched
//! variants that delegate verification to a separately deployed library.

use alloy::primitives::{Address, Bytes, FixedBytes, B256};
use std::sync::Arc;

use crate::bind::{
    decode_bytecode, deploy_contract, CallOpts, ContractBackend, IntoSolValue, Result,
    SubmittedTransaction, TransactOpts,
};
use crate::bind_contract;

pub const DEMO_BLS_ATTESTATION_VERIFIER_ABI: &str =
    include_str!("../../abi/demo_bls_attestation_verifier.json");
pub const DEMO_BLS_ATTESTATION_VERIFIER_BIN: &str =
    include_str!("../../abi/demo_bls_attestation_verifier.bin");
pub const DEMO_ECDSA_ATTESTATION_VERIFIER_ABI: &str =
    include_str!("../../abi/demo_ecdsa_attestation_verifier.json");
pub const DEMO_ECDSA_ATTESTATION_VERIFIER_BIN: &str =
    include_str!("../../abi/demo_ecdsa_attestation_verifier.bin");
pub const DEMO_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_ABI: &str =
    include_str!("../../abi/demo_dynamically_dispatched_attestation_verifier.json");
pub const DEMO_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_BIN: &str =
    include_str!("../../abi/demo_dynamically_dispatched_attestation_verifier.bin");

pub const OCR3_ATTESTATION_VERIFIER_BASE_ABI: &str =
    include_str!("../../abi/ocr3_attestation_verifier_base.json");
pub const OCR3_BLS_ATTESTATION_VERIFIER_ABI: &str =
    include_str!("../../abi/ocr3_bls_attestation_verifier.json");
pub const OCR3_BLS_ATTESTATION_VERIFIER_BIN: &str =
    include_str!("../../abi/ocr3_bls_attestation_verifier.bin");
pub const OCR3_ECDSA_ATTESTATION_VERIFIER_ABI: &str =
    include_str!("../../abi/ocr3_ecdsa_attestation_verifier.json");
pub const OCR3_ECDSA_ATTESTATION_VERIFIER_BIN: &str =
    include_str!("../../abi/ocr3_ecdsa_attestation_verifier.bin");
pub const OCR3_BLS_ATTESTATION_VERIFIER_LIB_ABI: &str =
    include_str!("../../abi/ocr3_bls_attestation_verifier_lib.json");
pub const OCR3_BLS_ATTESTATION_VERIFIER_LIB_BIN: &str =
    include_str!("../../abi/ocr3_bls_attestation_verifier_lib.bin");
pub const OCR3_ECDSA_ATTESTATION_VERIFIER_LIB_ABI: &str =
    include_str!("../../abi/ocr3_ecdsa_attestation_verifier_lib.json");
pub const OCR3_ECDSA_ATTESTATION_VERIFIER_LIB_BIN: &str =
    include_str!("../../abi/ocr3_ecdsa_attestation_verifier_lib.bin");

pub const OCR3_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_ABI: &str =
    include_str!("../../abi/ocr3_dynamically_dispatched_attestation_verifier.json");
pub const OCR3_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_BIN: &str =
    include_str!("../../abi/ocr3_dynamically_dispatched_attestation_verifier.bin");
pub const OCR3_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_SELECTOR_INTERFACE_ABI: &str =
    include_str!("../../abi/ocr3_dynamically_dispatched_attestation_verifier_selector_interface.json");
pub const OCR3_DYNAMICALLY_DISPATCHED_BLS_ATTESTATION_VERIFIER_LIB_ABI: &str =
    include_str!("../../abi/ocr3_dynamically_dispatched_bls_attestation_verifier_lib.json");
pub const OCR3_DYNAMICALLY_DISPATCHED_BLS_ATTESTATION_VERIFIER_LIB_BIN: &str =
    include_str!("../../abi/ocr3_dynamically_dispatched_bls_attestation_verifier_lib.bin");
pub const OCR3_DYNAMICALLY_DISPATCHED_ECDSA_ATTESTATION_VERIFIER_LIB_ABI: &str =
    include_str!("../../abi/ocr3_dynamically_dispatched_ecdsa_attestation_verifier_lib.json");
pub const OCR3_DYNAMICALLY_DISPATCHED_ECDSA_ATTESTATION_VERIFIER_LIB_BIN: &str =
    include_str!("../../abi/ocr3_dynamically_dispatched_ecdsa_attestation_verifier_lib.bin");

/// Arguments of an attestation verifier's `setConfig`.
#[derive(Debug, Clone, Default)]
pub struct VerifierConfig {
    pub config_version: u32,
    /// Number of oracles.
    pub n: u8,
    /// Maximum number of faulty oracles.
    pub f: u8,
    /// Concatenated oracle public keys, in oracle order.
    pub keys: Bytes,
}

macro_rules! attestation_verifier_methods {
    () => {
        pub async fn set_config(
            &self,
            opts: &TransactOpts,
            config: VerifierConfig,
        ) -> Result<SubmittedTransaction> {
            let args = vec![
                config.config_version.into_sol_value(),
                config.n.into_sol_value(),
                config.f.into_sol_value(),
                config.keys.into_sol_value(),
            ];
            self.contract.transact(opts, "setConfig", args).await
        }

        /// Submits `report` for sequence number `seq_nr` together with the
        /// oracles' attestation over it.
        pub async fn transmit(
            &self,
            opts: &TransactOpts,
            config_digest: B256,
            seq_nr: u64,
            report: Bytes,
            attestation: Bytes,
        ) -> Result<SubmittedTransaction> {
            let args = vec![
                config_digest.into_sol_value(),
                seq_nr.into_sol_value(),
                report.into_sol_value(),
                attestation.into_sol_value(),
            ];
            self.contract.transact(opts, "transmit", args).await
        }
    };
}

macro_rules! dispatch_selector_methods {
    () => {
        /// The two function selectors a dispatcher forwards to this library,
        /// in declaration order.
        pub async fn get_selectors(
            &self,
            opts: &CallOpts,
        ) -> Result<(FixedBytes<4>, FixedBytes<4>)> {
            let mut values = self
                .contract
                .call_values(opts, "getSelectors", vec![])
                .await?;
            Ok((values.take()?, values.take()?))
        }
    };
}

/// Deploys from an embedded bytecode constant with no constructor arguments.
macro_rules! deploy_bare {
    ($bin:expr) => {
        pub async fn deploy<B>(
            opts: &TransactOpts,
            backend: Arc<B>,
        ) -> Result<(Address, SubmittedTransaction, Self)>
        where
            B: ContractBackend + 'static,
        {
            let bytecode = decode_bytecode($bin)?;
            let (address, tx, contract) =
                deploy_contract(opts, Self::abi()?, bytecode, vec![], backend).await?;
            Ok((address, tx, contract.into()))
        }
    };
}

/// Deploys from an embedded bytecode constant, linking the verifier library
/// through the constructor.
macro_rules! deploy_with_library {
    ($bin:expr) => {
        pub async fn deploy<B>(
            opts: &TransactOpts,
            backend: Arc<B>,
            verifier_library: Address,
        ) -> Result<(Address, SubmittedTransaction, Self)>
        where
            B: ContractBackend + 'static,
        {
            let bytecode = decode_bytecode($bin)?;
            let args = vec![verifier_library.into_sol_value()];
            let (address, tx, contract) =
                deploy_contract(opts, Self::abi()?, bytecode, args, backend).await?;
            Ok((address, tx, contract.into()))
        }
    };
}

bind_contract! {
    pub struct DemoBlsAttestationVerifier(DEMO_BLS_ATTESTATION_VERIFIER_ABI);
}

impl DemoBlsAttestationVerifier {
    deploy_bare!(DEMO_BLS_ATTESTATION_VERIFIER_BIN);
    attestation_verifier_methods!();
}

bind_contract! {
    pub struct DemoEcdsaAttestationVerifier(DEMO_ECDSA_ATTESTATION_VERIFIER_ABI);
}

impl DemoEcdsaAttestationVerifier {
    deploy_bare!(DEMO_ECDSA_ATTESTATION_VERIFIER_BIN);
    attestation_verifier_methods!();
}

bind_contract! {
    /// Demo consumer that verifies through whichever library it was
    /// deployed with.
    pub struct DemoDynamicallyDispatchedAttestationVerifier(
        DEMO_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_ABI
    );
}

impl DemoDynamicallyDispatchedAttestationVerifier {
    deploy_with_library!(DEMO_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_BIN);
    attestation_verifier_methods!();
}

bind_contract! {
    /// Abstract base with no external surface; bound for completeness.
    pub struct Ocr3AttestationVerifierBase(OCR3_ATTESTATION_VERIFIER_BASE_ABI);
}

bind_contract! {
    pub struct Ocr3BlsAttestationVerifier(OCR3_BLS_ATTESTATION_VERIFIER_ABI);
}

impl Ocr3BlsAttestationVerifier {
    deploy_bare!(OCR3_BLS_ATTESTATION_VERIFIER_BIN);
}

bind_contract! {
    pub struct Ocr3EcdsaAttestationVerifier(OCR3_ECDSA_ATTESTATION_VERIFIER_ABI);
}

impl Ocr3EcdsaAttestationVerifier {
    deploy_bare!(OCR3_ECDSA_ATTESTATION_VERIFIER_BIN);
}

bind_contract! {
    pub struct Ocr3BlsAttestationVerifierLib(OCR3_BLS_ATTESTATION_VERIFIER_LIB_ABI);
}

impl Ocr3BlsAttestationVerifierLib {
    deploy_bare!(OCR3_BLS_ATTESTATION_VERIFIER_LIB_BIN);
}

bind_contract! {
    pub struct Ocr3EcdsaAttestationVerifierLib(OCR3_ECDSA_ATTESTATION_VERIFIER_LIB_ABI);
}

impl Ocr3EcdsaAttestationVerifierLib {
    deploy_bare!(OCR3_ECDSA_ATTESTATION_VERIFIER_LIB_BIN);
}

bind_contract! {
    pub struct Ocr3DynamicallyDispatchedAttestationVerifier(
        OCR3_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_ABI
    );
}

impl Ocr3DynamicallyDispatchedAttestationVerifier {
    deploy_with_library!(OCR3_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_BIN);
}

bind_contract! {
    /// Interface every dispatch library implements.
    pub struct Ocr3DynamicallyDispatchedAttestationVerifierSelectorInterface(
        OCR3_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_SELECTOR_INTERFACE_ABI
    );
}

impl Ocr3DynamicallyDispatchedAttestationVerifierSelectorInterface {
    dispatch_selector_methods!();
}

bind_contract! {
    pub struct Ocr3DynamicallyDispatchedBlsAttestationVerifierLib(
        OCR3_DYNAMICALLY_DISPATCHED_BLS_ATTESTATION_VERIFIER_LIB_ABI
    );
}

impl Ocr3DynamicallyDispatchedBlsAttestationVerifierLib {
    deploy_bare!(OCR3_DYNAMICALLY_DISPATCHED_BLS_ATTESTATION_VERIFIER_LIB_BIN);
    dispatch_selector_methods!();
}

bind_contract! {
    pub struct Ocr3DynamicallyDispatchedEcdsaAttestationVerifierLib(
        OCR3_DYNAMICALLY_DISPATCHED_ECDSA_ATTESTATION_VERIFIER_LIB_ABI
    );
}

impl Ocr3DynamicallyDispatchedEcdsaAttestationVerifierLib {
    deploy_bare!(OCR3_DYNAMICALLY_DISPATCHED_ECDSA_ATTESTATION_VERIFIER_LIB_BIN);
    dispatch_selector_methods!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::mock::MockBackend;
    use crate::Error;
    use alloy::dyn_abi::{DynSolValue, JsonAbiExt};

    const VERIFIER: Address = Address::repeat_byte(0x0e);

    #[test]
    fn test_every_embedded_artifact_parses() {
        let bins = [
            DEMO_BLS_ATTESTATION_VERIFIER_BIN,
            DEMO_ECDSA_ATTESTATION_VERIFIER_BIN,
            DEMO_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_BIN,
            OCR3_BLS_ATTESTATION_VERIFIER_BIN,
            OCR3_ECDSA_ATTESTATION_VERIFIER_BIN,
            OCR3_BLS_ATTESTATION_VERIFIER_LIB_BIN,
            OCR3_ECDSA_ATTESTATION_VERIFIER_LIB_BIN,
            OCR3_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_BIN,
            OCR3_DYNAMICALLY_DISPATCHED_BLS_ATTESTATION_VERIFIER_LIB_BIN,
            OCR3_DYNAMICALLY_DISPATCHED_ECDSA_ATTESTATION_VERIFIER_LIB_BIN,
        ];
        for bin in bins {
            assert!(!decode_bytecode(bin).unwrap().is_empty());
        }

        assert!(Ocr3AttestationVerifierBase::abi().unwrap().functions.is_empty());
        assert!(Ocr3BlsAttestationVerifierLib::abi().unwrap().constructor.is_none());
        assert!(Ocr3DynamicallyDispatchedAttestationVerifierSelectorInterface::abi().is_ok());
    }

    #[tokio::test]
    async fn test_transmit_encodes_attested_report() {
        let backend = Arc::new(MockBackend::default());
        let verifier = DemoEcdsaAttestationVerifier::new(VERIFIER, backend.clone()).unwrap();

        let tx = verifier
            .transmit(
                &TransactOpts::default(),
                B256::repeat_byte(0x11),
                42,
                Bytes::from_static(b"report"),
                Bytes::from_static(b"sigs"),
            )
            .await
            .unwrap();

        let abi = DemoEcdsaAttestationVerifier::abi().unwrap();
        let function = &abi.function("transmit").unwrap()[0];
        let input = tx.request.input.input().unwrap();
        assert_eq!(&input[..4], function.selector().as_slice());
        let args = function.abi_decode_input(&input[4..], true).unwrap();
        assert_eq!(args[0], DynSolValue::FixedBytes(B256::repeat_byte(0x11), 32));
        assert_eq!(args[1], DynSolValue::Uint(alloy::primitives::U256::from(42u64), 64));
        assert_eq!(args[2], DynSolValue::Bytes(b"report".to_vec()));
        assert_eq!(args[3], DynSolValue::Bytes(b"sigs".to_vec()));
    }

    #[tokio::test]
    async fn test_set_config_carries_keys() {
        let backend = Arc::new(MockBackend::default());
        let verifier = DemoBlsAttestationVerifier::new(VERIFIER, backend.clone()).unwrap();
        let config = VerifierConfig {
            config_version: 3,
            n: 4,
            f: 1,
            keys: Bytes::from(vec![0xab; 64]),
        };

        let tx = verifier
            .set_config(&TransactOpts::default(), config)
            .await
            .unwrap();

        let abi = DemoBlsAttestationVerifier::abi().unwrap();
        let function = &abi.function("setConfig").unwrap()[0];
        let input = tx.request.input.input().unwrap();
        let args = function.abi_decode_input(&input[4..], true).unwrap();
        assert_eq!(args[1], DynSolValue::Uint(alloy::primitives::U256::from(4u8), 8));
        assert_eq!(args[3], DynSolValue::Bytes(vec![0xab; 64]));
    }

    #[tokio::test]
    async fn test_deploy_links_verifier_library() {
        let backend = Arc::new(MockBackend::default());
        let library = Address::repeat_byte(0x1b);

        let (address, tx, _) = Ocr3DynamicallyDispatchedAttestationVerifier::deploy(
            &TransactOpts::default(),
            backend.clone(),
            library,
        )
        .await
        .unwrap();

        assert_eq!(address, backend.sender().create(0));
        let bytecode =
            decode_bytecode(OCR3_DYNAMICALLY_DISPATCHED_ATTESTATION_VERIFIER_BIN).unwrap();
        let input = tx.request.input.input().unwrap();
        assert!(input.starts_with(&bytecode));
        assert_eq!(&input[bytecode.len()..], library.into_word().as_slice());
    }

    #[tokio::test]
    async fn test_deploy_library_without_arguments() {
        let backend = Arc::new(MockBackend::default());
        let (_, tx, lib) = Ocr3DynamicallyDispatchedBlsAttestationVerifierLib::deploy(
            &TransactOpts::default(),
            backend.clone(),
        )
        .await
        .unwrap();

        let bytecode =
            decode_bytecode(OCR3_DYNAMICALLY_DISPATCHED_BLS_ATTESTATION_VERIFIER_LIB_BIN).unwrap();
        assert_eq!(tx.request.input.input().unwrap(), &bytecode);
        assert_eq!(lib.address(), backend.sender().create(0));
    }

    #[tokio::test]
    async fn test_get_selectors_splits_both_outputs() {
        let backend = Arc::new(MockBackend::default());
        let abi = Ocr3DynamicallyDispatchedEcdsaAttestationVerifierLib::abi().unwrap();
        let (first, second) = (
            FixedBytes::<4>::from([0xde, 0xad, 0xbe, 0xef]),
            FixedBytes::<4>::from([0x01, 0x02, 0x03, 0x04]),
        );
        backend.respond(
            abi.function("getSelectors").unwrap()[0].selector(),
            DynSolValue::Tuple(vec![
                DynSolValue::FixedBytes(B256::right_padding_from(first.as_slice()), 4),
                DynSolValue::FixedBytes(B256::right_padding_from(second.as_slice()), 4),
            ])
            .abi_encode_params(),
        );

        let lib =
            Ocr3DynamicallyDispatchedEcdsaAttestationVerifierLib::new_caller(VERIFIER, backend.clone())
                .unwrap();
        let selectors = lib.get_selectors(&CallOpts::default()).await.unwrap();
        assert_eq!(selectors, (first, second));
    }

    #[tokio::test]
    async fn test_rejected_verifier_deploy_is_submission_error() {
        let backend = Arc::new(MockBackend::default());
        backend.reject_transactions("insufficient funds");

        let err = DemoDynamicallyDispatchedAttestationVerifier::deploy(
            &TransactOpts::default(),
            backend.clone(),
            Address::repeat_byte(0x1b),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Submission(_)));
        assert!(backend.transactions().is_empty());
    }
}
