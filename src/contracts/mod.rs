//! Typed bindings for the offchain aggregator contract family and the OCR2
//! and OCR3 contracts that ship beside it.
//!
//! Every binding is a thin wrapper over [`BoundContract`](crate::bind::BoundContract):
//! view methods decode into native types, state-mutating methods return the
//! submitted transaction, and each event gets `filter_*`, `watch_*` and
//! `parse_*` accessors.

// Declaration order matters: later modules use the method macros of earlier ones.
#[macro_use]
pub mod ownership;
#[macro_use]
pub mod offchain_aggregator;

pub mod access_controlled_offchain_aggregator;
pub mod ocr2_title_request;
pub mod ocr3_attestation_verifier;
pub mod test_offchain_aggregator;
pub mod test_validator;

pub use access_controlled_offchain_aggregator::AccessControlledOffchainAggregator;
pub use ocr2_title_request::{Ocr2Base, Ocr2TitleRequest, TypeAndVersionInterface};
pub use ocr3_attestation_verifier::{
    DemoBlsAttestationVerifier, DemoDynamicallyDispatchedAttestationVerifier,
    DemoEcdsaAttestationVerifier, Ocr3AttestationVerifierBase, Ocr3BlsAttestationVerifier,
    Ocr3BlsAttestationVerifierLib, Ocr3DynamicallyDispatchedAttestationVerifier,
    Ocr3DynamicallyDispatchedAttestationVerifierSelectorInterface,
    Ocr3DynamicallyDispatchedBlsAttestationVerifierLib,
    Ocr3DynamicallyDispatchedEcdsaAttestationVerifierLib, Ocr3EcdsaAttestationVerifier,
    Ocr3EcdsaAttestationVerifierLib, VerifierConfig,
};
pub use offchain_aggregator::{AggregatorArgs, Billing, OffchainAggregator, RoundData};
pub use ownership::{ConfirmedOwner, ConfirmedOwnerWithProposal, OwnableInterface, OwnerIsCreator};
pub use test_offchain_aggregator::TestOffchainAggregator;
pub use test_validator::{AggregatorValidatorInterface, TestValidator};
