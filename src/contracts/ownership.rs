//! Two-step ownership transfer shared by every contract in the family, plus
//! the standalone ownership base contracts and interface.

use alloy::primitives::Address;
use std::sync::Arc;

use crate::bind::{
    decode_bytecode, deploy_contract, ContractBackend, IntoSolValue, Result, SubmittedTransaction,
    TransactOpts,
};
use crate::{bind_contract, contract_event};

pub const CONFIRMED_OWNER_ABI: &str = include_str!("../../abi/confirmed_owner.json");
pub const CONFIRMED_OWNER_BIN: &str = include_str!("../../abi/confirmed_owner.bin");
pub const CONFIRMED_OWNER_WITH_PROPOSAL_ABI: &str =
    include_str!("../../abi/confirmed_owner_with_proposal.json");
pub const CONFIRMED_OWNER_WITH_PROPOSAL_BIN: &str =
    include_str!("../../abi/confirmed_owner_with_proposal.bin");
pub const OWNER_IS_CREATOR_ABI: &str = include_str!("../../abi/owner_is_creator.json");
pub const OWNER_IS_CREATOR_BIN: &str = include_str!("../../abi/owner_is_creator.bin");
pub const OWNABLE_INTERFACE_ABI: &str = include_str!("../../abi/ownable_interface.json");

contract_event! {
    /// The owner proposed `to` as the next owner.
    pub struct OwnershipTransferRequested("OwnershipTransferRequested") {
        pub from: Address,
        pub to: Address,
    }
}

contract_event! {
    /// `to` accepted ownership from `from`.
    pub struct OwnershipTransferred("OwnershipTransferred") {
        pub from: Address,
        pub to: Address,
    }
}

/// `owner`, `transferOwnership`, `acceptOwnership` and the two ownership
/// events, for bindings whose ABI includes them.
macro_rules! ownable_methods {
    () => {
        pub async fn owner(
            &self,
            opts: &$crate::bind::CallOpts,
        ) -> $crate::bind::Result<::alloy::primitives::Address> {
            self.contract.call_values(opts, "owner", vec![]).await?.take()
        }

        /// Proposes `to` as the new owner; it takes effect once `to` accepts.
        pub async fn transfer_ownership(
            &self,
            opts: &$crate::bind::TransactOpts,
            to: ::alloy::primitives::Address,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            use $crate::bind::IntoSolValue;
            self.contract
                .transact(opts, "transferOwnership", vec![to.into_sol_value()])
                .await
        }

        pub async fn accept_ownership(
            &self,
            opts: &$crate::bind::TransactOpts,
        ) -> $crate::bind::Result<$crate::bind::SubmittedTransaction> {
            self.contract.transact(opts, "acceptOwnership", vec![]).await
        }

        $crate::event_bindings!(
            $crate::contracts::ownership::OwnershipTransferRequested,
            filter_ownership_transfer_requested,
            watch_ownership_transfer_requested,
            parse_ownership_transfer_requested,
            from: ::alloy::primitives::Address,
            to: ::alloy::primitives::Address,
        );

        $crate::event_bindings!(
            $crate::contracts::ownership::OwnershipTransferred,
            filter_ownership_transferred,
            watch_ownership_transferred,
            parse_ownership_transferred,
            from: ::alloy::primitives::Address,
            to: ::alloy::primitives::Address,
        );
    };
}

bind_contract! {
    /// Ownable base whose first owner is chosen at deployment.
    pub struct ConfirmedOwner(CONFIRMED_OWNER_ABI);
}

impl ConfirmedOwner {
    pub async fn deploy<B>(
        opts: &TransactOpts,
        backend: Arc<B>,
        new_owner: Address,
    ) -> Result<(Address, SubmittedTransaction, Self)>
    where
        B: ContractBackend + 'static,
    {
        let bytecode = decode_bytecode(CONFIRMED_OWNER_BIN)?;
        let args = vec![new_owner.into_sol_value()];
        let (address, tx, contract) =
            deploy_contract(opts, Self::abi()?, bytecode, args, backend).await?;
        Ok((address, tx, contract.into()))
    }

    ownable_methods!();
}

bind_contract! {
    /// Ownable base deployed with an owner and, optionally, a pending
    /// successor that still has to accept.
    pub struct ConfirmedOwnerWithProposal(CONFIRMED_OWNER_WITH_PROPOSAL_ABI);
}

impl ConfirmedOwnerWithProposal {
    /// Pass the zero address as `pending_owner` to skip the proposal.
    pub async fn deploy<B>(
        opts: &TransactOpts,
        backend: Arc<B>,
        new_owner: Address,
        pending_owner: Address,
    ) -> Result<(Address, SubmittedTransaction, Self)>
    where
        B: ContractBackend + 'static,
    {
        let bytecode = decode_bytecode(CONFIRMED_OWNER_WITH_PROPOSAL_BIN)?;
        let args = vec![new_owner.into_sol_value(), pending_owner.into_sol_value()];
        let (address, tx, contract) =
            deploy_contract(opts, Self::abi()?, bytecode, args, backend).await?;
        Ok((address, tx, contract.into()))
    }

    ownable_methods!();
}

bind_contract! {
    /// Ownable base owned by its deployer.
    pub struct OwnerIsCreator(OWNER_IS_CREATOR_ABI);
}

impl OwnerIsCreator {
    pub async fn deploy<B>(
        opts: &TransactOpts,
        backend: Arc<B>,
    ) -> Result<(Address, SubmittedTransaction, Self)>
    where
        B: ContractBackend + 'static,
    {
        let bytecode = decode_bytecode(OWNER_IS_CREATOR_BIN)?;
        let (address, tx, contract) =
            deploy_contract(opts, Self::abi()?, bytecode, vec![], backend).await?;
        Ok((address, tx, contract.into()))
    }

    ownable_methods!();
}

bind_contract! {
    /// Interface form of the ownership surface. It declares `owner` without
    /// `view`, so reading it goes through a transaction.
    pub struct OwnableInterface(OWNABLE_INTERFACE_ABI);
}

impl OwnableInterface {
    pub async fn owner(&self, opts: &TransactOpts) -> Result<SubmittedTransaction> {
        self.contract.transact(opts, "owner", vec![]).await
    }

    pub async fn transfer_ownership(
        &self,
        opts: &TransactOpts,
        recipient: Address,
    ) -> Result<SubmittedTransaction> {
        self.contract
            .transact(opts, "transferOwnership", vec![recipient.into_sol_value()])
            .await
    }

    pub async fn accept_ownership(&self, opts: &TransactOpts) -> Result<SubmittedTransaction> {
        self.contract.transact(opts, "acceptOwnership", vec![]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::mock::{log, MockBackend};
    use crate::bind::{CallOpts, FilterOpts};
    use alloy::dyn_abi::DynSolValue;
    use alloy::primitives::{Bytes, B256};

    #[tokio::test]
    async fn test_deploy_appends_owner_to_bytecode() {
        let backend = Arc::new(MockBackend::default());
        let owner = Address::repeat_byte(0x42);

        let (address, tx, bound) =
            ConfirmedOwner::deploy(&TransactOpts::default(), backend.clone(), owner)
                .await
                .unwrap();

        assert_eq!(address, backend.sender().create(0));
        assert_eq!(bound.address(), address);

        let bytecode = decode_bytecode(CONFIRMED_OWNER_BIN).unwrap();
        let input = tx.request.input.input().unwrap().clone();
        assert!(input.starts_with(&bytecode));
        assert_eq!(&input[bytecode.len()..], owner.into_word().as_slice());
    }

    #[tokio::test]
    async fn test_deploy_with_proposal_encodes_both_owners() {
        let backend = Arc::new(MockBackend::default());
        let (owner, pending) = (Address::repeat_byte(0x42), Address::repeat_byte(0x43));

        let (_, tx, _) = ConfirmedOwnerWithProposal::deploy(
            &TransactOpts::default(),
            backend.clone(),
            owner,
            pending,
        )
        .await
        .unwrap();

        let bytecode = decode_bytecode(CONFIRMED_OWNER_WITH_PROPOSAL_BIN).unwrap();
        let input = tx.request.input.input().unwrap();
        let args = &input[bytecode.len()..];
        assert_eq!(&args[..32], owner.into_word().as_slice());
        assert_eq!(&args[32..], pending.into_word().as_slice());
    }

    #[tokio::test]
    async fn test_owner_call() {
        let backend = Arc::new(MockBackend::default());
        let address = Address::repeat_byte(0x01);
        let owner = Address::repeat_byte(0x42);
        let abi = OwnerIsCreator::abi().unwrap();
        backend.respond(
            abi.function("owner").unwrap()[0].selector(),
            DynSolValue::Address(owner).abi_encode(),
        );

        let bound = OwnerIsCreator::new(address, backend.clone()).unwrap();
        assert_eq!(bound.owner(&CallOpts::default()).await.unwrap(), owner);
    }

    #[tokio::test]
    async fn test_filter_ownership_transferred_by_new_owner() {
        let backend = Arc::new(MockBackend::default());
        let address = Address::repeat_byte(0x01);
        let (previous, next) = (Address::repeat_byte(0xaa), Address::repeat_byte(0xbb));
        let abi = ConfirmedOwner::abi().unwrap();
        let selector = abi.event("OwnershipTransferred").unwrap()[0].selector();
        backend.push_log(log(
            address,
            vec![selector, previous.into_word(), next.into_word()],
            Bytes::new(),
        ));

        let bound = ConfirmedOwner::new(address, backend.clone()).unwrap();
        let events = bound
            .filter_ownership_transferred(&FilterOpts::default(), &[], &[next])
            .await
            .unwrap()
            .collect()
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from, previous);
        assert_eq!(events[0].to, next);

        let filter = &backend.filters()[0];
        assert!(filter.topics[1].is_empty());
        assert!(filter.topics[2].matches(&next.into_word()));
        assert!(!filter.topics[2].matches(&B256::ZERO));
    }

    #[tokio::test]
    async fn test_transfer_ownership_encodes_new_owner() {
        let backend = Arc::new(MockBackend::default());
        let bound = ConfirmedOwner::new(Address::repeat_byte(0x01), backend.clone()).unwrap();
        let to = Address::repeat_byte(0x07);

        let tx = bound
            .transfer_ownership(&TransactOpts::default(), to)
            .await
            .unwrap();

        let input = tx.request.input.input().unwrap();
        let selector = ConfirmedOwner::abi().unwrap().function("transferOwnership").unwrap()[0]
            .selector();
        assert_eq!(&input[..4], selector.as_slice());
        assert_eq!(&input[4..], to.into_word().as_slice());
    }

    #[tokio::test]
    async fn test_ownable_interface_owner_is_a_transaction() {
        let backend = Arc::new(MockBackend::default());
        let bound =
            OwnableInterface::new_transactor(Address::repeat_byte(0x01), backend.clone()).unwrap();

        let tx = bound.owner(&TransactOpts::default()).await.unwrap();

        let selector = OwnableInterface::abi().unwrap().function("owner").unwrap()[0].selector();
        assert_eq!(tx.request.input.input().unwrap().as_ref(), selector.as_slice());
        assert!(backend.calls().is_empty());
        assert!(OwnableInterface::abi().unwrap().events.is_empty());
    }
}
