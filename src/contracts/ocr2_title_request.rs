//! OCR2 demo consumer: requests a page title by URL and receives it through
//! an OCR2 report. Also binds the `OCR2Base` contract it extends and the
//! `typeAndVersion` interface.

use alloy::primitives::{Address, Bytes, B256};
use std::sync::Arc;

use crate::bind::{
    decode_bytecode, deploy_contract, CallOpts, ContractBackend, IntoSolValue, Result,
    SubmittedTransaction, TransactOpts,
};
use crate::{bind_contract, contract_event, event_bindings};

pub const OCR2_TITLE_REQUEST_ABI: &str = include_str!("../../abi/ocr2_title_request.json");
pub const OCR2_TITLE_REQUEST_BIN: &str = include_str!("../../abi/ocr2_title_request.bin");
pub const OCR2_BASE_ABI: &str = include_str!("../../abi/ocr2_base.json");
pub const TYPE_AND_VERSION_INTERFACE_ABI: &str =
    include_str!("../../abi/type_and_version_interface.json");

/// Result of `latestConfigDetails` on an OCR2 contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigDetails {
    pub config_count: u32,
    pub block_number: u32,
    pub config_digest: B256,
}

/// Arguments of an OCR2 `setConfig`.
#[derive(Debug, Clone, Default)]
pub struct Ocr2Config {
    pub signers: Vec<Address>,
    pub transmitters: Vec<Address>,
    /// Maximum number of faulty oracles.
    pub f: u8,
    pub onchain_config: Bytes,
    pub offchain_config_version: u64,
    pub offchain_config: Bytes,
}

contract_event! {
    pub struct ConfigSet("ConfigSet") {
        pub previous_config_block_number: u32,
        pub config_digest: B256,
        pub config_count: u64,
        pub signers: Vec<Address>,
        pub transmitters: Vec<Address>,
        pub f: u8,
        pub onchain_config: Bytes,
        pub encoded_config_version: u64,
        pub encoded: Bytes,
    }
}

contract_event! {
    pub struct TitleFulfillment("TitleFulfillment") {
        pub request_id: B256,
        pub title: String,
    }
}

contract_event! {
    pub struct TitleRequest("TitleRequest") {
        pub request_id: B256,
        pub url: String,
    }
}

contract_event! {
    /// A report was accepted for `config_digest` in `epoch`.
    pub struct Transmited("Transmited") {
        pub config_digest: B256,
        pub epoch: u32,
    }
}

/// Config, transmission and ownership surface of every `OCR2Base`
/// descendant.
macro_rules! ocr2_base_methods {
    () => {
        pub async fn latest_config_details(&self, opts: &CallOpts) -> Result<ConfigDetails> {
            let mut values = self
                .contract
                .call_values(opts, "latestConfigDetails", vec![])
                .await?;
            Ok(ConfigDetails {
                config_count: values.take()?,
                block_number: values.take()?,
                config_digest: values.take()?,
            })
        }

        pub async fn transmitters(&self, opts: &CallOpts) -> Result<Vec<Address>> {
            self.contract
                .call_values(opts, "transmitters", vec![])
                .await?
                .take()
        }

        pub async fn type_and_version(&self, opts: &CallOpts) -> Result<String> {
            self.contract
                .call_values(opts, "typeAndVersion", vec![])
                .await?
                .take()
        }

        pub async fn set_config(
            &self,
            opts: &TransactOpts,
            config: Ocr2Config,
        ) -> Result<SubmittedTransaction> {
            let args = vec![
                config.signers.into_sol_value(),
                config.transmitters.into_sol_value(),
                config.f.into_sol_value(),
                config.onchain_config.into_sol_value(),
                config.offchain_config_version.into_sol_value(),
                config.offchain_config.into_sol_value(),
            ];
            self.contract.transact(opts, "setConfig", args).await
        }

        /// Submits a signed report. `report_context` is the config digest,
        /// the epoch and round, and extra hash.
        pub async fn transmit(
            &self,
            opts: &TransactOpts,
            report_context: [B256; 3],
            report: Bytes,
            rs: Vec<B256>,
            ss: Vec<B256>,
            raw_vs: B256,
        ) -> Result<SubmittedTransaction> {
            let args = vec![
                report_context.into_sol_value(),
                report.into_sol_value(),
                rs.into_sol_value(),
                ss.into_sol_value(),
                raw_vs.into_sol_value(),
            ];
            self.contract.transact(opts, "transmit", args).await
        }

        ownable_methods!();

        event_bindings!(ConfigSet, filter_config_set, watch_config_set, parse_config_set);

        event_bindings!(Transmited, filter_transmited, watch_transmited, parse_transmited);
    };
}

bind_contract! {
    /// Abstract OCR2 contract: config and report transmission. Bind it at
    /// the address of any concrete descendant.
    pub struct Ocr2Base(OCR2_BASE_ABI);
}

impl Ocr2Base {
    ocr2_base_methods!();
}

bind_contract! {
    pub struct Ocr2TitleRequest(OCR2_TITLE_REQUEST_ABI);
}

impl Ocr2TitleRequest {
    pub async fn deploy<B>(
        opts: &TransactOpts,
        backend: Arc<B>,
    ) -> Result<(Address, SubmittedTransaction, Self)>
    where
        B: ContractBackend + 'static,
    {
        let bytecode = decode_bytecode(OCR2_TITLE_REQUEST_BIN)?;
        let (address, tx, contract) =
            deploy_contract(opts, Self::abi()?, bytecode, vec![], backend).await?;
        Ok((address, tx, contract.into()))
    }

    pub async fn fulfilled(&self, opts: &CallOpts, request_id: B256) -> Result<bool> {
        self.contract
            .call_values(opts, "fulfilled", vec![request_id.into_sol_value()])
            .await?
            .take()
    }

    /// Emits a `TitleRequest` for `url`.
    pub async fn request(&self, opts: &TransactOpts, url: &str) -> Result<SubmittedTransaction> {
        self.contract
            .transact(opts, "request", vec![url.into_sol_value()])
            .await
    }

    ocr2_base_methods!();

    event_bindings!(
        TitleFulfillment,
        filter_title_fulfillment,
        watch_title_fulfillment,
        parse_title_fulfillment,
    );

    event_bindings!(
        TitleRequest,
        filter_title_request,
        watch_title_request,
        parse_title_request,
    );
}

bind_contract! {
    /// Anything reporting its contract type and version string.
    pub struct TypeAndVersionInterface(TYPE_AND_VERSION_INTERFACE_ABI);
}

impl TypeAndVersionInterface {
    pub async fn type_and_version(&self, opts: &CallOpts) -> Result<String> {
        self.contract
            .call_values(opts, "typeAndVersion", vec![])
            .await?
            .take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::mock::{log, MockBackend};
    use crate::bind::WatchOpts;
    use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
    use tokio::sync::mpsc;

    const CONSUMER: Address = Address::repeat_byte(0x0d);

    fn title_request_log(request_id: B256, url: &str) -> alloy::rpc::types::Log {
        let abi = Ocr2TitleRequest::abi().unwrap();
        let data = DynSolValue::Tuple(vec![
            DynSolValue::FixedBytes(request_id, 32),
            DynSolValue::String(url.to_string()),
        ])
        .abi_encode_params();
        log(
            CONSUMER,
            vec![abi.event("TitleRequest").unwrap()[0].selector()],
            data.into(),
        )
    }

    #[tokio::test]
    async fn test_deploy_without_arguments_sends_bare_bytecode() {
        let backend = Arc::new(MockBackend::default());
        let (address, tx, _) = Ocr2TitleRequest::deploy(&TransactOpts::default(), backend.clone())
            .await
            .unwrap();

        assert_eq!(address, backend.sender().create(0));
        let bytecode = decode_bytecode(OCR2_TITLE_REQUEST_BIN).unwrap();
        assert_eq!(tx.request.input.input().unwrap(), &bytecode);
    }

    #[tokio::test]
    async fn test_transmit_encodes_report_context() {
        let backend = Arc::new(MockBackend::default());
        let consumer = Ocr2TitleRequest::new(CONSUMER, backend.clone()).unwrap();
        let context = [B256::repeat_byte(1), B256::repeat_byte(2), B256::repeat_byte(3)];

        let tx = consumer
            .transmit(
                &TransactOpts::default(),
                context,
                Bytes::from_static(b"report"),
                vec![B256::repeat_byte(4)],
                vec![B256::repeat_byte(5)],
                B256::ZERO,
            )
            .await
            .unwrap();

        let abi = Ocr2TitleRequest::abi().unwrap();
        let function = &abi.function("transmit").unwrap()[0];
        let input = tx.request.input.input().unwrap();
        let args = function.abi_decode_input(&input[4..], true).unwrap();
        assert_eq!(args[0], context.into_sol_value());
        assert_eq!(args[1], DynSolValue::Bytes(b"report".to_vec()));
    }

    #[tokio::test]
    async fn test_watch_title_requests_in_order() {
        let backend = Arc::new(MockBackend::default());
        let consumer = Ocr2TitleRequest::new(CONSUMER, backend.clone()).unwrap();
        let (tx, mut rx) = mpsc::channel(8);

        let _sub = consumer
            .watch_title_request(&WatchOpts::default(), tx)
            .await
            .unwrap();

        for (n, url) in ["https://a.example", "https://b.example"].iter().enumerate() {
            backend
                .emit(title_request_log(B256::repeat_byte(n as u8), url))
                .await;
        }

        assert_eq!(rx.recv().await.unwrap().url, "https://a.example");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.url, "https://b.example");
        assert_eq!(second.request_id, B256::repeat_byte(1));
    }

    #[tokio::test]
    async fn test_fulfilled_by_request_id() {
        let backend = Arc::new(MockBackend::default());
        let abi = Ocr2TitleRequest::abi().unwrap();
        backend.respond(
            abi.function("fulfilled").unwrap()[0].selector(),
            DynSolValue::Bool(false).abi_encode(),
        );

        let consumer = Ocr2TitleRequest::new_caller(CONSUMER, backend.clone()).unwrap();
        let done = consumer
            .fulfilled(&CallOpts::default(), B256::repeat_byte(9))
            .await
            .unwrap();
        assert!(!done);
    }

    #[tokio::test]
    async fn test_base_binding_reads_config_of_descendant() {
        let backend = Arc::new(MockBackend::default());
        let abi = Ocr2Base::abi().unwrap();
        let output = DynSolValue::Tuple(vec![
            DynSolValue::Uint(alloy::primitives::U256::from(2), 32),
            DynSolValue::Uint(alloy::primitives::U256::from(1_234), 32),
            DynSolValue::FixedBytes(B256::repeat_byte(0xcd), 32),
        ])
        .abi_encode_params();
        backend.respond(abi.function("latestConfigDetails").unwrap()[0].selector(), output);

        let base = Ocr2Base::new_caller(CONSUMER, backend.clone()).unwrap();
        let details = base.latest_config_details(&CallOpts::default()).await.unwrap();
        assert_eq!(
            details,
            ConfigDetails {
                config_count: 2,
                block_number: 1_234,
                config_digest: B256::repeat_byte(0xcd),
            }
        );

        // Shared selectors, so the base binding works on the consumer.
        let consumer = Ocr2TitleRequest::abi().unwrap();
        assert_eq!(
            abi.function("transmit").unwrap()[0].selector(),
            consumer.function("transmit").unwrap()[0].selector()
        );
    }

    #[tokio::test]
    async fn test_type_and_version_interface() {
        let backend = Arc::new(MockBackend::default());
        let abi = TypeAndVersionInterface::abi().unwrap();
        backend.respond(
            abi.function("typeAndVersion").unwrap()[0].selector(),
            DynSolValue::Tuple(vec![DynSolValue::String("OCR2TitleRequest 1.0.0".into())])
                .abi_encode_params(),
        );

        let bound = TypeAndVersionInterface::new_caller(CONSUMER, backend.clone()).unwrap();
        assert_eq!(
            bound.type_and_version(&CallOpts::default()).await.unwrap(),
            "OCR2TitleRequest 1.0.0"
        );
    }
}
