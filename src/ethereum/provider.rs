use crate::bind::{
    BackendError, ContractCaller, ContractFilterer, ContractTransactor, Error, LogSubscription,
    SubmittedTransaction, Subscription,
};
use crate::config::{Config, NetworkConfig};
use alloy::{
    eips::BlockId,
    network::EthereumWallet,
    primitives::{Address, Bytes},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{Filter, Log, TransactionRequest},
    signers::local::PrivateKeySigner,
    transports::{
        http::{Client, Http},
        Transport,
    },
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Logs buffered per live subscription before the poller waits on the
/// consumer.
const LOG_BUFFER: usize = 256;

/// Binder capabilities on top of an alloy JSON-RPC provider.
///
/// `sender` is the account used for transactions that do not name one; it
/// must be an account the provider can sign for.
pub struct ProviderBackend<P, T> {
    provider: P,
    sender: Option<Address>,
    _transport: PhantomData<fn() -> T>,
}

impl<P, T> ProviderBackend<P, T>
where
    P: Provider<T> + Clone + 'static,
    T: Transport + Clone,
{
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            sender: None,
            _transport: PhantomData,
        }
    }

    pub fn with_sender(provider: P, sender: Address) -> Self {
        Self {
            provider,
            sender: Some(sender),
            _transport: PhantomData,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn sender(&self) -> Option<Address> {
        self.sender
    }
}

impl<P, T> std::fmt::Debug for ProviderBackend<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBackend")
            .field("sender", &self.sender)
            .finish()
    }
}

#[async_trait]
impl<P, T> ContractCaller for ProviderBackend<P, T>
where
    P: Provider<T> + Clone + 'static,
    T: Transport + Clone,
{
    async fn code_at(&self, contract: Address, block: BlockId) -> Result<Bytes, BackendError> {
        Ok(self.provider.get_code_at(contract).block_id(block).await?)
    }

    async fn call_contract(
        &self,
        call: TransactionRequest,
        block: BlockId,
    ) -> Result<Bytes, BackendError> {
        Ok(self.provider.call(&call).block(block).await?)
    }
}

#[async_trait]
impl<P, T> ContractTransactor for ProviderBackend<P, T>
where
    P: Provider<T> + Clone + 'static,
    T: Transport + Clone,
{
    async fn send_transaction(
        &self,
        mut tx: TransactionRequest,
    ) -> Result<SubmittedTransaction, BackendError> {
        let from = tx
            .from
            .or(self.sender)
            .ok_or_else(|| BackendError::other("transaction has no sender"))?;

        // Pinned up front so contract-creation addresses can be derived.
        let nonce = match tx.nonce {
            Some(nonce) => nonce,
            None => {
                self.provider
                    .get_transaction_count(from)
                    .block_id(BlockId::pending())
                    .await?
            }
        };
        tx.from = Some(from);
        tx.nonce = Some(nonce);

        let pending = self.provider.send_transaction(tx.clone()).await?;
        let hash = *pending.tx_hash();
        tracing::info!("Transaction sent with hash: {:?}", hash);

        Ok(SubmittedTransaction {
            hash,
            from,
            nonce,
            request: tx,
        })
    }
}

#[async_trait]
impl<P, T> ContractFilterer for ProviderBackend<P, T>
where
    P: Provider<T> + Clone + 'static,
    T: Transport + Clone,
{
    async fn filter_logs(&self, filter: Filter) -> Result<Vec<Log>, BackendError> {
        Ok(self.provider.get_logs(&filter).await?)
    }

    /// Installs a node-side log filter and polls it from a background task.
    async fn subscribe_filter_logs(&self, filter: Filter) -> Result<LogSubscription, BackendError> {
        let poller = self.provider.watch_logs(&filter).await?;
        let mut stream = Box::pin(poller.into_stream().flat_map(futures::stream::iter));

        let (logs_tx, logs_rx) = mpsc::channel(LOG_BUFFER);
        let (quit_tx, mut quit_rx) = oneshot::channel::<()>();
        let (sub, errors) = Subscription::new(move || {
            let _ = quit_tx.send(());
        });

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut quit_rx => break,
                    next = stream.next() => {
                        let Some(log) = next else {
                            errors.fail(Error::Subscription(BackendError::other(
                                "log poller stopped",
                            )));
                            break;
                        };
                        tokio::select! {
                            _ = &mut quit_rx => break,
                            sent = logs_tx.send(log) => {
                                if sent.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            tracing::debug!("Log poller task finished");
        });

        Ok(LogSubscription { logs: logs_rx, sub })
    }
}

/// Read-only backend over a plain HTTP provider.
pub type HttpBackend = ProviderBackend<RootProvider<Http<Client>>, Http<Client>>;

#[derive(Debug)]
pub struct ProviderManager {
    providers: HashMap<String, RootProvider<Http<Client>>>,
    config: Config,
}

impl ProviderManager {
    pub fn new(config: Config) -> Result<Self> {
        let mut providers = HashMap::new();

        for (network_name, network_config) in &config.networks {
            let provider = Self::create_provider(network_config)?;
            providers.insert(network_name.clone(), provider);
        }

        Ok(Self { providers, config })
    }

    fn create_provider(network_config: &NetworkConfig) -> Result<RootProvider<Http<Client>>> {
        let provider = ProviderBuilder::new().on_http(network_config.rpc_url.parse()?);

        Ok(provider)
    }

    fn network_name<'a>(&'a self, network: Option<&'a str>) -> &'a str {
        network.unwrap_or(&self.config.default_network)
    }

    pub fn get_provider(&self, network: Option<&str>) -> Result<&RootProvider<Http<Client>>> {
        let network_name = self.network_name(network);
        self.providers
            .get(network_name)
            .ok_or_else(|| anyhow!("Network '{}' not found", network_name))
    }

    pub fn get_network_config(&self, network: Option<&str>) -> Result<&NetworkConfig> {
        let network_name = self.network_name(network);
        self.config
            .networks
            .get(network_name)
            .ok_or_else(|| anyhow!("Network '{}' not configured", network_name))
    }

    pub fn get_available_networks(&self) -> Vec<String> {
        self.config.networks.keys().cloned().collect()
    }

    /// Backend without signing capability, for calls and log queries.
    pub fn backend(&self, network: Option<&str>) -> Result<Arc<HttpBackend>> {
        let provider = self.get_provider(network)?.clone();
        Ok(Arc::new(ProviderBackend::new(provider)))
    }

    /// Backend that signs transactions locally with `private_key`.
    pub fn signing_backend(
        &self,
        network: Option<&str>,
        private_key: &str,
    ) -> Result<Arc<ProviderBackend<impl Provider<Http<Client>> + Clone + 'static, Http<Client>>>>
    {
        let private_key = private_key.trim();
        let private_key = private_key.strip_prefix("0x").unwrap_or(private_key);
        let signer = PrivateKeySigner::from_str(private_key)
            .map_err(|e| anyhow!("Invalid private key: {}", e))?;
        let sender = signer.address();
        tracing::info!("Signing transactions as {:?}", sender);

        let network_config = self.get_network_config(network)?;
        let url = network_config
            .rpc_url
            .parse()
            .map_err(|e| anyhow!("Invalid RPC URL '{}': {}", network_config.rpc_url, e))?;

        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(url);

        Ok(Arc::new(ProviderBackend::with_sender(provider, sender)))
    }

    /// Validates network connectivity with detailed error information
    pub async fn validate_network_connection(&self, network: Option<&str>) -> Result<()> {
        let network_name = self.network_name(network);
        let provider = self
            .get_provider(network)
            .map_err(|e| anyhow!("Network '{}' is not configured: {}", network_name, e))?;

        match provider.get_block_number().await {
            Ok(_) => Ok(()),
            Err(e) => Err(anyhow!(
                "Cannot connect to network '{}': {}. Please check your RPC endpoint configuration and network connectivity.",
                network_name,
                crate::ethereum::utils::interpret_rpc_error(&e.to_string())
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_builds_one_provider_per_network() {
        let manager = ProviderManager::new(Config::default()).unwrap();
        let mut networks = manager.get_available_networks();
        networks.sort();

        assert_eq!(networks, vec!["ethereum", "sepolia"]);
        assert!(manager.get_provider(None).is_ok());
        assert!(manager.get_provider(Some("sepolia")).is_ok());
        assert!(manager.get_provider(Some("polygon")).is_err());
    }

    #[test]
    fn test_signing_backend_rejects_bad_key() {
        let manager = ProviderManager::new(Config::default()).unwrap();
        assert!(manager.signing_backend(None, "0xnot-a-key").is_err());
    }

    #[test]
    fn test_signing_backend_derives_sender() {
        let manager = ProviderManager::new(Config::default()).unwrap();
        // Well-known development key.
        let backend = manager
            .signing_backend(
                None,
                "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            )
            .unwrap();
        assert_eq!(
            backend.sender(),
            Some(Address::from_str("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap())
        );
    }
}
