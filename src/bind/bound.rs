use alloy::dyn_abi::{DynSolValue, EventExt, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Event, EventParam, Function, JsonAbi, Param};
use alloy::network::TransactionBuilder;
use alloy::primitives::{keccak256, Address, Bytes, B256};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use std::sync::Arc;
use tracing::debug;

use super::backend::{
    ContractBackend, ContractCaller, ContractFilterer, ContractTransactor, LogSubscription,
    SubmittedTransaction,
};
use super::error::{Capability, Error, Result};
use super::opts::{CallOpts, FilterOpts, TransactOpts, WatchOpts};
use super::values::{conform, Values};

/// A decoded contract event carrying its raw log.
pub trait ContractEvent: Sized + Send + 'static {
    /// Event name as declared in the ABI.
    const NAME: &'static str;

    /// Builds the event from its fields in declaration order.
    fn from_fields(fields: Values, raw: Log) -> Result<Self>;
}

/// Runtime pairing of an address, a parsed ABI and the client capabilities
/// used to reach it. Immutable once built; clones share the capabilities.
#[derive(Clone)]
pub struct BoundContract {
    address: Address,
    abi: Arc<JsonAbi>,
    caller: Option<Arc<dyn ContractCaller>>,
    transactor: Option<Arc<dyn ContractTransactor>>,
    filterer: Option<Arc<dyn ContractFilterer>>,
}

impl std::fmt::Debug for BoundContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundContract")
            .field("address", &self.address)
            .field("caller", &self.caller.is_some())
            .field("transactor", &self.transactor.is_some())
            .field("filterer", &self.filterer.is_some())
            .finish()
    }
}

/// Parses a JSON contract ABI.
pub fn parse_abi(json: &str) -> Result<JsonAbi> {
    Ok(serde_json::from_str(json)?)
}

impl BoundContract {
    pub fn new(
        address: Address,
        abi: JsonAbi,
        caller: Option<Arc<dyn ContractCaller>>,
        transactor: Option<Arc<dyn ContractTransactor>>,
        filterer: Option<Arc<dyn ContractFilterer>>,
    ) -> Self {
        Self {
            address,
            abi: Arc::new(abi),
            caller,
            transactor,
            filterer,
        }
    }

    /// Binds `address` to the ABI in `json`. Fails only if the ABI does not
    /// parse.
    pub fn from_json(
        address: Address,
        json: &str,
        caller: Option<Arc<dyn ContractCaller>>,
        transactor: Option<Arc<dyn ContractTransactor>>,
        filterer: Option<Arc<dyn ContractFilterer>>,
    ) -> Result<Self> {
        let abi = parse_abi(json)?;
        Ok(Self::new(address, abi, caller, transactor, filterer))
    }

    /// Binds with all three capabilities taken from one backend.
    pub fn with_backend<B>(address: Address, json: &str, backend: Arc<B>) -> Result<Self>
    where
        B: ContractBackend + 'static,
    {
        Self::from_json(
            address,
            json,
            Some(backend.clone()),
            Some(backend.clone()),
            Some(backend),
        )
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    fn caller(&self) -> Result<&Arc<dyn ContractCaller>> {
        self.caller
            .as_ref()
            .ok_or(Error::MissingCapability(Capability::Caller))
    }

    fn transactor(&self) -> Result<&Arc<dyn ContractTransactor>> {
        self.transactor
            .as_ref()
            .ok_or(Error::MissingCapability(Capability::Transactor))
    }

    fn filterer(&self) -> Result<&Arc<dyn ContractFilterer>> {
        self.filterer
            .as_ref()
            .ok_or(Error::MissingCapability(Capability::Filterer))
    }

    fn function(&self, method: &str) -> Result<&Function> {
        self.abi
            .function(method)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| Error::UnknownMethod(method.to_string()))
    }

    fn event(&self, name: &str) -> Result<&Event> {
        self.abi
            .event(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| Error::UnknownEvent(name.to_string()))
    }

    /// Packs a method call: selector followed by the encoded arguments.
    pub fn pack(&self, method: &str, args: Vec<DynSolValue>) -> Result<Bytes> {
        let function = self.function(method)?;
        let args = conform_params(method, &function.inputs, args)?;
        let encoded = function
            .abi_encode_input(&args)
            .map_err(|e| Error::encode(method, e))?;
        Ok(encoded.into())
    }

    /// Decodes the raw output of `method`.
    pub fn unpack(&self, method: &str, output: &[u8]) -> Result<Vec<DynSolValue>> {
        let function = self.function(method)?;
        function
            .abi_decode_output(output, true)
            .map_err(|e| Error::decode(method, e))
    }

    /// Invokes a view method and returns its decoded outputs.
    pub async fn call(
        &self,
        opts: &CallOpts,
        method: &str,
        args: Vec<DynSolValue>,
    ) -> Result<Vec<DynSolValue>> {
        let caller = self.caller()?;
        let input = self.pack(method, args)?;
        let block = opts.block_id();

        let mut request = TransactionRequest::default()
            .to(self.address)
            .input(input.into());
        if let Some(from) = opts.from {
            request = request.from(from);
        }

        debug!("Calling {} on {:?} at {:?}", method, self.address, block);
        let output = caller
            .call_contract(request, block)
            .await
            .map_err(|source| Error::Call {
                method: method.to_string(),
                source,
            })?;

        if output.is_empty() && !self.function(method)?.outputs.is_empty() {
            let code = caller
                .code_at(self.address, block)
                .await
                .map_err(|source| Error::Call {
                    method: method.to_string(),
                    source,
                })?;
            if code.is_empty() {
                return Err(Error::NoCode);
            }
        }

        self.unpack(method, &output)
    }

    /// Like [`call`](Self::call), with the outputs wrapped in a [`Values`]
    /// cursor for typed extraction.
    pub async fn call_values(
        &self,
        opts: &CallOpts,
        method: &str,
        args: Vec<DynSolValue>,
    ) -> Result<Values> {
        let outputs = self.call(opts, method, args).await?;
        Ok(Values::new(method, outputs))
    }

    /// Invokes a state-mutating method. Returns once the transaction has been
    /// handed to the transactor; confirmation is the caller's concern.
    pub async fn transact(
        &self,
        opts: &TransactOpts,
        method: &str,
        args: Vec<DynSolValue>,
    ) -> Result<SubmittedTransaction> {
        let input = self.pack(method, args)?;
        self.submit(opts, Some(input)).await
    }

    /// Sends a plain value transfer to the contract.
    pub async fn transfer(&self, opts: &TransactOpts) -> Result<SubmittedTransaction> {
        self.submit(opts, None).await
    }

    async fn submit(&self, opts: &TransactOpts, input: Option<Bytes>) -> Result<SubmittedTransaction> {
        let transactor = self.transactor()?;
        let mut request = TransactionRequest::default().to(self.address);
        if let Some(input) = input {
            request = request.input(input.into());
        }
        let request = opts.apply(request);

        debug!("Submitting transaction to {:?}", self.address);
        transactor
            .send_transaction(request)
            .await
            .map_err(Error::Submission)
    }

    /// Builds the log filter for `event`: topic0 is the event selector, the
    /// following topics come from the indexed-argument rules in order. An
    /// empty rule matches anything.
    pub fn event_filter(&self, event: &str, rules: Vec<Vec<DynSolValue>>) -> Result<Filter> {
        let abi_event = self.event(event)?;
        let mut filter = Filter::new().address(self.address);
        if !abi_event.anonymous {
            filter = filter.event_signature(abi_event.selector());
        }

        let indexed: Vec<&EventParam> = abi_event
            .inputs
            .iter()
            .filter(|input| input.indexed)
            .collect();
        if rules.len() > indexed.len() {
            return Err(Error::encode(
                event,
                format!("{} topic rules for {} indexed inputs", rules.len(), indexed.len()),
            ));
        }

        let offset = if abi_event.anonymous { 0 } else { 1 };
        for (position, (rule, param)) in rules.into_iter().zip(indexed).enumerate() {
            if rule.is_empty() {
                continue;
            }
            let ty = param.resolve().map_err(|e| Error::encode(event, e))?;
            let topics = rule
                .into_iter()
                .map(|value| {
                    conform(value, &ty)
                        .map_err(|e| Error::encode(event, e))
                        .and_then(|value| topic_for(event, &value))
                })
                .collect::<Result<Vec<B256>>>()?;
            filter.topics[position + offset] = topics.into();
        }
        Ok(filter)
    }

    /// Retrieves historical occurrences of `event` matching `rules`.
    pub async fn filter_logs(
        &self,
        opts: &FilterOpts,
        event: &str,
        rules: Vec<Vec<DynSolValue>>,
    ) -> Result<LogSubscription> {
        let filterer = self.filterer()?;
        let mut filter = self.event_filter(event, rules)?.from_block(opts.start);
        if let Some(end) = opts.end {
            filter = filter.to_block(end);
        }

        debug!(
            "Filtering {} logs of {:?} from block {} to {:?}",
            event, self.address, opts.start, opts.end
        );
        let logs = filterer
            .filter_logs(filter)
            .await
            .map_err(Error::Subscription)?;
        Ok(LogSubscription::from_logs(logs))
    }

    /// Subscribes to future occurrences of `event` matching `rules`.
    pub async fn watch_logs(
        &self,
        opts: &WatchOpts,
        event: &str,
        rules: Vec<Vec<DynSolValue>>,
    ) -> Result<LogSubscription> {
        let filterer = self.filterer()?;
        let mut filter = self.event_filter(event, rules)?;
        if let Some(start) = opts.start {
            filter = filter.from_block(start);
        }

        debug!("Watching {} logs of {:?}", event, self.address);
        filterer
            .subscribe_filter_logs(filter)
            .await
            .map_err(Error::Subscription)
    }

    /// Decodes `log` as `E`. The log's first topic must be the selector of
    /// the event named `E::NAME`.
    pub fn unpack_log<E: ContractEvent>(&self, log: Log) -> Result<E> {
        let abi_event = self.event(E::NAME)?;
        if !abi_event.anonymous {
            let topic0 = log.topics().first().ok_or(Error::NoEventSignature)?;
            if *topic0 != abi_event.selector() {
                return Err(Error::EventSignatureMismatch);
            }
        }

        let decoded = abi_event
            .decode_log_parts(log.topics().iter().copied(), &log.data().data, true)
            .map_err(|e| Error::decode(E::NAME, e))?;

        let mut indexed = decoded.indexed.into_iter();
        let mut body = decoded.body.into_iter();
        let mut fields = Vec::with_capacity(abi_event.inputs.len());
        for input in &abi_event.inputs {
            let next = if input.indexed {
                indexed.next()
            } else {
                body.next()
            };
            fields.push(next.ok_or_else(|| {
                Error::decode(E::NAME, format!("missing value for '{}'", input.name))
            })?);
        }

        E::from_fields(Values::new(E::NAME, fields), log)
    }
}

/// Submits a contract-creation transaction carrying `bytecode` followed by
/// the encoded constructor arguments, and binds the resulting address.
pub async fn deploy_contract<B>(
    opts: &TransactOpts,
    abi: JsonAbi,
    bytecode: Bytes,
    args: Vec<DynSolValue>,
    backend: Arc<B>,
) -> Result<(Address, SubmittedTransaction, BoundContract)>
where
    B: ContractBackend + 'static,
{
    let encoded_args = match abi.constructor() {
        Some(constructor) => {
            let args = conform_params("constructor", &constructor.inputs, args)?;
            constructor
                .abi_encode_input(&args)
                .map_err(|e| Error::encode("constructor", e))?
        }
        None if args.is_empty() => Vec::new(),
        None => {
            return Err(Error::encode(
                "constructor",
                format!("ABI declares no constructor but {} arguments were given", args.len()),
            ))
        }
    };

    let mut code = bytecode.to_vec();
    code.extend_from_slice(&encoded_args);
    let request = opts.apply(TransactionRequest::default().with_deploy_code(code));

    debug!("Submitting contract deployment ({} bytes of bytecode)", bytecode.len());
    let tx = backend
        .send_transaction(request)
        .await
        .map_err(Error::Submission)?;
    let address = tx.created_address();

    let contract = BoundContract::new(
        address,
        abi,
        Some(backend.clone()),
        Some(backend.clone()),
        Some(backend),
    );
    Ok((address, tx, contract))
}

/// Decodes a `0x`-prefixed hex bytecode string.
pub fn decode_bytecode(hex_code: &str) -> Result<Bytes> {
    let trimmed = hex_code.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    Ok(hex::decode(trimmed)?.into())
}

fn conform_params(name: &str, params: &[Param], args: Vec<DynSolValue>) -> Result<Vec<DynSolValue>> {
    if params.len() != args.len() {
        let expected: Vec<String> = params
            .iter()
            .map(|param| format!("{} {}", param.ty, param.name))
            .collect();
        return Err(Error::encode(
            name,
            format!(
                "expected {} arguments, got {}. Expected parameters: [{}]",
                params.len(),
                args.len(),
                expected.join(", ")
            ),
        ));
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param.resolve().map_err(|e| Error::encode(name, e))?;
            conform(arg, &ty).map_err(|e| {
                Error::encode(name, format!("parameter '{}' of type '{}': {}", param.name, param.ty, e))
            })
        })
        .collect()
}

fn topic_for(event: &str, value: &DynSolValue) -> Result<B256> {
    if let Some(word) = value.as_word() {
        return Ok(word);
    }
    match value {
        DynSolValue::String(_) | DynSolValue::Bytes(_) => Ok(keccak256(value.abi_encode_packed())),
        _ => Err(Error::encode(
            event,
            "indexed arrays and tuples cannot be used as topic filters",
        )),
    }
}
