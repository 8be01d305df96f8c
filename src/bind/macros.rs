/// Declares a typed binding around a [`BoundContract`](crate::bind::BoundContract).
///
/// ```ignore
/// bind_contract! {
///     /// Docs for the wrapper.
///     pub struct TestValidator(ABI);
/// }
/// ```
///
/// expands to the struct plus its constructors: `new` takes one backend
/// providing every capability, `new_caller` / `new_transactor` /
/// `new_filterer` bind with a single capability. Typed methods are added in
/// a separate `impl` block next to the invocation.
#[macro_export]
macro_rules! bind_contract {
    ($(#[$meta:meta])* $vis:vis struct $name:ident($abi:expr);) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            contract: $crate::bind::BoundContract,
        }

        impl $name {
            /// Binds an instance at `address` with every capability taken
            /// from `backend`.
            pub fn new<B>(
                address: ::alloy::primitives::Address,
                backend: ::std::sync::Arc<B>,
            ) -> $crate::bind::Result<Self>
            where
                B: $crate::bind::ContractBackend + 'static,
            {
                let contract = $crate::bind::BoundContract::with_backend(address, $abi, backend)?;
                Ok(Self { contract })
            }

            /// Read-only binding.
            pub fn new_caller(
                address: ::alloy::primitives::Address,
                caller: ::std::sync::Arc<dyn $crate::bind::ContractCaller>,
            ) -> $crate::bind::Result<Self> {
                let contract =
                    $crate::bind::BoundContract::from_json(address, $abi, Some(caller), None, None)?;
                Ok(Self { contract })
            }

            /// Write-only binding.
            pub fn new_transactor(
                address: ::alloy::primitives::Address,
                transactor: ::std::sync::Arc<dyn $crate::bind::ContractTransactor>,
            ) -> $crate::bind::Result<Self> {
                let contract = $crate::bind::BoundContract::from_json(
                    address,
                    $abi,
                    None,
                    Some(transactor),
                    None,
                )?;
                Ok(Self { contract })
            }

            /// Log-only binding.
            pub fn new_filterer(
                address: ::alloy::primitives::Address,
                filterer: ::std::sync::Arc<dyn $crate::bind::ContractFilterer>,
            ) -> $crate::bind::Result<Self> {
                let contract =
                    $crate::bind::BoundContract::from_json(address, $abi, None, None, Some(filterer))?;
                Ok(Self { contract })
            }

            /// Parses this contract's ABI.
            pub fn abi() -> $crate::bind::Result<::alloy::json_abi::JsonAbi> {
                $crate::bind::parse_abi($abi)
            }

            pub fn address(&self) -> ::alloy::primitives::Address {
                self.contract.address()
            }

            /// Untyped access for raw `call`, `transact` and `transfer`.
            pub fn bound(&self) -> &$crate::bind::BoundContract {
                &self.contract
            }
        }

        impl From<$crate::bind::BoundContract> for $name {
            fn from(contract: $crate::bind::BoundContract) -> Self {
                Self { contract }
            }
        }
    };
}

/// Declares a decoded event struct and its [`ContractEvent`](crate::bind::ContractEvent)
/// impl. Fields are listed in ABI declaration order, indexed or not; the raw
/// log is kept in `raw`.
#[macro_export]
macro_rules! contract_event {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($event:literal) {
            $($(#[$field_meta:meta])* pub $field:ident: $ty:ty,)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            $($(#[$field_meta])* pub $field: $ty,)*
            pub raw: ::alloy::rpc::types::Log,
        }

        impl $crate::bind::ContractEvent for $name {
            const NAME: &'static str = $event;

            #[allow(unused_mut, unused_variables)]
            fn from_fields(
                mut fields: $crate::bind::Values,
                raw: ::alloy::rpc::types::Log,
            ) -> $crate::bind::Result<Self> {
                Ok(Self {
                    $($field: fields.take()?,)*
                    raw,
                })
            }
        }
    };
}

/// Generates the `filter_*`, `watch_*` and `parse_*` methods of one event
/// inside a binding's `impl` block. Each indexed argument becomes a slice of
/// accepted values; an empty slice matches anything.
#[macro_export]
macro_rules! event_bindings {
    ($event:ty, $filter:ident, $watch:ident, $parse:ident $(, $arg:ident: $ty:ty)* $(,)?) => {
        pub async fn $filter(
            &self,
            opts: &$crate::bind::FilterOpts,
            $($arg: &[$ty],)*
        ) -> $crate::bind::Result<$crate::bind::LogIterator<$event>> {
            $crate::bind::filter_event(
                &self.contract,
                opts,
                vec![$($crate::bind::rule($arg)),*],
            )
            .await
        }

        pub async fn $watch(
            &self,
            opts: &$crate::bind::WatchOpts,
            sink: ::tokio::sync::mpsc::Sender<$event>,
            $($arg: &[$ty],)*
        ) -> $crate::bind::Result<$crate::bind::Subscription> {
            $crate::bind::watch_event(
                &self.contract,
                opts,
                vec![$($crate::bind::rule($arg)),*],
                sink,
            )
            .await
        }

        pub fn $parse(
            &self,
            log: ::alloy::rpc::types::Log,
        ) -> $crate::bind::Result<$event> {
            self.contract.unpack_log(log)
        }
    };
}
