//! Generic contract binder shared by every typed binding in this crate.

pub mod backend;
pub mod bound;
pub mod error;
pub mod iterator;
pub mod macros;
pub mod mock;
pub mod opts;
pub mod values;
pub mod watch;

pub use backend::{
    ContractBackend, ContractCaller, ContractFilterer, ContractTransactor, LogSubscription,
    SubmittedTransaction, Subscription, SubscriptionErrorSink,
};
pub use bound::{decode_bytecode, deploy_contract, parse_abi, BoundContract, ContractEvent};
pub use error::{BackendError, Capability, Error, Result};
pub use iterator::{filter_event, LogIterator};
pub use mock::MockBackend;
pub use opts::{CallOpts, FilterOpts, TransactOpts, WatchOpts};
pub use values::{conform, rule, FromSolValue, IntoSolValue, Values};
pub use watch::{spawn_watcher, watch_event};
