pub mod config;
pub mod error;
pub mod events;
pub mod ledger;
pub mod retry;
pub mod store;
pub mod utils;
pub mod worker;

pub use config::Settings;
pub use error::HandlerError;
pub use events::EventKind;
pub use ledger::{LedgerClient, RpcLedgerClient};
pub use retry::{execute_with_retry, RetryConfig};
pub use store::{MemoryStore, PostgresStore, Store};
pub use worker::{EventHandlers, EventPoller, IndexerManager};
