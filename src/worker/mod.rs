pub mod handlers;
pub mod manager;
pub mod poller;

pub use handlers::EventHandlers;
pub use manager::IndexerManager;
pub use poller::EventPoller;
