pub mod activity;
pub mod balance;
pub mod chain;
pub mod config;
pub mod context;
pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod metadata;
pub mod notifier;
pub mod query;
pub mod range;
pub mod repository;
pub mod rpc;
pub mod scanner;
pub mod selectors;
pub mod store;

pub use activity::ActivityEvent;
pub use context::TrackerContext;
pub use dispatcher::{AddressOutcome, CycleOutcome, Dispatcher, DispatcherSettings};
