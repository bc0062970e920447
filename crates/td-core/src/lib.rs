//! td-core — local mirror and push reconciliation for td.
//!
//! td keeps a flat set of markdown **topics** on disk and synchronizes
//! them with a remote store. Each topic has a **synchronized copy**
//! (`old/`) and a **working copy** (`new/`); a push sends the pending
//! working copies and promotes the ones the remote accepted.

pub mod config;
pub mod detect;
pub mod diff;
pub mod error;
pub mod fsutil;
pub mod http;
pub mod index;
pub mod lock;
pub mod mirror;
pub mod remote;
pub mod state;
pub mod store;
pub mod suggest;
pub mod sync;
pub mod topic;

#[cfg(test)]
mod testutil;

pub use config::Config;
pub use error::{TdError, TdResult};
pub use remote::Remote;
pub use store::{PushOptions, Store};
pub use topic::Topic;
