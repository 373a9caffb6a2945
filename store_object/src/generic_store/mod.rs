mod binding;
pub mod core;
pub mod operations;
pub mod relations;
pub mod store_object;
pub mod transaction;

pub use core::GenericStore;
pub use transaction::{StoreTransaction, TxStore};
