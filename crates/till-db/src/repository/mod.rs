//! # Repository Module
//!
//! Database repository implementations for Tillpoint.
//!
//! Repositories abstract SQL behind a clean API; each owns a pool clone
//! and is cheap to create from [`Database`](crate::pool::Database)
//! accessors. Methods that must participate in the checkout transaction
//! take the caller's `Transaction` explicitly instead of the pool - the
//! transaction boundary is always owned by the coordinator, never hidden
//! inside a repository.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - catalog reads/writes
//! - [`stock::StockLedger`] - guarded stock counters + movement trail
//! - [`order::OrderRepository`] - orders and line items
//! - [`customer::CustomerRepository`] - loyalty customers
//! - [`setting::SettingRepository`] - key/value configuration
//! - [`audit::AuditRepository`] - append-only audit trail

pub mod audit;
pub mod customer;
pub mod order;
pub mod product;
pub mod setting;
pub mod stock;
