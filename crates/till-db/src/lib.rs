//! # till-db: Database Layer for Tillpoint
//!
//! SQLite persistence for the Tillpoint POS, plus the one transactional
//! core of the system: the checkout coordinator.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, stock, order,
//!   customer, setting, audit)
//! - [`checkout`] - The checkout transaction coordinator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_db::{CheckoutRequest, Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("tillpoint.db")).await?;
//!
//! let checkout = db.checkout_service();
//! let completed = checkout.checkout("user-1", request).await?;
//! println!("{}", completed.order.order_number);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{
    CheckoutError, CheckoutItem, CheckoutRequest, CheckoutService, CompletedCheckout,
    CustomerSummary,
};
pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::audit::AuditRepository;
pub use repository::customer::CustomerRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::setting::SettingRepository;
pub use repository::stock::{StockError, StockLedger};
