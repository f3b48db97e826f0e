// app/src/models/mod.rs

//! Data structures for persisted rows and request payloads.

pub mod cart;
pub mod grant;
pub mod issue;
pub mod order;

pub use cart::{CartLine, CheckoutRequest, CustomerInfo};
pub use grant::{DigitalAccessGrant, GrantKind, NewGrant};
pub use issue::{Issue, StockDecrement};
pub use order::{
  Address, BillingMode, MarkPaidOutcome, NewOrder, Order, OrderLine, OrderStatus, PaymentConfirmation, PaymentStatus,
};
