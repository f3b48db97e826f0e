// app/src/web/handlers/mod.rs

pub mod catalog_handlers;
pub mod checkout_handlers;
pub mod issue_handlers;
pub mod shipping_handlers;
