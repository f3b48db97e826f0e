// app/src/lib.rs

//! Kiosque: checkout, payment reconciliation and digital access for a
//! magazine shop.

pub mod catalog;
pub mod config;
pub mod errors;
pub mod models;
pub mod money;
pub mod pipelines;
pub mod services;
pub mod shipping;
pub mod state;
pub mod store;
pub mod web;
