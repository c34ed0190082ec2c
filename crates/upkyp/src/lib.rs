//! Billing, late-fee and payment ledger workflows for the Upkyp property management service.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
