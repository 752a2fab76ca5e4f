//! # BizGraph Core Domain Models
//!
//! Types shared by the synthetic business-graph generator and the Data API
//! clients that persist what it generates.
//!
//! ## Key Models
//!
//! - **Typed ids**: one newtype per record kind over the backend's opaque ids
//! - **Status lifecycles**: closed status enums for leads, quotes, work orders
//!   and invoices, each with an allowed-transition table
//! - **Creation payloads**: `NewAccount`, `NewContact`, `NewQuote`, ... with
//!   `validator` rules and the backend's camelCase / epoch-millisecond wire shape
//! - **GenerationConfig / GenerationRun / GenerationReport**: batch input,
//!   accumulator and output
//! - **WorkflowState / WorkflowReport**: linear lifecycle run state and output

pub mod ids;
pub mod status;
pub mod entities;
pub mod generation;
pub mod workflow;

#[cfg(test)]
pub mod property_tests;

pub use ids::*;
pub use status::*;
pub use entities::*;
pub use generation::*;
pub use workflow::*;
