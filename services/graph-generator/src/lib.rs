//! BizGraph Graph Generator
//!
//! Populates a CRM / field-service backend with synthetic but internally
//! consistent records: accounts, contacts, leads, quotes, work orders and
//! invoices, each moved to a status drawn from a configurable distribution.
//! Two entry points share one entity factory:
//!
//! - [`BatchGenerator`] creates configured counts per kind
//! - [`LinearWorkflowRunner`] walks one customer from lead to paid invoice

pub mod api;
pub mod batch;
pub mod factory;
pub mod sampler;
pub mod synth;
pub mod workflow;

pub use api::{router, AppState};
pub use batch::BatchGenerator;
pub use factory::{ContactOutcome, EntityFactory, PayloadTier};
pub use sampler::{sample_status, sample_weighted};
pub use workflow::LinearWorkflowRunner;
