//! Batch generation configuration and run accumulator.

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::marker::PhantomData;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::ids::{AccountId, ContactId, InvoiceId, LeadId, QuoteId, WorkOrderId};
use crate::status::{
    EntityKind, InvoiceStatus, LeadStatus, LifecycleStatus, QuoteStatus, WorkOrderStatus,
};

/// Upper bound on any per-kind count in a single run
pub const MAX_COUNT_PER_KIND: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightError {
    #[error("{kind} status weights are empty")]
    Empty { kind: EntityKind },

    #[error("{kind} status '{label}' has an invalid weight {weight}")]
    Invalid {
        kind: EntityKind,
        label: String,
        weight: f64,
    },

    #[error("{kind} status '{label}' appears more than once")]
    Duplicate { kind: EntityKind, label: String },

    #[error("{kind} status weights sum to zero")]
    ZeroTotal { kind: EntityKind },
}

/// Ordered status → weight map.
///
/// Iteration order is insertion order (document order when deserialized);
/// the sampler's cumulative step function is built in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusWeights<S> {
    entries: Vec<(S, f64)>,
}

impl<S: LifecycleStatus> StatusWeights<S> {
    pub fn new(entries: Vec<(S, f64)>) -> Self {
        Self { entries }
    }

    /// Every status of the kind with weight 1
    pub fn uniform() -> Self {
        Self::new(S::ALL.iter().map(|&status| (status, 1.0)).collect())
    }

    /// All weight on one status
    pub fn only(status: S) -> Self {
        Self::new(vec![(status, 1.0)])
    }

    pub fn entries(&self) -> &[(S, f64)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, weight)| weight).sum()
    }

    pub fn weight_of(&self, status: S) -> Option<f64> {
        self.entries
            .iter()
            .find(|(candidate, _)| *candidate == status)
            .map(|(_, weight)| *weight)
    }

    /// Weights must be finite and non-negative, labels unique, sum positive.
    pub fn check(&self) -> Result<(), WeightError> {
        if self.entries.is_empty() {
            return Err(WeightError::Empty { kind: S::KIND });
        }

        for (i, (status, weight)) in self.entries.iter().enumerate() {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(WeightError::Invalid {
                    kind: S::KIND,
                    label: status.label().to_string(),
                    weight: *weight,
                });
            }
            if self.entries[..i].iter().any(|(earlier, _)| earlier == status) {
                return Err(WeightError::Duplicate {
                    kind: S::KIND,
                    label: status.label().to_string(),
                });
            }
        }

        if self.total() <= 0.0 {
            return Err(WeightError::ZeroTotal { kind: S::KIND });
        }

        Ok(())
    }
}

impl<S: LifecycleStatus, const N: usize> From<[(S, f64); N]> for StatusWeights<S> {
    fn from(entries: [(S, f64); N]) -> Self {
        Self::new(entries.into())
    }
}

impl<S: LifecycleStatus> Serialize for StatusWeights<S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (status, weight) in &self.entries {
            map.serialize_entry(status.label(), weight)?;
        }
        map.end()
    }
}

struct WeightsVisitor<S>(PhantomData<S>);

impl<'de, S: LifecycleStatus> Visitor<'de> for WeightsVisitor<S> {
    type Value = StatusWeights<S>;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "a map of {} status labels to weights", S::KIND)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((label, weight)) = access.next_entry::<String, f64>()? {
            let status = S::parse(&label).ok_or_else(|| {
                de::Error::custom(format!("unknown {} status '{}'", S::KIND, label))
            })?;
            entries.push((status, weight));
        }
        Ok(StatusWeights::new(entries))
    }
}

impl<'de, S: LifecycleStatus> Deserialize<'de> for StatusWeights<S> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(WeightsVisitor(PhantomData))
    }
}

fn weight_error(err: WeightError) -> ValidationError {
    let mut error = ValidationError::new("status_weights");
    error.message = Some(err.to_string().into());
    error
}

fn validate_lead_weights(weights: &StatusWeights<LeadStatus>) -> Result<(), ValidationError> {
    weights.check().map_err(weight_error)
}

fn validate_quote_weights(weights: &StatusWeights<QuoteStatus>) -> Result<(), ValidationError> {
    weights.check().map_err(weight_error)
}

fn validate_work_order_weights(
    weights: &StatusWeights<WorkOrderStatus>,
) -> Result<(), ValidationError> {
    weights.check().map_err(weight_error)
}

fn validate_invoice_weights(weights: &StatusWeights<InvoiceStatus>) -> Result<(), ValidationError> {
    weights.check().map_err(weight_error)
}

/// What a batch run should produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationConfig {
    #[validate(range(max = 10000, message = "At most 10000 accounts per run"))]
    pub accounts: u32,
    #[validate(range(max = 10000, message = "At most 10000 contacts per run"))]
    pub contacts: u32,
    #[validate(range(max = 10000, message = "At most 10000 leads per run"))]
    pub leads: u32,
    #[validate(range(max = 10000, message = "At most 10000 quotes per run"))]
    pub quotes: u32,
    #[validate(range(max = 10000, message = "At most 10000 work orders per run"))]
    pub work_orders: u32,
    #[validate(range(max = 10000, message = "At most 10000 invoices per run"))]
    pub invoices: u32,
    #[validate(custom = "validate_lead_weights")]
    pub lead_status_weights: StatusWeights<LeadStatus>,
    #[validate(custom = "validate_quote_weights")]
    pub quote_status_weights: StatusWeights<QuoteStatus>,
    #[validate(custom = "validate_work_order_weights")]
    pub work_order_status_weights: StatusWeights<WorkOrderStatus>,
    #[validate(custom = "validate_invoice_weights")]
    pub invoice_status_weights: StatusWeights<InvoiceStatus>,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
}

impl GenerationConfig {
    pub fn count_for(&self, kind: EntityKind) -> u32 {
        match kind {
            EntityKind::Account => self.accounts,
            EntityKind::Contact => self.contacts,
            EntityKind::Lead => self.leads,
            EntityKind::Quote => self.quotes,
            EntityKind::WorkOrder => self.work_orders,
            EntityKind::Invoice => self.invoices,
        }
    }

    /// Same weights, every count zero
    pub fn empty() -> Self {
        Self {
            accounts: 0,
            contacts: 0,
            leads: 0,
            quotes: 0,
            work_orders: 0,
            invoices: 0,
            ..Self::default()
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            accounts: 10,
            contacts: 20,
            leads: 30,
            quotes: 25,
            work_orders: 20,
            invoices: 20,
            lead_status_weights: StatusWeights::from([
                (LeadStatus::New, 30.0),
                (LeadStatus::Contacted, 25.0),
                (LeadStatus::Qualified, 20.0),
                (LeadStatus::Unqualified, 10.0),
                (LeadStatus::Converted, 15.0),
            ]),
            quote_status_weights: StatusWeights::from([
                (QuoteStatus::Draft, 20.0),
                (QuoteStatus::Presented, 30.0),
                (QuoteStatus::Accepted, 35.0),
                (QuoteStatus::Declined, 15.0),
            ]),
            work_order_status_weights: StatusWeights::from([
                (WorkOrderStatus::Pending, 25.0),
                (WorkOrderStatus::InProgress, 25.0),
                (WorkOrderStatus::Completed, 40.0),
                (WorkOrderStatus::Cancelled, 10.0),
            ]),
            invoice_status_weights: StatusWeights::from([
                (InvoiceStatus::Draft, 15.0),
                (InvoiceStatus::Sent, 25.0),
                (InvoiceStatus::Paid, 45.0),
                (InvoiceStatus::Overdue, 15.0),
            ]),
            seed: None,
        }
    }
}

/// Identifiers created during a run, in creation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResults {
    pub accounts: Vec<AccountId>,
    pub contacts: Vec<ContactId>,
    pub leads: Vec<LeadId>,
    pub quotes: Vec<QuoteId>,
    pub work_orders: Vec<WorkOrderId>,
    pub invoices: Vec<InvoiceId>,
}

impl GenerationResults {
    pub fn count_for(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Account => self.accounts.len(),
            EntityKind::Contact => self.contacts.len(),
            EntityKind::Lead => self.leads.len(),
            EntityKind::Quote => self.quotes.len(),
            EntityKind::WorkOrder => self.work_orders.len(),
            EntityKind::Invoice => self.invoices.len(),
        }
    }
}

/// One recorded failure.
///
/// `index` is set for a single skipped entity and absent when a whole
/// kind's loop was aborted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    pub kind: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    pub message: String,
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// In-memory accumulator for one batch run. Never persisted.
#[derive(Debug, Default)]
pub struct GenerationRun {
    pub results: GenerationResults,
    errors: Vec<RunError>,
    warnings: Vec<String>,
    contact_accounts: HashMap<ContactId, AccountId>,
    quotes_by_contact: HashMap<ContactId, Vec<QuoteId>>,
    work_orders_by_contact: HashMap<ContactId, Vec<WorkOrderId>>,
}

impl GenerationRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_entity_error(&mut self, kind: EntityKind, index: u32, message: impl Into<String>) {
        self.errors.push(RunError {
            kind,
            index: Some(index),
            message: message.into(),
        });
    }

    pub fn record_stage_error(&mut self, kind: EntityKind, message: impl Into<String>) {
        self.errors.push(RunError {
            kind,
            index: None,
            message: message.into(),
        });
    }

    pub fn record_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn errors(&self) -> &[RunError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Entities of `kind` that were skipped because of a failure
    pub fn entity_error_count(&self, kind: EntityKind) -> usize {
        self.errors
            .iter()
            .filter(|e| e.kind == kind && e.index.is_some())
            .count()
    }

    pub fn link_contact_account(&mut self, contact: ContactId, account: AccountId) {
        self.contact_accounts.insert(contact, account);
    }

    pub fn account_for(&self, contact: &ContactId) -> Option<&AccountId> {
        self.contact_accounts.get(contact)
    }

    /// Only accepted quotes can be referenced by later work orders.
    pub fn add_quote(&mut self, contact: ContactId, quote: QuoteId, status: QuoteStatus) {
        self.results.quotes.push(quote.clone());
        if status == QuoteStatus::Accepted {
            self.quotes_by_contact.entry(contact).or_default().push(quote);
        }
    }

    pub fn quotes_for(&self, contact: &ContactId) -> &[QuoteId] {
        self.quotes_by_contact
            .get(contact)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cancelled work orders are never billed.
    pub fn add_work_order(
        &mut self,
        contact: ContactId,
        work_order: WorkOrderId,
        status: WorkOrderStatus,
    ) {
        self.results.work_orders.push(work_order.clone());
        if status != WorkOrderStatus::Cancelled {
            self.work_orders_by_contact
                .entry(contact)
                .or_default()
                .push(work_order);
        }
    }

    pub fn work_orders_for(&self, contact: &ContactId) -> &[WorkOrderId] {
        self.work_orders_by_contact
            .get(contact)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn into_report(self) -> GenerationReport {
        GenerationReport {
            success: self.errors.is_empty(),
            results: self.results,
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

/// What a batch run hands back to its caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub success: bool,
    pub results: GenerationResults,
    pub errors: Vec<RunError>,
    pub warnings: Vec<String>,
}

impl GenerationReport {
    pub fn error_messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }

    pub fn errors_for(&self, kind: EntityKind) -> impl Iterator<Item = &RunError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}
