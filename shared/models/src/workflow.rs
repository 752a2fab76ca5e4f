//! State carried through one linear lifecycle run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, ContactId, InvoiceId, LeadId, QuoteId, WorkOrderId};
use crate::status::{InvoiceStatus, LeadStatus, QuoteStatus, WorkOrderStatus};

/// Stages of the linear customer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    Lead,
    Conversion,
    Quote,
    WorkOrder,
    Invoice,
}

impl WorkflowStage {
    pub const ALL: [WorkflowStage; 5] = [
        WorkflowStage::Lead,
        WorkflowStage::Conversion,
        WorkflowStage::Quote,
        WorkflowStage::WorkOrder,
        WorkflowStage::Invoice,
    ];
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lead => write!(f, "Lead"),
            Self::Conversion => write!(f, "Conversion"),
            Self::Quote => write!(f, "Quote"),
            Self::WorkOrder => write!(f, "Work order"),
            Self::Invoice => write!(f, "Invoice"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    pub id: LeadId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: LeadStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub id: ContactId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: AccountId,
    pub name: String,
    pub primary_contact_linked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    pub id: QuoteId,
    pub status: QuoteStatus,
    pub issue_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderRecord {
    pub id: WorkOrderId,
    pub work_order_number: Option<String>,
    pub status: WorkOrderStatus,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub completed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub id: InvoiceId,
    pub status: InvoiceStatus,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// What one linear run has created so far.
///
/// Starts empty and fills in stage by stage; whatever is here when a stage
/// fails stays in the backend and is reported back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub lead: Option<LeadRecord>,
    pub contact: Option<ContactRecord>,
    pub account: Option<AccountRecord>,
    pub quote: Option<QuoteRecord>,
    pub work_order: Option<WorkOrderRecord>,
    pub invoice: Option<InvoiceRecord>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the invoice has been paid
    pub fn is_complete(&self) -> bool {
        matches!(&self.invoice, Some(invoice) if invoice.status == InvoiceStatus::Paid)
    }

    /// Number of records created so far
    pub fn created_count(&self) -> usize {
        [
            self.lead.is_some(),
            self.contact.is_some(),
            self.account.is_some(),
            self.quote.is_some(),
            self.work_order.is_some(),
            self.invoice.is_some(),
        ]
        .iter()
        .filter(|created| **created)
        .count()
    }
}

/// What a linear run hands back to its caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowReport {
    pub success: bool,
    pub results: WorkflowState,
    pub errors: Vec<String>,
    /// Best-effort steps that failed without stopping the run
    pub warnings: Vec<String>,
    pub failed_stage: Option<WorkflowStage>,
}
