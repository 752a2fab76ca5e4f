//! Data API contract
//!
//! The generator never talks to storage directly. Every record is created
//! and moved through its lifecycle by calling the backend's named remote
//! procedures, grouped by entity kind. `DataApi` is that contract; the HTTP
//! client and the in-memory store are its two implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use bizgraph_models::{
    AccountContactLink, AccountId, ContactId, InvoiceFromWorkOrder, InvoiceId, InvoiceStatus,
    LeadId, LeadUpdate, NewAccount, NewContact, NewInvoice, NewLead, NewQuote, NewWorkOrder,
    QuoteId, QuoteStatus, WorkOrderId, WorkOrderStatus,
};
use bizgraph_utils::BizGraphResult;

pub mod http;
pub mod memory;

pub use http::HttpDataApi;
pub use memory::InMemoryDataApi;

/// Remote procedures the generator calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Procedure {
    CreateAccount,
    LinkContactToAccount,
    CreateContact,
    CreateLead,
    UpdateLead,
    CreateQuote,
    ChangeQuoteStatus,
    CreateWorkOrder,
    ChangeWorkOrderStatus,
    CreateInvoice,
    CreateInvoiceFromWorkOrder,
    ChangeInvoiceStatus,
}

impl Procedure {
    /// `module:function` path on the backend
    pub fn path(&self) -> &'static str {
        match self {
            Self::CreateAccount => "accounts:create",
            Self::LinkContactToAccount => "accounts:linkContactToAccount",
            Self::CreateContact => "contacts:create",
            Self::CreateLead => "leads:create",
            Self::UpdateLead => "leads:update",
            Self::CreateQuote => "quotes:create",
            Self::ChangeQuoteStatus => "quotes:changeStatus",
            Self::CreateWorkOrder => "workOrders:create",
            Self::ChangeWorkOrderStatus => "workOrders:changeStatus",
            Self::CreateInvoice => "invoices:create",
            Self::CreateInvoiceFromWorkOrder => "invoices:createFromWorkOrder",
            Self::ChangeInvoiceStatus => "invoices:changeStatus",
        }
    }
}

impl std::fmt::Display for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Backend contract. Every call may reject.
#[async_trait]
pub trait DataApi: Send + Sync {
    async fn create_account(&self, account: &NewAccount) -> BizGraphResult<AccountId>;

    async fn link_contact_to_account(&self, link: &AccountContactLink) -> BizGraphResult<()>;

    async fn create_contact(&self, contact: &NewContact) -> BizGraphResult<ContactId>;

    async fn create_lead(&self, lead: &NewLead) -> BizGraphResult<LeadId>;

    async fn update_lead(&self, id: &LeadId, update: &LeadUpdate) -> BizGraphResult<()>;

    async fn create_quote(&self, quote: &NewQuote) -> BizGraphResult<QuoteId>;

    async fn change_quote_status(&self, id: &QuoteId, status: QuoteStatus) -> BizGraphResult<()>;

    async fn create_work_order(&self, work_order: &NewWorkOrder) -> BizGraphResult<WorkOrderId>;

    async fn change_work_order_status(
        &self,
        id: &WorkOrderId,
        status: WorkOrderStatus,
        completed_date: Option<DateTime<Utc>>,
    ) -> BizGraphResult<()>;

    async fn create_invoice(&self, invoice: &NewInvoice) -> BizGraphResult<InvoiceId>;

    async fn create_invoice_from_work_order(
        &self,
        input: &InvoiceFromWorkOrder,
    ) -> BizGraphResult<InvoiceId>;

    async fn change_invoice_status(&self, id: &InvoiceId, status: InvoiceStatus)
        -> BizGraphResult<()>;
}
