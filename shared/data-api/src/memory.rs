//! In-memory Data API
//!
//! Implements the whole contract against process-local maps. Identifiers are
//! fresh UUIDs, references to unknown records are rejected and every status
//! change must follow the kind's transition table. Procedures can be made to
//! reject on demand, which is how failure paths are exercised.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use bizgraph_models::{
    AccountContactLink, AccountId, ContactId, EntityKind, InvoiceFromWorkOrder, InvoiceId,
    InvoiceStatus, LeadId, LeadUpdate, LifecycleStatus, LineItem, NewAccount, NewContact,
    NewInvoice, NewLead, NewQuote, NewWorkOrder, QuoteId, QuoteStatus, WorkOrderId,
    WorkOrderStatus,
};
use bizgraph_utils::{validate_model, BizGraphError, BizGraphResult};

use crate::{DataApi, Procedure};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredAccount {
    pub id: AccountId,
    pub data: NewAccount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredContact {
    pub id: ContactId,
    pub data: NewContact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredLead {
    pub id: LeadId,
    pub data: NewLead,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredQuote {
    pub id: QuoteId,
    pub data: NewQuote,
    pub status: QuoteStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredWorkOrder {
    pub id: WorkOrderId,
    pub data: NewWorkOrder,
    pub status: WorkOrderStatus,
    pub completed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredInvoice {
    pub id: InvoiceId,
    pub data: NewInvoice,
    pub status: InvoiceStatus,
}

#[derive(Debug, Default)]
struct Store {
    accounts: HashMap<AccountId, StoredAccount>,
    contacts: HashMap<ContactId, StoredContact>,
    leads: HashMap<LeadId, StoredLead>,
    quotes: HashMap<QuoteId, StoredQuote>,
    work_orders: HashMap<WorkOrderId, StoredWorkOrder>,
    invoices: HashMap<InvoiceId, StoredInvoice>,
    links: Vec<AccountContactLink>,
}

impl Store {
    fn require_contact(&self, procedure: Procedure, id: &ContactId) -> BizGraphResult<()> {
        if self.contacts.contains_key(id) {
            Ok(())
        } else {
            Err(missing(procedure, EntityKind::Contact, id))
        }
    }

    fn require_account(&self, procedure: Procedure, id: Option<&AccountId>) -> BizGraphResult<()> {
        match id {
            Some(id) if !self.accounts.contains_key(id) => {
                Err(missing(procedure, EntityKind::Account, id))
            }
            _ => Ok(()),
        }
    }
}

/// Rejections to inject
#[derive(Debug, Default)]
struct FaultPlan {
    always: HashSet<Procedure>,
    next: HashMap<Procedure, u32>,
}

impl FaultPlan {
    fn should_reject(&mut self, procedure: Procedure) -> bool {
        if self.always.contains(&procedure) {
            return true;
        }
        match self.next.get_mut(&procedure) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

fn missing(procedure: Procedure, kind: EntityKind, id: &impl std::fmt::Display) -> BizGraphError {
    BizGraphError::data_api(procedure.path(), format!("{} {} not found", kind, id))
}

fn new_id<T: From<String>>() -> T {
    T::from(Uuid::new_v4().to_string())
}

/// Data API backed by process memory
#[derive(Clone, Default)]
pub struct InMemoryDataApi {
    store: Arc<RwLock<Store>>,
    faults: Arc<Mutex<FaultPlan>>,
    calls: Arc<Mutex<Vec<Procedure>>>,
}

impl InMemoryDataApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `procedure` reject
    pub fn reject_always(&self, procedure: Procedure) {
        self.lock_faults().always.insert(procedure);
    }

    /// Make the next `count` calls to `procedure` reject
    pub fn reject_next(&self, procedure: Procedure, count: u32) {
        *self.lock_faults().next.entry(procedure).or_insert(0) += count;
    }

    pub fn clear_faults(&self) {
        let mut faults = self.lock_faults();
        faults.always.clear();
        faults.next.clear();
    }

    /// Every call made so far, rejected ones included, in order
    pub fn calls(&self) -> Vec<Procedure> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self, procedure: Procedure) -> usize {
        self.calls().iter().filter(|p| **p == procedure).count()
    }

    pub async fn record_count(&self, kind: EntityKind) -> usize {
        let store = self.store.read().await;
        match kind {
            EntityKind::Account => store.accounts.len(),
            EntityKind::Contact => store.contacts.len(),
            EntityKind::Lead => store.leads.len(),
            EntityKind::Quote => store.quotes.len(),
            EntityKind::WorkOrder => store.work_orders.len(),
            EntityKind::Invoice => store.invoices.len(),
        }
    }

    pub async fn account(&self, id: &AccountId) -> Option<StoredAccount> {
        self.store.read().await.accounts.get(id).cloned()
    }

    pub async fn contact(&self, id: &ContactId) -> Option<StoredContact> {
        self.store.read().await.contacts.get(id).cloned()
    }

    pub async fn lead(&self, id: &LeadId) -> Option<StoredLead> {
        self.store.read().await.leads.get(id).cloned()
    }

    pub async fn quote(&self, id: &QuoteId) -> Option<StoredQuote> {
        self.store.read().await.quotes.get(id).cloned()
    }

    pub async fn work_order(&self, id: &WorkOrderId) -> Option<StoredWorkOrder> {
        self.store.read().await.work_orders.get(id).cloned()
    }

    pub async fn invoice(&self, id: &InvoiceId) -> Option<StoredInvoice> {
        self.store.read().await.invoices.get(id).cloned()
    }

    pub async fn links(&self) -> Vec<AccountContactLink> {
        self.store.read().await.links.clone()
    }

    fn lock_faults(&self) -> std::sync::MutexGuard<'_, FaultPlan> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Logs the call and applies any injected rejection
    fn enter(&self, procedure: Procedure) -> BizGraphResult<()> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(procedure);

        if self.lock_faults().should_reject(procedure) {
            debug!(procedure = %procedure, "Injected rejection");
            return Err(BizGraphError::data_api(
                procedure.path(),
                "Injected failure",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DataApi for InMemoryDataApi {
    async fn create_account(&self, account: &NewAccount) -> BizGraphResult<AccountId> {
        self.enter(Procedure::CreateAccount)?;
        validate_model("account", account)?;

        let id: AccountId = new_id();
        self.store.write().await.accounts.insert(
            id.clone(),
            StoredAccount {
                id: id.clone(),
                data: account.clone(),
            },
        );
        Ok(id)
    }

    async fn link_contact_to_account(&self, link: &AccountContactLink) -> BizGraphResult<()> {
        let procedure = Procedure::LinkContactToAccount;
        self.enter(procedure)?;
        validate_model("account contact link", link)?;

        let mut store = self.store.write().await;
        store.require_contact(procedure, &link.contact_id)?;
        store.require_account(procedure, Some(&link.account_id))?;

        if link.is_primary {
            for existing in store
                .links
                .iter_mut()
                .filter(|l| l.account_id == link.account_id)
            {
                existing.is_primary = false;
            }
        }
        store
            .links
            .retain(|l| !(l.account_id == link.account_id && l.contact_id == link.contact_id));
        store.links.push(link.clone());
        Ok(())
    }

    async fn create_contact(&self, contact: &NewContact) -> BizGraphResult<ContactId> {
        self.enter(Procedure::CreateContact)?;
        validate_model("contact", contact)?;

        let id: ContactId = new_id();
        self.store.write().await.contacts.insert(
            id.clone(),
            StoredContact {
                id: id.clone(),
                data: contact.clone(),
            },
        );
        Ok(id)
    }

    async fn create_lead(&self, lead: &NewLead) -> BizGraphResult<LeadId> {
        self.enter(Procedure::CreateLead)?;
        validate_model("lead", lead)?;

        let id: LeadId = new_id();
        self.store.write().await.leads.insert(
            id.clone(),
            StoredLead {
                id: id.clone(),
                data: lead.clone(),
            },
        );
        Ok(id)
    }

    async fn update_lead(&self, id: &LeadId, update: &LeadUpdate) -> BizGraphResult<()> {
        let procedure = Procedure::UpdateLead;
        self.enter(procedure)?;

        let mut store = self.store.write().await;
        let lead = store
            .leads
            .get_mut(id)
            .ok_or_else(|| missing(procedure, EntityKind::Lead, id))?;

        if let Some(status) = update.status {
            if status != lead.data.status {
                lead.data.status.check_transition(status)?;
                lead.data.status = status;
            }
        }
        if let Some(notes) = &update.notes {
            lead.data.notes = Some(notes.clone());
        }
        Ok(())
    }

    async fn create_quote(&self, quote: &NewQuote) -> BizGraphResult<QuoteId> {
        let procedure = Procedure::CreateQuote;
        self.enter(procedure)?;
        validate_model("quote", quote)?;

        let mut store = self.store.write().await;
        store.require_contact(procedure, &quote.contact_id)?;
        store.require_account(procedure, quote.account_id.as_ref())?;

        let id: QuoteId = new_id();
        store.quotes.insert(
            id.clone(),
            StoredQuote {
                id: id.clone(),
                data: quote.clone(),
                status: QuoteStatus::initial(),
            },
        );
        Ok(id)
    }

    async fn change_quote_status(&self, id: &QuoteId, status: QuoteStatus) -> BizGraphResult<()> {
        let procedure = Procedure::ChangeQuoteStatus;
        self.enter(procedure)?;

        let mut store = self.store.write().await;
        let quote = store
            .quotes
            .get_mut(id)
            .ok_or_else(|| missing(procedure, EntityKind::Quote, id))?;
        quote.status.check_transition(status)?;
        quote.status = status;
        Ok(())
    }

    async fn create_work_order(&self, work_order: &NewWorkOrder) -> BizGraphResult<WorkOrderId> {
        let procedure = Procedure::CreateWorkOrder;
        self.enter(procedure)?;
        validate_model("work order", work_order)?;

        let mut store = self.store.write().await;
        store.require_contact(procedure, &work_order.contact_id)?;
        store.require_account(procedure, work_order.account_id.as_ref())?;
        if let Some(quote_id) = &work_order.quote_id {
            if !store.quotes.contains_key(quote_id) {
                return Err(missing(procedure, EntityKind::Quote, quote_id));
            }
        }

        let id: WorkOrderId = new_id();
        store.work_orders.insert(
            id.clone(),
            StoredWorkOrder {
                id: id.clone(),
                data: work_order.clone(),
                status: WorkOrderStatus::initial(),
                completed_date: None,
            },
        );
        Ok(id)
    }

    async fn change_work_order_status(
        &self,
        id: &WorkOrderId,
        status: WorkOrderStatus,
        completed_date: Option<DateTime<Utc>>,
    ) -> BizGraphResult<()> {
        let procedure = Procedure::ChangeWorkOrderStatus;
        self.enter(procedure)?;

        let mut store = self.store.write().await;
        let work_order = store
            .work_orders
            .get_mut(id)
            .ok_or_else(|| missing(procedure, EntityKind::WorkOrder, id))?;
        work_order.status.check_transition(status)?;

        if status == WorkOrderStatus::Completed {
            let completed = completed_date.ok_or_else(|| {
                BizGraphError::data_api(
                    procedure.path(),
                    "completedDate is required when completing a work order",
                )
            })?;
            work_order.completed_date = Some(completed);
        }
        work_order.status = status;
        Ok(())
    }

    async fn create_invoice(&self, invoice: &NewInvoice) -> BizGraphResult<InvoiceId> {
        let procedure = Procedure::CreateInvoice;
        self.enter(procedure)?;
        validate_model("invoice", invoice)?;

        let mut store = self.store.write().await;
        store.require_contact(procedure, &invoice.contact_id)?;
        store.require_account(procedure, invoice.account_id.as_ref())?;
        if let Some(work_order_id) = &invoice.work_order_id {
            if !store.work_orders.contains_key(work_order_id) {
                return Err(missing(procedure, EntityKind::WorkOrder, work_order_id));
            }
        }

        let id: InvoiceId = new_id();
        store.invoices.insert(
            id.clone(),
            StoredInvoice {
                id: id.clone(),
                data: invoice.clone(),
                status: InvoiceStatus::initial(),
            },
        );
        Ok(id)
    }

    async fn create_invoice_from_work_order(
        &self,
        input: &InvoiceFromWorkOrder,
    ) -> BizGraphResult<InvoiceId> {
        let procedure = Procedure::CreateInvoiceFromWorkOrder;
        self.enter(procedure)?;
        validate_model("invoice from work order", input)?;

        let mut store = self.store.write().await;
        let work_order = store
            .work_orders
            .get(&input.work_order_id)
            .ok_or_else(|| missing(procedure, EntityKind::WorkOrder, &input.work_order_id))?;

        if work_order.status != WorkOrderStatus::Completed {
            return Err(BizGraphError::data_api(
                procedure.path(),
                format!(
                    "Work order must be Completed before invoicing, found {}",
                    work_order.status
                ),
            ));
        }

        // Bill the quoted items when the work order came from a quote
        let line_items = work_order
            .data
            .quote_id
            .as_ref()
            .and_then(|quote_id| store.quotes.get(quote_id))
            .map(|quote| quote.data.line_items.clone())
            .unwrap_or_else(|| {
                vec![LineItem {
                    description: format!(
                        "Work order {}",
                        work_order
                            .data
                            .work_order_number
                            .clone()
                            .unwrap_or_else(|| work_order.id.to_string())
                    ),
                    quantity: 1,
                    unit_price: 0.0,
                }]
            });

        let invoice = NewInvoice {
            invoice_number: None,
            contact_id: work_order.data.contact_id.clone(),
            account_id: work_order.data.account_id.clone(),
            work_order_id: Some(work_order.id.clone()),
            issue_date: input.issue_date,
            due_date: input.due_date,
            paid_date: None,
            line_items,
            notes: input.notes.clone(),
        };

        let id: InvoiceId = new_id();
        store.invoices.insert(
            id.clone(),
            StoredInvoice {
                id: id.clone(),
                data: invoice,
                status: InvoiceStatus::initial(),
            },
        );
        Ok(id)
    }

    async fn change_invoice_status(
        &self,
        id: &InvoiceId,
        status: InvoiceStatus,
    ) -> BizGraphResult<()> {
        let procedure = Procedure::ChangeInvoiceStatus;
        self.enter(procedure)?;

        let mut store = self.store.write().await;
        let invoice = store
            .invoices
            .get_mut(id)
            .ok_or_else(|| missing(procedure, EntityKind::Invoice, id))?;
        invoice.status.check_transition(status)?;

        if status == InvoiceStatus::Paid && invoice.data.paid_date.is_none() {
            invoice.data.paid_date = Some(Utc::now());
        }
        invoice.status = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizgraph_models::AccountType;
    use chrono::Duration;

    fn contact() -> NewContact {
        NewContact {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: Some("ada@example.com".to_string()),
            phone: None,
            address: None,
            city: None,
            state: None,
            zip: None,
            notes: None,
        }
    }

    fn account() -> NewAccount {
        NewAccount {
            name: "Northwind Heating".to_string(),
            account_type: AccountType::Commercial,
            address: "12 Elm St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: "62701".to_string(),
            notes: None,
        }
    }

    fn quote_for(contact_id: ContactId) -> NewQuote {
        let issue = Utc::now();
        NewQuote {
            contact_id,
            account_id: None,
            issue_date: issue,
            expiry_date: issue + Duration::days(30),
            line_items: vec![LineItem {
                description: "Boiler service".to_string(),
                quantity: 1,
                unit_price: 300.0,
            }],
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_contact_is_rejected() {
        let api = InMemoryDataApi::new();
        let err = api
            .create_quote(&quote_for(ContactId::new("nope")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("contact nope not found"));
        assert_eq!(api.record_count(EntityKind::Quote).await, 0);
    }

    #[tokio::test]
    async fn test_quote_transitions_follow_table() {
        let api = InMemoryDataApi::new();
        let contact_id = api.create_contact(&contact()).await.unwrap();
        let quote_id = api.create_quote(&quote_for(contact_id)).await.unwrap();

        let err = api
            .change_quote_status(&quote_id, QuoteStatus::Accepted)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_TRANSITION");

        api.change_quote_status(&quote_id, QuoteStatus::Presented)
            .await
            .unwrap();
        api.change_quote_status(&quote_id, QuoteStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(
            api.quote(&quote_id).await.unwrap().status,
            QuoteStatus::Accepted
        );
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let api = InMemoryDataApi::new();
        api.reject_next(Procedure::CreateContact, 1);

        assert!(api.create_contact(&contact()).await.is_err());
        assert!(api.create_contact(&contact()).await.is_ok());

        api.reject_always(Procedure::CreateAccount);
        assert!(api.create_account(&account()).await.is_err());
        assert!(api.create_account(&account()).await.is_err());

        api.clear_faults();
        assert!(api.create_account(&account()).await.is_ok());

        assert_eq!(api.call_count(Procedure::CreateContact), 2);
        assert_eq!(api.call_count(Procedure::CreateAccount), 3);
        assert_eq!(api.record_count(EntityKind::Contact).await, 1);
    }

    #[tokio::test]
    async fn test_primary_link_is_unique_per_account() {
        let api = InMemoryDataApi::new();
        let account_id = api.create_account(&account()).await.unwrap();
        let first = api.create_contact(&contact()).await.unwrap();
        let second = api.create_contact(&contact()).await.unwrap();

        for contact_id in [&first, &second] {
            api.link_contact_to_account(&AccountContactLink {
                contact_id: contact_id.clone(),
                account_id: account_id.clone(),
                relationship: "Owner".to_string(),
                is_primary: true,
            })
            .await
            .unwrap();
        }

        let links = api.links().await;
        assert_eq!(links.len(), 2);
        let primaries: Vec<_> = links.iter().filter(|l| l.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].contact_id, second);
    }

    #[tokio::test]
    async fn test_invoice_from_work_order_requires_completion() {
        let api = InMemoryDataApi::new();
        let contact_id = api.create_contact(&contact()).await.unwrap();
        let quote_id = api.create_quote(&quote_for(contact_id.clone())).await.unwrap();
        let work_order_id = api
            .create_work_order(&NewWorkOrder {
                work_order_number: Some("WO-1".to_string()),
                contact_id,
                account_id: None,
                quote_id: Some(quote_id),
                description: None,
                scheduled_date: None,
                notes: None,
            })
            .await
            .unwrap();

        let now = Utc::now();
        let input = InvoiceFromWorkOrder {
            work_order_id: work_order_id.clone(),
            issue_date: now,
            due_date: now + Duration::days(30),
            notes: None,
        };
        assert!(api.create_invoice_from_work_order(&input).await.is_err());

        api.change_work_order_status(&work_order_id, WorkOrderStatus::InProgress, None)
            .await
            .unwrap();
        assert!(api
            .change_work_order_status(&work_order_id, WorkOrderStatus::Completed, None)
            .await
            .is_err());
        api.change_work_order_status(&work_order_id, WorkOrderStatus::Completed, Some(now))
            .await
            .unwrap();

        let invoice_id = api.create_invoice_from_work_order(&input).await.unwrap();
        let invoice = api.invoice(&invoice_id).await.unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.data.line_items[0].description, "Boiler service");
        assert_eq!(invoice.data.work_order_id, Some(work_order_id));
    }
}
