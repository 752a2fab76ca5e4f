//! Linear workflow runner
//!
//! Walks one customer through the whole lifecycle: lead, conversion into a
//! contact and account, an accepted quote, a completed work order and a paid
//! invoice. The first failure stops the chain; everything created up to that
//! point is returned.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

use bizgraph_data_api::DataApi;
use bizgraph_models::{
    line_items_total, AccountContactLink, AccountRecord, ContactRecord, InvoiceFromWorkOrder,
    InvoiceRecord, InvoiceStatus, LeadRecord, LeadStatus, LeadUpdate, LifecycleStatus,
    QuoteRecord, QuoteStatus, WorkOrderRecord, WorkOrderStatus, WorkflowReport, WorkflowStage,
    WorkflowState,
};
use bizgraph_utils::{validate_model, BizGraphError, BizGraphResult, GenerationSettings};

use crate::factory::{ContactOutcome, EntityFactory, PayloadTier};

#[derive(Clone)]
pub struct LinearWorkflowRunner {
    api: Arc<dyn DataApi>,
    settings: GenerationSettings,
}

impl LinearWorkflowRunner {
    pub fn new(api: Arc<dyn DataApi>, settings: GenerationSettings) -> Self {
        Self { api, settings }
    }

    /// Run the full chain once. Never fails; a failed stage is reported in
    /// the result together with the partial state.
    pub async fn run_complete_workflow(&self, seed: Option<u64>) -> WorkflowReport {
        let mut chain = Chain {
            factory: EntityFactory::new(self.api.clone(), self.settings.clone(), seed),
            state: WorkflowState::new(),
            warnings: Vec::new(),
        };

        let mut failure = None;
        for stage in WorkflowStage::ALL {
            let span = info_span!("workflow_stage", stage = %stage);
            if let Err(e) = chain.run_stage(stage).instrument(span).await {
                failure = Some((stage, e));
                break;
            }
        }

        match failure {
            None => {
                info!(
                    records = chain.state.created_count(),
                    "Workflow completed"
                );
                WorkflowReport {
                    success: true,
                    results: chain.state,
                    errors: Vec::new(),
                    warnings: chain.warnings,
                    failed_stage: None,
                }
            }
            Some((stage, cause)) => {
                let message = format!("{} stage failed: {}", stage, cause);
                error!(
                    records = chain.state.created_count(),
                    "{}", message
                );
                WorkflowReport {
                    success: false,
                    results: chain.state,
                    errors: vec![message],
                    warnings: chain.warnings,
                    failed_stage: Some(stage),
                }
            }
        }
    }
}

/// Context of one run, threaded through every stage
struct Chain {
    factory: EntityFactory,
    state: WorkflowState,
    warnings: Vec<String>,
}

fn missing(what: &str) -> BizGraphError {
    BizGraphError::internal(format!("No {} recorded by an earlier stage", what))
}

impl Chain {
    async fn run_stage(&mut self, stage: WorkflowStage) -> BizGraphResult<()> {
        match stage {
            WorkflowStage::Lead => self.lead_stage().await,
            WorkflowStage::Conversion => self.conversion_stage().await,
            WorkflowStage::Quote => self.quote_stage().await,
            WorkflowStage::WorkOrder => self.work_order_stage().await,
            WorkflowStage::Invoice => self.invoice_stage().await,
        }
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    async fn lead_stage(&mut self) -> BizGraphResult<()> {
        let index = self.factory.ordinal();
        let payload = self.factory.lead_payload(index, LeadStatus::initial());
        validate_model("lead", &payload)?;

        let id = self.factory.api().create_lead(&payload).await?;
        info!(lead_id = %id, "Lead created");

        self.state.lead = Some(LeadRecord {
            id,
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            status: payload.status,
        });
        Ok(())
    }

    async fn conversion_stage(&mut self) -> BizGraphResult<()> {
        let lead = self.state.lead.clone().ok_or_else(|| missing("lead"))?;
        lead.status.check_transition(LeadStatus::Converted)?;

        // The contact is the lead's person, the rest is synthesized
        let index = self.factory.ordinal();
        let mut contact = self.factory.contact_payload(index);
        if let Some((first, last)) = lead.name.split_once(' ') {
            contact.first_name = first.to_string();
            contact.last_name = last.to_string();
        }
        contact.email = lead.email.clone();
        contact.phone = lead.phone.clone();

        let outcome = self.factory.create_contact_tiered(&contact).await;
        let (contact_id, tier) = match outcome {
            ContactOutcome::Created {
                id,
                tier,
                fallback_reason,
            } => {
                if let Some(reason) = fallback_reason {
                    self.warn(format!(
                        "Contact {} created with required fields only: {}",
                        id, reason
                    ));
                }
                (id, tier)
            }
            ContactOutcome::Failed { error } => return Err(error),
        };
        info!(contact_id = %contact_id, "Contact created");

        self.state.contact = Some(ContactRecord {
            id: contact_id.clone(),
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            email: match tier {
                PayloadTier::Full => contact.email.clone(),
                PayloadTier::RequiredOnly => None,
            },
        });

        let account = self.factory.account_payload();
        validate_model("account", &account)?;
        let account_id = self.factory.api().create_account(&account).await?;
        info!(account_id = %account_id, "Account created");

        self.state.account = Some(AccountRecord {
            id: account_id.clone(),
            name: account.name,
            primary_contact_linked: false,
        });

        let link = AccountContactLink {
            contact_id: contact_id.clone(),
            account_id: account_id.clone(),
            relationship: "Owner".to_string(),
            is_primary: true,
        };
        let linked = self.factory.api().link_contact_to_account(&link).await;
        match linked {
            Ok(()) => {
                if let Some(account) = self.state.account.as_mut() {
                    account.primary_contact_linked = true;
                }
            }
            Err(e) => self.warn(format!(
                "Could not link contact {} to account {}: {}",
                contact_id, account_id, e
            )),
        }

        let update = LeadUpdate {
            status: Some(LeadStatus::Converted),
            notes: Some(format!("Converted to contact {}", contact_id)),
        };
        self.factory.api().update_lead(&lead.id, &update).await?;
        if let Some(lead) = self.state.lead.as_mut() {
            lead.status = LeadStatus::Converted;
        }
        Ok(())
    }

    async fn quote_stage(&mut self) -> BizGraphResult<()> {
        let contact_id = self.state.contact.as_ref().ok_or_else(|| missing("contact"))?.id.clone();
        let account_id = self.state.account.as_ref().map(|account| account.id.clone());

        let payload = self.factory.quote_payload(contact_id, account_id);
        validate_model("quote", &payload)?;
        let id = self.factory.api().create_quote(&payload).await?;
        info!(quote_id = %id, "Quote created");

        self.state.quote = Some(QuoteRecord {
            id: id.clone(),
            status: QuoteStatus::initial(),
            issue_date: payload.issue_date,
            expiry_date: payload.expiry_date,
            total: line_items_total(&payload.line_items),
        });

        for status in [QuoteStatus::Presented, QuoteStatus::Accepted] {
            let current = self.state.quote.as_ref().map_or(QuoteStatus::initial(), |q| q.status);
            current.check_transition(status)?;
            self.factory.api().change_quote_status(&id, status).await?;
            if let Some(quote) = self.state.quote.as_mut() {
                quote.status = status;
            }
        }
        Ok(())
    }

    async fn work_order_stage(&mut self) -> BizGraphResult<()> {
        let contact_id = self.state.contact.as_ref().ok_or_else(|| missing("contact"))?.id.clone();
        let account_id = self.state.account.as_ref().map(|account| account.id.clone());
        let quote_id = self.state.quote.as_ref().ok_or_else(|| missing("quote"))?.id.clone();

        let index = self.factory.ordinal();
        let number = self.factory.work_order_number(index);
        let payload =
            self.factory
                .work_order_payload(number, contact_id, account_id, Some(quote_id));
        validate_model("work order", &payload)?;
        let id = self.factory.api().create_work_order(&payload).await?;
        info!(work_order_id = %id, "Work order created");

        self.state.work_order = Some(WorkOrderRecord {
            id: id.clone(),
            work_order_number: payload.work_order_number.clone(),
            status: WorkOrderStatus::initial(),
            scheduled_date: payload.scheduled_date,
            completed_date: None,
        });

        for status in [WorkOrderStatus::InProgress, WorkOrderStatus::Completed] {
            let current = self
                .state
                .work_order
                .as_ref()
                .map_or(WorkOrderStatus::initial(), |w| w.status);
            current.check_transition(status)?;

            let completed_date = (status == WorkOrderStatus::Completed).then(Utc::now);
            self.factory
                .api()
                .change_work_order_status(&id, status, completed_date)
                .await?;
            if let Some(work_order) = self.state.work_order.as_mut() {
                work_order.status = status;
                work_order.completed_date = completed_date.or(work_order.completed_date);
            }
        }
        Ok(())
    }

    async fn invoice_stage(&mut self) -> BizGraphResult<()> {
        let work_order_id = self
            .state
            .work_order
            .as_ref()
            .ok_or_else(|| missing("work order"))?
            .id
            .clone();

        let issue_date = Utc::now();
        let input = InvoiceFromWorkOrder {
            work_order_id,
            issue_date,
            due_date: issue_date + Duration::days(self.factory.settings().invoice_terms_days),
            notes: None,
        };
        validate_model("invoice", &input)?;
        let id = self.factory.api().create_invoice_from_work_order(&input).await?;
        info!(invoice_id = %id, "Invoice created");

        self.state.invoice = Some(InvoiceRecord {
            id: id.clone(),
            status: InvoiceStatus::initial(),
            issue_date: input.issue_date,
            due_date: input.due_date,
        });

        for status in [InvoiceStatus::Sent, InvoiceStatus::Paid] {
            let current = self
                .state
                .invoice
                .as_ref()
                .map_or(InvoiceStatus::initial(), |i| i.status);
            current.check_transition(status)?;
            self.factory.api().change_invoice_status(&id, status).await?;
            if let Some(invoice) = self.state.invoice.as_mut() {
                invoice.status = status;
            }
        }
        Ok(())
    }
}
