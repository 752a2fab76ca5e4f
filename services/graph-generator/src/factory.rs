//! Entity factory
//!
//! Builds plausible payloads, creates one record per call and walks it from
//! its kind's initial status to the sampled one, one legal hop at a time.
//! Batch-level `create_*` methods never fail: whatever goes wrong is written
//! to the run's error list and the entity is skipped.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, warn};
use validator::Validate;

use bizgraph_data_api::DataApi;
use bizgraph_models::{
    AccountContactLink, AccountId, AccountType, ContactId, EntityKind, GenerationRun,
    InvoiceId, InvoiceStatus, LeadStatus, LifecycleStatus, LineItem, NewAccount, NewContact,
    NewInvoice, NewLead, NewQuote, NewWorkOrder, QuoteId, QuoteStatus, StatusWeights,
    WorkOrderId, WorkOrderStatus,
};
use bizgraph_utils::{validate_model, BizGraphError, BizGraphResult, GenerationSettings};

use crate::sampler::sample_status;
use crate::synth;

/// Contact payload shapes, richest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadTier {
    Full,
    RequiredOnly,
}

impl PayloadTier {
    pub const ORDER: [PayloadTier; 2] = [PayloadTier::Full, PayloadTier::RequiredOnly];

    pub fn shape(&self, contact: &NewContact) -> NewContact {
        match self {
            Self::Full => contact.clone(),
            Self::RequiredOnly => contact.required_only(),
        }
    }
}

#[derive(Debug)]
pub enum ContactOutcome {
    Created {
        id: ContactId,
        tier: PayloadTier,
        /// Why the full payload was refused, when the fallback was needed
        fallback_reason: Option<String>,
    },
    Failed {
        error: BizGraphError,
    },
}

/// A status change the backend refused, or one the table cannot reach
#[derive(Debug)]
pub struct HopFailure<S> {
    pub status: S,
    pub error: BizGraphError,
}

/// Hops from the kind's initial status to `target`
fn plan<S: LifecycleStatus>(target: S) -> Result<Vec<S>, HopFailure<S>> {
    S::initial().path_to(target).ok_or_else(|| HopFailure {
        status: target,
        error: BizGraphError::InvalidTransition {
            kind: S::KIND,
            from: S::initial().label().to_string(),
            to: target.label().to_string(),
        },
    })
}

async fn submit<T, R, F, Fut>(model: &str, payload: &T, call: F) -> BizGraphResult<R>
where
    T: Validate,
    F: FnOnce() -> Fut,
    Fut: Future<Output = BizGraphResult<R>>,
{
    validate_model(model, payload)?;
    call().await
}

fn creation_failed(run: &mut GenerationRun, kind: EntityKind, index: u32, cause: &BizGraphError) {
    let message = format!("Error creating {} {}: {}", kind, index, cause);
    error!(kind = %kind, index, "{}", message);
    run.record_entity_error(kind, index, message);
}

fn status_change_failed<S: LifecycleStatus>(
    run: &mut GenerationRun,
    index: u32,
    id: &dyn std::fmt::Display,
    failure: HopFailure<S>,
) {
    let message = format!(
        "Error changing {} {} status to {}: {}",
        S::KIND,
        id,
        failure.status,
        failure.error
    );
    error!(kind = %S::KIND, index, "{}", message);
    run.record_entity_error(S::KIND, index, message);
}

pub struct EntityFactory {
    api: Arc<dyn DataApi>,
    rng: StdRng,
    settings: GenerationSettings,
    now: DateTime<Utc>,
}

impl EntityFactory {
    /// `seed` wins over the configured default seed; with neither the
    /// generator is seeded from entropy.
    pub fn new(api: Arc<dyn DataApi>, settings: GenerationSettings, seed: Option<u64>) -> Self {
        let rng = match seed.or(settings.default_seed) {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            api,
            rng,
            settings,
            now: Utc::now(),
        }
    }

    pub fn api(&self) -> &dyn DataApi {
        self.api.as_ref()
    }

    /// Reference instant for every date this factory draws
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn choose<T: Clone>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            None
        } else {
            Some(synth::pick(&mut self.rng, items).clone())
        }
    }

    pub fn sample<S: LifecycleStatus>(&mut self, weights: &StatusWeights<S>) -> S {
        sample_status(weights, &mut self.rng)
    }

    pub fn draw_primary(&mut self) -> bool {
        let probability = self.settings.primary_contact_probability;
        let probability = if probability.is_finite() {
            probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.rng.gen_bool(probability)
    }

    pub fn relationship(&mut self) -> String {
        synth::pick(&mut self.rng, synth::CONTACT_RELATIONSHIPS).to_string()
    }

    /// Small number for one-off records that have no run index
    pub fn ordinal(&mut self) -> u32 {
        self.rng.gen_range(1..10_000)
    }

    fn maybe_note(&mut self) -> Option<String> {
        if self.rng.gen_bool(0.4) {
            Some(synth::pick(&mut self.rng, synth::NOTES).to_string())
        } else {
            None
        }
    }

    /// Uniform within the look-back window ending now
    pub fn issue_date(&mut self) -> DateTime<Utc> {
        let start = self.now - Duration::days(self.settings.lookback_days.max(0));
        synth::date_between(&mut self.rng, start, self.now)
    }

    /// Strictly after `scheduled`, within three days and not after now
    /// unless `scheduled` itself is that late.
    pub fn completion_date(&mut self, scheduled: DateTime<Utc>) -> DateTime<Utc> {
        let earliest = scheduled + Duration::hours(1);
        let latest = (scheduled + Duration::days(3)).min(self.now).max(earliest);
        synth::date_between(&mut self.rng, earliest, latest)
    }

    /// Strictly after `issue`, within the payment terms and not after now
    /// unless `issue` is already within a millisecond of now.
    pub fn paid_date(&mut self, issue: DateTime<Utc>) -> DateTime<Utc> {
        let earliest = issue + Duration::milliseconds(1);
        let latest = (issue + Duration::days(self.settings.invoice_terms_days)).min(self.now);
        if latest < earliest {
            return earliest;
        }
        synth::date_between(&mut self.rng, earliest, latest)
    }

    pub fn work_order_number(&self, index: u32) -> String {
        format!("WO-{}-{:04}", self.now.format("%Y%m%d"), index)
    }

    pub fn invoice_number(&self, index: u32) -> String {
        format!("INV-{}-{:04}", self.now.format("%Y%m%d"), index)
    }

    pub fn account_payload(&mut self) -> NewAccount {
        let prefix = synth::pick(&mut self.rng, synth::COMPANY_PREFIXES);
        let suffix = synth::pick(&mut self.rng, synth::COMPANY_SUFFIXES);
        let street = synth::pick(&mut self.rng, synth::STREETS);
        let (city, state, zip) = *synth::pick(&mut self.rng, synth::LOCATIONS);
        let account_type = *synth::pick(&mut self.rng, &AccountType::ALL);
        let number = synth::amount_between(&mut self.rng, 100, 9999);

        NewAccount {
            name: format!("{} {}", prefix, suffix),
            account_type,
            address: format!("{} {}", number, street),
            city: city.to_string(),
            state: state.to_string(),
            zip: zip.to_string(),
            notes: self.maybe_note(),
        }
    }

    pub fn contact_payload(&mut self, index: u32) -> NewContact {
        let first = synth::pick(&mut self.rng, synth::FIRST_NAMES);
        let last = synth::pick(&mut self.rng, synth::LAST_NAMES);
        let street = synth::pick(&mut self.rng, synth::STREETS);
        let (city, state, zip) = *synth::pick(&mut self.rng, synth::LOCATIONS);
        let number = synth::amount_between(&mut self.rng, 100, 9999);

        NewContact {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: Some(synth::email_for(first, last, index)),
            phone: Some(synth::phone_for(index)),
            address: Some(format!("{} {}", number, street)),
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            zip: Some(zip.to_string()),
            notes: self.maybe_note(),
        }
    }

    pub fn lead_payload(&mut self, index: u32, status: LeadStatus) -> NewLead {
        let first = synth::pick(&mut self.rng, synth::FIRST_NAMES);
        let last = synth::pick(&mut self.rng, synth::LAST_NAMES);
        let source = synth::pick(&mut self.rng, synth::LEAD_SOURCES);

        NewLead {
            name: format!("{} {}", first, last),
            email: Some(synth::email_for(first, last, index)),
            phone: Some(synth::phone_for(index)),
            source: Some(source.to_string()),
            status,
            notes: self.maybe_note(),
        }
    }

    /// One to three distinct service items
    pub fn line_items(&mut self) -> Vec<LineItem> {
        let count = self.rng.gen_range(1..=3);
        let mut items: Vec<LineItem> = Vec::with_capacity(count);

        while items.len() < count {
            let (description, min, max) = *synth::pick(&mut self.rng, synth::SERVICE_ITEMS);
            if items.iter().any(|item| item.description == description) {
                continue;
            }
            items.push(LineItem {
                description: description.to_string(),
                quantity: self.rng.gen_range(1..=4),
                unit_price: synth::amount_between(&mut self.rng, min, max) as f64,
            });
        }

        items
    }

    pub fn quote_payload(&mut self, contact_id: ContactId, account_id: Option<AccountId>) -> NewQuote {
        let issue_date = self.issue_date();
        NewQuote {
            contact_id,
            account_id,
            issue_date,
            expiry_date: issue_date + Duration::days(self.settings.quote_validity_days),
            line_items: self.line_items(),
            notes: self.maybe_note(),
        }
    }

    pub fn work_order_payload(
        &mut self,
        work_order_number: String,
        contact_id: ContactId,
        account_id: Option<AccountId>,
        quote_id: Option<QuoteId>,
    ) -> NewWorkOrder {
        NewWorkOrder {
            work_order_number: Some(work_order_number),
            contact_id,
            account_id,
            quote_id,
            description: Some(synth::pick(&mut self.rng, synth::WORK_DESCRIPTIONS).to_string()),
            scheduled_date: Some(self.issue_date()),
            notes: self.maybe_note(),
        }
    }

    /// `paid` stamps a paid date after the issue date
    pub fn invoice_payload(
        &mut self,
        invoice_number: String,
        contact_id: ContactId,
        account_id: Option<AccountId>,
        work_order_id: Option<WorkOrderId>,
        paid: bool,
    ) -> NewInvoice {
        let issue_date = self.issue_date();
        let paid_date = if paid {
            Some(self.paid_date(issue_date))
        } else {
            None
        };

        NewInvoice {
            invoice_number: Some(invoice_number),
            contact_id,
            account_id,
            work_order_id,
            issue_date,
            due_date: issue_date + Duration::days(self.settings.invoice_terms_days),
            paid_date,
            line_items: self.line_items(),
            notes: self.maybe_note(),
        }
    }

    /// Create a contact, falling back to the required-only payload when the
    /// full one is refused.
    pub async fn create_contact_tiered(&self, contact: &NewContact) -> ContactOutcome {
        let mut fallback_reason: Option<String> = None;
        let mut last_error = None;

        for tier in PayloadTier::ORDER {
            let payload = tier.shape(contact);
            let created = submit("contact", &payload, || self.api.create_contact(&payload)).await;

            match created {
                Ok(id) => {
                    return ContactOutcome::Created {
                        id,
                        tier,
                        fallback_reason,
                    }
                }
                Err(e) => {
                    if tier == PayloadTier::Full {
                        warn!(
                            contact = %contact.full_name(),
                            "Full contact payload rejected, retrying with required fields: {}",
                            e
                        );
                        fallback_reason = Some(e.to_string());
                    }
                    last_error = Some(e);
                }
            }
        }

        ContactOutcome::Failed {
            error: last_error
                .unwrap_or_else(|| BizGraphError::internal("No contact payload tier was attempted")),
        }
    }

    pub async fn advance_quote(
        &self,
        id: &QuoteId,
        target: QuoteStatus,
    ) -> Result<(), HopFailure<QuoteStatus>> {
        for status in plan(target)? {
            self.api
                .change_quote_status(id, status)
                .await
                .map_err(|error| HopFailure { status, error })?;
        }
        Ok(())
    }

    /// The hop into `Completed` carries a completion date after `scheduled`.
    pub async fn advance_work_order(
        &mut self,
        id: &WorkOrderId,
        target: WorkOrderStatus,
        scheduled: Option<DateTime<Utc>>,
    ) -> Result<(), HopFailure<WorkOrderStatus>> {
        for status in plan(target)? {
            let completed_date = if status == WorkOrderStatus::Completed {
                Some(self.completion_date(scheduled.unwrap_or(self.now)))
            } else {
                None
            };
            self.api
                .change_work_order_status(id, status, completed_date)
                .await
                .map_err(|error| HopFailure { status, error })?;
        }
        Ok(())
    }

    pub async fn advance_invoice(
        &self,
        id: &InvoiceId,
        target: InvoiceStatus,
    ) -> Result<(), HopFailure<InvoiceStatus>> {
        for status in plan(target)? {
            self.api
                .change_invoice_status(id, status)
                .await
                .map_err(|error| HopFailure { status, error })?;
        }
        Ok(())
    }

    pub async fn create_account(&mut self, run: &mut GenerationRun, index: u32) {
        let payload = self.account_payload();
        match submit("account", &payload, || self.api.create_account(&payload)).await {
            Ok(id) => {
                debug!(account_id = %id, name = %payload.name, "Account created");
                run.results.accounts.push(id);
            }
            Err(e) => creation_failed(run, EntityKind::Account, index, &e),
        }
    }

    /// Creates the contact and, when accounts exist, links it to one of them.
    /// A failed link is only a warning.
    pub async fn create_contact(&mut self, run: &mut GenerationRun, index: u32) {
        let payload = self.contact_payload(index);

        let id = match self.create_contact_tiered(&payload).await {
            ContactOutcome::Created {
                id,
                tier,
                fallback_reason,
            } => {
                if let Some(reason) = fallback_reason {
                    run.record_warning(format!(
                        "Contact {} created with required fields only: {}",
                        index, reason
                    ));
                }
                debug!(contact_id = %id, ?tier, "Contact created");
                id
            }
            ContactOutcome::Failed { error } => {
                creation_failed(run, EntityKind::Contact, index, &error);
                return;
            }
        };

        if let Some(account_id) = self.choose(&run.results.accounts) {
            let link = AccountContactLink {
                contact_id: id.clone(),
                account_id: account_id.clone(),
                relationship: self.relationship(),
                is_primary: self.draw_primary(),
            };
            let linked = submit("account contact link", &link, || {
                self.api.link_contact_to_account(&link)
            })
            .await;

            match linked {
                Ok(()) => run.link_contact_account(id.clone(), account_id),
                Err(e) => {
                    let message = format!(
                        "Could not link contact {} to account {}: {}",
                        id, account_id, e
                    );
                    warn!("{}", message);
                    run.record_warning(message);
                }
            }
        }

        run.results.contacts.push(id);
    }

    pub async fn create_lead(
        &mut self,
        run: &mut GenerationRun,
        index: u32,
        weights: &StatusWeights<LeadStatus>,
    ) {
        let status = self.sample(weights);
        let payload = self.lead_payload(index, status);
        match submit("lead", &payload, || self.api.create_lead(&payload)).await {
            Ok(id) => {
                debug!(lead_id = %id, %status, "Lead created");
                run.results.leads.push(id);
            }
            Err(e) => creation_failed(run, EntityKind::Lead, index, &e),
        }
    }

    pub async fn create_quote(
        &mut self,
        run: &mut GenerationRun,
        index: u32,
        weights: &StatusWeights<QuoteStatus>,
    ) {
        let kind = EntityKind::Quote;
        let Some(contact_id) = self.choose(&run.results.contacts) else {
            creation_failed(run, kind, index, &BizGraphError::missing_prerequisite(kind, EntityKind::Contact));
            return;
        };
        let account_id = run.account_for(&contact_id).cloned();
        let target = self.sample(weights);
        let payload = self.quote_payload(contact_id.clone(), account_id);

        let id = match submit("quote", &payload, || self.api.create_quote(&payload)).await {
            Ok(id) => id,
            Err(e) => return creation_failed(run, kind, index, &e),
        };

        if let Err(failure) = self.advance_quote(&id, target).await {
            return status_change_failed(run, index, &id, failure);
        }

        debug!(quote_id = %id, status = %target, "Quote created");
        run.add_quote(contact_id, id, target);
    }

    /// Prefers a quote the chosen contact already accepted.
    pub async fn create_work_order(
        &mut self,
        run: &mut GenerationRun,
        index: u32,
        weights: &StatusWeights<WorkOrderStatus>,
    ) {
        let kind = EntityKind::WorkOrder;
        let Some(contact_id) = self.choose(&run.results.contacts) else {
            creation_failed(run, kind, index, &BizGraphError::missing_prerequisite(kind, EntityKind::Contact));
            return;
        };
        let account_id = run.account_for(&contact_id).cloned();
        let quote_id = self.choose(run.quotes_for(&contact_id));
        let target = self.sample(weights);
        let number = self.work_order_number(index);
        let payload = self.work_order_payload(number, contact_id.clone(), account_id, quote_id);

        let id = match submit("work order", &payload, || self.api.create_work_order(&payload)).await
        {
            Ok(id) => id,
            Err(e) => return creation_failed(run, kind, index, &e),
        };

        if let Err(failure) = self
            .advance_work_order(&id, target, payload.scheduled_date)
            .await
        {
            return status_change_failed(run, index, &id, failure);
        }

        debug!(work_order_id = %id, status = %target, "Work order created");
        run.add_work_order(contact_id, id, target);
    }

    /// Prefers a work order of the chosen contact that was not cancelled.
    pub async fn create_invoice(
        &mut self,
        run: &mut GenerationRun,
        index: u32,
        weights: &StatusWeights<InvoiceStatus>,
    ) {
        let kind = EntityKind::Invoice;
        let Some(contact_id) = self.choose(&run.results.contacts) else {
            creation_failed(run, kind, index, &BizGraphError::missing_prerequisite(kind, EntityKind::Contact));
            return;
        };
        let account_id = run.account_for(&contact_id).cloned();
        let work_order_id = self.choose(run.work_orders_for(&contact_id));
        let target = self.sample(weights);
        let number = self.invoice_number(index);
        let payload = self.invoice_payload(
            number,
            contact_id,
            account_id,
            work_order_id,
            target == InvoiceStatus::Paid,
        );

        let id = match submit("invoice", &payload, || self.api.create_invoice(&payload)).await {
            Ok(id) => id,
            Err(e) => return creation_failed(run, kind, index, &e),
        };

        if let Err(failure) = self.advance_invoice(&id, target).await {
            return status_change_failed(run, index, &id, failure);
        }

        debug!(invoice_id = %id, status = %target, "Invoice created");
        run.results.invoices.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizgraph_data_api::{InMemoryDataApi, Procedure};

    fn factory(api: &InMemoryDataApi) -> EntityFactory {
        EntityFactory::new(Arc::new(api.clone()), GenerationSettings::default(), Some(11))
    }

    #[test]
    fn test_payloads_pass_validation() {
        let api = InMemoryDataApi::new();
        let mut factory = factory(&api);

        for index in 1..=50 {
            assert!(factory.account_payload().validate().is_ok());
            assert!(factory.contact_payload(index).validate().is_ok());
            assert!(factory.lead_payload(index, LeadStatus::New).validate().is_ok());

            let quote = factory.quote_payload(ContactId::new("c1"), None);
            assert!(quote.validate().is_ok());
            assert_eq!(quote.expiry_date - quote.issue_date, Duration::days(30));
            assert!((1..=3).contains(&quote.line_items.len()));

            let invoice = factory.invoice_payload(
                factory.invoice_number(index),
                ContactId::new("c1"),
                None,
                None,
                true,
            );
            assert!(invoice.validate().is_ok());
            assert!(invoice.paid_date.unwrap() > invoice.issue_date);
        }
    }

    #[test]
    fn test_numbers_follow_date_and_index() {
        let api = InMemoryDataApi::new();
        let factory = factory(&api);
        let day = factory.now().format("%Y%m%d").to_string();

        assert_eq!(factory.work_order_number(7), format!("WO-{}-0007", day));
        assert_eq!(factory.invoice_number(12), format!("INV-{}-0012", day));
    }

    #[test]
    fn test_completion_follows_schedule() {
        let api = InMemoryDataApi::new();
        let mut factory = factory(&api);
        let scheduled = factory.now() - Duration::days(10);

        for _ in 0..100 {
            let completed = factory.completion_date(scheduled);
            assert!(completed > scheduled);
            assert!(completed <= factory.now());
        }
    }

    #[test]
    fn test_paid_date_never_after_now() {
        let api = InMemoryDataApi::new();
        let mut factory = factory(&api);

        for _ in 0..20_000 {
            let issue = factory.issue_date();
            let paid = factory.paid_date(issue);
            assert!(paid > issue);
            assert!(paid <= factory.now(), "paid {} is after now {}", paid, factory.now());
            assert!(paid - issue <= Duration::days(30));
        }

        let recent = factory.now() - Duration::minutes(5);
        for _ in 0..100 {
            let paid = factory.paid_date(recent);
            assert!(paid > recent && paid <= factory.now());
        }

        let issued_now = factory.now();
        assert!(factory.paid_date(issued_now) > issued_now);
    }

    #[test]
    fn test_primary_draw_follows_probability() {
        let api = InMemoryDataApi::new();
        let mut factory = EntityFactory::new(
            Arc::new(api.clone()),
            GenerationSettings::default(),
            Some(5),
        );
        let draws = 5_000;
        let primaries = (0..draws).filter(|_| factory.draw_primary()).count();
        let rate = primaries as f64 / draws as f64;
        let expected = factory.settings().primary_contact_probability;

        assert!(
            (rate - expected).abs() < 0.03,
            "primary rate {} not near {}",
            rate,
            expected
        );
    }

    #[test]
    fn test_primary_probability_is_clamped() {
        let api = InMemoryDataApi::new();
        let draws_with = |probability: f64| {
            let settings = GenerationSettings {
                primary_contact_probability: probability,
                ..GenerationSettings::default()
            };
            let mut factory = EntityFactory::new(Arc::new(api.clone()), settings, Some(3));
            (0..500).filter(|_| factory.draw_primary()).count()
        };

        assert_eq!(draws_with(0.0), 0);
        assert_eq!(draws_with(1.0), 500);
        assert_eq!(draws_with(-2.0), 0);
        assert_eq!(draws_with(7.5), 500);
        assert_eq!(draws_with(f64::NAN), 0);
    }

    #[test]
    fn test_same_seed_same_payloads() {
        let api = InMemoryDataApi::new();
        let mut left = factory(&api);
        let mut right = factory(&api);
        assert_eq!(left.contact_payload(1).full_name(), right.contact_payload(1).full_name());
        assert_eq!(left.account_payload().name, right.account_payload().name);
    }

    #[tokio::test]
    async fn test_contact_falls_back_to_required_fields() {
        let api = InMemoryDataApi::new();
        api.reject_next(Procedure::CreateContact, 1);
        let factory = factory(&api);

        let payload = factory_contact();
        match factory.create_contact_tiered(&payload).await {
            ContactOutcome::Created {
                id,
                tier,
                fallback_reason,
            } => {
                assert_eq!(tier, PayloadTier::RequiredOnly);
                assert!(fallback_reason.unwrap().contains("Injected failure"));
                let stored = api.contact(&id).await.unwrap();
                assert!(stored.data.email.is_none());
            }
            other => panic!("expected a contact, got {:?}", other),
        }
        assert_eq!(api.call_count(Procedure::CreateContact), 2);
    }

    #[tokio::test]
    async fn test_contact_fails_after_both_tiers() {
        let api = InMemoryDataApi::new();
        api.reject_always(Procedure::CreateContact);
        let factory = factory(&api);

        let outcome = factory.create_contact_tiered(&factory_contact()).await;
        assert!(matches!(outcome, ContactOutcome::Failed { .. }));
        assert_eq!(api.call_count(Procedure::CreateContact), 2);
    }

    #[tokio::test]
    async fn test_one_hop_target_is_one_call() {
        let api = InMemoryDataApi::new();
        let mut factory = factory(&api);
        let mut run = GenerationRun::new();
        factory.create_contact(&mut run, 1).await;

        factory
            .create_quote(&mut run, 1, &StatusWeights::only(QuoteStatus::Presented))
            .await;
        assert_eq!(api.call_count(Procedure::ChangeQuoteStatus), 1);

        factory
            .create_quote(&mut run, 2, &StatusWeights::only(QuoteStatus::Draft))
            .await;
        assert_eq!(api.call_count(Procedure::ChangeQuoteStatus), 1);

        factory
            .create_quote(&mut run, 3, &StatusWeights::only(QuoteStatus::Accepted))
            .await;
        assert_eq!(api.call_count(Procedure::ChangeQuoteStatus), 3);

        let accepted = api.quote(&run.results.quotes[2]).await.unwrap();
        assert_eq!(accepted.status, QuoteStatus::Accepted);
        assert!(run.errors().is_empty());
    }

    #[tokio::test]
    async fn test_status_change_failure_skips_entity() {
        let api = InMemoryDataApi::new();
        let mut factory = factory(&api);
        let mut run = GenerationRun::new();
        factory.create_contact(&mut run, 1).await;

        api.reject_next(Procedure::ChangeInvoiceStatus, 1);
        factory
            .create_invoice(&mut run, 4, &StatusWeights::only(InvoiceStatus::Paid))
            .await;

        assert!(run.results.invoices.is_empty());
        assert_eq!(run.entity_error_count(EntityKind::Invoice), 1);
        let message = &run.errors()[0].message;
        assert!(message.starts_with("Error changing invoice "));
        assert!(message.contains("status to Sent: "));
    }

    #[tokio::test]
    async fn test_completed_work_order_carries_completion_date() {
        let api = InMemoryDataApi::new();
        let mut factory = factory(&api);
        let mut run = GenerationRun::new();
        factory.create_contact(&mut run, 1).await;

        factory
            .create_work_order(&mut run, 1, &StatusWeights::only(WorkOrderStatus::Completed))
            .await;

        let stored = api.work_order(&run.results.work_orders[0]).await.unwrap();
        assert_eq!(stored.status, WorkOrderStatus::Completed);
        assert!(stored.completed_date.unwrap() > stored.data.scheduled_date.unwrap());
    }

    fn factory_contact() -> NewContact {
        NewContact {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            email: Some("grace.hopper1@example.com".to_string()),
            phone: Some(synth::phone_for(1)),
            address: None,
            city: None,
            state: None,
            zip: None,
            notes: None,
        }
    }
}
