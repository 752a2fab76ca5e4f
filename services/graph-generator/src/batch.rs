//! Batch generator
//!
//! Creates the configured number of records per kind in dependency order.
//! A failing entity is recorded and skipped; a kind whose prerequisite is
//! missing is recorded once and the run moves on to the next kind.

use std::sync::Arc;
use tracing::{error, info, info_span, Instrument};

use bizgraph_data_api::DataApi;
use bizgraph_models::{EntityKind, GenerationConfig, GenerationReport, GenerationRun};
use bizgraph_utils::{BizGraphError, GenerationSettings};

use crate::factory::EntityFactory;

#[derive(Clone)]
pub struct BatchGenerator {
    api: Arc<dyn DataApi>,
    settings: GenerationSettings,
}

impl BatchGenerator {
    pub fn new(api: Arc<dyn DataApi>, settings: GenerationSettings) -> Self {
        Self { api, settings }
    }

    /// Run one batch. Never fails; errors are reported in the result.
    pub async fn generate(&self, config: &GenerationConfig) -> GenerationReport {
        let mut factory = EntityFactory::new(self.api.clone(), self.settings.clone(), config.seed);
        let mut run = GenerationRun::new();

        for kind in EntityKind::DEPENDENCY_ORDER {
            let count = config.count_for(kind);
            let span = info_span!("generate", kind = %kind, count);
            self.generate_kind(&mut factory, &mut run, config, kind, count)
                .instrument(span)
                .await;
        }

        let report = run.into_report();
        info!(
            success = report.success,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Batch generation finished"
        );
        report
    }

    async fn generate_kind(
        &self,
        factory: &mut EntityFactory,
        run: &mut GenerationRun,
        config: &GenerationConfig,
        kind: EntityKind,
        count: u32,
    ) {
        if count == 0 {
            return;
        }

        if needs_contact(kind) && run.results.contacts.is_empty() {
            let cause = BizGraphError::missing_prerequisite(kind, EntityKind::Contact);
            error!("{}", cause);
            run.record_stage_error(kind, format!("Error creating {}: {}", kind.plural(), cause));
            return;
        }

        for index in 1..=count {
            match kind {
                EntityKind::Account => factory.create_account(run, index).await,
                EntityKind::Contact => factory.create_contact(run, index).await,
                EntityKind::Lead => {
                    factory
                        .create_lead(run, index, &config.lead_status_weights)
                        .await
                }
                EntityKind::Quote => {
                    factory
                        .create_quote(run, index, &config.quote_status_weights)
                        .await
                }
                EntityKind::WorkOrder => {
                    factory
                        .create_work_order(run, index, &config.work_order_status_weights)
                        .await
                }
                EntityKind::Invoice => {
                    factory
                        .create_invoice(run, index, &config.invoice_status_weights)
                        .await
                }
            }
        }

        let created = run.results.count_for(kind);
        info!("Created {} of {} {}", created, count, kind.plural());
    }
}

fn needs_contact(kind: EntityKind) -> bool {
    matches!(
        kind,
        EntityKind::Quote | EntityKind::WorkOrder | EntityKind::Invoice
    )
}
