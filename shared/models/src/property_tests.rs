//! Property-based tests for the BizGraph domain models
//!
//! Covers the status transition tables, weight validation and the wire
//! shape of weight maps.

use proptest::prelude::*;

use crate::{
    InvoiceStatus, LeadStatus, LifecycleStatus, QuoteStatus, StatusWeights, WeightError,
    WorkOrderStatus,
};

fn arb_quote_status() -> impl Strategy<Value = QuoteStatus> {
    prop::sample::select(QuoteStatus::ALL.to_vec())
}

fn arb_work_order_status() -> impl Strategy<Value = WorkOrderStatus> {
    prop::sample::select(WorkOrderStatus::ALL.to_vec())
}

fn arb_invoice_status() -> impl Strategy<Value = InvoiceStatus> {
    prop::sample::select(InvoiceStatus::ALL.to_vec())
}

fn arb_lead_status() -> impl Strategy<Value = LeadStatus> {
    prop::sample::select(LeadStatus::ALL.to_vec())
}

/// Every hop of a path must be a legal single transition.
fn path_is_legal<S: LifecycleStatus>(from: S, path: &[S]) -> bool {
    let mut current = from;
    for &next in path {
        if !current.can_transition_to(next) {
            return false;
        }
        current = next;
    }
    true
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_quote_paths_are_legal(from in arb_quote_status(), to in arb_quote_status()) {
        if let Some(path) = from.path_to(to) {
            prop_assert!(path_is_legal(from, &path));
            prop_assert_eq!(path.last().copied().unwrap_or(from), to);
        }
    }

    #[test]
    fn prop_work_order_paths_are_legal(from in arb_work_order_status(), to in arb_work_order_status()) {
        if let Some(path) = from.path_to(to) {
            prop_assert!(path_is_legal(from, &path));
            prop_assert_eq!(path.last().copied().unwrap_or(from), to);
        }
    }

    #[test]
    fn prop_invoice_paths_are_legal(from in arb_invoice_status(), to in arb_invoice_status()) {
        if let Some(path) = from.path_to(to) {
            prop_assert!(path_is_legal(from, &path));
            prop_assert_eq!(path.last().copied().unwrap_or(from), to);
        }
    }

    #[test]
    fn prop_terminal_statuses_go_nowhere(status in arb_lead_status(), target in arb_lead_status()) {
        if status.is_terminal() && status != target {
            prop_assert!(status.path_to(target).is_none());
            prop_assert!(status.check_transition(target).is_err());
        }
    }

    #[test]
    fn prop_every_status_reachable_from_initial(status in arb_invoice_status()) {
        prop_assert!(InvoiceStatus::initial().path_to(status).is_some());
    }

    #[test]
    fn prop_labels_parse_back(status in arb_work_order_status()) {
        prop_assert_eq!(WorkOrderStatus::parse(status.label()), Some(status));
        prop_assert_eq!(WorkOrderStatus::parse(&status.label().to_uppercase()), Some(status));
    }

    #[test]
    fn prop_non_negative_weights_with_positive_sum_pass(
        weights in prop::collection::vec(0.0f64..1000.0, 4),
    ) {
        let entries: Vec<(QuoteStatus, f64)> = QuoteStatus::ALL
            .iter()
            .copied()
            .zip(weights.iter().copied())
            .collect();
        let map = StatusWeights::new(entries);

        if map.total() > 0.0 {
            prop_assert!(map.check().is_ok());
        } else {
            prop_assert!(matches!(map.check(), Err(WeightError::ZeroTotal { .. })), "all-zero weights must be rejected");
        }
    }

    #[test]
    fn prop_negative_weight_is_rejected(bad in -1000.0f64..-0.0001, good in 0.1f64..1000.0) {
        let map = StatusWeights::from([(QuoteStatus::Draft, good), (QuoteStatus::Presented, bad)]);
        prop_assert!(
            matches!(map.check(), Err(WeightError::Invalid { .. })),
            "negative weight must be rejected"
        );
    }

    #[test]
    fn prop_weights_json_keeps_order(weights in prop::collection::vec(0.0f64..100.0, 5)) {
        let entries: Vec<(InvoiceStatus, f64)> = InvoiceStatus::ALL
            .iter()
            .rev()
            .copied()
            .zip(weights.iter().copied())
            .collect();
        let map = StatusWeights::new(entries);

        let json = serde_json::to_string(&map).unwrap();
        let back: StatusWeights<InvoiceStatus> = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, map);
    }
}
