//! Entity kinds and status lifecycles.
//!
//! Every status-bearing kind has a closed status enum, an initial status and
//! an allowed-transition table. Anything not in the table is an illegal move.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use thiserror::Error;

/// Kinds of business records the generator creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Account,
    Contact,
    Lead,
    Quote,
    WorkOrder,
    Invoice,
}

impl EntityKind {
    /// Creation order that respects foreign-key dependencies
    pub const DEPENDENCY_ORDER: [EntityKind; 6] = [
        EntityKind::Account,
        EntityKind::Contact,
        EntityKind::Lead,
        EntityKind::Quote,
        EntityKind::WorkOrder,
        EntityKind::Invoice,
    ];

    pub fn plural(&self) -> &'static str {
        match self {
            Self::Account => "accounts",
            Self::Contact => "contacts",
            Self::Lead => "leads",
            Self::Quote => "quotes",
            Self::WorkOrder => "work orders",
            Self::Invoice => "invoices",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Account => write!(f, "account"),
            Self::Contact => write!(f, "contact"),
            Self::Lead => write!(f, "lead"),
            Self::Quote => write!(f, "quote"),
            Self::WorkOrder => write!(f, "work order"),
            Self::Invoice => write!(f, "invoice"),
        }
    }
}

/// Rejected status change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid {kind} status transition from {from} to {to}")]
pub struct TransitionError {
    pub kind: EntityKind,
    pub from: String,
    pub to: String,
}

/// A closed status enumeration with a transition table.
pub trait LifecycleStatus:
    Copy + Eq + Hash + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static
{
    const KIND: EntityKind;
    const ALL: &'static [Self];

    /// Status the backend assigns on creation
    fn initial() -> Self;

    /// Statuses reachable in one step
    fn allowed_transitions(&self) -> &'static [Self];

    /// Label used on the wire
    fn label(&self) -> &'static str;

    fn can_transition_to(&self, target: Self) -> bool {
        self.allowed_transitions().contains(&target)
    }

    fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    fn check_transition(&self, target: Self) -> Result<(), TransitionError> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(TransitionError {
                kind: Self::KIND,
                from: self.label().to_string(),
                to: target.label().to_string(),
            })
        }
    }

    /// Shortest sequence of hops from `self` to `target`, excluding `self`.
    ///
    /// Returns an empty path when already there and `None` when `target`
    /// cannot be reached through the table.
    fn path_to(&self, target: Self) -> Option<Vec<Self>> {
        if *self == target {
            return Some(Vec::new());
        }

        let mut previous: HashMap<Self, Self> = HashMap::new();
        let mut queue = VecDeque::from([*self]);

        while let Some(current) = queue.pop_front() {
            for &next in current.allowed_transitions() {
                if next == *self || previous.contains_key(&next) {
                    continue;
                }
                previous.insert(next, current);
                if next == target {
                    let mut path = vec![target];
                    let mut cursor = target;
                    while let Some(&prev) = previous.get(&cursor) {
                        if prev == *self {
                            break;
                        }
                        path.push(prev);
                        cursor = prev;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }

        None
    }

    /// Lenient parse: case, spaces, dashes and underscores are ignored
    fn parse(label: &str) -> Option<Self> {
        let wanted = normalize(label);
        Self::ALL
            .iter()
            .copied()
            .find(|status| normalize(status.label()) == wanted)
    }
}

fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

macro_rules! display_via_label {
    ($name:ident) => {
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

/// Lead states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Unqualified,
    Converted,
}

impl LifecycleStatus for LeadStatus {
    const KIND: EntityKind = EntityKind::Lead;
    const ALL: &'static [Self] = &[
        Self::New,
        Self::Contacted,
        Self::Qualified,
        Self::Unqualified,
        Self::Converted,
    ];

    fn initial() -> Self {
        Self::New
    }

    fn allowed_transitions(&self) -> &'static [Self] {
        match self {
            Self::New => &[Self::Contacted, Self::Qualified, Self::Unqualified, Self::Converted],
            Self::Contacted => &[Self::Qualified, Self::Unqualified, Self::Converted],
            Self::Qualified => &[Self::Converted, Self::Unqualified],
            Self::Unqualified | Self::Converted => &[],
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Contacted => "Contacted",
            Self::Qualified => "Qualified",
            Self::Unqualified => "Unqualified",
            Self::Converted => "Converted",
        }
    }
}

display_via_label!(LeadStatus);

/// Quote states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuoteStatus {
    Draft,
    Presented,
    Accepted,
    Declined,
}

impl LifecycleStatus for QuoteStatus {
    const KIND: EntityKind = EntityKind::Quote;
    const ALL: &'static [Self] = &[Self::Draft, Self::Presented, Self::Accepted, Self::Declined];

    fn initial() -> Self {
        Self::Draft
    }

    fn allowed_transitions(&self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Presented],
            Self::Presented => &[Self::Accepted, Self::Declined],
            Self::Accepted | Self::Declined => &[],
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Presented => "Presented",
            Self::Accepted => "Accepted",
            Self::Declined => "Declined",
        }
    }
}

display_via_label!(QuoteStatus);

/// Work order states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkOrderStatus {
    Pending,
    #[serde(rename = "In Progress", alias = "InProgress")]
    InProgress,
    Completed,
    Cancelled,
}

impl LifecycleStatus for WorkOrderStatus {
    const KIND: EntityKind = EntityKind::WorkOrder;
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::InProgress,
        Self::Completed,
        Self::Cancelled,
    ];

    fn initial() -> Self {
        Self::Pending
    }

    fn allowed_transitions(&self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::InProgress, Self::Cancelled],
            Self::InProgress => &[Self::Completed, Self::Cancelled],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }
}

display_via_label!(WorkOrderStatus);

/// Invoice states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl LifecycleStatus for InvoiceStatus {
    const KIND: EntityKind = EntityKind::Invoice;
    const ALL: &'static [Self] = &[
        Self::Draft,
        Self::Sent,
        Self::Paid,
        Self::Overdue,
        Self::Cancelled,
    ];

    fn initial() -> Self {
        Self::Draft
    }

    fn allowed_transitions(&self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Sent, Self::Cancelled],
            Self::Sent => &[Self::Paid, Self::Overdue, Self::Cancelled],
            Self::Overdue => &[Self::Paid, Self::Cancelled],
            Self::Paid | Self::Cancelled => &[],
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Sent => "Sent",
            Self::Paid => "Paid",
            Self::Overdue => "Overdue",
            Self::Cancelled => "Cancelled",
        }
    }
}

display_via_label!(InvoiceStatus);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_transitions() {
        assert!(QuoteStatus::Draft.can_transition_to(QuoteStatus::Presented));
        assert!(QuoteStatus::Presented.can_transition_to(QuoteStatus::Accepted));
        assert!(!QuoteStatus::Draft.can_transition_to(QuoteStatus::Accepted));
        assert!(QuoteStatus::Accepted.is_terminal());
    }

    #[test]
    fn test_work_order_transitions() {
        assert!(WorkOrderStatus::Pending.can_transition_to(WorkOrderStatus::InProgress));
        assert!(!WorkOrderStatus::Completed.can_transition_to(WorkOrderStatus::InProgress));

        let err = WorkOrderStatus::Pending
            .check_transition(WorkOrderStatus::Completed)
            .unwrap_err();
        assert_eq!(err.kind, EntityKind::WorkOrder);
        assert_eq!(err.to_string(), "Invalid work order status transition from Pending to Completed");
    }

    #[test]
    fn test_path_to_walks_the_table() {
        assert_eq!(QuoteStatus::Draft.path_to(QuoteStatus::Draft), Some(vec![]));
        assert_eq!(
            QuoteStatus::Draft.path_to(QuoteStatus::Accepted),
            Some(vec![QuoteStatus::Presented, QuoteStatus::Accepted])
        );
        assert_eq!(
            InvoiceStatus::Draft.path_to(InvoiceStatus::Paid),
            Some(vec![InvoiceStatus::Sent, InvoiceStatus::Paid])
        );
        assert_eq!(
            InvoiceStatus::Draft.path_to(InvoiceStatus::Cancelled),
            Some(vec![InvoiceStatus::Cancelled])
        );
        assert_eq!(QuoteStatus::Accepted.path_to(QuoteStatus::Draft), None);
    }

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!(WorkOrderStatus::parse("in progress"), Some(WorkOrderStatus::InProgress));
        assert_eq!(WorkOrderStatus::parse("IN_PROGRESS"), Some(WorkOrderStatus::InProgress));
        assert_eq!(LeadStatus::parse("converted"), Some(LeadStatus::Converted));
        assert_eq!(QuoteStatus::parse("approved"), None);
    }

    #[test]
    fn test_wire_labels() {
        assert_eq!(
            serde_json::to_string(&WorkOrderStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        assert_eq!(WorkOrderStatus::InProgress.to_string(), "In Progress");
        assert_eq!(EntityKind::WorkOrder.to_string(), "work order");
    }
}
