//! Typed identifiers for backend records.
//!
//! The backend hands out opaque string ids. Each entity kind gets its own
//! newtype so a contact id can never be passed where a quote id is expected.

use serde::{Deserialize, Serialize};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

entity_id!(
    /// Identifier of an account record
    AccountId
);
entity_id!(
    /// Identifier of a contact record
    ContactId
);
entity_id!(
    /// Identifier of a lead record
    LeadId
);
entity_id!(
    /// Identifier of a quote record
    QuoteId
);
entity_id!(
    /// Identifier of a work order record
    WorkOrderId
);
entity_id!(
    /// Identifier of an invoice record
    InvoiceId
);
