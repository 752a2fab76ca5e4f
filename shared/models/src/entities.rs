//! Creation payloads for backend records.
//!
//! Field names serialize camelCase and dates as epoch milliseconds, which is
//! what the backend's mutation arguments expect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::ids::{AccountId, ContactId, QuoteId, WorkOrderId};
use crate::status::LeadStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Residential,
    Commercial,
    Industrial,
    Government,
    #[serde(rename = "Non-Profit")]
    NonProfit,
}

impl AccountType {
    pub const ALL: [AccountType; 5] = [
        AccountType::Residential,
        AccountType::Commercial,
        AccountType::Industrial,
        AccountType::Government,
        AccountType::NonProfit,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    #[validate(length(min = 1, max = 255, message = "Account name is required"))]
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 2, max = 2, message = "State must be a two-letter code"))]
    pub state: String,
    #[validate(length(min = 5, max = 10))]
    pub zip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Email must be a valid email address"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl NewContact {
    /// Same person, required fields only
    pub fn required_only(&self) -> Self {
        Self {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: None,
            phone: None,
            address: None,
            city: None,
            state: None,
            zip: None,
            notes: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AccountContactLink {
    pub contact_id: ContactId,
    pub account_id: AccountId,
    #[validate(length(min = 1, max = 100))]
    pub relationship: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    #[validate(length(min = 1, max = 255, message = "Lead name is required"))]
    pub name: String,
    #[validate(email(message = "Email must be a valid email address"))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub status: LeadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial lead update; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<LeadStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[validate(length(min = 1, max = 500, message = "Line item description is required"))]
    pub description: String,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
    #[validate(range(min = 0.0, message = "Unit price must not be negative"))]
    pub unit_price: f64,
}

impl LineItem {
    pub fn amount(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

pub fn line_items_total(items: &[LineItem]) -> f64 {
    items.iter().map(LineItem::amount).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_quote_dates"))]
pub struct NewQuote {
    pub contact_id: ContactId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub issue_date: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expiry_date: DateTime<Utc>,
    #[validate(custom = "validate_line_items")]
    pub line_items: Vec<LineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkOrder {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_order_number: Option<String>,
    pub contact_id: ContactId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<QuoteId>,
    #[validate(length(max = 2000))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_invoice_dates"))]
pub struct NewInvoice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    pub contact_id: ContactId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_order_id: Option<WorkOrderId>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub issue_date: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub due_date: DateTime<Utc>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub paid_date: Option<DateTime<Utc>>,
    #[validate(custom = "validate_line_items")]
    pub line_items: Vec<LineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_from_work_order_dates"))]
pub struct InvoiceFromWorkOrder {
    pub work_order_id: WorkOrderId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub issue_date: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub due_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn validate_line_items(items: &[LineItem]) -> Result<(), ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::new("line_items_empty"));
    }
    if items.iter().any(|item| item.validate().is_err()) {
        return Err(ValidationError::new("line_item_invalid"));
    }
    Ok(())
}

fn validate_quote_dates(quote: &NewQuote) -> Result<(), ValidationError> {
    if quote.expiry_date < quote.issue_date {
        return Err(ValidationError::new("expiry_before_issue"));
    }
    Ok(())
}

fn validate_invoice_dates(invoice: &NewInvoice) -> Result<(), ValidationError> {
    if invoice.due_date < invoice.issue_date {
        return Err(ValidationError::new("due_before_issue"));
    }
    if let Some(paid) = invoice.paid_date {
        if paid <= invoice.issue_date {
            return Err(ValidationError::new("paid_not_after_issue"));
        }
    }
    Ok(())
}

fn validate_from_work_order_dates(input: &InvoiceFromWorkOrder) -> Result<(), ValidationError> {
    if input.due_date < input.issue_date {
        return Err(ValidationError::new("due_before_issue"));
    }
    Ok(())
}
