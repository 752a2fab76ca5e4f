//! HTTP Data API client
//!
//! Calls the hosted backend's mutation endpoint. Every procedure is a POST of
//! `{"path": "<module>:<function>", "args": {...}, "format": "json"}`; the
//! backend answers with a `success` or `error` envelope.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use bizgraph_models::{
    AccountContactLink, AccountId, ContactId, InvoiceFromWorkOrder, InvoiceId, InvoiceStatus,
    LeadId, LeadUpdate, NewAccount, NewContact, NewInvoice, NewLead, NewQuote, NewWorkOrder,
    QuoteId, QuoteStatus, WorkOrderId, WorkOrderStatus,
};
use bizgraph_utils::{BizGraphError, BizGraphResult, DataApiConfig};

use crate::{DataApi, Procedure};

#[derive(Debug, Serialize)]
struct MutationRequest<'a> {
    path: &'a str,
    args: serde_json::Value,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum MutationResponse {
    Success {
        value: serde_json::Value,
    },
    Error {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

/// Data API over HTTP
pub struct HttpDataApi {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpDataApi {
    pub fn new(config: &DataApiConfig) -> BizGraphResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/mutation", self.base_url)
    }

    async fn call<A, T>(&self, procedure: Procedure, args: &A) -> BizGraphResult<T>
    where
        A: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = MutationRequest {
            path: procedure.path(),
            args: serde_json::to_value(args)?,
            format: "json",
        };

        debug!(procedure = %procedure, "Calling Data API");

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BizGraphError::data_api(procedure.path(), e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BizGraphError::data_api(procedure.path(), e.to_string()))?;

        match serde_json::from_str::<MutationResponse>(&body) {
            Ok(MutationResponse::Success { value }) if status.is_success() => {
                serde_json::from_value(value).map_err(|e| {
                    BizGraphError::data_api(
                        procedure.path(),
                        format!("Unexpected response value: {}", e),
                    )
                })
            }
            Ok(MutationResponse::Error { error_message }) => {
                Err(BizGraphError::data_api(procedure.path(), error_message))
            }
            _ => Err(BizGraphError::data_api(
                procedure.path(),
                format!("HTTP {}: {}", status, body),
            )),
        }
    }
}

#[async_trait]
impl DataApi for HttpDataApi {
    async fn create_account(&self, account: &NewAccount) -> BizGraphResult<AccountId> {
        self.call(Procedure::CreateAccount, account).await
    }

    async fn link_contact_to_account(&self, link: &AccountContactLink) -> BizGraphResult<()> {
        self.call(Procedure::LinkContactToAccount, link).await
    }

    async fn create_contact(&self, contact: &NewContact) -> BizGraphResult<ContactId> {
        self.call(Procedure::CreateContact, contact).await
    }

    async fn create_lead(&self, lead: &NewLead) -> BizGraphResult<LeadId> {
        self.call(Procedure::CreateLead, lead).await
    }

    async fn update_lead(&self, id: &LeadId, update: &LeadUpdate) -> BizGraphResult<()> {
        let mut args = serde_json::to_value(update)?;
        args["id"] = json!(id);
        self.call(Procedure::UpdateLead, &args).await
    }

    async fn create_quote(&self, quote: &NewQuote) -> BizGraphResult<QuoteId> {
        self.call(Procedure::CreateQuote, quote).await
    }

    async fn change_quote_status(&self, id: &QuoteId, status: QuoteStatus) -> BizGraphResult<()> {
        self.call(
            Procedure::ChangeQuoteStatus,
            &json!({ "id": id, "status": status }),
        )
        .await
    }

    async fn create_work_order(&self, work_order: &NewWorkOrder) -> BizGraphResult<WorkOrderId> {
        self.call(Procedure::CreateWorkOrder, work_order).await
    }

    async fn change_work_order_status(
        &self,
        id: &WorkOrderId,
        status: WorkOrderStatus,
        completed_date: Option<DateTime<Utc>>,
    ) -> BizGraphResult<()> {
        let mut args = json!({ "id": id, "status": status });
        if let Some(completed) = completed_date {
            args["completedDate"] = json!(completed.timestamp_millis());
        }
        self.call(Procedure::ChangeWorkOrderStatus, &args).await
    }

    async fn create_invoice(&self, invoice: &NewInvoice) -> BizGraphResult<InvoiceId> {
        self.call(Procedure::CreateInvoice, invoice).await
    }

    async fn create_invoice_from_work_order(
        &self,
        input: &InvoiceFromWorkOrder,
    ) -> BizGraphResult<InvoiceId> {
        self.call(Procedure::CreateInvoiceFromWorkOrder, input).await
    }

    async fn change_invoice_status(
        &self,
        id: &InvoiceId,
        status: InvoiceStatus,
    ) -> BizGraphResult<()> {
        self.call(
            Procedure::ChangeInvoiceStatus,
            &json!({ "id": id, "status": status }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use bizgraph_utils::DataApiMode;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    type Seen = Arc<Mutex<Vec<serde_json::Value>>>;

    /// Spawns a fake backend on an ephemeral port and returns its base URL.
    async fn fake_backend(seen: Seen) -> String {
        let app = Router::new().route(
            "/api/mutation",
            post(move |Json(body): Json<serde_json::Value>| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(body.clone());
                    let reply = match body["path"].as_str() {
                        Some("contacts:create") => json!({"status": "success", "value": "contact_1"}),
                        Some("quotes:changeStatus") => json!({"status": "success", "value": null}),
                        Some(path) => json!({
                            "status": "error",
                            "errorMessage": format!("Server Error: {} is unavailable", path),
                        }),
                        None => json!({"status": "error", "errorMessage": "missing path"}),
                    };
                    Json(reply)
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> HttpDataApi {
        HttpDataApi::new(&DataApiConfig {
            mode: DataApiMode::Http,
            base_url,
            auth_token: Some("test-token".to_string()),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_success_envelope_returns_value() {
        let seen: Seen = Arc::default();
        let api = client_for(fake_backend(seen.clone()).await);

        let contact = NewContact {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: None,
            phone: None,
            address: None,
            city: None,
            state: None,
            zip: None,
            notes: None,
        };
        let id = api.create_contact(&contact).await.unwrap();
        assert_eq!(id, ContactId::new("contact_1"));

        api.change_quote_status(&QuoteId::new("q1"), QuoteStatus::Presented)
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0]["path"], "contacts:create");
        assert_eq!(seen[0]["format"], "json");
        assert_eq!(seen[0]["args"]["firstName"], "Ada");
        assert_eq!(seen[1]["args"], json!({"id": "q1", "status": "Presented"}));
    }

    #[tokio::test]
    async fn test_error_envelope_becomes_data_api_error() {
        let seen: Seen = Arc::default();
        let api = client_for(fake_backend(seen).await);

        let err = api
            .change_invoice_status(&InvoiceId::new("i1"), InvoiceStatus::Sent)
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "DATA_API_ERROR");
        assert!(err.to_string().contains("invoices:changeStatus is unavailable"));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_reported() {
        let api = client_for("http://127.0.0.1:9".to_string());
        let err = api
            .change_quote_status(&QuoteId::new("q1"), QuoteStatus::Presented)
            .await
            .unwrap_err();
        assert!(matches!(err, BizGraphError::DataApi { .. }));
    }

    #[tokio::test]
    async fn test_work_order_completion_sends_millis() {
        let seen: Seen = Arc::default();
        let api = client_for(fake_backend(seen.clone()).await);
        let completed = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();

        let _ = api
            .change_work_order_status(
                &WorkOrderId::new("w1"),
                WorkOrderStatus::Completed,
                Some(completed),
            )
            .await;

        let seen = seen.lock().unwrap();
        assert_eq!(
            seen[0]["args"],
            json!({"id": "w1", "status": "Completed", "completedDate": 1_700_000_000_000i64})
        );
    }
}
