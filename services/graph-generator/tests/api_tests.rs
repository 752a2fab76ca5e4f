use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

use bizgraph_data_api::InMemoryDataApi;
use bizgraph_graph_generator::{router, AppState};
use bizgraph_models::{GenerationConfig, GenerationReport, WorkflowReport};
use bizgraph_utils::GenerationSettings;

async fn spawn_service() -> String {
    let state = AppState::new(
        Arc::new(InMemoryDataApi::new()),
        GenerationSettings::default(),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_health() {
    let base = spawn_service().await;
    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "graph-generator");
}

#[tokio::test]
async fn test_defaults_round_trip_into_batch() {
    let base = spawn_service().await;
    let client = reqwest::Client::new();

    let defaults: GenerationConfig = client
        .get(format!("{}/api/v1/generation/defaults", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(defaults, GenerationConfig::default());

    let small = GenerationConfig {
        accounts: 2,
        contacts: 3,
        quotes: 2,
        seed: Some(4),
        ..GenerationConfig::empty()
    };
    let response = client
        .post(format!("{}/api/v1/generation/batch", base))
        .json(&small)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let report: GenerationReport = response.json().await.unwrap();
    assert!(report.success);
    assert_eq!(report.results.accounts.len(), 2);
    assert_eq!(report.results.contacts.len(), 3);
    assert_eq!(report.results.quotes.len(), 2);
}

#[tokio::test]
async fn test_batch_rejects_invalid_config() {
    let base = spawn_service().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/generation/batch", base))
        .json(&json!({ "invoiceStatusWeights": { "Paid": 0, "Sent": 0 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["message"].as_str().unwrap().contains("sum to zero"));

    let response = client
        .post(format!("{}/api/v1/generation/batch", base))
        .json(&json!({ "quoteStatusWeights": { "Approved": 1 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = client
        .post(format!("{}/api/v1/generation/batch", base))
        .json(&json!({ "leads": 10001 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_workflow_route() {
    let base = spawn_service().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/v1/generation/workflow", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let report: WorkflowReport = response.json().await.unwrap();
    assert!(report.success, "{:?}", report.errors);
    assert!(report.results.is_complete());

    let seeded = client
        .post(format!("{}/api/v1/generation/workflow", base))
        .json(&json!({ "seed": 9 }))
        .send()
        .await
        .unwrap();
    assert_eq!(seeded.status(), 200);
}
