use privy_pin::Pin;
use serde_json::{json, Value};

use crate::support::{repo, sorted_names, start_server, toilet};

#[tokio::test]
async fn batch_create_then_list_all() {
    let base = start_server(repo()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/toilets/batch"))
        .json(&json!([toilet("A", 121.0, 14.5), toilet("B", 121.1, 14.6)]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["created"].as_array().unwrap().len(), 2);
    assert!(body["failed"].as_array().unwrap().is_empty());
    // Input order is preserved in the response.
    assert_eq!(body["created"][0]["name"], "A");
    assert_eq!(body["created"][1]["name"], "B");

    let all: Vec<Pin> = client
        .get(format!("{base}/toilets"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sorted_names(&all), vec!["A", "B"]);
    assert_ne!(all[0].id, all[1].id);

    let a = all.iter().find(|p| p.name == "A").unwrap();
    assert_eq!(a.location.coordinates, [121.0, 14.5]);
}

#[tokio::test]
async fn batch_partial_failure_is_207() {
    let base = start_server(repo()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/toilets/batch"))
        .json(&json!([
            toilet("Good", 121.0, 14.5),
            toilet("Bad", 121.0, 95.0),
            toilet("Also good", 121.0, 14.6)
        ]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 207);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["created"].as_array().unwrap().len(), 2);
    assert_eq!(body["failed"][0]["index"], 1);
    assert!(body["failed"][0]["message"].is_string());
}

#[tokio::test]
async fn batch_total_failure_is_422() {
    let base = start_server(repo()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/toilets/batch"))
        .json(&json!([toilet("", 0.0, 0.0), toilet("Far", 500.0, 0.0)]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert!(body["created"].as_array().unwrap().is_empty());
    assert_eq!(body["failed"].as_array().unwrap().len(), 2);
}
