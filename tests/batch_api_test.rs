//! REST round-trips against an in-memory SQLite database.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::TestApp;

fn hdpe_batch_payload(code: &str) -> Value {
    json!({
        "batch_code": code,
        "batch_no": 7,
        "production_date": "2024-04-01",
        "product_type_name": "HDPE Coil Pipe",
        "brand_name": "Acme",
        "parameters": {"OD": "32", "PN": "6", "PE": "10"},
        "stock_entries": [
            {"stock_type": "FULL_ROLL", "quantity": 3, "length_per_unit": 100},
            {"stock_type": "CUT_ROLL", "total_available": 10},
            {"stock_type": "CUT_ROLL", "total_available": 10},
            {"stock_type": "CUT_ROLL", "total_available": 5}
        ]
    })
}

fn sprinkler_batch_payload(code: &str) -> Value {
    json!({
        "batch_code": code,
        "batch_no": 9,
        "production_date": "2024-04-02",
        "product_type_name": "Sprinkler Pipe",
        "brand_name": "Rainflow",
        "parameters": {"OD": "25"},
        "stock_entries": [
            {"stock_type": "BUNDLE", "quantity": 3, "pieces_per_bundle": 25, "piece_length_meters": 6},
            {"stock_type": "SPARE", "piece_length_meters": 6, "piece_count": 12}
        ]
    })
}

fn entry_ids(batch: &Value) -> Vec<String> {
    let mut ids: Vec<String> = batch["stock_entries"]
        .as_array()
        .expect("stock_entries array")
        .iter()
        .map(|entry| entry["id"].as_str().expect("entry id").to_string())
        .collect();
    ids.sort();
    ids
}

fn entry_of_type<'a>(batch: &'a Value, stock_type: &str) -> &'a Value {
    batch["stock_entries"]
        .as_array()
        .expect("stock_entries array")
        .iter()
        .find(|entry| entry["stock_type"] == stock_type)
        .expect("entry of requested type")
}

#[tokio::test]
async fn create_and_fetch_batch_round_trip() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/batches",
            Some(hdpe_batch_payload("B-1001")),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");

    let created = &body["data"];
    assert_eq!(created["batch_code"], "B-1001");
    assert_eq!(created["stock_entries"].as_array().map(Vec::len), Some(4));
    // Derived meters for the full roll entry.
    let full_roll = entry_of_type(created, "FULL_ROLL");
    assert_eq!(full_roll["status"], "AVAILABLE");
    assert_eq!(full_roll["total_available"], "300");

    let id = created["id"].as_str().expect("batch id");
    let (status, body) = app
        .request(Method::GET, &format!("/api/v1/batches/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["batch_code"], "B-1001");
    assert_eq!(body["data"]["parameters"]["OD"], "32");
}

#[tokio::test]
async fn list_batches_filters_by_product_type() {
    let app = TestApp::new().await;
    app.request(
        Method::POST,
        "/api/v1/batches",
        Some(hdpe_batch_payload("B-2001")),
    )
    .await;
    app.request(
        Method::POST,
        "/api/v1/batches",
        Some(sprinkler_batch_payload("B-2002")),
    )
    .await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/batches?product_type=Sprinkler%20Pipe", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["batch_code"], "B-2002");

    let (status, body) = app.request(Method::GET, "/api/v1/batches", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
}

#[tokio::test]
async fn create_rejects_fields_foreign_to_the_stock_type() {
    let app = TestApp::new().await;

    let mut payload = hdpe_batch_payload("B-3001");
    payload["stock_entries"][0]["pieces_per_bundle"] = json!(25);

    let (status, body) = app
        .request(Method::POST, "/api/v1/batches", Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .expect("message")
        .contains("pieces_per_bundle"));
}

#[tokio::test]
async fn create_rejects_duplicate_batch_codes() {
    let app = TestApp::new().await;
    app.request(
        Method::POST,
        "/api/v1/batches",
        Some(hdpe_batch_payload("B-4001")),
    )
    .await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/batches",
            Some(hdpe_batch_payload("B-4001")),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn update_patches_header_without_touching_entries() {
    let app = TestApp::new().await;
    let (_, body) = app
        .request(
            Method::POST,
            "/api/v1/batches",
            Some(hdpe_batch_payload("B-5001")),
        )
        .await;
    let id = body["data"]["id"].as_str().expect("batch id").to_string();
    let original_entries = entry_ids(&body["data"]);

    let (status, body) = app
        .request(
            Method::PUT,
            &format!("/api/v1/batches/{id}"),
            Some(json!({"brand_name": "Apex", "batch_no": 8})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["brand_name"], "Apex");
    assert_eq!(body["data"]["batch_no"], 8);
    assert_eq!(entry_ids(&body["data"]), original_entries);

    let (status, _) = app
        .request(Method::PUT, &format!("/api/v1/batches/{id}"), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_removes_the_batch_and_its_entries() {
    let app = TestApp::new().await;
    let (_, body) = app
        .request(
            Method::POST,
            "/api/v1/batches",
            Some(hdpe_batch_payload("B-6001")),
        )
        .await;
    let id = body["data"]["id"].as_str().expect("batch id").to_string();

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/v1/batches/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(Method::GET, &format!("/api/v1/batches/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .request(Method::GET, "/api/v1/stock/grouped", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn string_numerics_land_in_the_same_group_as_numbers() {
    let app = TestApp::new().await;

    let mut first = sprinkler_batch_payload("B-7001");
    first["stock_entries"] = json!([
        {"stock_type": "SPARE", "piece_length_meters": "6", "piece_count": 1}
    ]);
    let mut second = sprinkler_batch_payload("B-7002");
    second["stock_entries"] = json!([
        {"stock_type": "SPARE", "piece_length_meters": "6.0", "piece_count": 2}
    ]);

    let (status, _) = app
        .request(Method::POST, "/api/v1/batches", Some(first))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app
        .request(Method::POST, "/api/v1/batches", Some(second))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .request(Method::GET, "/api/v1/stock/grouped", None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let groups = body["data"].as_array().expect("groups");
    assert_eq!(groups.len(), 1);
    let spares = groups[0]["rollup"]["spares"].as_array().expect("spares");
    assert_eq!(spares.len(), 1, "scales must collapse to one group");
    assert_eq!(spares[0]["total_pieces"], 3);
}

#[tokio::test]
async fn grouped_stock_reports_totals_per_policy() {
    let app = TestApp::new().await;
    app.request(
        Method::POST,
        "/api/v1/batches",
        Some(hdpe_batch_payload("B-8001")),
    )
    .await;
    app.request(
        Method::POST,
        "/api/v1/batches",
        Some(sprinkler_batch_payload("B-8002")),
    )
    .await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/stock/grouped", None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let groups = body["data"].as_array().expect("groups");
    assert_eq!(groups.len(), 2);

    let hdpe = &groups[0];
    assert_eq!(hdpe["product_type_name"], "HDPE Coil Pipe");
    assert_eq!(hdpe["total"], "325");
    assert_eq!(hdpe["total_unit"], "meters");

    let sprinkler = &groups[1];
    assert_eq!(sprinkler["product_type_name"], "Sprinkler Pipe");
    assert_eq!(sprinkler["total"], "87");
    assert_eq!(sprinkler["total_unit"], "pieces");
}

#[tokio::test]
async fn dispatch_return_and_scrap_transitions() {
    let app = TestApp::new().await;
    let (_, body) = app
        .request(
            Method::POST,
            "/api/v1/batches",
            Some(hdpe_batch_payload("B-9001")),
        )
        .await;
    let ids = entry_ids(&body["data"]);
    let created = body["data"].clone();
    let dispatched = entry_of_type(&created, "CUT_ROLL")["id"]
        .as_str()
        .expect("entry id");

    // Dispatch one cut roll.
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/stock/dispatch",
            Some(json!({"stock_ids": [dispatched], "note": "truck 14"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "dispatch failed: {body}");
    assert_eq!(body["data"]["updated"], 1);

    // Dispatched stock leaves the default grouped view.
    let (_, body) = app
        .request(Method::GET, "/api/v1/stock/grouped", None)
        .await;
    let lines = body["data"][0]["lines"].as_array().expect("lines");
    assert_eq!(lines.len(), ids.len() - 1);

    // Re-dispatching the same entry conflicts.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/stock/dispatch",
            Some(json!({"stock_ids": [dispatched]})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Return brings it back to available.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/stock/return",
            Some(json!({"stock_ids": [dispatched]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app
        .request(Method::GET, "/api/v1/stock/grouped", None)
        .await;
    let lines = body["data"][0]["lines"].as_array().expect("lines");
    assert_eq!(lines.len(), ids.len());

    // Scrap requires a reason and removes the entry from stock.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/stock/scrap",
            Some(json!({"stock_ids": [dispatched], "reason": ""})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/stock/scrap",
            Some(json!({"stock_ids": [dispatched], "reason": "kinked coil"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app
        .request(Method::GET, "/api/v1/stock/grouped", None)
        .await;
    let lines = body["data"][0]["lines"].as_array().expect("lines");
    assert_eq!(lines.len(), ids.len() - 1);

    // Scrapped entries are visible under their own status filter.
    let (_, body) = app
        .request(Method::GET, "/api/v1/stock/grouped?status=SCRAPPED", None)
        .await;
    let lines = body["data"][0]["lines"].as_array().expect("lines");
    assert_eq!(lines.len(), 1);
}

#[tokio::test]
async fn share_message_round_trip_and_empty_selection() {
    let app = TestApp::new().await;
    let (_, body) = app
        .request(
            Method::POST,
            "/api/v1/batches",
            Some(sprinkler_batch_payload("B-9101")),
        )
        .await;
    let ids = entry_ids(&body["data"]);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/stock/share-message",
            Some(json!({"stock_ids": ids})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let message = body["data"]["message"].as_str().expect("message");
    assert!(message.contains("*Sprinkler Pipe*"));
    assert!(message.contains("Total: 87 pcs"));

    // Empty selection is rejected before any formatting happens.
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/stock/share-message",
            Some(json!({"stock_ids": []})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");

    // A selection of unknown ids is rejected as well.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/stock/share-message",
            Some(json!({"stock_ids": ["00000000-0000-0000-0000-000000000000"]})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_and_status_endpoints_respond() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["service"], "pipestock-api");

    let (status, body) = app.request(Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["checks"]["database"], "healthy");
}
