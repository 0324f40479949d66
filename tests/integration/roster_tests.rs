//! Students, subjects and enrollments

use reqwest::Client;
use serde_json::{json, Value};

use crate::common::{admin_token, post, unique};

async fn create_student(client: &Client, token: &str, first_name: &str) -> i64 {
    let code = unique("2024");
    let response = post(
        client,
        token,
        "/students",
        json!({
            "student_id": code,
            "first_name": first_name,
            "last_name": "Doe",
            "email": format!("{}@school.test", code)
        }),
    )
    .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse student");
    body["data"]["id"].as_i64().expect("No student id")
}

#[tokio::test]
#[ignore]
async fn test_bulk_enroll_skips_existing_pairs() {
    let client = Client::new();
    let admin = admin_token(&client).await;

    let subject: Value = post(
        &client,
        &admin,
        "/subjects",
        json!({ "name": "History", "code": unique("HIST") }),
    )
    .await
    .json()
    .await
    .expect("Failed to parse subject");
    let subject_id = subject["data"]["id"].as_i64().expect("No subject id");

    let already = create_student(&client, &admin, "Jane").await;
    let second = create_student(&client, &admin, "John").await;
    let third = create_student(&client, &admin, "Jim").await;

    let single = post(
        &client,
        &admin,
        "/enrollments",
        json!({ "student_id": already, "subject_id": subject_id }),
    )
    .await;
    assert_eq!(single.status(), 201);

    let bulk = post(
        &client,
        &admin,
        "/enrollments/bulk",
        json!({ "student_ids": [already, second, third], "subject_id": subject_id }),
    )
    .await;
    assert_eq!(bulk.status(), 201);
    let body: Value = bulk.json().await.expect("Failed to parse bulk result");

    assert_eq!(body["data"]["skipped"], json!([already]));
    let mut enrolled: Vec<i64> = body["data"]["enrolled"]
        .as_array()
        .expect("No enrolled list")
        .iter()
        .filter_map(|e| e["student_id"].as_i64())
        .collect();
    enrolled.sort_unstable();
    let mut expected = vec![second, third];
    expected.sort_unstable();
    assert_eq!(enrolled, expected);

    // Running it again enrolls nobody new
    let repeat: Value = post(
        &client,
        &admin,
        "/enrollments/bulk",
        json!({ "student_ids": [already, second, third], "subject_id": subject_id }),
    )
    .await
    .json()
    .await
    .expect("Failed to parse bulk result");
    assert_eq!(repeat["data"]["enrolled"], json!([]));
    assert_eq!(repeat["data"]["skipped"].as_array().map(Vec::len), Some(3));
}
