//! Scan sessions and QR attendance

use reqwest::Client;
use serde_json::{json, Value};

use crate::common::{admin_token, base_url, post, unique};

/// Creates a subject and an enrolled student; returns (subject_id, qr_code)
async fn subject_with_student(client: &Client, token: &str) -> (i64, String) {
    let subject: Value = post(
        client,
        token,
        "/subjects",
        json!({ "name": "Mathematics", "code": unique("MATH") }),
    )
    .await
    .json()
    .await
    .expect("Failed to parse subject");
    let subject_id = subject["data"]["id"].as_i64().expect("No subject id");

    let qr_code = unique("qr-john-doe");
    let code = unique("2024");
    let student: Value = post(
        client,
        token,
        "/students",
        json!({
            "student_id": code,
            "first_name": "John",
            "last_name": "Doe",
            "email": format!("{}@school.test", code),
            "qr_code": qr_code
        }),
    )
    .await
    .json()
    .await
    .expect("Failed to parse student");
    let student_id = student["data"]["id"].as_i64().expect("No student id");

    let enrolled = post(
        client,
        token,
        "/enrollments",
        json!({ "student_id": student_id, "subject_id": subject_id }),
    )
    .await;
    assert_eq!(enrolled.status(), 201);

    (subject_id, qr_code)
}

#[tokio::test]
#[ignore]
async fn test_scan_requires_active_session() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (subject_id, qr_code) = subject_with_student(&client, &admin).await;

    let response = post(
        &client,
        &admin,
        "/scan/scan",
        json!({ "qr_code": qr_code, "subject_id": subject_id }),
    )
    .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_second_scan_same_day_conflicts() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let (subject_id, qr_code) = subject_with_student(&client, &admin).await;

    let session = post(&client, &admin, "/scan/session/start", json!({ "subject_id": subject_id })).await;
    assert_eq!(session.status(), 201);
    let session: Value = session.json().await.expect("Failed to parse session");
    let session_id = session["data"]["id"].as_i64().expect("No session id");

    let again = post(&client, &admin, "/scan/session/start", json!({ "subject_id": subject_id })).await;
    assert_eq!(again.status(), 409);

    let scan = json!({ "qr_code": qr_code, "subject_id": subject_id });
    let first = post(&client, &admin, "/scan/scan", scan.clone()).await;
    assert_eq!(first.status(), 200);
    let body: Value = first.json().await.expect("Failed to parse scan");
    assert_eq!(body["data"]["attendance"]["status"], "present");
    assert_eq!(body["data"]["student"]["first_name"], "John");

    let second = post(&client, &admin, "/scan/scan", scan).await;
    assert_eq!(second.status(), 409);

    let unknown = post(
        &client,
        &admin,
        "/scan/scan",
        json!({ "qr_code": unique("qr-nobody"), "subject_id": subject_id }),
    )
    .await;
    assert_eq!(unknown.status(), 404);

    let ended = client
        .put(format!("{}/scan/session/end/{}", base_url(), session_id))
        .bearer_auth(&admin)
        .send()
        .await
        .expect("Failed to end session");
    assert_eq!(ended.status(), 200);
}
