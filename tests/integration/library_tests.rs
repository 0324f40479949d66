//! Borrowing, returns and reservations

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value};

use crate::common::{admin_token, base_url, database, get, post, unique, user_with_role};

fn timestamp(value: &Value) -> DateTime<Utc> {
    value
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .expect("Not an RFC 3339 timestamp")
}

async fn available_copies(client: &Client, book_id: i64) -> i64 {
    let details: Value = client
        .get(format!("{}/library/books/{}", base_url(), book_id))
        .send()
        .await
        .expect("Failed to fetch book")
        .json()
        .await
        .expect("Failed to parse book");
    details["data"]["available_copies"].as_i64().expect("No availability")
}

async fn borrow(client: &Client, token: &str, book_id: i64) -> Value {
    let response = post(client, token, "/library/borrow", json!({ "book_id": book_id })).await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse borrowing");
    body["data"].clone()
}

async fn create_book(client: &Client, token: &str, title: &str, copies: i32) -> i64 {
    let response = post(
        client,
        token,
        "/library/admin/books",
        json!({ "title": title, "author": "George Orwell", "copies": copies }),
    )
    .await;
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.expect("Failed to parse book");
    body["data"]["id"].as_i64().expect("No book id")
}

#[tokio::test]
#[ignore]
async fn test_borrow_return_and_reserve_single_copy() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book_id = create_book(&client, &admin, &unique("1984"), 1).await;
    let (_, reader) = user_with_role(&client, &admin, "viewer").await;
    let (_, other) = user_with_role(&client, &admin, "teacher").await;

    let borrowed = post(&client, &reader, "/library/borrow", json!({ "book_id": book_id })).await;
    assert_eq!(borrowed.status(), 201);
    let borrowing: Value = borrowed.json().await.expect("Failed to parse borrowing");
    let borrowing_id = borrowing["data"]["id"].as_i64().expect("No borrowing id");

    // The only copy is out
    let denied = post(&client, &other, "/library/borrow", json!({ "book_id": book_id })).await;
    assert_eq!(denied.status(), 400);

    let reserved = post(&client, &other, "/library/reservations", json!({ "book_id": book_id })).await;
    assert_eq!(reserved.status(), 201);
    let twice = post(&client, &other, "/library/reservations", json!({ "book_id": book_id })).await;
    assert_eq!(twice.status(), 409);

    // Someone else's borrowing cannot be returned through self-service
    let foreign = post(&client, &other, "/library/return", json!({ "borrowing_id": borrowing_id })).await;
    assert_eq!(foreign.status(), 404);

    let returned = post(&client, &reader, "/library/return", json!({ "borrowing_id": borrowing_id })).await;
    assert_eq!(returned.status(), 200);
    let receipt: Value = returned.json().await.expect("Failed to parse receipt");
    assert_eq!(receipt["data"]["days_overdue"], 0);
    assert_eq!(receipt["data"]["borrowing"]["status"], "returned");

    let again = post(&client, &reader, "/library/return", json!({ "borrowing_id": borrowing_id })).await;
    assert_eq!(again.status(), 409);

    // A copy is available again, so a new reservation is refused
    let (_, third) = user_with_role(&client, &admin, "librarian").await;
    let refused = post(&client, &third, "/library/reservations", json!({ "book_id": book_id })).await;
    assert_eq!(refused.status(), 409);
}

#[tokio::test]
#[ignore]
async fn test_concurrent_borrow_of_last_copy() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book_id = create_book(&client, &admin, &unique("Animal Farm"), 1).await;
    let (_, first) = user_with_role(&client, &admin, "viewer").await;
    let (_, second) = user_with_role(&client, &admin, "viewer").await;

    let body = json!({ "book_id": book_id });
    let (a, b) = tokio::join!(
        post(&client, &first, "/library/borrow", body.clone()),
        post(&client, &second, "/library/borrow", body.clone()),
    );

    let mut statuses = vec![a.status().as_u16(), b.status().as_u16()];
    statuses.sort_unstable();
    assert_eq!(statuses, vec![201, 400]);

assert_eq!(available_copies(&client, book_id).await, 0);
}

#[tokio::test]
#[ignore]
async fn test_catalog_is_public_and_desk_is_not() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let title = unique("Homage to Catalonia");
    create_book(&client, &admin, &title, 2).await;

    let search: Value = client
        .get(format!("{}/library/books", base_url()))
        .query(&[("search", title.as_str())])
        .send()
        .await
        .expect("Failed to search")
        .json()
        .await
        .expect("Failed to parse search");
    assert_eq!(search["data"]["pagination"]["total"], 1);
    assert_eq!(search["data"]["items"][0]["available_copies"], 2);

    let (_, teacher) = user_with_role(&client, &admin, "teacher").await;
    let stats = get(&client, &teacher, "/library/admin/stats").await;
    assert_eq!(stats.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_four_copies_out_and_back() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book_id = create_book(&client, &admin, &unique("1984"), 4).await;
    let (_, reader) = user_with_role(&client, &admin, "viewer").await;
    assert_eq!(available_copies(&client, book_id).await, 4);

    let borrowing = borrow(&client, &reader, book_id).await;
    assert_eq!(borrowing["status"], "borrowed");
    assert_eq!(
        timestamp(&borrowing["due_date"]).date_naive(),
        (Utc::now() + Duration::days(14)).date_naive()
    );
    assert_eq!(available_copies(&client, book_id).await, 3);

    let mine: Value = get(&client, &reader, "/library/borrowings")
        .await
        .json()
        .await
        .expect("Failed to parse borrowings");
    assert_eq!(mine["data"].as_array().map(Vec::len), Some(1));

    let returned = post(&client, &reader, "/library/return", json!({ "borrowing_id": borrowing["id"] })).await;
    assert_eq!(returned.status(), 200);
    let receipt: Value = returned.json().await.expect("Failed to parse receipt");
    assert_eq!(receipt["data"]["days_overdue"], 0);
    assert_eq!(receipt["data"]["fine_amount"].as_str().and_then(|f| f.parse::<f64>().ok()), Some(0.0));
    assert_eq!(available_copies(&client, book_id).await, 4);
}

#[tokio::test]
#[ignore]
async fn test_borrow_limit_leaves_no_borrowing_behind() {
    let client = Client::new();
    let db = database().await;
    let admin = admin_token(&client).await;
    let first_book = create_book(&client, &admin, &unique("Brave New World"), 1).await;
    let second_book = create_book(&client, &admin, &unique("Fahrenheit 451"), 1).await;
    let (user_id, reader) = user_with_role(&client, &admin, "viewer").await;

    sqlx::query("UPDATE library_users SET max_borrow_limit = 1 WHERE user_id = $1")
        .bind(user_id as i32)
        .execute(&db)
        .await
        .expect("Failed to lower borrow limit");

    borrow(&client, &reader, first_book).await;
    let refused = post(&client, &reader, "/library/borrow", json!({ "book_id": second_book })).await;
    assert_eq!(refused.status(), 400);
    let body: Value = refused.json().await.expect("Failed to parse error");
    assert_eq!(body["success"], false);

    let (held,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM borrowings b JOIN library_users lu ON lu.id = b.user_id WHERE lu.user_id = $1",
    )
    .bind(user_id as i32)
    .fetch_one(&db)
    .await
    .expect("Failed to count borrowings");
    assert_eq!(held, 1);
    assert_eq!(available_copies(&client, second_book).await, 1);
}

#[tokio::test]
#[ignore]
async fn test_late_return_charges_each_started_day() {
    let client = Client::new();
    let db = database().await;
    let admin = admin_token(&client).await;
    let book_id = create_book(&client, &admin, &unique("We"), 1).await;
    let (_, reader) = user_with_role(&client, &admin, "viewer").await;
    let borrowing = borrow(&client, &reader, book_id).await;
    let borrowing_id = borrowing["id"].as_i64().expect("No borrowing id") as i32;

    sqlx::query("UPDATE borrowings SET due_date = NOW() - INTERVAL '3 days' + INTERVAL '1 hour' WHERE id = $1")
        .bind(borrowing_id)
        .execute(&db)
        .await
        .expect("Failed to move due date");

    let returned = post(&client, &reader, "/library/return", json!({ "borrowing_id": borrowing_id })).await;
    assert_eq!(returned.status(), 200);
    let receipt: Value = returned.json().await.expect("Failed to parse receipt");
    assert_eq!(receipt["data"]["days_overdue"], 3);
    assert_eq!(receipt["data"]["fine_amount"].as_str().and_then(|f| f.parse::<f64>().ok()), Some(1.5));
    assert_eq!(receipt["data"]["borrowing"]["status"], "returned");

    let (rows, total): (i64, f64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(amount), 0)::FLOAT8 FROM fines WHERE borrowing_id = $1 AND NOT paid",
    )
    .bind(borrowing_id)
    .fetch_one(&db)
    .await
    .expect("Failed to read fines");
    assert_eq!(rows, 1);
    assert_eq!(total, 1.5);
}

#[tokio::test]
#[ignore]
async fn test_renewal_extends_from_current_due_date() {
    let client = Client::new();
    let db = database().await;
    let admin = admin_token(&client).await;
    let book_id = create_book(&client, &admin, &unique("Nineteen Eighty-Four"), 1).await;
    let (_, reader) = user_with_role(&client, &admin, "viewer").await;
    let (_, librarian) = user_with_role(&client, &admin, "librarian").await;
    let borrowing = borrow(&client, &reader, book_id).await;
    let borrowing_id = borrowing["id"].as_i64().expect("No borrowing id");

    // A due date far from now separates "due + 14" from "now + 14"
    sqlx::query("UPDATE borrowings SET due_date = NOW() + INTERVAL '5 days' WHERE id = $1")
        .bind(borrowing_id as i32)
        .execute(&db)
        .await
        .expect("Failed to move due date");
    let (due,): (DateTime<Utc>,) = sqlx::query_as("SELECT due_date FROM borrowings WHERE id = $1")
        .bind(borrowing_id as i32)
        .fetch_one(&db)
        .await
        .expect("Failed to read due date");

    let renewed = post(
        &client,
        &librarian,
        &format!("/library/admin/borrowings/{}/renew", borrowing_id),
        json!({}),
    )
    .await;
    assert_eq!(renewed.status(), 200);
    let body: Value = renewed.json().await.expect("Failed to parse renewal");
    let new_due = timestamp(&body["data"]["due_date"]);
    assert!((new_due - (due + Duration::days(14))).num_seconds().abs() <= 1);
    assert_eq!(body["data"]["status"], "borrowed");
}

#[tokio::test]
#[ignore]
async fn test_fulfilled_hold_is_not_a_checkout() {
    let client = Client::new();
    let admin = admin_token(&client).await;
    let book_id = create_book(&client, &admin, &unique("Down and Out"), 1).await;
    let (_, reader) = user_with_role(&client, &admin, "viewer").await;
    let (waiting_id, waiting) = user_with_role(&client, &admin, "teacher").await;
    let (_, librarian) = user_with_role(&client, &admin, "librarian").await;
    borrow(&client, &reader, book_id).await;

    let reserved = post(&client, &waiting, "/library/reservations", json!({ "book_id": book_id })).await;
    assert_eq!(reserved.status(), 201);
    let reservation: Value = reserved.json().await.expect("Failed to parse reservation");
    let reservation_id = reservation["data"]["id"].as_i64().expect("No reservation id");
    let path = format!("/library/admin/reservations/{}/fulfill", reservation_id);

    let fulfilled = post(&client, &librarian, &path, json!({})).await;
    assert_eq!(fulfilled.status(), 200);
    let body: Value = fulfilled.json().await.expect("Failed to parse reservation");
    assert_eq!(body["data"]["status"], "fulfilled");
    let pickup_by = timestamp(&body["data"]["expires_at"]);
    assert!((pickup_by - (Utc::now() + Duration::days(3))).num_minutes().abs() <= 5);

    let checked_out: Value = get(&client, &librarian, &format!("/library/admin/borrowings/{}", waiting_id))
        .await
        .json()
        .await
        .expect("Failed to parse borrowings");
    assert_eq!(checked_out["data"].as_array().map(Vec::len), Some(0));
    assert_eq!(available_copies(&client, book_id).await, 0);

    let again = post(&client, &librarian, &path, json!({})).await;
    assert_eq!(again.status(), 404);
}
