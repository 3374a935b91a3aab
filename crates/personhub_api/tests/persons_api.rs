use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use personhub_api::{app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> Router {
    app(AppState::in_memory().unwrap())
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create(app: &Router, name: &str, email: &str, age: i32) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/persons",
        Some(json!({ "name": name, "email": email, "age": age })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body["id"].as_i64().unwrap()
}

fn names(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|person| person["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn create_conflict_update_delete_flow() {
    let app = test_app();

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/persons",
        Some(json!({ "name": "Ann", "email": "ann@x.com", "age": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/persons",
        Some(json!({ "name": "Bob", "email": "ann@x.com", "age": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let uri = format!("/api/persons/{id}");
    let (status, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, json!({ "id": id, "name": "Ann", "email": "ann@x.com", "age": 20 }));

    let (status, updated) = send(
        &app,
        Method::PUT,
        &uri,
        Some(json!({ "name": "Annie", "age": 21 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated, json!({ "id": id, "name": "Annie", "email": "ann@x.com", "age": 21 }));

    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn missing_ids_are_not_found() {
    let app = test_app();

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/persons/77",
        Some(json!({ "name": "Ghost", "email": "ghost@x.com", "age": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/api/persons/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_to_foreign_email_is_conflict() {
    let app = test_app();
    let ann = create(&app, "Ann", "ann@x.com", 20).await;
    create(&app, "Bob", "bob@x.com", 30).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/persons/{ann}"),
        Some(json!({ "name": "Ann", "email": "bob@x.com", "age": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");

    let (_, stored) = send(&app, Method::GET, &format!("/api/persons/{ann}"), None).await;
    assert_eq!(stored["email"], "ann@x.com");
}

#[tokio::test]
async fn field_validation_fails_with_bad_request() {
    let app = test_app();

    let long_name = "a".repeat(10_000);
    let cases = [
        json!({ "name": long_name, "email": "long@x.com", "age": 1 }),
        json!({ "name": "   ", "email": "blank@x.com", "age": 1 }),
        json!({ "name": "Test", "email": "invalid-email", "age": 30 }),
        json!({ "name": "Neg", "email": "neg@x.com", "age": -1 }),
        json!({ "name": "NoEmail", "age": 1 }),
        json!({ "id": 5, "name": "Preset", "email": "preset@x.com", "age": 1 }),
    ];
    for case in cases {
        let (status, body) = send(&app, Method::POST, "/api/persons", Some(case)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(body["error"]["code"], "validation_error");
    }

    let (_, count) = send(&app, Method::GET, "/api/persons/count", None).await;
    assert_eq!(count, json!(0));
}

#[tokio::test]
async fn malformed_bodies_are_rejected_at_the_boundary() {
    let app = test_app();

    let request = Request::post("/api/persons")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = Request::post("/api/persons")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(r#"{"name":"Ann","email":"ann@x.com","age":20}"#))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (_, count) = send(&app, Method::GET, "/api/persons/count", None).await;
    assert_eq!(count, json!(0));
}

#[tokio::test]
async fn search_endpoints_return_lists() {
    let app = test_app();
    create(&app, "Ann Smith", "ann@x.com", 20).await;
    create(&app, "Bob", "bob@corp.com", 30).await;
    create(&app, "Anna", "anna@x.com", 30).await;
    create(&app, "Bob", "bob2@x.com", 45).await;

    let (_, body) = send(&app, Method::GET, "/api/persons/search/name/Bob", None).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) =
        send(&app, Method::GET, "/api/persons/search/email/anna@x.com", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Anna");

    let (status, _) =
        send(&app, Method::GET, "/api/persons/search/email/nobody@x.com", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, Method::GET, "/api/persons/search/age/30", None).await;
    assert_eq!(names(&body), ["Bob", "Anna"]);

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/persons/search/name/containing?keyword=ANN",
        None,
    )
    .await;
    assert_eq!(names(&body), ["Ann Smith", "Anna"]);

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/persons/search/email/containing?keyword=corp",
        None,
    )
    .await;
    assert_eq!(names(&body), ["Bob"]);

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/persons/search/nameAndAge?name=Bob&age=45",
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/persons/search/nameOrEmail?name=Anna&email=ann@x.com",
        None,
    )
    .await;
    assert_eq!(names(&body), ["Ann Smith", "Anna"]);

    let (_, body) = send(&app, Method::GET, "/api/persons/search/age/orderByName/30", None).await;
    assert_eq!(names(&body), ["Anna", "Bob"]);

    let (_, body) = send(&app, Method::GET, "/api/persons/search/name/orderByAge/Bob", None).await;
    let ages: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|person| person["age"].as_i64().unwrap())
        .collect();
    assert_eq!(ages, [45, 30]);

    let (_, body) = send(&app, Method::GET, "/api/persons/search/age/older/30", None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = send(&app, Method::GET, "/api/persons/search/age/younger/30", None).await;
    assert_eq!(names(&body), ["Ann Smith"]);

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/persons/search/keyword?keyword=x.com",
        None,
    )
    .await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (_, body) = send(&app, Method::GET, "/api/persons/search/name/top5?name=b", None).await;
    assert_eq!(names(&body), ["Bob", "Bob"]);
}

#[tokio::test]
async fn name_searches_ignore_non_ascii_case() {
    let app = test_app();
    create(&app, "Jürg MÜLLER", "juerg@x.com", 40).await;
    create(&app, "Bob", "bob@x.com", 30).await;

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/persons/search/name/containing?keyword=m%C3%BCller",
        None,
    )
    .await;
    assert_eq!(names(&body), ["Jürg MÜLLER"]);

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/persons/search/keyword?keyword=m%C3%BCller",
        None,
    )
    .await;
    assert_eq!(names(&body), ["Jürg MÜLLER"]);

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/persons/count/name/containing?namePattern=m%C3%BCller",
        None,
    )
    .await;
    assert_eq!(body, json!(1));
}

#[tokio::test]
async fn age_range_validates_bounds() {
    let app = test_app();
    create(&app, "Ann", "ann@x.com", 25).await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/persons/search/age/range?startAge=30&endAge=20",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/persons/search/age/range?startAge=20&endAge=30",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), ["Ann"]);
}

#[tokio::test]
async fn oldest_endpoints_sort_by_age_desc() {
    let app = test_app();
    create(&app, "A", "a@x.com", 40).await;
    create(&app, "B", "b@x.com", 60).await;
    create(&app, "C", "c@x.com", 60).await;
    create(&app, "D", "d@x.com", 20).await;

    let (_, body) = send(&app, Method::GET, "/api/persons/oldest", None).await;
    assert_eq!(names(&body), ["B", "C"]);

    let (_, body) = send(&app, Method::GET, "/api/persons/oldest/top3", None).await;
    assert_eq!(names(&body), ["B", "C", "A"]);
}

#[tokio::test]
async fn probes_and_counts_return_raw_values() {
    let app = test_app();
    create(&app, "Ann", "ann@x.com", 20).await;
    create(&app, "Annabel", "annabel@x.com", 20).await;

    let (_, body) = send(&app, Method::GET, "/api/persons/exists/email/ann@x.com", None).await;
    assert_eq!(body, json!(true));
    let (_, body) = send(&app, Method::GET, "/api/persons/exists/email/zed@x.com", None).await;
    assert_eq!(body, json!(false));

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/persons/exists/nameAndAge?name=Ann&age=20",
        None,
    )
    .await;
    assert_eq!(body, json!(true));

    let (_, body) = send(&app, Method::GET, "/api/persons/count/age/20", None).await;
    assert_eq!(body, json!(2));

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/persons/count/name/containing?namePattern=bel",
        None,
    )
    .await;
    assert_eq!(body, json!(1));

    let (_, body) = send(&app, Method::GET, "/api/persons/count", None).await;
    assert_eq!(body, json!(2));
}

#[tokio::test]
async fn batch_create_is_atomic() {
    let app = test_app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/persons/batch",
        Some(json!([
            { "name": "One", "email": "one@x.com", "age": 1 },
            { "name": "Two", "email": "two@x.com", "age": 2 }
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(names(&body), ["One", "Two"]);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/persons/batch",
        Some(json!([
            { "name": "Three", "email": "three@x.com", "age": 3 },
            { "name": "Dup", "email": "one@x.com", "age": 4 }
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, count) = send(&app, Method::GET, "/api/persons/count", None).await;
    assert_eq!(count, json!(2));
}

#[tokio::test]
async fn batch_delete_is_all_or_nothing() {
    let app = test_app();
    let ann = create(&app, "Ann", "ann@x.com", 20).await;
    let bob = create(&app, "Bob", "bob@x.com", 30).await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/api/persons/batch",
        Some(json!([{ "id": ann }, { "id": 999 }])),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, count) = send(&app, Method::GET, "/api/persons/count", None).await;
    assert_eq!(count, json!(2));

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/api/persons/batch",
        Some(json!([{ "id": ann }, { "name": "no id" }])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/api/persons/batch",
        Some(json!([{ "id": ann }, { "id": bob }])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, count) = send(&app, Method::GET, "/api/persons/count", None).await;
    assert_eq!(count, json!(0));
}

#[tokio::test]
async fn bulk_deletes_remove_matching_rows() {
    let app = test_app();
    create(&app, "Ann", "ann@x.com", 20).await;
    create(&app, "Bob", "bob@x.com", 30).await;
    create(&app, "Cid", "cid@x.com", 40).await;

    let (status, _) = send(&app, Method::DELETE, "/api/persons/email/ann@x.com", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/api/persons/nameAndAge?name=Bob&age=30",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/api/persons", None).await;
    assert_eq!(names(&body), ["Cid"]);

    let (status, _) = send(&app, Method::DELETE, "/api/persons/all", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, Method::GET, "/api/persons", None).await;
    assert_eq!(body, json!([]));
}
