//! Person HTTP routes.
//!
//! Handlers bind and field-validate input, then call exactly one service
//! use-case. Presence/absence is translated into status codes here.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use personhub_core::{Person, PersonDraft, PersonId};
use serde::Deserialize;

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct KeywordQuery {
    pub keyword: String,
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamePatternQuery {
    pub name_pattern: String,
}

#[derive(Debug, Deserialize)]
pub struct NameAndAgeQuery {
    pub name: String,
    pub age: i32,
}

#[derive(Debug, Deserialize)]
pub struct NameOrEmailQuery {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeRangeQuery {
    pub start_age: i32,
    pub end_age: i32,
}

/// Batch-delete entry; only `id` is read.
#[derive(Debug, Deserialize)]
pub struct PersonRef {
    #[serde(default)]
    pub id: Option<PersonId>,
}

/// Routes mounted under `/api/persons`.
pub fn person_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_persons).post(create_person))
        .route("/count", get(total_count))
        .route("/all", delete(delete_all_persons))
        .route("/batch", delete(delete_persons).post(create_persons))
        .route(
            "/{id}",
            get(get_person).put(update_person).delete(delete_person),
        )
        .route("/email/{email}", delete(delete_by_email))
        .route("/nameAndAge", delete(delete_by_name_and_age))
        .route("/search/name/{name}", get(find_by_name))
        .route("/search/email/{email}", get(find_by_email))
        .route("/search/age/{age}", get(find_by_age))
        .route("/search/name/containing", get(search_by_name_containing))
        .route("/search/email/containing", get(search_by_email_containing))
        .route("/search/nameAndAge", get(find_by_name_and_age))
        .route("/search/nameOrEmail", get(find_by_name_or_email))
        .route("/search/age/orderByName/{age}", get(find_by_age_ordered_by_name))
        .route(
            "/search/name/orderByAge/{name}",
            get(find_by_name_ordered_by_age_desc),
        )
        .route("/search/age/older/{age}", get(find_older_than))
        .route("/search/age/younger/{age}", get(find_younger_than))
        .route("/search/age/range", get(find_in_age_range))
        .route("/search/keyword", get(search_by_keyword))
        .route("/search/name/top5", get(find_first5_by_name_containing))
        .route("/oldest", get(find_oldest))
        .route("/oldest/top3", get(find_top3_oldest))
        .route("/exists/email/{email}", get(email_exists))
        .route("/exists/nameAndAge", get(exists_by_name_and_age))
        .route("/count/age/{age}", get(count_by_age))
        .route("/count/name/containing", get(count_by_name_containing))
}

async fn list_persons(State(state): State<AppState>) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(|service| Ok(service.get_all_persons()?))
        .await
        .map(Json)
}

async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<Json<Person>> {
    state
        .run(move |service| {
            service
                .get_person_by_id(id)?
                .ok_or_else(|| ApiError::not_found(format!("person not found with id: {id}")))
        })
        .await
        .map(Json)
}

async fn create_person(
    State(state): State<AppState>,
    payload: Result<Json<PersonDraft>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Person>)> {
    let Json(draft) = payload?;
    draft.validate_fields()?;
    let created = state
        .run(move |service| Ok(service.create_person(draft)?))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
    payload: Result<Json<PersonDraft>, JsonRejection>,
) -> ApiResult<Json<Person>> {
    let Json(draft) = payload?;
    draft.validate_fields()?;
    state
        .run(move |service| Ok(service.update_person(id, draft)?))
        .await
        .map(Json)
}

async fn delete_person(
    State(state): State<AppState>,
    Path(id): Path<PersonId>,
) -> ApiResult<StatusCode> {
    state
        .run(move |service| Ok(service.delete_person(id)?))
        .await?;
    Ok(StatusCode::OK)
}

async fn create_persons(
    State(state): State<AppState>,
    payload: Result<Json<Vec<PersonDraft>>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Vec<Person>>)> {
    let Json(drafts) = payload?;
    for draft in &drafts {
        draft.validate_fields()?;
    }
    let created = state
        .run(move |service| Ok(service.create_persons(drafts)?))
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn delete_persons(
    State(state): State<AppState>,
    payload: Result<Json<Vec<PersonRef>>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Json(refs) = payload?;
    let ids = refs
        .iter()
        .map(|person| {
            person
                .id
                .ok_or_else(|| ApiError::validation("every entry must carry an id"))
        })
        .collect::<ApiResult<Vec<_>>>()?;
    state
        .run(move |service| Ok(service.delete_persons(&ids)?))
        .await?;
    Ok(StatusCode::OK)
}

async fn total_count(State(state): State<AppState>) -> ApiResult<Json<u64>> {
    state
        .run(|service| Ok(service.total_count()?))
        .await
        .map(Json)
}

async fn delete_all_persons(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state
        .run(|service| Ok(service.delete_all_persons()?))
        .await?;
    Ok(StatusCode::OK)
}

async fn find_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.find_by_name(&name)?))
        .await
        .map(Json)
}

async fn find_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<Person>> {
    state
        .run(move |service| {
            service
                .find_by_email(&email)?
                .ok_or_else(|| ApiError::not_found("no person with that email"))
        })
        .await
        .map(Json)
}

async fn find_by_age(
    State(state): State<AppState>,
    Path(age): Path<i32>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.find_by_age(age)?))
        .await
        .map(Json)
}

async fn search_by_name_containing(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.search_by_name_containing(&query.keyword)?))
        .await
        .map(Json)
}

async fn search_by_email_containing(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.search_by_email_containing(&query.keyword)?))
        .await
        .map(Json)
}

async fn find_by_name_and_age(
    State(state): State<AppState>,
    Query(query): Query<NameAndAgeQuery>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.find_by_name_and_age(&query.name, query.age)?))
        .await
        .map(Json)
}

async fn find_by_name_or_email(
    State(state): State<AppState>,
    Query(query): Query<NameOrEmailQuery>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.find_by_name_or_email(&query.name, &query.email)?))
        .await
        .map(Json)
}

async fn find_by_age_ordered_by_name(
    State(state): State<AppState>,
    Path(age): Path<i32>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.find_by_age_ordered_by_name(age)?))
        .await
        .map(Json)
}

async fn find_by_name_ordered_by_age_desc(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.find_by_name_ordered_by_age_desc(&name)?))
        .await
        .map(Json)
}

async fn find_older_than(
    State(state): State<AppState>,
    Path(age): Path<i32>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.find_older_than(age)?))
        .await
        .map(Json)
}

async fn find_younger_than(
    State(state): State<AppState>,
    Path(age): Path<i32>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.find_younger_than(age)?))
        .await
        .map(Json)
}

async fn find_in_age_range(
    State(state): State<AppState>,
    Query(query): Query<AgeRangeQuery>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.find_in_age_range(query.start_age, query.end_age)?))
        .await
        .map(Json)
}

async fn search_by_keyword(
    State(state): State<AppState>,
    Query(query): Query<KeywordQuery>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.search_by_keyword(&query.keyword)?))
        .await
        .map(Json)
}

async fn find_first5_by_name_containing(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(move |service| Ok(service.find_first5_by_name_containing(&query.name)?))
        .await
        .map(Json)
}

async fn find_oldest(State(state): State<AppState>) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(|service| Ok(service.find_oldest()?))
        .await
        .map(Json)
}

async fn find_top3_oldest(State(state): State<AppState>) -> ApiResult<Json<Vec<Person>>> {
    state
        .run(|service| Ok(service.find_top3_oldest()?))
        .await
        .map(Json)
}

async fn email_exists(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<Json<bool>> {
    state
        .run(move |service| Ok(service.email_exists(&email)?))
        .await
        .map(Json)
}

async fn exists_by_name_and_age(
    State(state): State<AppState>,
    Query(query): Query<NameAndAgeQuery>,
) -> ApiResult<Json<bool>> {
    state
        .run(move |service| Ok(service.exists_by_name_and_age(&query.name, query.age)?))
        .await
        .map(Json)
}

async fn count_by_age(
    State(state): State<AppState>,
    Path(age): Path<i32>,
) -> ApiResult<Json<u64>> {
    state
        .run(move |service| Ok(service.count_by_age(age)?))
        .await
        .map(Json)
}

async fn count_by_name_containing(
    State(state): State<AppState>,
    Query(query): Query<NamePatternQuery>,
) -> ApiResult<Json<u64>> {
    state
        .run(move |service| Ok(service.count_by_name_containing(&query.name_pattern)?))
        .await
        .map(Json)
}

async fn delete_by_email(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .run(move |service| Ok(service.delete_by_email(&email)?))
        .await?;
    Ok(StatusCode::OK)
}

async fn delete_by_name_and_age(
    State(state): State<AppState>,
    Query(query): Query<NameAndAgeQuery>,
) -> ApiResult<StatusCode> {
    state
        .run(move |service| Ok(service.delete_by_name_and_age(&query.name, query.age)?))
        .await?;
    Ok(StatusCode::OK)
}
