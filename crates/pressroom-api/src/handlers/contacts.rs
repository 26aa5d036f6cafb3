//! Contact handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use pressroom_common::types::{ContactId, Page};
use pressroom_storage::models::{Contact, CreateContact, UpdateContact};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::auth::AppState;
use crate::error::{api_error, not_found, validation, ApiResult};

/// Query parameters for listing contacts
#[derive(Debug, Deserialize)]
pub struct ListContactsQuery {
    pub tag: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// GET /api/v1/contacts
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListContactsQuery>,
) -> ApiResult<Json<Vec<Contact>>> {
    let page = Page {
        limit: query.limit.clamp(1, 500),
        offset: query.offset.max(0),
    };
    let contacts = state
        .contacts
        .list(query.tag.as_deref(), page)
        .await
        .map_err(api_error)?;
    Ok(Json(contacts))
}

/// POST /api/v1/contacts
pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    Json(mut input): Json<CreateContact>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    input.email = input.email.trim().to_lowercase();
    if !input.email.contains('@') {
        return Err(validation("A valid email address is required"));
    }
    input.tags = normalize_tags(input.tags);

    let contact = state.contacts.create(input).await.map_err(api_error)?;
    info!(contact_id = %contact.id, "Created contact");

    Ok((StatusCode::CREATED, Json(contact)))
}

/// PUT /api/v1/contacts/:id
pub async fn update_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ContactId>,
    Json(mut input): Json<UpdateContact>,
) -> ApiResult<Json<Contact>> {
    input.tags = input.tags.map(normalize_tags);
    state
        .contacts
        .update(id, input)
        .await
        .map_err(api_error)?
        .map(Json)
        .ok_or_else(|| not_found("Contact"))
}

/// DELETE /api/v1/contacts/:id
pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ContactId>,
) -> ApiResult<StatusCode> {
    if !state.contacts.delete(id).await.map_err(api_error)? {
        return Err(not_found("Contact"));
    }
    info!(contact_id = %id, "Deleted contact");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/contacts/tags
pub async fn list_tags(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<String>>> {
    let tags = state.contacts.distinct_tags().await.map_err(api_error)?;
    Ok(Json(normalize_tags(tags)))
}

#[cfg(test)]
mod tests {
    use super::normalize_tags;

    #[test]
    fn tags_are_trimmed_and_deduplicated() {
        let tags = vec![" vip".to_string(), "b2b".to_string(), "vip ".to_string(), " ".to_string()];
        assert_eq!(normalize_tags(tags), vec!["b2b".to_string(), "vip".to_string()]);
    }
}
