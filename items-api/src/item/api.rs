use crate::item::{Item, ItemCreate, ItemStore, ItemUpdate};
use crate::web::error::{ApiError, FieldError};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

/// Store handle shared by the item handlers.
pub type SharedItemStore = Arc<dyn ItemStore>;

/// Query parameters for paging through items.
#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    100
}

/// JSON payload for a partial update. Absent keys are left unchanged.
#[derive(Debug, Deserialize)]
pub struct ItemUpdatePayload {
    #[serde(default, deserialize_with = "nullable")]
    name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "nullable")]
    is_available: Option<Option<bool>>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from an absent key (`None`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TryFrom<ItemUpdatePayload> for ItemUpdate {
    type Error = ApiError;

    fn try_from(payload: ItemUpdatePayload) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();
        let name = reject_null(payload.name, "name", &mut errors);
        let price = reject_null(payload.price, "price", &mut errors);
        let is_available = reject_null(payload.is_available, "is_available", &mut errors);
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(Self {
            name,
            description: payload.description,
            price,
            is_available,
        })
    }
}

fn reject_null<T>(
    value: Option<Option<T>>,
    field: &str,
    errors: &mut Vec<FieldError>,
) -> Option<T> {
    match value {
        Some(None) => {
            errors.push(FieldError::new(
                &["body", field],
                format!("'{}' may not be null", field),
                "null_invalid",
            ));
            None
        }
        Some(Some(value)) => Some(value),
        None => None,
    }
}

/// Handler for GET /items/ - Returns one page of items.
#[tracing::instrument(skip(store))]
pub async fn list_items_handler(
    State(store): State<SharedItemStore>,
    WithRejection(Query(pagination), _): WithRejection<Query<Pagination>, ApiError>,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = store.list(pagination.skip, pagination.limit).await?;
    Ok(Json(items))
}

/// Handler for POST /items/ - Creates an item.
#[tracing::instrument(skip(store))]
pub async fn create_item_handler(
    State(store): State<SharedItemStore>,
    WithRejection(Json(payload), _): WithRejection<Json<ItemCreate>, ApiError>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let problems = payload.validate();
    if !problems.is_empty() {
        return Err(ApiError::invalid_body(problems));
    }
    let item = store.create(payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for GET /items/{item_id} - Returns a single item.
#[tracing::instrument(skip(store))]
pub async fn get_item_handler(
    State(store): State<SharedItemStore>,
    WithRejection(Path(item_id), _): WithRejection<Path<u64>, ApiError>,
) -> Result<Json<Item>, ApiError> {
    store
        .get(item_id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::item_not_found)
}

/// Handler for PUT /items/{item_id} - Replaces the supplied fields of an item.
#[tracing::instrument(skip(store))]
pub async fn update_item_handler(
    State(store): State<SharedItemStore>,
    WithRejection(Path(item_id), _): WithRejection<Path<u64>, ApiError>,
    WithRejection(Json(payload), _): WithRejection<Json<ItemUpdatePayload>, ApiError>,
) -> Result<Json<Item>, ApiError> {
    let changes = ItemUpdate::try_from(payload)?;
    let problems = changes.validate();
    if !problems.is_empty() {
        return Err(ApiError::invalid_body(problems));
    }
    store
        .update(item_id, changes)
        .await?
        .map(Json)
        .ok_or_else(ApiError::item_not_found)
}

/// Handler for DELETE /items/{item_id} - Removes an item.
#[tracing::instrument(skip(store))]
pub async fn delete_item_handler(
    State(store): State<SharedItemStore>,
    WithRejection(Path(item_id), _): WithRejection<Path<u64>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if store.delete(item_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::item_not_found())
    }
}

/// Creates the items router. Mount it under the API version prefix.
pub fn create_item_router(store: SharedItemStore) -> Router {
    Router::new()
        .route("/items", get(list_items_handler).post(create_item_handler))
        .route("/items/", get(list_items_handler).post(create_item_handler))
        .route(
            "/items/{item_id}",
            get(get_item_handler)
                .put(update_item_handler)
                .delete(delete_item_handler),
        )
        .with_state(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{MockItemStore, StoreError};
    use axum::body::Body;
    use axum::http::Request;
    use mockall::predicate::*;
    use tower::ServiceExt;

    async fn call(
        router: Router,
        method: &str,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn can_map_store_failure_to_internal_error() {
        let mut store = MockItemStore::new();
        store
            .expect_get()
            .with(eq(3))
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("connection reset".to_string())));
        let router = create_item_router(Arc::new(store));

        let (status, body) = call(router, "GET", "/items/3", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "Internal server error");
    }

    #[tokio::test]
    async fn can_pass_default_page_to_store() {
        let mut store = MockItemStore::new();
        store
            .expect_list()
            .with(eq(0), eq(100))
            .times(1)
            .returning(|_, _| Ok(Vec::new()));
        let router = create_item_router(Arc::new(store));

        let (status, body) = call(router, "GET", "/items/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn can_skip_store_when_payload_is_invalid() {
        let mut store = MockItemStore::new();
        store.expect_create().never();
        let router = create_item_router(Arc::new(store));

        let (status, body) = call(
            router,
            "POST",
            "/items/",
            Some(r#"{"name": "", "price": -5}"#),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"][0]["loc"], serde_json::json!(["body", "name"]));
        assert_eq!(body["detail"][1]["loc"], serde_json::json!(["body", "price"]));
    }

    #[tokio::test]
    async fn can_reject_null_for_required_update_fields() {
        let mut store = MockItemStore::new();
        store.expect_update().never();
        let router = create_item_router(Arc::new(store));

        let (status, body) = call(
            router,
            "PUT",
            "/items/1",
            Some(r#"{"name": null, "price": null, "is_available": null}"#),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<&str> = body["detail"]
            .as_array()
            .unwrap()
            .iter()
            .map(|error| error["loc"][1].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["name", "price", "is_available"]);
        assert_eq!(body["detail"][0]["type"], "null_invalid");
    }

    #[tokio::test]
    async fn can_clear_description_with_null() {
        let mut store = MockItemStore::new();
        store
            .expect_update()
            .with(
                eq(4),
                eq(ItemUpdate {
                    description: Some(None),
                    ..Default::default()
                }),
            )
            .times(1)
            .returning(|id, _| {
                Ok(Some(Item {
                    id,
                    name: "Widget".to_string(),
                    description: None,
                    price: 2.5,
                    is_available: true,
                }))
            });
        let router = create_item_router(Arc::new(store));

        let body = Some(r#"{"description": null}"#);
        let (status, body) = call(router, "PUT", "/items/4", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["description"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn can_report_missing_item_on_delete() {
        let mut store = MockItemStore::new();
        store
            .expect_delete()
            .with(eq(9))
            .times(1)
            .returning(|_| Ok(false));
        let router = create_item_router(Arc::new(store));

        let (status, body) = call(router, "DELETE", "/items/9", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Item not found");
    }
}
