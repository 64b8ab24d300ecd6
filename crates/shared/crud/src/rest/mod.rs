//! Generic REST surface over [`CrudOperations`].

mod auth;
mod extract;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

use common::{AppError, AppResult, JsonMap};
use domain::{Dto, Id};

use crate::pagination::{Page, PageParams, PageRequest, SortOrder};
use crate::service::CrudOperations;

pub use auth::{authenticate, JwtAuthenticator};
pub use extract::JsonBody;

type Service<D> = Arc<dyn CrudOperations<D>>;

/// Query of `GET /:id`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindParams {
    /// Also fill nested and computed properties
    #[serde(default = "default_map_all")]
    pub map_all: bool,
}

fn default_map_all() -> bool {
    true
}

/// Query of `POST /search/first`.
#[derive(Debug, Default, Deserialize)]
pub struct SortParams {
    pub sort: Option<String>,
}

/// CRUD routes for one resource, to be nested under its path.
pub fn crud_routes<D: Dto>(service: Service<D>) -> Router {
    Router::new()
        .route("/", get(find_all::<D>).post(create::<D>).delete(delete_all::<D>))
        .route("/batch", post(save_all::<D>))
        .route("/search", post(search::<D>))
        .route("/search/first", post(search_first::<D>))
        .route(
            "/:id",
            get(find_by_id::<D>)
                .put(update::<D>)
                .patch(patch::<D>)
                .delete(delete::<D>),
        )
        .route("/:id/exists", get(exists::<D>))
        .with_state(service)
}

async fn find_all<D: Dto>(State(service): State<Service<D>>) -> AppResult<Json<Vec<D>>> {
    Ok(Json(service.find_all().await?))
}

async fn create<D: Dto>(
    State(service): State<Service<D>>,
    JsonBody(dto): JsonBody<D>,
) -> AppResult<(StatusCode, Json<D>)> {
    let status = if dto.id().is_some() {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(service.save(dto).await?)))
}

async fn save_all<D: Dto>(
    State(service): State<Service<D>>,
    JsonBody(dtos): JsonBody<Vec<D>>,
) -> AppResult<Json<Vec<D>>> {
    Ok(Json(service.save_all(dtos).await?))
}

async fn delete_all<D: Dto>(
    State(service): State<Service<D>>,
    JsonBody(ids): JsonBody<Vec<Id>>,
) -> AppResult<Json<Vec<D>>> {
    Ok(Json(service.delete_all(ids).await?))
}

async fn find_by_id<D: Dto>(
    State(service): State<Service<D>>,
    Path(id): Path<Id>,
    Query(params): Query<FindParams>,
) -> AppResult<Json<D>> {
    service
        .find_by_id_with(id, params.map_all)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn update<D: Dto>(
    State(service): State<Service<D>>,
    Path(id): Path<Id>,
    JsonBody(dto): JsonBody<D>,
) -> AppResult<Json<D>> {
    Ok(Json(service.save_by_id(id, dto).await?))
}

async fn patch<D: Dto>(
    State(service): State<Service<D>>,
    Path(id): Path<Id>,
    JsonBody(changes): JsonBody<JsonMap>,
) -> AppResult<Json<D>> {
    Ok(Json(service.patch(id, changes).await?))
}

async fn delete<D: Dto>(
    State(service): State<Service<D>>,
    Path(id): Path<Id>,
) -> AppResult<Json<D>> {
    Ok(Json(service.delete(id).await?))
}

async fn exists<D: Dto>(
    State(service): State<Service<D>>,
    Path(id): Path<Id>,
) -> AppResult<Json<bool>> {
    Ok(Json(service.exists_by_id(id).await?))
}

async fn search<D: Dto>(
    State(service): State<Service<D>>,
    Query(params): Query<PageParams>,
    JsonBody(criteria): JsonBody<D>,
) -> AppResult<Json<Page<D>>> {
    let page = PageRequest::try_from(params)?;
    Ok(Json(service.search(criteria, page).await?))
}

async fn search_first<D: Dto>(
    State(service): State<Service<D>>,
    Query(params): Query<SortParams>,
    JsonBody(criteria): JsonBody<D>,
) -> AppResult<Json<Option<D>>> {
    let sort = params
        .sort
        .as_deref()
        .map(|terms| {
            terms
                .split(';')
                .filter(|term| !term.trim().is_empty())
                .map(SortOrder::parse)
                .collect::<AppResult<Vec<_>>>()
        })
        .transpose()?;
    Ok(Json(service.search_first(criteria, sort).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::MockCrudOperations;
    use crate::test_support::WardDto;
    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Method, Request},
    };
    use domain::DataError;
    use mockall::predicate::eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(service: MockCrudOperations<WardDto>) -> Router {
        Router::new().nest("/wards", crud_routes::<WardDto>(Arc::new(service)))
    }

    async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_create_returns_created() {
        let mut service = MockCrudOperations::<WardDto>::new();
        service.expect_save().times(1).returning(|mut dto| {
            dto.base.id = Some(1);
            Ok(dto)
        });

        let (status, body) = send(
            app(service),
            Method::POST,
            "/wards",
            Some(json!({"name": "ICU"})),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["id"], 1);
        assert_eq!(body["name"], "ICU");
    }

    #[tokio::test]
    async fn test_find_by_id_maps_not_found() {
        let mut service = MockCrudOperations::<WardDto>::new();
        service
            .expect_find_by_id_with()
            .with(eq(3), eq(false))
            .returning(|id, _| Err(DataError::not_found(id, "Ward").into()));

        let (status, body) = send(app(service), Method::GET, "/wards/3?mapAll=false", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["errorCode"], 602);
    }

    #[tokio::test]
    async fn test_patch_passes_raw_changes() {
        let mut service = MockCrudOperations::<WardDto>::new();
        service
            .expect_patch()
            .withf(|id, changes| *id == 4 && changes.get("floor") == Some(&json!(2)))
            .returning(|id, _| {
                let mut dto = WardDto::named(Some(id), "ICU");
                dto.floor = Some(2);
                Ok(dto)
            });

        let (status, body) = send(
            app(service),
            Method::PATCH,
            "/wards/4",
            Some(json!({"floor": 2})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["floor"], 2);
    }

    #[tokio::test]
    async fn test_search_parses_page_and_sort() {
        let mut service = MockCrudOperations::<WardDto>::new();
        service
            .expect_search()
            .withf(|criteria, page| {
                criteria.name.as_deref() == Some("IC")
                    && page.page == 2
                    && page.size == 5
                    && page.sort == vec![SortOrder::desc("name")]
            })
            .returning(|_, page| Ok(Page::new(Vec::new(), &page, 6)));

        let (status, body) = send(
            app(service),
            Method::POST,
            "/wards/search?page=2&size=5&sort=name,desc",
            Some(json!({"name": "IC"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["total"], 6);
        assert_eq!(body["meta"]["totalPages"], 2);
    }

    #[tokio::test]
    async fn test_batch_delete_reports_per_item_status() {
        let mut service = MockCrudOperations::<WardDto>::new();
        service
            .expect_delete_all()
            .with(eq(vec![1, 2]))
            .returning(|ids| {
                let mut blocked = WardDto::named(Some(ids[1]), "Surgery");
                blocked.set_status(Some(605), Some("referenced".to_string()));
                Ok(vec![WardDto::named(Some(ids[0]), "ICU"), blocked])
            });

        let (status, body) = send(app(service), Method::DELETE, "/wards", Some(json!([1, 2]))).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body[0].get("code").is_none());
        assert_eq!(body[1]["code"], 605);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let service = MockCrudOperations::<WardDto>::new();
        let (status, _) = send(app(service), Method::POST, "/wards/batch", Some(json!({"name": 1}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
