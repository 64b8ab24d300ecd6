//! Generic CRUD service.
//!
//! Every operation runs a fixed pipeline with hook points:
//!
//! - save: resolve or create the record, `before_save`, persist, map back,
//!   `after_save`
//! - delete: foreign key check, load, `before_delete`, soft delete,
//!   `after_delete`
//! - reads: load and map, with `map_all_properties` telling the mapping hooks
//!   whether to fill expensive properties
//!
//! Batch operations isolate failures per element: a coded error raised by a
//! hook or the foreign key check is recorded on that element's DTO and the
//! rest of the batch carries on.

use std::sync::Arc;

use async_trait::async_trait;
use validator::{Validate, ValidationErrors};

use common::{json, AppError, AppResult, JsonMap};
use domain::{DataError, Dto, Entity, Id, PROPERTY_ID};

use crate::mapping::{EntityMapper, MappingHooks, NoHooks};
use crate::pagination::{Page, PageRequest, SortOrder};
use crate::repository::BaseRepository;
use crate::security;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Hook points of the service pipeline. All default to pass-through.
#[async_trait]
pub trait ServiceHooks<E: Entity, D: Dto>: MappingHooks<E, D> {
    async fn before_save(&self, entity: E, _dto: &D) -> AppResult<E> {
        Ok(entity)
    }

    /// `before_save` for a batch element. `accepted` holds the earlier
    /// elements of the same batch that passed and are about to be written.
    async fn before_save_in_batch(&self, entity: E, dto: &D, _accepted: &[E]) -> AppResult<E> {
        self.before_save(entity, dto).await
    }

    async fn after_save(&self, _entity: &E, dto: D) -> AppResult<D> {
        Ok(dto)
    }

    async fn before_delete(&self, entity: E) -> AppResult<E> {
        Ok(entity)
    }

    async fn after_delete(&self, entity: E) -> AppResult<E> {
        Ok(entity)
    }

    async fn before_search(&self, criteria: D) -> AppResult<D> {
        Ok(criteria)
    }
}

impl<E: Entity, D: Dto> ServiceHooks<E, D> for NoHooks {}

/// CRUD operations over DTOs, as exposed to the REST layer.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CrudOperations<D: Dto>: Send + Sync {
    /// Insert when `dto` has no id, otherwise update the stored record.
    async fn save(&self, dto: D) -> AppResult<D>;

    async fn save_all(&self, dtos: Vec<D>) -> AppResult<Vec<D>>;

    async fn save_by_id(&self, id: Id, dto: D) -> AppResult<D>;

    /// Deep-merge `changes` onto the stored record's DTO, then save.
    async fn patch(&self, id: Id, changes: JsonMap) -> AppResult<D>;

    async fn delete(&self, id: Id) -> AppResult<D>;

    async fn delete_all(&self, ids: Vec<Id>) -> AppResult<Vec<D>>;

    /// `None` for ids below 1; a missing record is an error.
    async fn find_by_id(&self, id: Id) -> AppResult<Option<D>>;

    async fn find_by_id_with(&self, id: Id, map_all_properties: bool) -> AppResult<Option<D>>;

    async fn find_all(&self) -> AppResult<Vec<D>>;

    async fn exists_by_id(&self, id: Id) -> AppResult<bool>;

    async fn search(&self, criteria: D, page: PageRequest) -> AppResult<Page<D>>;

    /// First match, newest first unless `sort` says otherwise.
    async fn search_first(&self, criteria: D, sort: Option<Vec<SortOrder>>) -> AppResult<Option<D>>;
}

/// Validation failure as a client error, naming the first failing field.
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let message = errors
        .field_errors()
        .iter()
        .next()
        .and_then(|(field, errors)| {
            errors.first().map(|error| match &error.message {
                Some(msg) => msg.to_string(),
                None => format!("{}: {}", field, error.code),
            })
        })
        .unwrap_or_else(|| "Validation failed".to_string());
    AppError::validation(message)
}

fn validate<D: Validate>(dto: &D) -> AppResult<()> {
    dto.validate().map_err(validation_error)
}

/// Split a hook failure: coded data errors are recorded on the element,
/// anything else aborts the batch.
fn isolate<T>(result: AppResult<T>) -> AppResult<Result<T, DataError>> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(AppError::Data(e)) => Ok(Err(e)),
        Err(other) => Err(other),
    }
}

fn with_status<D: Dto>(mut dto: D, error: &DataError) -> D {
    dto.set_status(Some(error.code()), Some(error.to_string()));
    dto
}

enum Slot<D> {
    Ready(D),
    Failed(D),
}

pub struct BaseService<E, D, H> {
    repository: Arc<dyn BaseRepository<E, D>>,
    mapper: EntityMapper<E, D, H>,
    hooks: Arc<H>,
}

impl<E, D, H> BaseService<E, D, H>
where
    E: Entity,
    D: Dto,
    H: ServiceHooks<E, D> + 'static,
{
    /// Build the service and check that `E` and `D` map onto each other.
    pub fn new(repository: Arc<dyn BaseRepository<E, D>>, hooks: Arc<H>) -> AppResult<Self> {
        Self::with_mapper(EntityMapper::new(repository, hooks))
    }

    pub fn with_mapper(mapper: EntityMapper<E, D, H>) -> AppResult<Self> {
        mapper.verify()?;
        Ok(Self {
            repository: Arc::clone(mapper.repository()),
            hooks: Arc::clone(mapper.hooks()),
            mapper,
        })
    }

    pub fn repository(&self) -> &Arc<dyn BaseRepository<E, D>> {
        &self.repository
    }

    pub fn mapper(&self) -> &EntityMapper<E, D, H> {
        &self.mapper
    }

    /// A live record or [`DataError::NotFoundEntityById`].
    pub async fn get_by_id(&self, id: Id) -> AppResult<E> {
        if id <= 0 {
            return Err(DataError::not_found(id, E::NAME).into());
        }
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DataError::not_found(id, E::NAME).into())
    }

    /// Resolve the record `dto` describes: the stored one with the DTO
    /// overlaid, or a new one.
    async fn resolve(&self, dto: &D) -> AppResult<E> {
        match dto.id() {
            Some(id) => {
                let stored = self.get_by_id(id).await?;
                let mut entity = self.mapper.map_to_entity_onto(dto, stored).await?;
                entity.set_id(id);
                Ok(entity)
            }
            None => self.mapper.map_to_entity(dto).await,
        }
    }

    async fn persist(&self, entity: E, dto: D) -> AppResult<D> {
        let entity = self.hooks.before_save(entity, &dto).await?;

        let mut entity = entity;
        entity.set_map_all_properties(true);
        let saved = self.repository.save(entity).await?;

        let dto = self.mapper.map_to_dto_onto(&saved, dto).await?;
        self.hooks.after_save(&saved, dto).await
    }

    async fn remove(&self, entity: E) -> AppResult<E> {
        let entity = self.hooks.before_delete(entity).await?;
        let deleted = self.repository.delete(entity).await?;
        self.hooks.after_delete(deleted).await
    }

    async fn check_foreign_keys(&self, id: Id) -> AppResult<()> {
        if self.repository.exists_foreign_key_constraint(id).await? {
            return Err(DataError::ExistsForeignKeyConstraint.into());
        }
        Ok(())
    }

    async fn search_entities(&self, criteria: D, page: &PageRequest) -> AppResult<Page<E>> {
        let mut criteria = criteria;
        criteria.set_language(security::current_language());
        let criteria = self.hooks.before_search(criteria).await?;
        self.repository.search(&criteria, page).await
    }
}

#[async_trait]
impl<E, D, H> CrudOperations<D> for BaseService<E, D, H>
where
    E: Entity,
    D: Dto,
    H: ServiceHooks<E, D> + 'static,
{
    async fn save(&self, dto: D) -> AppResult<D> {
        validate(&dto)?;
        let entity = self.resolve(&dto).await?;
        self.persist(entity, dto).await
    }

    async fn save_all(&self, dtos: Vec<D>) -> AppResult<Vec<D>> {
        if dtos.is_empty() {
            return Err(DataError::NotExistsData.into());
        }
        for dto in &dtos {
            validate(dto)?;
        }

        let mut slots = Vec::with_capacity(dtos.len());
        let mut ready = Vec::new();
        for dto in dtos {
            let entity = self.resolve(&dto).await?;
            match isolate(self.hooks.before_save_in_batch(entity, &dto, &ready).await)? {
                Ok(mut entity) => {
                    entity.set_map_all_properties(true);
                    ready.push(entity);
                    slots.push(Slot::Ready(dto));
                }
                Err(e) => {
                    tracing::debug!(entity = E::NAME, code = e.code(), "Batch element rejected");
                    slots.push(Slot::Failed(with_status(dto, &e)));
                }
            }
        }

        let saved = if ready.is_empty() {
            Vec::new()
        } else {
            self.repository.save_all(ready).await?
        };

        let mut saved = saved.into_iter();
        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Failed(dto) => results.push(dto),
                Slot::Ready(dto) => {
                    let entity = saved
                        .next()
                        .ok_or_else(|| AppError::internal("Batch save returned fewer records"))?;
                    let dto = self.mapper.map_to_dto_onto(&entity, dto).await?;
                    let fallback = dto.clone();
                    let dto = match isolate(self.hooks.after_save(&entity, dto).await)? {
                        Ok(dto) => dto,
                        Err(e) => with_status(fallback, &e),
                    };
                    results.push(dto);
                }
            }
        }

        Ok(results)
    }

    async fn save_by_id(&self, id: Id, mut dto: D) -> AppResult<D> {
        if id <= 0 {
            return Err(DataError::not_found(id, E::NAME).into());
        }
        dto.set_id(id);
        self.save(dto).await
    }

    async fn patch(&self, id: Id, changes: JsonMap) -> AppResult<D> {
        if id <= 0 {
            return Err(DataError::not_found(id, E::NAME).into());
        }
        if changes.is_empty() {
            return Err(DataError::NotExistsData.into());
        }

        let mut stored = self.get_by_id(id).await?;
        stored.set_map_all_properties(true);
        let current = json::to_map(&self.mapper.map_to_dto(&stored).await?)?;

        // dotted keys address nested properties
        let (paths, plain): (JsonMap, JsonMap) =
            changes.into_iter().partition(|(key, _)| key.contains('.'));
        let mut merged = json::merge_map(plain, current);
        for (path, value) in paths {
            json::put_value(&mut merged, value, &path)?;
        }

        let mut dto: D = json::from_map(merged)?;
        dto.set_id(id);
        validate(&dto)?;

        let entity = self.mapper.map_to_entity_onto(&dto, stored).await?;
        self.persist(entity, dto).await
    }

    async fn delete(&self, id: Id) -> AppResult<D> {
        self.check_foreign_keys(id).await?;
        let entity = self.get_by_id(id).await?;
        let deleted = self.remove(entity).await?;
        tracing::info!(entity = E::NAME, id, "Record deleted");
        self.mapper.map_to_dto(&deleted).await
    }

    async fn delete_all(&self, ids: Vec<Id>) -> AppResult<Vec<D>> {
        if ids.is_empty() {
            return Err(DataError::NotExistsData.into());
        }

        let mut slots = Vec::with_capacity(ids.len());
        let mut ready = Vec::new();
        for id in ids {
            let entity = self.get_by_id(id).await?;
            let dto = self.mapper.map_to_dto(&entity).await?;

            let checked = match isolate(self.check_foreign_keys(id).await)? {
                Ok(()) => isolate(self.hooks.before_delete(entity).await)?,
                Err(e) => Err(e),
            };
            match checked {
                Ok(entity) => {
                    ready.push(entity);
                    slots.push(Slot::Ready(dto));
                }
                Err(e) => slots.push(Slot::Failed(with_status(dto, &e))),
            }
        }

        let deleted = if ready.is_empty() {
            Vec::new()
        } else {
            self.repository.delete_entities(ready).await?
        };

        let mut deleted = deleted.into_iter();
        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot {
                Slot::Failed(dto) => results.push(dto),
                Slot::Ready(dto) => {
                    let entity = deleted
                        .next()
                        .ok_or_else(|| AppError::internal("Batch delete returned fewer records"))?;
                    let dto = match isolate(self.hooks.after_delete(entity).await)? {
                        Ok(_) => dto,
                        Err(e) => with_status(dto, &e),
                    };
                    results.push(dto);
                }
            }
        }

        Ok(results)
    }

    async fn find_by_id(&self, id: Id) -> AppResult<Option<D>> {
        self.find_by_id_with(id, true).await
    }

    async fn find_by_id_with(&self, id: Id, map_all_properties: bool) -> AppResult<Option<D>> {
        if id <= 0 {
            return Ok(None);
        }

        let mut entity = self.get_by_id(id).await?;
        entity.set_map_all_properties(map_all_properties);
        self.mapper.map_to_dto(&entity).await.map(Some)
    }

    async fn find_all(&self) -> AppResult<Vec<D>> {
        let entities = self.repository.find_all().await?;
        self.mapper.map_to_dtos(&entities).await
    }

    async fn exists_by_id(&self, id: Id) -> AppResult<bool> {
        self.repository.exists_by_id(id).await
    }

    async fn search(&self, criteria: D, page: PageRequest) -> AppResult<Page<D>> {
        let found = self.search_entities(criteria, &page).await?;
        let dtos = self.mapper.map_to_dtos(&found.content).await?;
        Ok(found.with_content(dtos))
    }

    async fn search_first(&self, criteria: D, sort: Option<Vec<SortOrder>>) -> AppResult<Option<D>> {
        let sort = sort
            .filter(|orders| !orders.is_empty())
            .unwrap_or_else(|| vec![SortOrder::desc(PROPERTY_ID)]);
        let page = PageRequest::new(1, 1).with_sort(sort);

        let found = self.search_entities(criteria, &page).await?;
        match found.content.into_iter().next() {
            Some(mut entity) => {
                entity.set_map_all_properties(true);
                self.mapper.map_to_dto(&entity).await.map(Some)
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryRepository, MockBaseRepository};
    use crate::security::{scope, RequestContext};
    use crate::test_support::{Ward, WardDto};
    use domain::UserPrincipal;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    type Wards = InMemoryRepository<Ward, WardDto>;

    /// Rejects names starting with "X" and blocks deleting "Locked".
    struct WardHooks;

    impl MappingHooks<Ward, WardDto> for WardHooks {}

    #[async_trait]
    impl ServiceHooks<Ward, WardDto> for WardHooks {
        async fn before_save(&self, entity: Ward, _dto: &WardDto) -> AppResult<Ward> {
            if entity.name.starts_with('X') {
                return Err(DataError::coded(1001, "name is reserved").into());
            }
            Ok(entity)
        }

        async fn before_save_in_batch(&self, entity: Ward, dto: &WardDto, accepted: &[Ward]) -> AppResult<Ward> {
            let entity = self.before_save(entity, dto).await?;
            if accepted.iter().any(|other| other.name == entity.name) {
                return Err(DataError::coded(1003, "name repeated in batch").into());
            }
            Ok(entity)
        }

        async fn before_delete(&self, entity: Ward) -> AppResult<Ward> {
            if entity.name == "Locked" {
                return Err(DataError::coded(1002, "ward is locked").into());
            }
            Ok(entity)
        }

        async fn before_search(&self, mut criteria: WardDto) -> AppResult<WardDto> {
            criteria.base.strictly_search = Some(true);
            Ok(criteria)
        }
    }

    fn service(repository: Arc<Wards>) -> BaseService<Ward, WardDto, WardHooks> {
        BaseService::new(repository, Arc::new(WardHooks)).unwrap()
    }

    fn wards() -> Arc<Wards> {
        Arc::new(Wards::new().with_criteria(|ward: &Ward, criteria: &WardDto| {
            match criteria.name.as_deref() {
                Some(name) if criteria.strictly_search() => ward.name == name,
                Some(name) => ward.name.contains(name),
                None => true,
            }
        }))
    }

    #[tokio::test]
    async fn test_save_inserts_and_stamps() {
        let repository = wards();
        let service = service(repository.clone());

        let principal = UserPrincipal {
            id: Some(42),
            username: "registrar".to_string(),
            ..UserPrincipal::default()
        };
        let saved = scope(
            RequestContext::for_user(principal),
            service.save(WardDto::named(None, "Oncology")),
        )
        .await
        .unwrap();

        assert_eq!(saved.base.id, Some(1));
        assert_eq!(saved.base.active, Some(true));
        assert_eq!(saved.base.audit.created_by, Some(42));
        assert!(saved.base.audit.created_at.is_some());
    }

    #[tokio::test]
    async fn test_unset_active_never_deactivates() {
        let repository = wards();
        let service = service(repository.clone());
        let saved = service.save(WardDto::named(None, "Oncology")).await.unwrap();

        let mut update = WardDto::named(saved.base.id, "Oncology B");
        update.base.active = None;
        let updated = service.save(update).await.unwrap();

        assert_eq!(updated.base.active, Some(true));
        assert_eq!(repository.row(1).and_then(|w| w.base.active), Some(true));
        assert_eq!(repository.row(1).map(|w| w.name).as_deref(), Some("Oncology B"));
    }

    #[tokio::test]
    async fn test_save_unknown_id_is_not_found() {
        let service = service(wards());
        let err = service.save(WardDto::named(Some(9), "Ghost")).await.unwrap_err();
        assert_eq!(err.error_code(), Some(602));
    }

    #[tokio::test]
    async fn test_invalid_dto_is_rejected_before_mapping() {
        let service = service(wards());
        let err = service.save(WardDto::named(None, "")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_batch_save_isolates_failing_element() {
        let repository = wards();
        let service = service(repository.clone());

        let results = service
            .save_all(vec![
                WardDto::named(None, "Cardiology"),
                WardDto::named(None, "X-Ray"),
                WardDto::named(None, "Neurology"),
            ])
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].base.id.is_some());
        assert_eq!(results[0].base.code, None);
        assert_eq!(results[1].base.code, Some(1001));
        assert_eq!(results[1].base.message.as_deref(), Some("name is reserved"));
        assert_eq!(results[1].base.id, None);
        assert!(results[2].base.id.is_some());

        let names: Vec<String> = repository.rows().into_iter().map(|w| w.name).collect();
        assert_eq!(names, vec!["Cardiology", "Neurology"]);
    }

    #[tokio::test]
    async fn test_batch_hook_sees_earlier_elements() {
        let repository = wards();
        let service = service(repository.clone());

        let results = service
            .save_all(vec![
                WardDto::named(None, "Surgery"),
                WardDto::named(None, "Xray"),
                WardDto::named(None, "Surgery"),
            ])
            .await
            .unwrap();

        assert_eq!(results[0].base.code, None);
        assert_eq!(results[1].base.code, Some(1001));
        assert_eq!(results[2].base.code, Some(1003));
        assert_eq!(results[2].base.id, None);
        assert_eq!(repository.rows().len(), 1);
    }

    #[tokio::test]
    async fn test_search_past_the_last_page_is_empty() {
        let service = service(wards());
        service.save(WardDto::named(None, "Surgery")).await.unwrap();

        let page = service
            .search(WardDto::default(), PageRequest::new(u64::MAX / 10, 100))
            .await
            .unwrap();

        assert!(page.content.is_empty());
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.meta.page, crate::pagination::MAX_PAGE_NUMBER);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let service = service(wards());
        let err = service.save_all(Vec::new()).await.unwrap_err();
        assert_eq!(err.error_code(), Some(606));
        let err = service.delete_all(Vec::new()).await.unwrap_err();
        assert_eq!(err.error_code(), Some(606));
    }

    #[tokio::test]
    async fn test_delete_soft_deletes_with_own_id() {
        let repository = wards();
        let service = service(repository.clone());
        for name in ["A", "B", "C", "D", "E"] {
            service.save(WardDto::named(None, name)).await.unwrap();
        }

        service.delete(5).await.unwrap();

        let row = repository.row(5).unwrap();
        assert_eq!(row.base.deleted, 5);
        assert_eq!(repository.rows().len(), 5);
        assert_err!(service.find_by_id(5).await);
        assert!(!service.exists_by_id(5).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_blocked_by_dependents() {
        let repository = wards();
        let service = service(repository.clone());
        service.save(WardDto::named(None, "Surgery")).await.unwrap();
        repository.add_reference(1);

        let err = service.delete(1).await.unwrap_err();
        assert_eq!(err.error_code(), Some(605));
        assert_eq!(repository.row(1).unwrap().base.deleted, 0);
    }

    #[tokio::test]
    async fn test_batch_delete_isolates_failures() {
        let repository = wards();
        let service = service(repository.clone());
        for name in ["Surgery", "Locked", "Pediatrics"] {
            service.save(WardDto::named(None, name)).await.unwrap();
        }
        repository.add_reference(3);

        let results = service.delete_all(vec![1, 2, 3]).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].base.code, None);
        assert_eq!(results[1].base.code, Some(1002));
        assert_eq!(results[2].base.code, Some(605));
        assert_eq!(repository.row(1).unwrap().base.deleted, 1);
        assert_eq!(repository.row(2).unwrap().base.deleted, 0);
        assert_eq!(repository.row(3).unwrap().base.deleted, 0);
    }

    #[tokio::test]
    async fn test_batch_delete_missing_id_aborts() {
        let service = service(wards());
        let err = service.delete_all(vec![77]).await.unwrap_err();
        assert_eq!(err.error_code(), Some(602));
    }

    #[tokio::test]
    async fn test_patch_merges_onto_stored_record() {
        let repository = wards();
        let service = service(repository.clone());
        let saved = service.save(WardDto::named(None, "Oncology")).await.unwrap();
        let id = saved.base.id.unwrap();

        let changes = json::to_map(&json!({"floor": 3})).unwrap();
        let patched = service.patch(id, changes).await.unwrap();

        assert_eq!(patched.name.as_deref(), Some("Oncology"));
        assert_eq!(patched.floor, Some(3));
        assert_eq!(repository.row(id).and_then(|w| w.floor), Some(3));
    }

    #[tokio::test]
    async fn test_patch_rejects_scalar_parent_path() {
        let service = service(wards());
        service.save(WardDto::named(None, "Oncology")).await.unwrap();

        let changes = json::to_map(&json!({"name.first": "x"})).unwrap();
        let err = service.patch(1, changes).await.unwrap_err();
        assert_eq!(err.error_code(), Some(604));
    }

    #[tokio::test]
    async fn test_patch_preconditions() {
        let service = service(wards());
        let err = service.patch(0, JsonMap::new()).await.unwrap_err();
        assert_eq!(err.error_code(), Some(602));

        service.save(WardDto::named(None, "Oncology")).await.unwrap();
        let err = service.patch(1, JsonMap::new()).await.unwrap_err();
        assert_eq!(err.error_code(), Some(606));
    }

    #[tokio::test]
    async fn test_find_by_id_bounds() {
        let service = service(wards());
        assert_eq!(assert_ok!(service.find_by_id(0).await), None);
        assert_eq!(service.find_by_id(3).await.unwrap_err().error_code(), Some(602));
    }

    #[tokio::test]
    async fn test_search_runs_hook_and_pages() {
        let service = service(wards());
        for name in ["Ward", "Ward A", "Ward B"] {
            service.save(WardDto::named(None, name)).await.unwrap();
        }

        let mut criteria = WardDto::default();
        criteria.name = Some("Ward".to_string());
        let page = service.search(criteria, PageRequest::new(1, 10)).await.unwrap();

        // the hook forces an exact match
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.content[0].name.as_deref(), Some("Ward"));
    }

    #[tokio::test]
    async fn test_search_first_defaults_to_newest() {
        let repository = Arc::new(Wards::new());
        let service = BaseService::new(repository, Arc::new(NoHooks)).unwrap();
        for name in ["First", "Second"] {
            service.save(WardDto::named(None, name)).await.unwrap();
        }

        let newest = service.search_first(WardDto::default(), None).await.unwrap();
        assert_eq!(newest.and_then(|w| w.name).as_deref(), Some("Second"));

        let oldest = service
            .search_first(WardDto::default(), Some(vec![SortOrder::asc("id")]))
            .await
            .unwrap();
        assert_eq!(oldest.and_then(|w| w.name).as_deref(), Some("First"));
    }

    #[tokio::test]
    async fn test_constructor_fails_fast_when_shapes_do_not_map() {
        use serde::{Deserialize, Serialize};
        use validator::Validate;

        #[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
        #[serde(rename_all = "camelCase", default)]
        struct BrokenDto {
            #[serde(flatten)]
            base: domain::BaseDtoFields,
            // the record serializes `name` as a string
            name: Vec<i32>,
        }
        domain::impl_dto!(BrokenDto);

        let repository: Arc<dyn BaseRepository<Ward, BrokenDto>> =
            Arc::new(MockBaseRepository::<Ward, BrokenDto>::new());
        let result = BaseService::new(repository, Arc::new(NoHooks));
        assert_eq!(result.err().and_then(|e| e.error_code()), Some(607));
    }
}
