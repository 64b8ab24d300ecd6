//! Record <-> DTO mapping service.
//!
//! Properties are copied by name through [`ModelMapper`]. Whatever cannot be
//! copied that way (nested records, computed values) is filled in by the
//! [`MappingHooks`] of the record type.

use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use common::{AppError, AppResult};
use domain::{DataError, Dto, Entity, Id, AUDIT_PROPERTIES, PROPERTY_CODE, PROPERTY_MESSAGE};

use crate::mapper::ModelMapper;
use crate::repository::BaseRepository;

/// Extension points for properties that are not copied by name.
#[async_trait]
pub trait MappingHooks<E: Entity, D: Dto>: Send + Sync {
    async fn specific_map_to_entity(&self, _dto: &D, _entity: &mut E) -> AppResult<()> {
        Ok(())
    }

    async fn specific_map_to_dto(&self, _entity: &E, _dto: &mut D) -> AppResult<()> {
        Ok(())
    }
}

/// Hooks for record types that map entirely by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<E: Entity, D: Dto> MappingHooks<E, D> for NoHooks {}

pub struct EntityMapper<E, D, H> {
    repository: Arc<dyn BaseRepository<E, D>>,
    hooks: Arc<H>,
    to_entity: ModelMapper,
    to_dto: ModelMapper,
}

impl<E, D, H> EntityMapper<E, D, H>
where
    E: Entity,
    D: Dto,
    H: MappingHooks<E, D>,
{
    pub fn new(repository: Arc<dyn BaseRepository<E, D>>, hooks: Arc<H>) -> Self {
        let to_entity = ModelMapper::new()
            .skip(AUDIT_PROPERTIES.iter().copied())
            .skip([PROPERTY_CODE, PROPERTY_MESSAGE]);

        Self {
            repository,
            hooks,
            to_entity,
            to_dto: ModelMapper::new(),
        }
    }

    /// Replace the name-matching mappers, e.g. to add converters.
    pub fn with_mappers(mut self, to_entity: ModelMapper, to_dto: ModelMapper) -> Self {
        self.to_entity = to_entity;
        self.to_dto = to_dto;
        self
    }

    pub fn repository(&self) -> &Arc<dyn BaseRepository<E, D>> {
        &self.repository
    }

    pub fn hooks(&self) -> &Arc<H> {
        &self.hooks
    }

    /// Map the default record to a DTO and back. Fails with
    /// [`DataError::InvalidConstructor`] when the pair does not map.
    pub fn verify(&self) -> AppResult<()> {
        let invalid = |e: AppError| {
            tracing::error!(entity = E::NAME, "Record and DTO do not map: {}", e);
            DataError::InvalidConstructor(E::NAME.to_string())
        };

        let dto: D = self.to_dto.map(&E::default()).map_err(invalid)?;
        let _: E = self.to_entity.map(&dto).map_err(invalid)?;
        Ok(())
    }

    /// A new record from `dto`. An unset `active` is read from the stored
    /// record so that omitting it never deactivates.
    pub async fn map_to_entity(&self, dto: &D) -> AppResult<E> {
        let started = Instant::now();
        let mut entity: E = self.to_entity.map(dto)?;

        if entity.active().is_none() {
            if let Some(id) = dto.id().filter(|id| *id > 0) {
                entity.base_mut().active = self.repository.active_by_id(id).await?;
            }
        }

        self.hooks.specific_map_to_entity(dto, &mut entity).await?;
        tracing::trace!(entity = E::NAME, elapsed = ?started.elapsed(), "Mapped DTO to new record");
        Ok(entity)
    }

    /// Overlay `dto` onto a loaded record. Unset DTO properties that are
    /// skipped on output (`id`, `active`) keep the record's values.
    pub async fn map_to_entity_onto(&self, dto: &D, mut entity: E) -> AppResult<E> {
        let started = Instant::now();
        let state = mem::take(&mut entity.base_mut().state);

        let mut mapped: E = self.to_entity.map_onto(dto, &entity)?;
        mapped.base_mut().state = state;
        if mapped.active().is_none() {
            mapped.base_mut().active = entity.active();
        }

        self.hooks.specific_map_to_entity(dto, &mut mapped).await?;
        tracing::trace!(entity = E::NAME, elapsed = ?started.elapsed(), "Mapped DTO onto record");
        Ok(mapped)
    }

    /// Reconcile a replacement set of DTOs against the current records.
    ///
    /// DTOs matching a record by id update it, the others become new
    /// records, and records no DTO matches are soft deleted.
    pub async fn map_to_entities(&self, dtos: &[D], existing: Vec<E>) -> AppResult<Vec<E>> {
        // records without an id were never saved and have nothing to delete
        let mut current: BTreeMap<Id, E> = existing
            .into_iter()
            .filter_map(|entity| entity.id().map(|id| (id, entity)))
            .collect();

        let mut mapped = Vec::with_capacity(dtos.len());
        for dto in dtos {
            let matched = dto.id().and_then(|id| current.remove(&id));
            let entity = match matched {
                Some(entity) => self.map_to_entity_onto(dto, entity).await?,
                None => self.map_to_entity(dto).await?,
            };
            mapped.push(entity);
        }

        if !current.is_empty() {
            tracing::debug!(entity = E::NAME, count = current.len(), "Removing unmatched records");
            self.repository
                .delete_entities(current.into_values().collect())
                .await?;
        }
        Ok(mapped)
    }

    pub async fn map_to_dto(&self, entity: &E) -> AppResult<D> {
        let started = Instant::now();
        let mut dto: D = self.to_dto.map(entity)?;

        self.hooks.specific_map_to_dto(entity, &mut dto).await?;
        tracing::trace!(entity = E::NAME, elapsed = ?started.elapsed(), "Mapped record to DTO");
        Ok(dto)
    }

    /// Overlay a record onto an existing DTO, keeping its request-scoped
    /// language and search flag.
    pub async fn map_to_dto_onto(&self, entity: &E, dto: D) -> AppResult<D> {
        let language = dto.base().language.clone();
        let strictly_search = dto.base().strictly_search;

        let mut mapped: D = self.to_dto.map_onto(entity, &dto)?;
        mapped.base_mut().language = language;
        mapped.base_mut().strictly_search = strictly_search;

        self.hooks.specific_map_to_dto(entity, &mut mapped).await?;
        Ok(mapped)
    }

    pub async fn map_to_dtos(&self, entities: &[E]) -> AppResult<Vec<D>> {
        let mut dtos = Vec::with_capacity(entities.len());
        for entity in entities {
            dtos.push(self.map_to_dto(entity).await?);
        }
        Ok(dtos)
    }
}
