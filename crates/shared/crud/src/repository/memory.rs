//! In-memory repository for tests.
//!
//! Keeps every row, soft-deleted ones included, and applies the same
//! lifecycle rules as the SeaORM repository: id assignment on insert, audit
//! stamps, carried-over `active` on update and soft delete.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use common::{AppError, AppResult, JsonMap};
use domain::{DataError, Dto, Entity, Id};

use super::BaseRepository;
use crate::pagination::{Direction, Page, PageRequest};
use crate::security;

type Criteria<E, F> = Box<dyn Fn(&E, &F) -> bool + Send + Sync>;
type Procedure = Box<dyn Fn(&JsonMap) -> Vec<Value> + Send + Sync>;

pub struct InMemoryRepository<E, F> {
    rows: Mutex<BTreeMap<Id, E>>,
    next_id: AtomicI64,
    criteria: Option<Criteria<E, F>>,
    referenced: Mutex<BTreeSet<Id>>,
    procedures: BTreeMap<String, Procedure>,
}

impl<E: Entity, F: Dto> Default for InMemoryRepository<E, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity, F: Dto> InMemoryRepository<E, F> {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            criteria: None,
            referenced: Mutex::new(BTreeSet::new()),
            procedures: BTreeMap::new(),
        }
    }

    /// Table-specific search criteria, applied after `active`.
    pub fn with_criteria(
        mut self,
        criteria: impl Fn(&E, &F) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.criteria = Some(Box::new(criteria));
        self
    }

    pub fn with_procedure(
        mut self,
        name: impl Into<String>,
        procedure: impl Fn(&JsonMap) -> Vec<Value> + Send + Sync + 'static,
    ) -> Self {
        self.procedures.insert(name.into(), Box::new(procedure));
        self
    }

    /// Mark `id` as referenced by dependent rows.
    pub fn add_reference(&self, id: Id) {
        self.lock_referenced().insert(id);
    }

    pub fn remove_reference(&self, id: Id) {
        self.lock_referenced().remove(&id);
    }

    /// Every stored row, soft-deleted ones included.
    pub fn rows(&self) -> Vec<E> {
        self.lock_rows().values().cloned().collect()
    }

    /// A stored row by id, even when soft-deleted.
    pub fn row(&self, id: Id) -> Option<E> {
        self.lock_rows().get(&id).cloned()
    }

    fn lock_rows(&self) -> MutexGuard<'_, BTreeMap<Id, E>> {
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_referenced(&self) -> MutexGuard<'_, BTreeSet<Id>> {
        self.referenced
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn live(rows: &BTreeMap<Id, E>, id: Id) -> Option<&E> {
        rows.get(&id).filter(|row| !row.base().is_deleted())
    }

    fn loaded(mut entity: E) -> E {
        entity.base_mut().mark_loaded();
        entity
    }

    fn persist(&self, rows: &mut BTreeMap<Id, E>, mut entity: E) -> AppResult<E> {
        let now = Utc::now();
        let actor = security::current_user_id();
        let map_all = entity.map_all_properties();

        if entity.is_new_record() {
            let id = match entity.id() {
                Some(id) if id > 0 => id,
                _ => self.next_id.fetch_add(1, AtomicOrdering::SeqCst),
            };
            entity.set_id(id);
            entity.base_mut().pre_persist(now, actor);
        } else {
            let id = entity.id().unwrap_or_default();
            let stored = Self::live(rows, id).ok_or_else(|| DataError::not_found(id, E::NAME))?;

            if entity.base().state.old_active.is_none() {
                entity.base_mut().state.old_active = stored.active();
            }
            let created = stored.base().audit.clone();
            entity.base_mut().pre_update(now, actor);
            // creation stamps are never rewritten on update
            let audit = &mut entity.base_mut().audit;
            audit.created_at = created.created_at;
            audit.created_by = created.created_by;
        }

        let mut stored = Self::loaded(entity);
        stored.set_map_all_properties(false);
        let id = stored.id().unwrap_or_default();
        rows.insert(id, stored.clone());

        stored.set_map_all_properties(map_all);
        Ok(stored)
    }

    fn matches(&self, entity: &E, criteria: &F) -> bool {
        if let Some(active) = criteria.active() {
            if entity.active() != Some(active) {
                return false;
            }
        }
        self.criteria
            .as_ref()
            .map_or(true, |matches| matches(entity, criteria))
    }
}

fn sort_key(entity: &impl Entity, property: &str) -> Value {
    serde_json::to_value(entity)
        .ok()
        .and_then(|value| value.get(property).cloned())
        .unwrap_or(Value::Null)
}

fn compare(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l
            .as_f64()
            .partial_cmp(&r.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(l), Value::String(r)) => l.cmp(r),
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl<E: Entity, F: Dto> BaseRepository<E, F> for InMemoryRepository<E, F> {
    async fn save(&self, entity: E) -> AppResult<E> {
        let mut rows = self.lock_rows();
        self.persist(&mut rows, entity)
    }

    async fn save_all(&self, entities: Vec<E>) -> AppResult<Vec<E>> {
        let mut rows = self.lock_rows();
        // all or nothing, like a transaction
        let mut staged = rows.clone();
        let saved = entities
            .into_iter()
            .map(|entity| self.persist(&mut staged, entity))
            .collect::<AppResult<Vec<_>>>()?;
        *rows = staged;
        Ok(saved)
    }

    async fn find_all(&self) -> AppResult<Vec<E>> {
        Ok(self
            .lock_rows()
            .values()
            .filter(|row| !row.base().is_deleted())
            .cloned()
            .map(Self::loaded)
            .collect())
    }

    async fn find_all_by_id(&self, ids: &[Id]) -> AppResult<Vec<E>> {
        let rows = self.lock_rows();
        Ok(ids
            .iter()
            .filter_map(|id| Self::live(&rows, *id).cloned())
            .map(Self::loaded)
            .collect())
    }

    async fn find_by_id(&self, id: Id) -> AppResult<Option<E>> {
        Ok(Self::live(&self.lock_rows(), id).cloned().map(Self::loaded))
    }

    async fn exists_by_id(&self, id: Id) -> AppResult<bool> {
        Ok(Self::live(&self.lock_rows(), id).is_some())
    }

    async fn active_by_id(&self, id: Id) -> AppResult<Option<bool>> {
        Ok(Self::live(&self.lock_rows(), id).and_then(|row| row.active()))
    }

    async fn delete(&self, mut entity: E) -> AppResult<E> {
        let id = entity
            .id()
            .filter(|id| *id > 0)
            .ok_or(DataError::InvalidId(entity.id().unwrap_or_default()))?;

        let mut rows = self.lock_rows();
        let stored = rows
            .get_mut(&id)
            .filter(|row| !row.base().is_deleted())
            .ok_or_else(|| DataError::not_found(id, E::NAME))?;

        stored.base_mut().mark_deleted();
        entity.base_mut().mark_deleted();
        Ok(entity)
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let mut count = 0;
        for row in self.lock_rows().values_mut() {
            if !row.base().is_deleted() {
                row.base_mut().mark_deleted();
                count += 1;
            }
        }
        Ok(count)
    }

    async fn exists_foreign_key_constraint(&self, id: Id) -> AppResult<bool> {
        Ok(self.lock_referenced().contains(&id))
    }

    async fn search(&self, criteria: &F, page: &PageRequest) -> AppResult<Page<E>> {
        let mut matched: Vec<E> = self
            .lock_rows()
            .values()
            .filter(|row| !row.base().is_deleted() && self.matches(row, criteria))
            .cloned()
            .collect();

        // stable sorts applied last key first
        for order in page.sort.iter().rev() {
            matched.sort_by(|a, b| {
                let ordering = compare(&sort_key(a, &order.property), &sort_key(b, &order.property));
                match order.direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let total = matched.len() as u64;
        let content = matched
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.size).unwrap_or(usize::MAX))
            .map(Self::loaded)
            .collect();

        Ok(Page::new(content, page, total))
    }

    async fn call_procedure(&self, name: &str, params: &JsonMap) -> AppResult<Vec<Value>> {
        self.procedures
            .get(name)
            .map(|procedure| procedure(params))
            .ok_or_else(|| AppError::bad_request(format!("Unknown procedure '{}'", name)))
    }
}
