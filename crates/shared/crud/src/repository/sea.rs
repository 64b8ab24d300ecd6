//! Generic SeaORM repository.
//!
//! A table plugs in through [`TableBinding`]: its SeaORM entity, the
//! conversion to and from the domain record, and optional search filters and
//! dependent-row counting. [`SeaOrmRepository`] supplies the soft-delete,
//! audit and transaction behavior on top.

use std::marker::PhantomData;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    sea_query::Expr, ActiveModelBehavior, ActiveModelTrait, ActiveValue, ColumnTrait,
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, IntoActiveModel,
    JsonValue, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Statement,
};
use serde_json::Value;

use common::{AppError, AppResult, JsonMap};
use domain::{DataError, Dto, Entity, Id, NOT_DELETED};

use super::transaction::{begin_read, begin_write, finish};
use super::BaseRepository;
use crate::pagination::{Direction, Page, PageRequest};
use crate::security;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("Invalid identifier regex")
});

/// Column type of a binding's table.
pub type ColumnOf<T> = <<T as TableBinding>::Table as EntityTrait>::Column;

/// Glue between a SeaORM table and a domain record.
#[async_trait]
pub trait TableBinding: Send + Sync + 'static {
    type Table: EntityTrait<Model = Self::Model>;
    type Model: FromQueryResult + IntoActiveModel<Self::ActiveModel> + Send + Sync + 'static;
    type ActiveModel: ActiveModelTrait<Entity = Self::Table> + ActiveModelBehavior + Send + 'static;
    type Domain: Entity;
    type Filter: Dto;

    fn id_column() -> ColumnOf<Self>;

    fn active_column() -> ColumnOf<Self>;

    fn deleted_column() -> ColumnOf<Self>;

    fn to_domain(model: Self::Model) -> Self::Domain;

    /// Build the active model to write. Use [`key`] for the primary key and
    /// [`created`] for creation stamps.
    fn to_active_model(entity: &Self::Domain) -> Self::ActiveModel;

    /// Table-specific search criteria.
    fn apply_filter(query: Select<Self::Table>, _filter: &Self::Filter) -> Select<Self::Table> {
        query
    }

    /// Live rows in other tables referencing `id`.
    async fn count_dependents(_db: &DatabaseConnection, _id: Id) -> Result<u64, DbErr> {
        Ok(0)
    }
}

/// Primary key for writing: unset for records without an id.
pub fn key<E: Entity>(entity: &E) -> ActiveValue<Id> {
    match entity.id() {
        Some(id) if id > 0 => ActiveValue::Set(id),
        _ => ActiveValue::NotSet,
    }
}

/// Creation stamps are written on insert only.
pub fn created<E, V>(entity: &E, value: V) -> ActiveValue<V>
where
    E: Entity,
    V: Into<sea_orm::Value>,
{
    if entity.base().state.new_record {
        ActiveValue::Set(value)
    } else {
        ActiveValue::NotSet
    }
}

pub struct SeaOrmRepository<T> {
    db: DatabaseConnection,
    _binding: PhantomData<fn() -> T>,
}

impl<T: TableBinding> SeaOrmRepository<T> {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            _binding: PhantomData,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    fn live() -> Select<T::Table> {
        T::Table::find().filter(T::deleted_column().eq(NOT_DELETED))
    }

    fn loaded(model: T::Model) -> T::Domain {
        let mut entity = T::to_domain(model);
        entity.base_mut().mark_loaded();
        entity
    }

    async fn active_in<C: ConnectionTrait>(conn: &C, id: Id) -> AppResult<Option<bool>> {
        Self::live()
            .select_only()
            .column(T::active_column())
            .filter(T::id_column().eq(id))
            .into_tuple::<bool>()
            .one(conn)
            .await
            .map_err(AppError::from)
    }

    async fn persist<C: ConnectionTrait>(conn: &C, mut entity: T::Domain) -> AppResult<T::Domain> {
        let now = Utc::now();
        let actor = security::current_user_id();
        let map_all = entity.map_all_properties();

        let model = if entity.is_new_record() {
            entity.base_mut().pre_persist(now, actor);
            T::to_active_model(&entity).insert(conn).await?
        } else {
            let id = entity.id().unwrap_or_default();
            let stored_active = Self::active_in(conn, id)
                .await?
                .ok_or_else(|| DataError::not_found(id, T::Domain::NAME))?;

            if entity.base().state.old_active.is_none() {
                entity.base_mut().state.old_active = Some(stored_active);
            }
            entity.base_mut().pre_update(now, actor);

            T::to_active_model(&entity)
                .update(conn)
                .await
                .map_err(|e| match e {
                    DbErr::RecordNotUpdated => DataError::not_found(id, T::Domain::NAME).into(),
                    other => AppError::from(other),
                })?
        };

        let mut saved = Self::loaded(model);
        saved.set_map_all_properties(map_all);
        Ok(saved)
    }

    async fn persist_all<C: ConnectionTrait>(
        conn: &C,
        entities: Vec<T::Domain>,
    ) -> AppResult<Vec<T::Domain>> {
        let mut saved = Vec::with_capacity(entities.len());
        for entity in entities {
            saved.push(Self::persist(conn, entity).await?);
        }
        Ok(saved)
    }

    fn order(query: Select<T::Table>, page: &PageRequest) -> AppResult<Select<T::Table>> {
        if page.sort.is_empty() {
            return Ok(query.order_by_asc(T::id_column()));
        }

        page.sort.iter().try_fold(query, |query, sort| {
            let column = ColumnOf::<T>::from_str(&to_snake_case(&sort.property))
                .map_err(|_| AppError::bad_request(format!("Unknown sort property '{}'", sort.property)))?;
            let order = match sort.direction {
                Direction::Asc => Order::Asc,
                Direction::Desc => Order::Desc,
            };
            Ok(query.order_by(column, order))
        })
    }
}

#[async_trait]
impl<T: TableBinding> BaseRepository<T::Domain, T::Filter> for SeaOrmRepository<T> {
    async fn save(&self, entity: T::Domain) -> AppResult<T::Domain> {
        let txn = begin_write(&self.db).await?;
        let result = Self::persist(&txn, entity).await;
        finish(txn, result).await
    }

    async fn save_all(&self, entities: Vec<T::Domain>) -> AppResult<Vec<T::Domain>> {
        let txn = begin_write(&self.db).await?;
        let result = Self::persist_all(&txn, entities).await;
        finish(txn, result).await
    }

    async fn find_all(&self) -> AppResult<Vec<T::Domain>> {
        let txn = begin_read(&self.db).await?;
        let result = Self::live()
            .order_by_asc(T::id_column())
            .all(&txn)
            .await
            .map_err(AppError::from);
        let models = finish(txn, result).await?;
        Ok(models.into_iter().map(Self::loaded).collect())
    }

    async fn find_all_by_id(&self, ids: &[Id]) -> AppResult<Vec<T::Domain>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let txn = begin_read(&self.db).await?;
        let result = Self::live()
            .filter(T::id_column().is_in(ids.iter().copied()))
            .all(&txn)
            .await
            .map_err(AppError::from);
        let models = finish(txn, result).await?;
        Ok(models.into_iter().map(Self::loaded).collect())
    }

    async fn find_by_id(&self, id: Id) -> AppResult<Option<T::Domain>> {
        let txn = begin_read(&self.db).await?;
        let result = Self::live()
            .filter(T::id_column().eq(id))
            .one(&txn)
            .await
            .map_err(AppError::from);
        let model = finish(txn, result).await?;
        Ok(model.map(Self::loaded))
    }

    async fn exists_by_id(&self, id: Id) -> AppResult<bool> {
        let count = Self::live()
            .filter(T::id_column().eq(id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn active_by_id(&self, id: Id) -> AppResult<Option<bool>> {
        Self::active_in(&self.db, id).await
    }

    async fn delete(&self, mut entity: T::Domain) -> AppResult<T::Domain> {
        let id = entity
            .id()
            .filter(|id| *id > 0)
            .ok_or(DataError::InvalidId(entity.id().unwrap_or_default()))?;

        let txn = begin_write(&self.db).await?;
        let result = T::Table::update_many()
            .col_expr(T::deleted_column(), Expr::value(id))
            .filter(T::id_column().eq(id))
            .filter(T::deleted_column().eq(NOT_DELETED))
            .exec(&txn)
            .await
            .map_err(AppError::from);
        let updated = finish(txn, result).await?;

        if updated.rows_affected == 0 {
            return Err(DataError::not_found(id, T::Domain::NAME).into());
        }

        tracing::debug!(entity = T::Domain::NAME, id, "Record soft deleted");
        entity.base_mut().mark_deleted();
        Ok(entity)
    }

    async fn delete_all(&self) -> AppResult<u64> {
        let txn = begin_write(&self.db).await?;
        let result = T::Table::update_many()
            .col_expr(T::deleted_column(), Expr::col(T::id_column()).into())
            .filter(T::deleted_column().eq(NOT_DELETED))
            .exec(&txn)
            .await
            .map_err(AppError::from);
        let updated = finish(txn, result).await?;

        tracing::info!(entity = T::Domain::NAME, count = updated.rows_affected, "Records soft deleted");
        Ok(updated.rows_affected)
    }

    async fn exists_foreign_key_constraint(&self, id: Id) -> AppResult<bool> {
        Ok(T::count_dependents(&self.db, id).await? > 0)
    }

    async fn search(&self, criteria: &T::Filter, page: &PageRequest) -> AppResult<Page<T::Domain>> {
        let mut query = Self::live();
        if let Some(active) = criteria.active() {
            query = query.filter(T::active_column().eq(active));
        }
        let query = Self::order(T::apply_filter(query, criteria), page)?;

        let paginator = query.paginate(&self.db, page.size);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page.page_index()).await?;

        Ok(Page::new(
            models.into_iter().map(Self::loaded).collect(),
            page,
            total,
        ))
    }

    async fn call_procedure(&self, name: &str, params: &JsonMap) -> AppResult<Vec<Value>> {
        if !IDENTIFIER.is_match(name) {
            return Err(AppError::bad_request(format!("Invalid procedure name '{}'", name)));
        }

        let mut arguments = Vec::with_capacity(params.len());
        let mut values = Vec::with_capacity(params.len());
        for (position, (param, value)) in params.iter().enumerate() {
            if param.contains('.') || !IDENTIFIER.is_match(param) {
                return Err(AppError::bad_request(format!("Invalid parameter name '{}'", param)));
            }
            arguments.push(format!("{} => ${}", param, position + 1));
            values.push(sql_value(value));
        }

        let sql = format!("SELECT * FROM {}({})", name, arguments.join(", "));
        tracing::debug!(procedure = name, "Calling stored procedure");

        let statement = Statement::from_sql_and_values(self.db.get_database_backend(), sql, values);
        let txn = begin_write(&self.db).await?;
        let result = JsonValue::find_by_statement(statement)
            .all(&txn)
            .await
            .map_err(AppError::from);
        finish(txn, result).await
    }
}

fn sql_value(value: &Value) -> sea_orm::Value {
    match value {
        Value::Null => sea_orm::Value::String(None),
        Value::Bool(b) => sea_orm::Value::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => sea_orm::Value::from(i),
            None => sea_orm::Value::from(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => sea_orm::Value::from(s.clone()),
        composite => sea_orm::Value::from(composite.clone()),
    }
}

/// `departmentId` -> `department_id`
pub(crate) fn to_snake_case(property: &str) -> String {
    let mut column = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            column.push('_');
            column.push(c.to_ascii_lowercase());
        } else {
            column.push(c);
        }
    }
    column
}
