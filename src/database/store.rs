use async_trait::async_trait;
use chrono::NaiveDate;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    CitizenFilter, CitizenFlag, CitizenPatch, CitizenRecord, NewCitizen, TableInfo, User,
};

/// Raw persistence for citizen rows.
///
/// Rows come back exactly as stored; cleaning happens in the service layer.
/// Writes that would duplicate a `national_id` fail with
/// [`DatabaseError::UniqueViolation`], whether caught by the pre-check or by the
/// table constraint.
#[async_trait]
pub trait CitizenStore: Send + Sync {
    async fn find_by_id(&self, id: i32) -> Result<Option<CitizenRecord>, DatabaseError>;

    async fn find_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Option<CitizenRecord>, DatabaseError>;

    /// Filtered page ordered by id ascending
    async fn select(
        &self,
        filter: &CitizenFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CitizenRecord>, DatabaseError>;

    async fn count(&self, filter: &CitizenFilter) -> Result<i64, DatabaseError>;

    /// Case-insensitive literal match on name, national id, neighborhood or address
    async fn search(&self, term: &str, limit: i64) -> Result<Vec<CitizenRecord>, DatabaseError>;

    async fn insert(
        &self,
        citizen: &NewCitizen,
        registration_date: NaiveDate,
    ) -> Result<CitizenRecord, DatabaseError>;

    /// `Ok(None)` when no row has `id`
    async fn update(
        &self,
        id: i32,
        patch: &CitizenPatch,
    ) -> Result<Option<CitizenRecord>, DatabaseError>;

    async fn set_flag(
        &self,
        id: i32,
        flag: CitizenFlag,
        value: bool,
    ) -> Result<Option<CitizenRecord>, DatabaseError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, DatabaseError>;

    async fn list(&self) -> Result<Vec<User>, DatabaseError>;

    async fn insert(&self, name: &str, password_hash: &str) -> Result<User, DatabaseError>;
}

/// Table and column listing for the schema dump
#[async_trait]
pub trait SchemaCatalog: Send + Sync {
    async fn tables(&self) -> Result<Vec<TableInfo>, DatabaseError>;
}
