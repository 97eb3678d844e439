use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::models::citizen::contains_ignore_case;
use crate::database::models::{
    CitizenFilter, CitizenFlag, CitizenPatch, CitizenRecord, ColumnInfo, NewCitizen, TableInfo,
    User,
};
use crate::database::postgres::NATIONAL_ID_CONSTRAINT;
use crate::database::store::{CitizenStore, SchemaCatalog, UserStore};

const USERS_NAME_CONSTRAINT: &str = "users_name_key";

#[derive(Debug, Default)]
struct MemoryState {
    citizens: BTreeMap<i32, CitizenRecord>,
    users: BTreeMap<i32, User>,
    next_citizen_id: i32,
    next_user_id: i32,
}

impl MemoryState {
    fn national_id_taken(&self, national_id: &str, except: Option<i32>) -> bool {
        self.citizens
            .values()
            .any(|c| c.national_id == national_id && Some(c.id) != except)
    }
}

/// In-memory store for tests and database-less development runs.
///
/// Every write holds the single write guard for its whole check-then-modify
/// sequence, which gives it the same atomicity as a Postgres transaction.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row verbatim, bypassing validation. Used to stage legacy data.
    pub async fn seed_citizen(&self, record: CitizenRecord) {
        let mut state = self.state.write().await;
        state.next_citizen_id = state.next_citizen_id.max(record.id);
        state.citizens.insert(record.id, record);
    }
}

#[async_trait]
impl CitizenStore for MemoryStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<CitizenRecord>, DatabaseError> {
        Ok(self.state.read().await.citizens.get(&id).cloned())
    }

    async fn find_by_national_id(
        &self,
        national_id: &str,
    ) -> Result<Option<CitizenRecord>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .citizens
            .values()
            .find(|c| c.national_id == national_id)
            .cloned())
    }

    async fn select(
        &self,
        filter: &CitizenFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CitizenRecord>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .citizens
            .values()
            .filter(|c| filter.matches(c))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &CitizenFilter) -> Result<i64, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.citizens.values().filter(|c| filter.matches(c)).count() as i64)
    }

    async fn search(&self, term: &str, limit: i64) -> Result<Vec<CitizenRecord>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .citizens
            .values()
            .filter(|c| {
                [&c.full_name, &c.national_id, &c.neighborhood, &c.full_address]
                    .iter()
                    .any(|field| contains_ignore_case(field, term))
            })
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        citizen: &NewCitizen,
        registration_date: NaiveDate,
    ) -> Result<CitizenRecord, DatabaseError> {
        let mut state = self.state.write().await;
        if state.national_id_taken(&citizen.national_id, None) {
            return Err(DatabaseError::UniqueViolation(NATIONAL_ID_CONSTRAINT.to_string()));
        }

        state.next_citizen_id += 1;
        let record = citizen
            .clone()
            .into_record(state.next_citizen_id, registration_date);
        state.citizens.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: i32,
        patch: &CitizenPatch,
    ) -> Result<Option<CitizenRecord>, DatabaseError> {
        let mut state = self.state.write().await;
        if !state.citizens.contains_key(&id) {
            return Ok(None);
        }
        if let Some(national_id) = &patch.national_id {
            if state.national_id_taken(national_id, Some(id)) {
                return Err(DatabaseError::UniqueViolation(NATIONAL_ID_CONSTRAINT.to_string()));
            }
        }

        Ok(state.citizens.get_mut(&id).map(|record| {
            patch.apply(record);
            record.clone()
        }))
    }

    async fn set_flag(
        &self,
        id: i32,
        flag: CitizenFlag,
        value: bool,
    ) -> Result<Option<CitizenRecord>, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(state.citizens.get_mut(&id).map(|record| {
            flag.set(record, value);
            record.clone()
        }))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.name == name).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, DatabaseError> {
        Ok(self.state.read().await.users.values().cloned().collect())
    }

    async fn insert(&self, name: &str, password_hash: &str) -> Result<User, DatabaseError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.name == name) {
            return Err(DatabaseError::UniqueViolation(USERS_NAME_CONSTRAINT.to_string()));
        }

        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            name: name.to_string(),
            password_hash: password_hash.to_string(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }
}

/// Mirrors the tables created by the SQL migrations
#[async_trait]
impl SchemaCatalog for MemoryStore {
    async fn tables(&self) -> Result<Vec<TableInfo>, DatabaseError> {
        Ok(vec![
            TableInfo {
                name: "citizens".to_string(),
                columns: vec![
                    ColumnInfo::new("id", "integer", false, true),
                    ColumnInfo::new("full_name", "character varying", false, false),
                    ColumnInfo::new("national_id", "character varying", false, false),
                    ColumnInfo::new("spouse_name", "character varying", true, false),
                    ColumnInfo::new("spouse_national_id", "character varying", true, false),
                    ColumnInfo::new("neighborhood", "character varying", false, false),
                    ColumnInfo::new("zone", "character varying", true, false),
                    ColumnInfo::new("phone", "character varying", true, false),
                    ColumnInfo::new("email", "character varying", true, false),
                    ColumnInfo::new("full_address", "character varying", false, false),
                    ColumnInfo::new("social_program", "character varying", true, false),
                    ColumnInfo::new("registration_status", "character varying", false, false),
                    ColumnInfo::new("registration_date", "date", false, false),
                    ColumnInfo::new("active", "boolean", false, false),
                    ColumnInfo::new("voted", "boolean", false, false),
                    ColumnInfo::new("eligible", "boolean", false, false),
                ],
            },
            TableInfo {
                name: "users".to_string(),
                columns: vec![
                    ColumnInfo::new("id", "integer", false, true),
                    ColumnInfo::new("name", "character varying", false, false),
                    ColumnInfo::new("password_hash", "character varying", false, false),
                ],
            },
        ])
    }
}
