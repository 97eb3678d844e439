use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use crate::citizen::normalize::normalize;
use crate::citizen::validate::{national_id_digits, ValidationErrors};
use crate::citizen::{
    validate_create, validate_update, CitizenError, CitizenFilter, CitizenFlag, CitizenRecord,
    CreateCitizenRequest, UpdateCitizenRequest,
};
use crate::config::config;
use crate::database::{CitizenStore, DatabaseError};

/// Record access for citizens: validation before storage, cleaning after every read.
#[derive(Clone)]
pub struct CitizenService {
    store: Arc<dyn CitizenStore>,
}

impl CitizenService {
    pub fn new(store: Arc<dyn CitizenStore>) -> Self {
        Self { store }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<CitizenRecord>, CitizenError> {
        let record = self.store.find_by_id(id).await.map_err(storage)?;
        Ok(record.map(normalize))
    }

    /// Look up by CPF. Formatting characters are ignored; anything but 11 digits is invalid.
    pub async fn get_by_national_id(&self, raw: &str) -> Result<Option<CitizenRecord>, CitizenError> {
        let national_id = national_id_digits(raw)
            .ok_or_else(|| ValidationErrors::single("national_id", "must contain exactly 11 digits"))?;
        let record = self
            .store
            .find_by_national_id(&national_id)
            .await
            .map_err(storage)?;
        Ok(record.map(normalize))
    }

    pub async fn list(
        &self,
        filter: &CitizenFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CitizenRecord>, CitizenError> {
        let limit = config().clamp_limit(limit);
        let records = self
            .store
            .select(filter, offset.max(0), limit)
            .await
            .map_err(storage)?;
        Ok(records.into_iter().map(normalize).collect())
    }

    pub async fn count(&self, filter: &CitizenFilter) -> Result<i64, CitizenError> {
        self.store.count(filter).await.map_err(storage)
    }

    /// Substring search over name, CPF, neighborhood and address. A blank term finds nothing.
    pub async fn search(&self, term: &str, limit: i64) -> Result<Vec<CitizenRecord>, CitizenError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(vec![]);
        }
        let limit = config().clamp_limit(limit);
        let records = self.store.search(term, limit).await.map_err(storage)?;
        Ok(records.into_iter().map(normalize).collect())
    }

    pub async fn create(&self, request: CreateCitizenRequest) -> Result<CitizenRecord, CitizenError> {
        let citizen = validate_create(request)?;
        let today = Utc::now().date_naive();

        let record = self
            .store
            .insert(&citizen, today)
            .await
            .map_err(|e| conflict_or_storage(e, &citizen.national_id))?;

        debug!("Created citizen {}", record.id);
        Ok(normalize(record))
    }

    /// Apply a partial update. `Ok(None)` when `id` does not exist.
    pub async fn update(
        &self,
        id: i32,
        request: UpdateCitizenRequest,
    ) -> Result<Option<CitizenRecord>, CitizenError> {
        let patch = validate_update(request)?;
        let national_id = patch.national_id.clone().unwrap_or_default();

        let record = self
            .store
            .update(id, &patch)
            .await
            .map_err(|e| conflict_or_storage(e, &national_id))?;
        Ok(record.map(normalize))
    }

    /// Mark the record inactive. Nothing is removed.
    pub async fn logical_delete(&self, id: i32) -> Result<Option<CitizenRecord>, CitizenError> {
        self.set_flag(id, CitizenFlag::Active, false).await
    }

    pub async fn set_voted(&self, id: i32, voted: bool) -> Result<Option<CitizenRecord>, CitizenError> {
        self.set_flag(id, CitizenFlag::Voted, voted).await
    }

    pub async fn set_eligible(
        &self,
        id: i32,
        eligible: bool,
    ) -> Result<Option<CitizenRecord>, CitizenError> {
        self.set_flag(id, CitizenFlag::Eligible, eligible).await
    }

    async fn set_flag(
        &self,
        id: i32,
        flag: CitizenFlag,
        value: bool,
    ) -> Result<Option<CitizenRecord>, CitizenError> {
        let record = self.store.set_flag(id, flag, value).await.map_err(storage)?;
        Ok(record.map(normalize))
    }
}

fn conflict_or_storage(err: DatabaseError, national_id: &str) -> CitizenError {
    match err {
        DatabaseError::UniqueViolation(_) => CitizenError::Conflict(national_id.to_string()),
        other => storage(other),
    }
}

fn storage(err: DatabaseError) -> CitizenError {
    error!("Citizen store failure: {}", err);
    CitizenError::Storage(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn service() -> CitizenService {
        CitizenService::new(Arc::new(MemoryStore::new()))
    }

    fn request(national_id: &str) -> CreateCitizenRequest {
        CreateCitizenRequest {
            full_name: Some("Maria Souza".into()),
            national_id: Some(national_id.into()),
            neighborhood: Some("Centro".into()),
            full_address: Some("Rua A, 10".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn negative_paging_is_floored() {
        let citizens = service();
        citizens.create(request("10000000001")).await.unwrap();
        citizens.create(request("10000000002")).await.unwrap();

        let all = CitizenFilter::default();
        assert_eq!(citizens.list(&all, -5, 10).await.unwrap().len(), 2);
        assert!(citizens.list(&all, 0, -1).await.unwrap().is_empty());
        assert!(citizens.search("Maria", -1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_limits_are_capped() {
        let Some(max) = config().filter.max_limit else { return };
        let citizens = service();
        for i in 0..=max {
            citizens.create(request(&format!("2{:010}", i))).await.unwrap();
        }

        let listed = citizens.list(&CitizenFilter::default(), 0, max + 50).await.unwrap();
        assert_eq!(listed.len() as i64, max);
    }

    #[tokio::test]
    async fn blank_search_terms_find_nothing() {
        let citizens = service();
        citizens.create(request("30000000003")).await.unwrap();

        assert!(citizens.search("", 10).await.unwrap().is_empty());
        assert!(citizens.search(" \t ", 10).await.unwrap().is_empty());
        assert_eq!(citizens.search(" maria ", 10).await.unwrap().len(), 1);
    }
}
