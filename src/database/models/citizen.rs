use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sqlx::FromRow;

use crate::filter::contains_pattern;

pub const DEFAULT_REGISTRATION_STATUS: &str = "Active";

/// A persisted citizen row (table `citizens`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CitizenRecord {
    pub id: i32,
    pub full_name: String,
    pub national_id: String,
    pub spouse_name: Option<String>,
    pub spouse_national_id: Option<String>,
    pub neighborhood: String,
    pub zone: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub full_address: String,
    pub social_program: Option<String>,
    pub registration_status: String,
    pub registration_date: NaiveDate,
    pub active: bool,
    pub voted: bool,
    pub eligible: bool,
}

/// Validated input for a new citizen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCitizen {
    pub full_name: String,
    pub national_id: String,
    pub spouse_name: Option<String>,
    pub spouse_national_id: Option<String>,
    pub neighborhood: String,
    pub zone: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub full_address: String,
    pub social_program: Option<String>,
    pub registration_status: String,
}

impl NewCitizen {
    /// The row as it is stored on insert: active, not voted, eligible.
    pub fn into_record(self, id: i32, registration_date: NaiveDate) -> CitizenRecord {
        CitizenRecord {
            id,
            full_name: self.full_name,
            national_id: self.national_id,
            spouse_name: self.spouse_name,
            spouse_national_id: self.spouse_national_id,
            neighborhood: self.neighborhood,
            zone: self.zone,
            phone: self.phone,
            email: self.email,
            full_address: self.full_address,
            social_program: self.social_program,
            registration_status: self.registration_status,
            registration_date,
            active: true,
            voted: false,
            eligible: true,
        }
    }
}

/// Validated partial update.
///
/// `None` leaves a column untouched. Optional columns use `Some(None)` to clear
/// the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CitizenPatch {
    pub full_name: Option<String>,
    pub national_id: Option<String>,
    pub spouse_name: Option<Option<String>>,
    pub spouse_national_id: Option<Option<String>>,
    pub neighborhood: Option<String>,
    pub zone: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub full_address: Option<String>,
    pub social_program: Option<Option<String>>,
    pub registration_status: Option<String>,
    pub active: Option<bool>,
}

impl CitizenPatch {
    pub fn is_empty(&self) -> bool {
        *self == CitizenPatch::default()
    }

    /// Merge the supplied fields into `record`, leaving every other field as is.
    pub fn apply(&self, record: &mut CitizenRecord) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        set(&mut record.full_name, &self.full_name);
        set(&mut record.national_id, &self.national_id);
        set(&mut record.spouse_name, &self.spouse_name);
        set(&mut record.spouse_national_id, &self.spouse_national_id);
        set(&mut record.neighborhood, &self.neighborhood);
        set(&mut record.zone, &self.zone);
        set(&mut record.phone, &self.phone);
        set(&mut record.email, &self.email);
        set(&mut record.full_address, &self.full_address);
        set(&mut record.social_program, &self.social_program);
        set(&mut record.registration_status, &self.registration_status);
        set(&mut record.active, &self.active);
    }
}

/// Listing filters, AND-combined. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CitizenFilter {
    /// Case-insensitive substring
    pub neighborhood: Option<String>,
    pub registration_status: Option<String>,
    pub active: Option<bool>,
    pub eligible: Option<bool>,
}

impl CitizenFilter {
    pub fn eligible(eligible: bool) -> Self {
        Self {
            eligible: Some(eligible),
            ..Default::default()
        }
    }

    fn neighborhood_term(&self) -> Option<&str> {
        self.neighborhood.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    fn status_term(&self) -> Option<&str> {
        self.registration_status.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// WHERE document for the filter SQL builder, `None` when nothing filters.
    pub fn to_where(&self) -> Option<Value> {
        let mut conditions = Map::new();
        if let Some(term) = self.neighborhood_term() {
            conditions.insert("neighborhood".into(), json!({ "$ilike": contains_pattern(term) }));
        }
        if let Some(status) = self.status_term() {
            conditions.insert("registration_status".into(), json!(status));
        }
        if let Some(active) = self.active {
            conditions.insert("active".into(), json!(active));
        }
        if let Some(eligible) = self.eligible {
            conditions.insert("eligible".into(), json!(eligible));
        }

        if conditions.is_empty() {
            None
        } else {
            Some(Value::Object(conditions))
        }
    }

    pub fn matches(&self, record: &CitizenRecord) -> bool {
        if let Some(term) = self.neighborhood_term() {
            if !contains_ignore_case(&record.neighborhood, term) {
                return false;
            }
        }
        if let Some(status) = self.status_term() {
            if record.registration_status != status {
                return false;
            }
        }
        if self.active.is_some_and(|a| a != record.active) {
            return false;
        }
        if self.eligible.is_some_and(|e| e != record.eligible) {
            return false;
        }
        true
    }
}

/// Case-insensitive literal substring test, the in-process twin of `ILIKE '%term%'`
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Boolean columns that can be flipped in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitizenFlag {
    Active,
    Voted,
    Eligible,
}

impl CitizenFlag {
    pub fn column(self) -> &'static str {
        match self {
            CitizenFlag::Active => "active",
            CitizenFlag::Voted => "voted",
            CitizenFlag::Eligible => "eligible",
        }
    }

    pub fn set(self, record: &mut CitizenRecord, value: bool) {
        match self {
            CitizenFlag::Active => record.active = value,
            CitizenFlag::Voted => record.voted = value,
            CitizenFlag::Eligible => record.eligible = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CitizenRecord {
        NewCitizen {
            full_name: "Maria Souza".into(),
            national_id: "11122233396".into(),
            spouse_name: None,
            spouse_national_id: None,
            neighborhood: "Centro".into(),
            zone: Some("Urbana".into()),
            phone: None,
            email: None,
            full_address: "Rua A, 10".into(),
            social_program: None,
            registration_status: DEFAULT_REGISTRATION_STATUS.into(),
        }
        .into_record(1, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut r = record();
        let before = r.clone();
        let patch = CitizenPatch::default();
        assert!(patch.is_empty());
        patch.apply(&mut r);
        assert_eq!(r, before);
    }

    #[test]
    fn patch_sets_and_clears_only_supplied_fields() {
        let mut r = record();
        let patch = CitizenPatch {
            phone: Some(Some("11987654321".into())),
            zone: Some(None),
            ..Default::default()
        };
        patch.apply(&mut r);

        assert_eq!(r.phone.as_deref(), Some("11987654321"));
        assert_eq!(r.zone, None);
        assert_eq!(r.full_name, "Maria Souza");
        assert!(r.active);
    }

    #[test]
    fn filter_matches_and_where_agree_on_fields() {
        let r = record();
        let filter = CitizenFilter {
            neighborhood: Some("cEnT".into()),
            active: Some(true),
            ..Default::default()
        };
        assert!(filter.matches(&r));
        assert_eq!(
            filter.to_where(),
            Some(json!({ "neighborhood": { "$ilike": "%cEnT%" }, "active": true }))
        );

        assert!(!CitizenFilter::eligible(false).matches(&r));
        assert_eq!(CitizenFilter::default().to_where(), None);
    }

    #[test]
    fn blank_filter_values_are_ignored() {
        let filter = CitizenFilter {
            neighborhood: Some("   ".into()),
            registration_status: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(filter.to_where(), None);
        assert!(filter.matches(&record()));
    }
}
