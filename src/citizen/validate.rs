use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::citizen::normalize::{clean_optional, clean_str};
use crate::database::models::{CitizenPatch, NewCitizen, DEFAULT_REGISTRATION_STATUS};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("valid email regex")
});

const NATIONAL_ID_DIGITS: usize = 11;
const PHONE_MAX: usize = 15;

const FULL_NAME_MAX: usize = 100;
const SPOUSE_NAME_MAX: usize = 100;
const NEIGHBORHOOD_MAX: usize = 100;
const ZONE_MAX: usize = 50;
const EMAIL_MAX: usize = 100;
const FULL_ADDRESS_MAX: usize = 200;
const SOCIAL_PROGRAM_MAX: usize = 100;
const REGISTRATION_STATUS_MAX: usize = 50;

/// Raw body of a create request. Every field may be missing; the validator decides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCitizenRequest {
    pub full_name: Option<String>,
    pub national_id: Option<String>,
    pub spouse_name: Option<String>,
    pub spouse_national_id: Option<String>,
    pub neighborhood: Option<String>,
    pub zone: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub full_address: Option<String>,
    pub social_program: Option<String>,
    pub registration_status: Option<String>,
}

/// Raw body of a partial update.
///
/// The outer `Option` records whether the key was sent at all, the inner one
/// whether it was `null`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCitizenRequest {
    #[serde(deserialize_with = "present")]
    pub full_name: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub national_id: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub spouse_name: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub spouse_national_id: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub neighborhood: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub zone: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub phone: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub full_address: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub social_program: Option<Option<String>>,
    #[serde(deserialize_with = "present")]
    pub registration_status: Option<Option<String>>,
    pub active: Option<bool>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

/// Every field problem found in one input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed: {}", summarize(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError {
                field,
                reason: reason.into(),
            }],
        }
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Strip formatting from a CPF; `None` unless exactly 11 digits remain.
pub fn national_id_digits(value: &str) -> Option<String> {
    let digits = digits_only(value);
    (digits.len() == NATIONAL_ID_DIGITS).then_some(digits)
}

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &'static str, reason: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            reason: reason.into(),
        });
    }

    fn max_len(&mut self, field: &'static str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.fail(field, format!("must be at most {} characters", max));
        }
    }

    fn required(&mut self, field: &'static str, value: Option<String>, max: usize) -> String {
        match clean_optional(value) {
            Some(v) => {
                self.max_len(field, &v, max);
                v
            }
            None => {
                self.fail(field, "is required");
                String::new()
            }
        }
    }

    fn optional(&mut self, field: &'static str, value: Option<String>, max: usize) -> Option<String> {
        let value = clean_optional(value);
        if let Some(v) = &value {
            self.max_len(field, v, max);
        }
        value
    }

    fn national_id(&mut self, value: &str) -> String {
        match national_id_digits(value) {
            Some(digits) => digits,
            None => {
                self.fail("national_id", "must contain exactly 11 digits");
                String::new()
            }
        }
    }

    fn email(&mut self, value: Option<String>) -> Option<String> {
        let email = self.optional("email", value, EMAIL_MAX)?;
        if !EMAIL_RE.is_match(&email) {
            self.fail("email", "is not a valid email address");
        }
        Some(email)
    }

    /// On update a required column may be omitted, but never blanked.
    fn patch_required(
        &mut self,
        field: &'static str,
        value: Option<Option<String>>,
        max: usize,
    ) -> Option<String> {
        let value = value?;
        match clean_optional(value) {
            Some(v) => {
                self.max_len(field, &v, max);
                Some(v)
            }
            None => {
                self.fail(field, "cannot be blank");
                None
            }
        }
    }

    fn patch_optional(
        &mut self,
        field: &'static str,
        value: Option<Option<String>>,
        max: usize,
    ) -> Option<Option<String>> {
        value.map(|v| self.optional(field, v, max))
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors {
                errors: self.errors,
            })
        }
    }
}

/// Spouse CPF never fails validation: anything but 11 digits is dropped.
fn spouse_national_id(value: Option<String>) -> Option<String> {
    clean_optional(value).and_then(|v| national_id_digits(&v))
}

pub fn validate_create(request: CreateCitizenRequest) -> Result<NewCitizen, ValidationErrors> {
    let mut check = Checker::default();

    let full_name = check.required("full_name", request.full_name, FULL_NAME_MAX);
    let national_id = match clean_optional(request.national_id) {
        Some(raw) => check.national_id(&raw),
        None => {
            check.fail("national_id", "is required");
            String::new()
        }
    };
    let spouse_name = check.optional("spouse_name", request.spouse_name, SPOUSE_NAME_MAX);
    let spouse_national_id = spouse_national_id(request.spouse_national_id);
    let neighborhood = check.required("neighborhood", request.neighborhood, NEIGHBORHOOD_MAX);
    let zone = check.optional("zone", request.zone, ZONE_MAX);

    let phone = clean_optional(request.phone)
        .map(|raw| digits_only(&raw))
        .filter(|digits| !digits.is_empty());
    if let Some(p) = &phone {
        check.max_len("phone", p, PHONE_MAX);
    }

    let email = check.email(request.email);
    let full_address = check.required("full_address", request.full_address, FULL_ADDRESS_MAX);
    let social_program = check.optional("social_program", request.social_program, SOCIAL_PROGRAM_MAX);
    let registration_status = check
        .optional("registration_status", request.registration_status, REGISTRATION_STATUS_MAX)
        .unwrap_or_else(|| DEFAULT_REGISTRATION_STATUS.to_string());

    check.finish(NewCitizen {
        full_name,
        national_id,
        spouse_name,
        spouse_national_id,
        neighborhood,
        zone,
        phone,
        email,
        full_address,
        social_program,
        registration_status,
    })
}

pub fn validate_update(request: UpdateCitizenRequest) -> Result<CitizenPatch, ValidationErrors> {
    let mut check = Checker::default();

    let full_name = check.patch_required("full_name", request.full_name, FULL_NAME_MAX);
    let national_id = request.national_id.map(|value| {
        match value.as_deref().and_then(clean_str) {
            Some(raw) => check.national_id(&raw),
            None => {
                check.fail("national_id", "cannot be blank");
                String::new()
            }
        }
    });
    let spouse_name = check.patch_optional("spouse_name", request.spouse_name, SPOUSE_NAME_MAX);
    let spouse_national_id = request.spouse_national_id.map(spouse_national_id);
    let neighborhood = check.patch_required("neighborhood", request.neighborhood, NEIGHBORHOOD_MAX);
    let zone = check.patch_optional("zone", request.zone, ZONE_MAX);

    let phone = request.phone.map(|value| {
        let digits = clean_optional(value).map(|raw| digits_only(&raw)).unwrap_or_default();
        if digits.is_empty() {
            None
        } else {
            if !(10..=11).contains(&digits.len()) {
                check.fail("phone", "must contain 10 or 11 digits");
            }
            Some(digits)
        }
    });

    let email = request.email.map(|value| check.email(value));
    let full_address = check.patch_required("full_address", request.full_address, FULL_ADDRESS_MAX);
    let social_program =
        check.patch_optional("social_program", request.social_program, SOCIAL_PROGRAM_MAX);
    let registration_status = check.patch_required(
        "registration_status",
        request.registration_status,
        REGISTRATION_STATUS_MAX,
    );

    check.finish(CitizenPatch {
        full_name,
        national_id,
        spouse_name,
        spouse_national_id,
        neighborhood,
        zone,
        phone,
        email,
        full_address,
        social_program,
        registration_status,
        active: request.active,
    })
}
