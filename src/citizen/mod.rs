//! Citizen records: field cleaning, input validation and the domain error.

pub mod error;
pub mod normalize;
pub mod validate;

pub use crate::database::models::{
    CitizenFilter, CitizenFlag, CitizenPatch, CitizenRecord, NewCitizen,
    DEFAULT_REGISTRATION_STATUS,
};
pub use error::CitizenError;
pub use normalize::normalize;
pub use validate::{
    validate_create, validate_update, CreateCitizenRequest, FieldError, UpdateCitizenRequest,
    ValidationErrors,
};
