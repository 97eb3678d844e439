pub mod citizen;
pub mod schema;
pub mod user;

pub use citizen::{
    CitizenFilter, CitizenFlag, CitizenPatch, CitizenRecord, NewCitizen,
    DEFAULT_REGISTRATION_STATUS,
};
pub use schema::{ColumnInfo, TableInfo};
pub use user::User;
