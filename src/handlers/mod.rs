// handlers/mod.rs - HTTP handlers
//
// public/    no authentication (users, login, citizen reads and toggles, files, schema)
// protected/ bearer token required (profile, citizen update and delete)

pub mod protected;
pub mod public;
