pub mod admin;
pub mod auth;
pub mod chat;
pub mod credits;
pub mod leads;
pub mod profiles;
pub mod requests;
pub mod reviews;
pub mod users;
