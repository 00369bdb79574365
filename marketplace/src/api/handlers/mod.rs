pub mod admin;
pub mod auth;
pub mod chat;
pub mod credits;
pub mod customers;
pub mod health;
pub mod professionals;
pub mod reviews;
pub mod webhooks;
