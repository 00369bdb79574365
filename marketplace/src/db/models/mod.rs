pub mod chat;
pub mod credits;
pub mod leads;
pub mod payments;
pub mod profiles;
pub mod requests;
pub mod reviews;
pub mod users;
