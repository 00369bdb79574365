pub mod chat;
pub mod credits;
pub mod leads;
pub mod payments;
pub mod profiles;
pub mod repository;
pub mod requests;
pub mod reviews;
pub mod stats;
pub mod users;

pub use chat::Chats;
pub use credits::Credits;
pub use leads::Leads;
pub use payments::Payments;
pub use profiles::Profiles;
pub use repository::Repository;
pub use requests::Requests;
pub use reviews::Reviews;
pub use stats::Stats;
pub use users::Users;
