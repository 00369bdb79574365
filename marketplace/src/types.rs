use std::fmt;
use uuid::Uuid;

pub type UserId = Uuid;
pub type ProfileId = Uuid;
pub type CustomerRequestId = Uuid;
pub type LeadId = Uuid;
pub type ReviewId = Uuid;
pub type TransactionId = Uuid;

/// `*All` grants access to every row, `*Own` only to rows the caller owns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateAll,
    CreateOwn,
    ReadAll,
    ReadOwn,
    UpdateAll,
    UpdateOwn,
    DeleteAll,
    DeleteOwn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Users,
    Profiles,
    CustomerRequests,
    Leads,
    Credits,
    Reviews,
    Stats,
}

/// The permission a rejected request was missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    Allow(Resource, Operation),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::CreateAll | Operation::CreateOwn => write!(f, "Create"),
            Operation::ReadAll | Operation::ReadOwn => write!(f, "Read"),
            Operation::UpdateAll | Operation::UpdateOwn => write!(f, "Update"),
            Operation::DeleteAll | Operation::DeleteOwn => write!(f, "Delete"),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Users => "users",
            Resource::Profiles => "business profiles",
            Resource::CustomerRequests => "customer requests",
            Resource::Leads => "leads",
            Resource::Credits => "credits",
            Resource::Reviews => "reviews",
            Resource::Stats => "platform statistics",
        };
        f.write_str(name)
    }
}
