use crate::db::errors::Result;

/// CRUD surface shared by the entity repositories.
///
/// Each repository borrows a connection (or an open transaction) for its
/// lifetime, so callers decide the transactional scope.
#[async_trait::async_trait]
pub trait Repository {
    type CreateRequest;
    type UpdateRequest;
    type Response;
    type Id;
    type Filter;

    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response>;

    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>>;

    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>>;

    /// Fails with `DbError::NotFound` when no row has the given id
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response>;

    /// Returns whether a row was deleted
    async fn delete(&mut self, id: Self::Id) -> Result<bool>;
}
