//! Field repository interface

use async_trait::async_trait;

use super::model::Field;
use crate::domain::DomainResult;

#[async_trait]
pub trait FieldRepository: Send + Sync {
    /// Find field by ID
    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Field>>;
}
