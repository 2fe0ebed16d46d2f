//! SeaORM implementation of FieldRepository

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};

use super::db_err;
use crate::domain::{DomainResult, Field, FieldRepository};
use crate::infrastructure::database::entities::field;
use crate::shared::types::from_minor_units;

pub struct SeaOrmFieldRepository {
    db: DatabaseConnection,
}

impl SeaOrmFieldRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: field::Model) -> Field {
    Field {
        id: m.id,
        name: m.name,
        price_per_hour: from_minor_units(m.price_per_hour_minor),
        description: m.description,
    }
}

#[async_trait]
impl FieldRepository for SeaOrmFieldRepository {
    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Field>> {
        let model = field::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }
}
