use async_trait::async_trait;
use diesel::prelude::*;
use uuid::Uuid;

use crate::config::TenantContext;
use crate::domain::entities::QaRecord;
use crate::domain::repositories::qa_repository::{QaRepository, QaRepositoryError};
use crate::infrastructure::database::models::{NewQaRecordModel, QaRecordModel};
use crate::infrastructure::database::schema::qa_records::dsl::*;
use crate::infrastructure::database::{DbConnection, DbPool, tenant_connection};

pub struct PostgresQaRepository {
    pool: DbPool,
    tenant: TenantContext,
}

impl PostgresQaRepository {
    pub fn new(pool: DbPool, tenant: TenantContext) -> Self {
        Self { pool, tenant }
    }

    fn conn(&self) -> Result<DbConnection, QaRepositoryError> {
        tenant_connection(&self.pool, &self.tenant)
            .map_err(|e| QaRepositoryError::DatabaseError(e.to_string()))
    }
}

#[async_trait]
impl QaRepository for PostgresQaRepository {
    async fn insert(&self, record: &QaRecord) -> Result<(), QaRepositoryError> {
        let mut conn = self.conn()?;

        let new_record = NewQaRecordModel::build(record, &self.tenant.chatbot_id)
            .map_err(QaRepositoryError::ValidationError)?;

        diesel::insert_into(qa_records)
            .values(&new_record)
            .execute(&mut conn)
            .map_err(|e| QaRepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<QaRecord>, QaRepositoryError> {
        let mut conn = self.conn()?;

        let result = qa_records
            .filter(qa_id.eq(id))
            .filter(chatbot_id.eq(&self.tenant.chatbot_id))
            .select(QaRecordModel::as_select())
            .first::<QaRecordModel>(&mut conn)
            .optional()
            .map_err(|e| QaRepositoryError::DatabaseError(e.to_string()))?;

        match result {
            Some(model) => QaRecord::try_from(model)
                .map(Some)
                .map_err(QaRepositoryError::ValidationError),
            None => Ok(None),
        }
    }

    async fn find_by_room_id(&self, room: &str) -> Result<Vec<QaRecord>, QaRepositoryError> {
        let mut conn = self.conn()?;

        let models = qa_records
            .filter(room_id.eq(room))
            .filter(chatbot_id.eq(&self.tenant.chatbot_id))
            .order(created_at.asc())
            .select(QaRecordModel::as_select())
            .load::<QaRecordModel>(&mut conn)
            .map_err(|e| QaRepositoryError::DatabaseError(e.to_string()))?;

        models
            .into_iter()
            .map(|model| QaRecord::try_from(model).map_err(QaRepositoryError::ValidationError))
            .collect()
    }

    async fn update_feedback(
        &self,
        id: Uuid,
        thumb_value: Option<i16>,
        comment_value: Option<String>,
    ) -> Result<(), QaRepositoryError> {
        let mut conn = self.conn()?;

        let updated = diesel::update(
            qa_records
                .filter(qa_id.eq(id))
                .filter(chatbot_id.eq(&self.tenant.chatbot_id)),
        )
        .set((thumb.eq(thumb_value), comment.eq(comment_value)))
        .execute(&mut conn)
        .map_err(|e| QaRepositoryError::DatabaseError(e.to_string()))?;

        if updated == 0 {
            return Err(QaRepositoryError::NotFound(id));
        }
        Ok(())
    }
}
