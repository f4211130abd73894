use async_trait::async_trait;
use diesel::prelude::*;

use crate::config::TenantContext;
use crate::domain::entities::RoomSession;
use crate::domain::repositories::room_session_repository::{
    RoomSessionRepository, RoomSessionRepositoryError,
};
use crate::infrastructure::database::models::{NewRoomSessionModel, RoomSessionModel};
use crate::infrastructure::database::schema::room_sessions::dsl::*;
use crate::infrastructure::database::{DbConnection, DbPool, tenant_connection};

pub struct PostgresRoomSessionRepository {
    pool: DbPool,
    tenant: TenantContext,
}

impl PostgresRoomSessionRepository {
    pub fn new(pool: DbPool, tenant: TenantContext) -> Self {
        Self { pool, tenant }
    }

    fn conn(&self) -> Result<DbConnection, RoomSessionRepositoryError> {
        tenant_connection(&self.pool, &self.tenant)
            .map_err(|e| RoomSessionRepositoryError::DatabaseError(e.to_string()))
    }
}

#[async_trait]
impl RoomSessionRepository for PostgresRoomSessionRepository {
    async fn find_by_room_id(
        &self,
        room: &str,
    ) -> Result<Option<RoomSession>, RoomSessionRepositoryError> {
        let mut conn = self.conn()?;

        let result = room_sessions
            .filter(room_id.eq(room))
            .filter(chatbot_id.eq(&self.tenant.chatbot_id))
            .select(RoomSessionModel::as_select())
            .first::<RoomSessionModel>(&mut conn)
            .optional()
            .map_err(|e| RoomSessionRepositoryError::DatabaseError(e.to_string()))?;

        match result {
            Some(model) => model
                .into_domain()
                .map(Some)
                .map_err(RoomSessionRepositoryError::ValidationError),
            None => Ok(None),
        }
    }

    async fn create(&self, session: &RoomSession) -> Result<(), RoomSessionRepositoryError> {
        let mut conn = self.conn()?;

        let new_session = NewRoomSessionModel::build(session, &self.tenant.chatbot_id)
            .map_err(RoomSessionRepositoryError::ValidationError)?;

        diesel::insert_into(room_sessions)
            .values(&new_session)
            .execute(&mut conn)
            .map_err(|e| RoomSessionRepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn update(&self, session: &RoomSession) -> Result<(), RoomSessionRepositoryError> {
        let mut conn = self.conn()?;

        let changes = NewRoomSessionModel::build(session, &self.tenant.chatbot_id)
            .map_err(RoomSessionRepositoryError::ValidationError)?;

        diesel::insert_into(room_sessions)
            .values(&changes)
            .on_conflict(room_id)
            .do_update()
            .set(&changes)
            .execute(&mut conn)
            .map_err(|e| RoomSessionRepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, room: &str) -> Result<(), RoomSessionRepositoryError> {
        let mut conn = self.conn()?;

        diesel::delete(
            room_sessions
                .filter(room_id.eq(room))
                .filter(chatbot_id.eq(&self.tenant.chatbot_id)),
        )
        .execute(&mut conn)
        .map_err(|e| RoomSessionRepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }
}
