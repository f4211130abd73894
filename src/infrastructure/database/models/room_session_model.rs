use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use crate::domain::entities::room_session::SessionImage;
use crate::domain::entities::RoomSession;
use crate::domain::value_objects::SessionStage;
use crate::infrastructure::database::schema::room_sessions;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = room_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RoomSessionModel {
    pub room_id: String,
    pub chatbot_id: String,
    pub stage: i32,
    pub header: Option<String>,
    pub body_text: Option<String>,
    pub images: Value,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = room_sessions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewRoomSessionModel {
    pub room_id: String,
    pub chatbot_id: String,
    pub stage: i32,
    pub header: Option<String>,
    pub body_text: Option<String>,
    pub images: Value,
    pub updated_at: DateTime<Utc>,
}

impl RoomSessionModel {
    pub fn into_domain(self) -> Result<RoomSession, String> {
        let stage = SessionStage::from_i32(self.stage)?;
        let images: Vec<SessionImage> = serde_json::from_value(self.images)
            .map_err(|e| format!("Malformed session images payload: {}", e))?;
        Ok(RoomSession::from_database(
            self.room_id,
            stage,
            self.header,
            self.body_text,
            images,
            self.updated_at,
        ))
    }
}

impl NewRoomSessionModel {
    pub fn build(session: &RoomSession, chatbot_id: &str) -> Result<Self, String> {
        Ok(Self {
            room_id: session.room_id().to_string(),
            chatbot_id: chatbot_id.to_string(),
            stage: session.stage().as_i32(),
            header: session.header().map(str::to_string),
            body_text: session.body_text().map(str::to_string),
            images: serde_json::to_value(session.images())
                .map_err(|e| format!("Failed to serialize session images: {}", e))?,
            updated_at: session.updated_at(),
        })
    }
}
