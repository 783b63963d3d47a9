//! Free-text notes left on a business or consumer, mostly by compliance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    services::sql::{ColumnUpdate, UpdateBuilder},
    shared::{BusinessId, ConsumerId, NoteId, OwnerId},
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Note {
    pub id: NoteId,
    pub business_id: Option<BusinessId>,
    pub consumer_id: Option<ConsumerId>,
    pub author: String,
    pub body: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub deleted: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub owner_id: OwnerId,
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateNoteRequest {
    pub body: Option<String>,
}

impl ColumnUpdate for UpdateNoteRequest {
    fn assign<'a>(self, builder: &mut UpdateBuilder<'a>) {
        builder.set("body", self.body);
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    pub id: NoteId,
    pub owner_id: Option<OwnerId>,
    pub author: String,
    pub body: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id,
            owner_id: OwnerId::from_columns(note.business_id, note.consumer_id),
            author: note.author,
            body: note.body,
            created: note.created,
            modified: note.modified,
        }
    }
}
