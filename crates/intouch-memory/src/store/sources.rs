//! Address book and message history read from SQLite.

use super::Store;
use async_trait::async_trait;
use intouch_core::{
    error::IntouchError,
    traits::{AddressBook, AddressBookRow, MessageHistory, SentMessage},
};

#[async_trait]
impl AddressBook for Store {
    async fn contacts(&self) -> Result<Vec<AddressBookRow>, IntouchError> {
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT id, display_name FROM contacts ORDER BY rowid")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| IntouchError::Source(format!("read contacts failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(id, display_name)| AddressBookRow { id, display_name })
            .collect())
    }

    async fn numbers(&self, contact_id: &str) -> Result<Vec<Option<String>>, IntouchError> {
        let rows: Vec<(Option<String>,)> =
            sqlx::query_as("SELECT number FROM phones WHERE contact_id = ? ORDER BY id")
                .bind(contact_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| IntouchError::Source(format!("read numbers failed: {e}")))?;

        Ok(rows.into_iter().map(|(number,)| number).collect())
    }
}

#[async_trait]
impl MessageHistory for Store {
    async fn sent_messages(&self) -> Result<Vec<SentMessage>, IntouchError> {
        let rows: Vec<(Option<String>, Option<i64>)> = sqlx::query_as(
            "SELECT address, sent_at_ms FROM sent_messages ORDER BY sent_at_ms ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| IntouchError::Source(format!("read sent messages failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(address, timestamp_millis)| SentMessage {
                address,
                timestamp_millis,
            })
            .collect())
    }
}
