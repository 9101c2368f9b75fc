use log::debug;
use mongodb::{
    bson::doc,
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions},
    ClientSession,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::mongodb::Coll;

/// ID of the counter used to allocate election IDs.
pub const ELECTION_ID_COUNTER_ID: &str = "election_id";

/// A counter object used to implement auto-increment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counter {
    #[serde(rename = "_id")]
    pub id: String,
    pub next: u32,
}

impl Counter {
    /// Atomically retrieve the next value of the counter with the given ID,
    /// as part of the given session's transaction.
    pub async fn next(
        counters: &Coll<Counter>,
        id: &str,
        session: &mut ClientSession,
    ) -> Result<u32> {
        let update = doc! {
            "$inc": { "next": 1 }
        };
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::Before)
            .build();
        let counter = counters
            .find_one_and_update_with_session(doc! { "_id": id }, update, options, session)
            .await?
            .ok_or_else(|| Error::not_found(format!("Counter '{id}'")))?;
        Ok(counter.next)
    }
}

/// Ensure the election ID counter exists, starting from 1.
///
/// This operation is idempotent.
pub async fn ensure_election_id_counter_exists(counters: &Coll<Counter>) -> Result<(), DbError> {
    debug!("Ensuring the election ID counter exists");
    let update = doc! {
        "$setOnInsert": { "next": 1_u32 }
    };
    let options = UpdateOptions::builder().upsert(true).build();
    counters
        .update_one(doc! { "_id": ELECTION_ID_COUNTER_ID }, update, options)
        .await?;
    Ok(())
}
