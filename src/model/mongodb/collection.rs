use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    admin::{Admin, AdminCore},
    candidate::{Candidate, CandidateCore},
    election::Election,
    election_candidate::{ElectionCandidate, ElectionCandidateCore},
    group::{Group, GroupCore},
    vote::{Vote, VoteCore},
    voted_user::{VotedUser, VotedUserCore},
    voter::{Voter, VoterCore},
};

use super::counter::Counter;

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

/// Register both the ID-less and full variants of an entity under one collection.
macro_rules! collection {
    ($name:expr => $($ty:ty),+) => {
        $(
            impl MongoCollection for $ty {
                const NAME: &'static str = $name;
            }
        )+
    };
}

collection!("admins" => Admin, AdminCore);
collection!("voters" => Voter, VoterCore);
collection!("groups" => Group, GroupCore);
collection!("candidates" => Candidate, CandidateCore);
collection!("elections" => Election);
collection!("election_candidates" => ElectionCandidate, ElectionCandidateCore);
collection!("voted_users" => VotedUser, VotedUserCore);
collection!("votes" => Vote, VoteCore);
collection!("counters" => Counter);

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Voter collection.
    let voter_index = IndexModel::builder()
        .keys(doc! {"email": 1})
        .options(unique.clone())
        .build();
    Coll::<Voter>::from_db(db)
        .create_index(voter_index, None)
        .await?;

    // Admin collection.
    let admin_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<Admin>::from_db(db)
        .create_index(admin_index, None)
        .await?;

    // Group collection.
    let group_index = IndexModel::builder()
        .keys(doc! {"name": 1})
        .options(unique.clone())
        .build();
    Coll::<Group>::from_db(db)
        .create_index(group_index, None)
        .await?;

    // Election-candidate links.
    let link_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "candidate_id": 1})
        .options(unique.clone())
        .build();
    Coll::<ElectionCandidate>::from_db(db)
        .create_index(link_index, None)
        .await?;

    // One voted marker per voter per election.
    let voted_index = IndexModel::builder()
        .keys(doc! {"voter_id": 1, "election_id": 1})
        .options(unique)
        .build();
    Coll::<VotedUser>::from_db(db)
        .create_index(voted_index, None)
        .await?;

    // Votes are only ever read per election.
    let vote_index = IndexModel::builder()
        .keys(doc! {"election_id": 1})
        .build();
    Coll::<Vote>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    Ok(())
}
