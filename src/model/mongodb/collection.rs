use std::ops::Deref;

use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{proposal::Proposal, user::User, vote::VoteCommitment};

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

impl MongoCollection for User {
    const NAME: &'static str = "users";
}

impl MongoCollection for Proposal {
    const NAME: &'static str = "proposals";
}

impl MongoCollection for VoteCommitment {
    const NAME: &'static str = "votes";
}

impl MongoCollection for Counter {
    const NAME: &'static str = "counters";
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // User collection.
    let user_index = IndexModel::builder()
        .keys(doc! {"username": 1})
        .options(unique.clone())
        .build();
    Coll::<User>::from_db(db)
        .create_index(user_index, None)
        .await?;

    // Proposal collection: listing is by author or by anchored address, newest first.
    let author_index = IndexModel::builder()
        .keys(doc! {"author_id": 1, "created_at": -1})
        .build();
    let pda_index = IndexModel::builder().keys(doc! {"pda": 1}).build();
    Coll::<Proposal>::from_db(db)
        .create_indexes([author_index, pda_index], None)
        .await?;

    // Vote collection: at most one commitment per user and proposal.
    let vote_index = IndexModel::builder()
        .keys(doc! {"proposal_id": 1, "user_id": 1})
        .options(unique)
        .build();
    Coll::<VoteCommitment>::from_db(db)
        .create_index(vote_index, None)
        .await?;

    Ok(())
}
