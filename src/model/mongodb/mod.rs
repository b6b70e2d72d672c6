mod bson;
mod collection;
mod counter;
mod errors;

pub use bson::u32_id_filter;
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{ensure_proposal_id_counter_exists, Counter, PROPOSAL_ID_COUNTER_ID};
pub use errors::{is_duplicate_key_error, DUPLICATE_KEY};

#[cfg(test)]
pub(crate) use errors::examples::duplicate_key_error;
