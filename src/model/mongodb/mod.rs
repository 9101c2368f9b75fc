mod bson;
mod collection;
mod counter;
mod errors;

pub use bson::{contains_filter, id_array, u32_id_filter, Id};
pub use collection::{ensure_indexes_exist, Coll, MongoCollection};
pub use counter::{ensure_election_id_counter_exists, Counter, ELECTION_ID_COUNTER_ID};
pub use errors::{is_duplicate_key_error, is_write_conflict_error};
