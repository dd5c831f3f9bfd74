mod object_id;
mod object_id_mapping;
mod store;

pub use object_id::{EncodedObjectId, DEFAULT_GRAPH_ID};
pub use object_id_mapping::MemObjectIdMapping;
pub use store::{MemoryStoreSnapshot, MemoryTripleStore};
