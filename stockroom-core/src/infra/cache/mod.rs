pub mod local_store;
pub mod registry;

pub use local_store::{LocalStore, StoreResult, StoredFile, content_digest};
pub use registry::{
    Admission, CacheRegistry, FlightLease, FlightOutcome, FlightWaiter,
};
