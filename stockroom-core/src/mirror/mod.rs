pub mod checker;
pub mod materializer;
pub mod service;
pub mod settings;

pub use checker::ExistenceChecker;
pub use materializer::Materializer;
pub use service::MirrorService;
pub use settings::{FetchSettings, MirrorSettings, RetryPolicy};
