pub use vote_pipeline_core::{contract, envelope, keys};
