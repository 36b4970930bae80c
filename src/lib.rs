pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod store;

pub use checkpoint::CheckpointReader;
pub use config::Config;
pub use store::CheckpointDb;
