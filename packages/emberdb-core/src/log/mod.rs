pub mod record;
pub mod segment;

pub use segment::{Log, LogIterator};
