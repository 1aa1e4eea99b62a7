pub mod listing_producer;

pub use listing_producer::{ListingProducer, RunSummary};
