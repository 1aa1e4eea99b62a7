pub mod aggregator;
pub mod config;
pub mod dom;
pub mod driver;
pub mod extractor;
pub mod immoweb;
pub mod logger;
pub mod models;
pub mod pagination;
pub mod producer;

pub use aggregator::{aggregate, ListingTable};
pub use extractor::CardExtractor;
pub use models::listing::{Listing, OutputFormat};
pub use pagination::PaginationWalker;
pub use producer::{ListingProducer, RunSummary};
