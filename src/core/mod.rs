pub mod channel;
pub mod classifier;
pub mod consumer;
pub mod engine;
pub mod ingestion;
pub mod queries;
pub mod resolver;
pub mod route;
pub mod shape;
pub mod store;

pub use crate::domain::model::{AttributionRecord, Item, Listing, ListingRef, Snapshot, Venue};
pub use crate::domain::ports::{GraphqlRequest, GraphqlTransport, PageStateSource};
pub use crate::utils::error::Result;
