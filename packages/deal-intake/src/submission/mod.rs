//! Mapping approved deals to store records and submitting them.

pub mod notion;
pub mod rate_limited;
pub mod record;
pub mod store;

pub use notion::NotionDealStore;
pub use rate_limited::{DealStoreExt, RateLimitedStore};
pub use record::{title_for, SellingMarkup, SubmissionRecord};
pub use store::{submit_deals, DealStore, DealSubmission, SubmissionReport};
