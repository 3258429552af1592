//! Interactive review of parsed deals before submission.

pub mod edit;
pub mod session;
pub mod store;

pub use edit::{apply_edit, EditField};
pub use session::{
    DealStatus, EditState, ReviewAction, ReviewOutcome, ReviewSession, ReviewSummary,
};
pub use store::{SessionStore, UserId};
