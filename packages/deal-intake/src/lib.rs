// Deal Intake - normalization, review and submission of affiliate deals
//
// Deals arrive as chat messages, either hyphen-delimited lines or free text
// structured by an LLM oracle. Each reviewer walks the parsed batch, fixes
// and approves deals, and the approved ones are written to Notion.

pub mod bot;
pub mod config;
pub mod deal;
pub mod error;
pub mod extraction;
pub mod review;
pub mod submission;
pub mod testing;

pub use config::Config;
pub use deal::{parse_batch, parse_line, Candidate, Deal, PricingModel};
pub use error::{
    DealParseError, EditError, ExtractError, OracleError, ReviewError, StoreError, TransportError,
};
