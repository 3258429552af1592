//! Oracle-backed extraction of deals written as free text.

pub mod detect;
pub mod extract;
pub mod oracle;
pub mod progress;
pub mod prompts;
pub mod retry;

pub use detect::looks_like_free_text_deal;
pub use extract::{BlockOutcome, StructuredDealExtractor};
pub use oracle::{OpenAIOracle, Oracle};
pub use progress::{ProgressEvent, ProgressSink};
pub use retry::{call_with_retry, RetryPolicy};
