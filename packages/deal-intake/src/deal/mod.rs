pub mod delimited;
pub mod model;
pub mod normalize;

pub use delimited::{parse_batch, parse_line, BatchParse, LineFailure};
pub use model::{Candidate, Deal, PricingModel, ABSENT};
