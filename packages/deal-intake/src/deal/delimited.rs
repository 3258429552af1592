//! Hyphen-delimited deal lines.
//!
//! ```text
//! region-partner-geo-language-source-pricing_model-cpa-crg-cpl-funnels-cr-deduction_limit
//! TIER1-FTD Company-UK|IE|NL-Native-Facebook|Google-cpa_crg-1200-0.10-&-QuantumAI-&-0.05
//! ```
//!
//! `&` marks an optional field as absent.

use std::panic::{self, AssertUnwindSafe};

use super::model::{Candidate, Deal, PricingModel, ABSENT};
use super::normalize::{clean_fraction, parse_finite, to_fraction};
use crate::error::{DealParseError, ParseResult};

pub const FIELD_COUNT: usize = 12;

/// Parse one delimited line into a valid deal.
pub fn parse_line(line: &str) -> ParseResult<Deal> {
    match panic::catch_unwind(AssertUnwindSafe(|| parse_fields(line))) {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(input = %line, "Deal line parser panicked");
            Err(DealParseError::Unexpected {
                input: line.to_string(),
            })
        }
    }
}

fn parse_fields(line: &str) -> ParseResult<Deal> {
    let line = line.trim();
    if line.is_empty() {
        return Err(DealParseError::Empty);
    }

    let fields: Vec<&str> = line.split('-').map(str::trim).collect();
    if fields.len() != FIELD_COUNT {
        return Err(DealParseError::FieldCount {
            expected: FIELD_COUNT,
            actual: fields.len(),
        });
    }

    let deal = Deal {
        region: fields[0].to_string(),
        partner: fields[1].to_string(),
        geo: fields[2].to_string(),
        language: fields[3].to_string(),
        source: fields[4].to_string(),
        pricing_model: PricingModel::parse(fields[5]),
        cpa: optional_number("cpa", fields[6])?,
        crg: optional_number("crg", fields[7])?.map(to_fraction),
        cpl: optional_number("cpl", fields[8])?,
        funnels: funnel_list(fields[9]),
        cr: lenient_fraction(fields[10]),
        deduction_limit: optional_number("deduction_limit", fields[11])?.map(to_fraction),
    };

    let missing = deal.missing_fields();
    if !missing.is_empty() {
        return Err(DealParseError::MissingFields { missing });
    }

    Ok(deal)
}

fn optional_number(field: &'static str, raw: &str) -> ParseResult<Option<f64>> {
    if raw == ABSENT {
        return Ok(None);
    }
    parse_finite(raw)
        .map(Some)
        .ok_or_else(|| DealParseError::InvalidNumber {
            field,
            raw: raw.to_string(),
        })
}

/// `cr` is informational: text without a number reads as absent.
fn lenient_fraction(raw: &str) -> Option<f64> {
    if raw == ABSENT {
        return None;
    }
    clean_fraction(raw)
}

fn funnel_list(raw: &str) -> Vec<String> {
    if raw == ABSENT {
        return Vec::new();
    }
    raw.split('|')
        .map(str::trim)
        .filter(|funnel| !funnel.is_empty())
        .map(str::to_string)
        .collect()
}

/// A rejected line, numbered from 1 among the non-blank lines.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFailure {
    pub position: usize,
    pub input: String,
    pub error: DealParseError,
}

/// Outcome of parsing a multi-line message, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchParse {
    pub candidates: Vec<Candidate>,
    pub failures: Vec<LineFailure>,
}

impl BatchParse {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty() && self.failures.is_empty()
    }
}

/// Parse every non-blank line of `text` independently.
pub fn parse_batch(text: &str) -> BatchParse {
    let mut batch = BatchParse::default();

    for (index, line) in text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
    {
        match parse_line(line) {
            Ok(deal) => batch.candidates.push(Candidate::new(deal, line)),
            Err(error) => {
                tracing::debug!(position = index + 1, error = %error, "Rejected deal line");
                batch.failures.push(LineFailure {
                    position: index + 1,
                    input: line.to_string(),
                    error,
                });
            }
        }
    }

    batch
}
