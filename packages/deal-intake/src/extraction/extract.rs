//! Two-step oracle extraction of deals from free text.
//!
//! 1. Structure analysis splits the message into sections of deal blocks,
//!    each section carrying fields shared by its deals.
//! 2. Every block is parsed on its own with its section's shared fields as
//!    context. One bad block never affects its siblings.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use super::oracle::Oracle;
use super::progress::{ProgressEvent, ProgressSink};
use super::prompts::{
    format_parse_prompt, format_structure_prompt, PARSE_SYSTEM_PROMPT, STRUCTURE_SYSTEM_PROMPT,
};
use super::retry::{call_with_retry, RetryPolicy};
use crate::deal::model::is_set;
use crate::deal::normalize::{
    clean_geo, clean_language, clean_source, default_language, fraction_from_json,
    number_from_json, split_list, to_fraction,
};
use crate::deal::{Candidate, Deal, PricingModel};
use crate::error::ExtractError;

/// What became of one deal block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOutcome {
    Parsed(Candidate),
    /// The oracle answered with something unusable; the candidate holds the
    /// placeholder deal so the user can fix it by hand.
    Placeholder { candidate: Candidate, reason: String },
    /// The oracle call itself failed.
    Failed { detail: String },
}

impl BlockOutcome {
    /// The reviewable candidate, if the block produced one.
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Self::Parsed(candidate) | Self::Placeholder { candidate, .. } => Some(candidate),
            Self::Failed { .. } => None,
        }
    }

    pub fn into_candidate(self) -> Option<Candidate> {
        match self {
            Self::Parsed(candidate) | Self::Placeholder { candidate, .. } => Some(candidate),
            Self::Failed { .. } => None,
        }
    }
}

/// One group of deal blocks sharing context.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Section {
    pub shared_fields: Map<String, Value>,
    pub blocks: Vec<String>,
}

pub struct StructuredDealExtractor {
    oracle: Arc<dyn Oracle>,
    retry: RetryPolicy,
}

impl StructuredDealExtractor {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Extract every deal block in `text`, in order.
    ///
    /// Only a failed structure call is an error. Per-block problems are
    /// reported in the returned outcomes.
    #[instrument(skip(self, text, progress), fields(text_len = text.len()))]
    pub async fn extract(
        &self,
        text: &str,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Vec<BlockOutcome>, ExtractError> {
        let start = Instant::now();
        report(progress, ProgressEvent::Init).await;
        report(progress, ProgressEvent::StructureStart).await;

        let user = format_structure_prompt(text);
        let reply = match call_with_retry(&self.retry, || {
            self.oracle.complete_json(STRUCTURE_SYSTEM_PROMPT, &user)
        })
        .await
        {
            Ok(reply) => reply,
            Err(err) => {
                report(
                    progress,
                    ProgressEvent::Error {
                        message: err.to_string(),
                    },
                )
                .await;
                return Err(ExtractError::Structure(err));
            }
        };

        let sections = parse_structure(&reply);
        report(progress, ProgressEvent::StructureComplete).await;

        let total: usize = sections.iter().map(|s| s.blocks.len()).sum();
        info!(sections = sections.len(), total_deals = total, "Deal structure analyzed");

        let mut outcomes = Vec::with_capacity(total);
        for section in &sections {
            for block in &section.blocks {
                report(
                    progress,
                    ProgressEvent::Progress {
                        current: outcomes.len() + 1,
                        total,
                    },
                )
                .await;
                outcomes.push(self.parse_block(block, &section.shared_fields).await);
            }
        }

        report(
            progress,
            ProgressEvent::Complete {
                elapsed: start.elapsed(),
                total_deals: total,
            },
        )
        .await;

        Ok(outcomes)
    }

    async fn parse_block(&self, block: &str, shared: &Map<String, Value>) -> BlockOutcome {
        let user = format_parse_prompt(block, &Value::Object(shared.clone()));
        let reply = match call_with_retry(&self.retry, || {
            self.oracle.complete_json(PARSE_SYSTEM_PROMPT, &user)
        })
        .await
        {
            Ok(reply) => reply,
            Err(err) => {
                return BlockOutcome::Failed {
                    detail: err.to_string(),
                }
            }
        };

        match candidate_from_reply(&reply, block, shared) {
            Ok(candidate) => {
                debug!(partner = %candidate.deal.partner, geo = %candidate.deal.geo, "Deal block parsed");
                BlockOutcome::Parsed(candidate)
            }
            Err(reason) => {
                warn!(reason = %reason, "Unusable deal block reply, using placeholder");
                BlockOutcome::Placeholder {
                    candidate: Candidate::new(Deal::placeholder(), block).with_note(reason.clone()),
                    reason,
                }
            }
        }
    }
}

async fn report(progress: Option<&dyn ProgressSink>, event: ProgressEvent) {
    if let Some(sink) = progress {
        sink.report(event).await;
    }
}

/// Sections from a structure reply. Anything malformed yields one empty
/// section.
pub(crate) fn parse_structure(reply: &str) -> Vec<Section> {
    let sections = match serde_json::from_str::<Value>(reply) {
        Ok(Value::Object(mut root)) => match root.remove("sections") {
            Some(Value::Array(sections)) => sections,
            _ => {
                warn!("Structure reply has no sections array");
                return vec![Section::default()];
            }
        },
        Ok(_) => {
            warn!("Structure reply is not a JSON object");
            return vec![Section::default()];
        }
        Err(err) => {
            warn!(error = %err, "Structure reply is not valid JSON");
            return vec![Section::default()];
        }
    };

    sections
        .into_iter()
        .filter_map(|section| match section {
            Value::Object(mut section) => Some(Section {
                shared_fields: match section.remove("shared_fields") {
                    Some(Value::Object(fields)) => fields,
                    _ => Map::new(),
                },
                blocks: match section.remove("deal_blocks") {
                    Some(Value::Array(blocks)) => blocks.iter().filter_map(block_text).collect(),
                    _ => Vec::new(),
                },
            }),
            _ => None,
        })
        .collect()
}

fn block_text(block: &Value) -> Option<String> {
    let text = match block {
        Value::Object(block) => block.get("text")?.as_str()?,
        Value::String(text) => text.as_str(),
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn candidate_from_reply(
    reply: &str,
    block: &str,
    shared: &Map<String, Value>,
) -> Result<Candidate, String> {
    let root: Value = serde_json::from_str(reply).map_err(|err| err.to_string())?;
    let data = root
        .get("parsed_data")
        .and_then(Value::as_object)
        .ok_or_else(|| "reply has no parsed_data object".to_string())?;

    let raw_text = root
        .get("raw_text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or(block);

    Ok(Candidate::new(deal_from_payload(data, shared, block), raw_text))
}

/// Map an oracle payload onto a [`Deal`].
///
/// Fields the payload leaves out fall back to the section's shared fields.
pub(crate) fn deal_from_payload(
    data: &Map<String, Value>,
    shared: &Map<String, Value>,
    block: &str,
) -> Deal {
    let field = |key: &str| lookup(data, shared, key);

    let geo = clean_geo(&field("geo").and_then(as_text).unwrap_or_default());
    let language = match field("language").and_then(as_text) {
        Some(language) => clean_language(Some(&language)),
        None => default_language(&geo),
    };

    let cpa = field("cpa").and_then(number_from_json);
    let crg = field("crg").and_then(fraction_from_json);
    let cpl = field("cpl").and_then(number_from_json);

    let pricing_model = if is_set(crg) {
        Some(PricingModel::CpaCrg)
    } else if is_set(cpa) {
        Some(PricingModel::Cpa)
    } else if is_set(cpl) {
        Some(PricingModel::Cpl)
    } else {
        field("pricing_model")
            .and_then(Value::as_str)
            .and_then(PricingModel::parse)
    };

    let funnels = match field("funnels") {
        Some(Value::Array(items)) => items.iter().filter_map(as_text).collect(),
        Some(Value::String(list)) => split_list(list),
        _ => funnels_from_text(block),
    };

    Deal {
        region: field("region").and_then(as_text).unwrap_or_default(),
        partner: field("partner").and_then(as_text).unwrap_or_default(),
        geo,
        language,
        source: clean_source(&field("source").and_then(as_text).unwrap_or_default()),
        pricing_model,
        cpa,
        crg,
        cpl,
        funnels,
        cr: field("cr").and_then(fraction_from_json),
        deduction_limit: field("deduction_limit")
            .and_then(number_from_json)
            .map(to_fraction),
    }
}

fn lookup<'a>(
    data: &'a Map<String, Value>,
    shared: &'a Map<String, Value>,
    key: &str,
) -> Option<&'a Value> {
    data.get(key)
        .filter(|value| !is_blank(value))
        .or_else(|| shared.get(key).filter(|value| !is_blank(value)))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn as_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

const FUNNEL_MARKERS: [&str; 3] = ["funnels:", "landing page:", "funnel:"];

/// Funnel names listed after `Funnels:` style labels in the block text.
fn funnels_from_text(block: &str) -> Vec<String> {
    let mut funnels = Vec::new();
    for line in block.lines() {
        let lower = line.to_ascii_lowercase();
        let Some((marker, at)) = FUNNEL_MARKERS
            .iter()
            .find_map(|marker| lower.find(marker).map(|at| (marker, at)))
        else {
            continue;
        };
        funnels.extend(
            line[at + marker.len()..]
                .split(|c: char| matches!(c, ',' | '|' | '/'))
                .map(str::trim)
                .filter(|funnel| !funnel.is_empty())
                .map(str::to_string),
        );
    }
    funnels
}
