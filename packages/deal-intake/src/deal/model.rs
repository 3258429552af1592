//! The canonical deal record shared by every ingestion path.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder meaning "intentionally absent".
pub const ABSENT: &str = "&";

/// Which combination of price fields is authoritative for a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    CpaCrg,
    Cpa,
    Cpl,
}

impl PricingModel {
    pub const ALL: [PricingModel; 3] = [PricingModel::CpaCrg, PricingModel::Cpa, PricingModel::Cpl];

    /// Parse either the wire name (`cpa_crg`) or the display name (`CPA/CRG`),
    /// ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "cpa_crg" | "cpa/crg" => Some(Self::CpaCrg),
            "cpa" => Some(Self::Cpa),
            "cpl" => Some(Self::Cpl),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CpaCrg => "cpa_crg",
            Self::Cpa => "cpa",
            Self::Cpl => "cpl",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::CpaCrg => "CPA/CRG",
            Self::Cpa => "CPA",
            Self::Cpl => "CPL",
        }
    }
}

impl fmt::Display for PricingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One advertiser offer.
///
/// `crg`, `cr` and `deduction_limit` are fractions in `[0, 1]`. A price of
/// zero is treated the same as an absent price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub region: String,
    pub partner: String,
    pub geo: String,
    pub language: String,
    pub source: String,
    pub pricing_model: Option<PricingModel>,
    pub cpa: Option<f64>,
    pub crg: Option<f64>,
    pub cpl: Option<f64>,
    pub funnels: Vec<String>,
    pub cr: Option<f64>,
    pub deduction_limit: Option<f64>,
}

impl Deal {
    /// Record substituted for a deal block the oracle could not structure.
    pub fn placeholder() -> Self {
        Self {
            region: "TIER3".to_string(),
            partner: ABSENT.to_string(),
            geo: ABSENT.to_string(),
            language: "Native".to_string(),
            source: ABSENT.to_string(),
            pricing_model: Some(PricingModel::Cpa),
            ..Default::default()
        }
    }

    /// Required fields that are missing, in detection order.
    ///
    /// Base fields come first (region, partner, geo, language, source,
    /// funnels), followed by whatever the pricing model demands.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        for (name, value) in [
            ("region", &self.region),
            ("partner", &self.partner),
            ("geo", &self.geo),
            ("language", &self.language),
        ] {
            if value.trim().is_empty() {
                missing.push(name);
            }
        }

        let source = self.source.trim();
        if source.is_empty() || source == ABSENT {
            missing.push("source");
        }

        if !self.has_funnels() {
            missing.push("funnels");
        }

        match self.pricing_model {
            None => missing.push("pricing_model"),
            Some(PricingModel::CpaCrg) => {
                if !is_set(self.cpa) {
                    missing.push("cpa");
                }
                if !is_set(self.crg) {
                    missing.push("crg");
                }
            }
            Some(PricingModel::Cpa) => {
                if !is_set(self.cpa) {
                    missing.push("cpa");
                }
            }
            Some(PricingModel::Cpl) => {
                if !is_set(self.cpl) {
                    missing.push("cpl");
                }
            }
        }

        missing
    }

    pub fn is_valid(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// True when any buying price (cpa, crg, cpl) is present.
    pub fn has_buying_price(&self) -> bool {
        is_set(self.cpa) || is_set(self.crg) || is_set(self.cpl)
    }

    fn has_funnels(&self) -> bool {
        !self.funnels.is_empty() && !(self.funnels.len() == 1 && self.funnels[0] == ABSENT)
    }
}

/// A price counts only when it is a non-zero finite number.
pub(crate) fn is_set(value: Option<f64>) -> bool {
    matches!(value, Some(v) if v != 0.0 && v.is_finite())
}

/// A deal under review together with the text it was read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub deal: Deal,
    pub raw_text: String,
    /// Why the deal is a placeholder, when it is one.
    #[serde(default)]
    pub note: Option<String>,
}

impl Candidate {
    pub fn new(deal: Deal, raw_text: impl Into<String>) -> Self {
        Self {
            deal,
            raw_text: raw_text.into(),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}
