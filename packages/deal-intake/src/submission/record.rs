//! Approved deal mapped onto the offers database shape.

use serde::{Deserialize, Serialize};

use crate::deal::model::is_set;
use crate::deal::normalize::round4;
use crate::deal::Deal;

pub const ACTIVE_STATUS: &str = "Active";

/// What the network adds on top of buying prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SellingMarkup {
    pub cpa: f64,
    pub crg: f64,
    pub cpl: f64,
}

impl Default for SellingMarkup {
    fn default() -> Self {
        Self {
            cpa: 100.0,
            crg: 0.01,
            cpl: 5.0,
        }
    }
}

/// One offer ready to be written to the store.
///
/// Absent prices stay `None` and are left out of the stored record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRecord {
    pub title: String,
    pub status: String,
    pub company_id: String,
    pub languages: Vec<String>,
    pub sources: Vec<String>,
    pub funnels: Vec<String>,
    pub cpa_buying: Option<f64>,
    pub crg_buying: Option<f64>,
    pub cpl_buying: Option<f64>,
    pub cpa_selling: Option<f64>,
    pub crg_selling: Option<f64>,
    pub cpl_selling: Option<f64>,
    pub deduction: Option<f64>,
}

impl SubmissionRecord {
    pub fn from_deal(deal: &Deal, company_id: impl Into<String>, markup: &SellingMarkup) -> Self {
        let cpa = set(deal.cpa);
        let crg = set(deal.crg);
        let cpl = set(deal.cpl);

        Self {
            title: title_for(deal),
            status: ACTIVE_STATUS.to_string(),
            company_id: company_id.into(),
            languages: split_non_empty(&deal.language, ','),
            sources: split_non_empty(&deal.source, '|'),
            funnels: deal
                .funnels
                .iter()
                .map(|f| f.trim())
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect(),
            cpa_buying: cpa,
            crg_buying: crg,
            cpl_buying: cpl,
            cpa_selling: cpa.map(|v| v + markup.cpa),
            crg_selling: crg.map(|v| round4(v + markup.crg)),
            cpl_selling: cpl.map(|v| v + markup.cpl),
            deduction: set(deal.deduction_limit),
        }
    }
}

/// `"<geo> <language>-<partner>-<source>"`
pub fn title_for(deal: &Deal) -> String {
    format!(
        "{} {}-{}-{}",
        deal.geo, deal.language, deal.partner, deal.source
    )
}

fn set(value: Option<f64>) -> Option<f64> {
    value.filter(|v| is_set(Some(*v)))
}

fn split_non_empty(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::PricingModel;

    fn deal() -> Deal {
        Deal {
            region: "TIER1".into(),
            partner: "FTD Company".into(),
            geo: "UK".into(),
            language: "English,German".into(),
            source: "Facebook|Google".into(),
            pricing_model: Some(PricingModel::CpaCrg),
            cpa: Some(1200.0),
            crg: Some(0.1),
            cpl: Some(0.0),
            funnels: vec!["QuantumAI".into(), " ".into()],
            deduction_limit: Some(0.05),
            ..Default::default()
        }
    }

    #[test]
    fn test_selling_prices_use_markup() {
        let record = SubmissionRecord::from_deal(&deal(), "company-1", &SellingMarkup::default());

        assert_eq!(record.cpa_buying, Some(1200.0));
        assert_eq!(record.cpa_selling, Some(1300.0));
        assert_eq!(record.crg_selling, Some(0.11));
        assert_eq!(record.cpl_buying, None);
        assert_eq!(record.cpl_selling, None);
        assert_eq!(record.deduction, Some(0.05));
    }

    #[test]
    fn test_custom_markup() {
        let markup = SellingMarkup {
            cpa: 50.0,
            crg: 0.02,
            cpl: 1.0,
        };
        let record = SubmissionRecord::from_deal(&deal(), "c", &markup);
        assert_eq!(record.cpa_selling, Some(1250.0));
        assert_eq!(record.crg_selling, Some(0.12));
    }

    #[test]
    fn test_lists_and_title() {
        let record = SubmissionRecord::from_deal(&deal(), "c", &SellingMarkup::default());
        assert_eq!(record.title, "UK English,German-FTD Company-Facebook|Google");
        assert_eq!(record.status, "Active");
        assert_eq!(record.languages, vec!["English", "German"]);
        assert_eq!(record.sources, vec!["Facebook", "Google"]);
        assert_eq!(record.funnels, vec!["QuantumAI"]);
    }
}
