//! Single-field edits typed in by the reviewer.

use std::fmt;

use crate::deal::normalize::{
    clean_fraction, clean_geo, clean_language, clean_source, parse_finite, split_list,
};
use crate::deal::{Deal, PricingModel};
use crate::error::EditError;

/// A deal field the reviewer can change by typing a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditField {
    Region,
    Partner,
    Geo,
    Language,
    Source,
    PricingModel,
    Cpa,
    Crg,
    Cpl,
    Funnels,
    Cr,
    DeductionLimit,
}

impl EditField {
    /// Order of the fields in the edit menu.
    pub const MENU: [EditField; 12] = [
        EditField::Partner,
        EditField::Geo,
        EditField::Cpa,
        EditField::Crg,
        EditField::Cpl,
        EditField::Cr,
        EditField::Source,
        EditField::Funnels,
        EditField::Language,
        EditField::PricingModel,
        EditField::DeductionLimit,
        EditField::Region,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Region => "region",
            Self::Partner => "partner",
            Self::Geo => "geo",
            Self::Language => "language",
            Self::Source => "source",
            Self::PricingModel => "pricing_model",
            Self::Cpa => "cpa",
            Self::Crg => "crg",
            Self::Cpl => "cpl",
            Self::Funnels => "funnels",
            Self::Cr => "cr",
            Self::DeductionLimit => "deduction_limit",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::MENU.iter().copied().find(|field| field.as_str() == raw)
    }

    /// Button label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Region => "Region",
            Self::Partner => "Partner",
            Self::Geo => "GEO",
            Self::Language => "Language",
            Self::Source => "Source",
            Self::PricingModel => "Pricing Model",
            Self::Cpa => "CPA",
            Self::Crg => "CRG",
            Self::Cpl => "CPL",
            Self::Funnels => "Funnels",
            Self::Cr => "CR",
            Self::DeductionLimit => "Deduction Limit",
        }
    }
}

impl fmt::Display for EditField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert `input` for `field` and store it on `deal`.
///
/// On error the deal is left untouched.
pub fn apply_edit(deal: &mut Deal, field: EditField, input: &str) -> Result<(), EditError> {
    let input = input.trim();
    let invalid = |reason: &str| EditError::InvalidValue {
        field: field.as_str(),
        reason: reason.to_string(),
    };

    match field {
        EditField::Region | EditField::Partner => {
            if input.is_empty() {
                return Err(invalid("must not be empty"));
            }
            let target = match field {
                EditField::Region => &mut deal.region,
                _ => &mut deal.partner,
            };
            *target = input.to_string();
        }
        EditField::Geo => {
            let geo = clean_geo(input);
            if geo.is_empty() {
                return Err(invalid("must contain a country code"));
            }
            deal.geo = geo;
        }
        EditField::Language => deal.language = clean_language(Some(input)),
        EditField::Source => {
            let source = clean_source(input);
            if source.is_empty() {
                return Err(invalid("must not be empty"));
            }
            deal.source = source;
        }
        EditField::PricingModel => {
            deal.pricing_model = Some(match input.to_uppercase().as_str() {
                "CPA/CRG" => PricingModel::CpaCrg,
                "CPA" => PricingModel::Cpa,
                "CPL" => PricingModel::Cpl,
                _ => return Err(invalid("Must be one of: CPA/CRG, CPA, CPL")),
            });
        }
        EditField::Cpa | EditField::Cpl => {
            let value = parse_finite(input).ok_or_else(|| invalid("must be a number"))?;
            if field == EditField::Cpa {
                deal.cpa = Some(value);
            } else {
                deal.cpl = Some(value);
            }
        }
        EditField::Crg | EditField::Cr => {
            let value = clean_fraction(input).ok_or_else(|| invalid("must contain a number"))?;
            if field == EditField::Crg {
                deal.crg = Some(value);
            } else {
                deal.cr = Some(value);
            }
        }
        EditField::DeductionLimit => {
            let value = parse_finite(input.replace('%', "").trim())
                .ok_or_else(|| invalid("must be a number"))?;
            deal.deduction_limit = Some(value / 100.0);
        }
        EditField::Funnels => {
            let funnels = split_list(input);
            if funnels.is_empty() {
                return Err(invalid("must list at least one funnel"));
            }
            deal.funnels = funnels;
        }
    }

    Ok(())
}
