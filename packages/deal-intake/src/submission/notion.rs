//! [`DealStore`] backed by two Notion databases: offers and advertisers.

use async_trait::async_trait;
use notion_client::{property, CreatePage, DatabaseQuery, NotionClient};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::record::SubmissionRecord;
use super::store::DealStore;
use crate::error::{StoreError, StoreResult};

/// Property names of the offers database.
pub mod props {
    pub const TITLE: &str = "GEO-Funnel Code";
    // The trailing backtick is part of the property name in the workspace.
    pub const STATUS: &str = "Active Status`";
    pub const LANGUAGE: &str = "Language";
    pub const SOURCES: &str = "Sources";
    pub const FUNNELS: &str = "Funnels";
    pub const CPA_BUYING: &str = "CPA | Buying";
    pub const CRG_BUYING: &str = "CRG | Buying";
    pub const CPL_BUYING: &str = "CPL | Buying";
    pub const CPA_SELLING: &str = "CPA | Network | Selling";
    pub const CRG_SELLING: &str = "CRG | Network | Selling";
    pub const CPL_SELLING: &str = "CPL | Network | Selling";
    pub const DEDUCTION: &str = "Deduction %";
    pub const ADVERTISER: &str = "⚡ ALL ADVERTISERS | Kitchen";

    /// Title property of the advertisers database.
    pub const COMPANY_TITLE: &str = "title";
}

pub struct NotionDealStore {
    client: NotionClient,
    offers_database_id: String,
    advertisers_database_id: String,
}

impl NotionDealStore {
    pub fn new(
        client: NotionClient,
        offers_database_id: impl Into<String>,
        advertisers_database_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            offers_database_id: offers_database_id.into(),
            advertisers_database_id: advertisers_database_id.into(),
        }
    }
}

#[async_trait]
impl DealStore for NotionDealStore {
    async fn find_or_create_company(&self, name: &str) -> StoreResult<String> {
        let company_error = |err: notion_client::NotionError| StoreError::Company {
            name: name.to_string(),
            reason: err.to_string(),
        };

        let found = self
            .client
            .query_database(
                &self.advertisers_database_id,
                &DatabaseQuery::title_equals(name).page_size(1),
            )
            .await
            .map_err(company_error)?;

        if let Some(page) = found.results.into_iter().next() {
            debug!(company = name, company_id = %page.id, "Found existing company");
            return Ok(page.id);
        }

        let mut properties = Map::new();
        properties.insert(props::COMPANY_TITLE.to_string(), property::title(name));
        let created = self
            .client
            .create_page(&CreatePage::in_database(
                &self.advertisers_database_id,
                properties,
            ))
            .await
            .map_err(company_error)?;

        info!(company = name, company_id = %created.id, "Created company");
        Ok(created.id)
    }

    async fn create_deal_record(&self, record: &SubmissionRecord) -> StoreResult<String> {
        let page = CreatePage::in_database(&self.offers_database_id, offer_properties(record));
        let created = self
            .client
            .create_page(&page)
            .await
            .map_err(|err| StoreError::Record(err.to_string()))?;

        info!(title = %record.title, page_id = %created.id, "Created offer");
        Ok(created.id)
    }
}

/// Offer page properties. Absent numbers are left out.
pub fn offer_properties(record: &SubmissionRecord) -> Map<String, Value> {
    let mut properties = Map::new();
    let mut put = |name: &str, value: Value| {
        properties.insert(name.to_string(), value);
    };

    put(props::TITLE, property::title(&record.title));
    put(props::STATUS, property::select(&record.status));
    put(props::LANGUAGE, property::multi_select(&record.languages));
    put(props::SOURCES, property::multi_select(&record.sources));
    put(props::FUNNELS, property::multi_select(&record.funnels));

    for (name, value) in [
        (props::CPA_BUYING, record.cpa_buying),
        (props::CRG_BUYING, record.crg_buying),
        (props::CPL_BUYING, record.cpl_buying),
        (props::CPA_SELLING, record.cpa_selling),
        (props::CRG_SELLING, record.crg_selling),
        (props::CPL_SELLING, record.cpl_selling),
        (props::DEDUCTION, record.deduction),
    ] {
        if let Some(value) = value {
            put(name, property::number(value));
        }
    }

    put(
        props::ADVERTISER,
        property::relation(&[record.company_id.as_str()]),
    );
    properties
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deal::{Deal, PricingModel};
    use crate::submission::SellingMarkup;
    use serde_json::json;

    #[test]
    fn test_offer_properties_shape() {
        let deal = Deal {
            region: "TIER1".into(),
            partner: "FTD".into(),
            geo: "UK".into(),
            language: "English".into(),
            source: "Facebook|Google".into(),
            pricing_model: Some(PricingModel::Cpa),
            cpa: Some(1200.0),
            funnels: vec!["QuantumAI".into()],
            ..Default::default()
        };
        let record = SubmissionRecord::from_deal(&deal, "page-7", &SellingMarkup::default());
        let properties = offer_properties(&record);

        assert_eq!(
            properties[props::TITLE],
            json!({"title": [{"text": {"content": "UK English-FTD-Facebook|Google"}}]})
        );
        assert_eq!(properties[props::STATUS], json!({"select": {"name": "Active"}}));
        assert_eq!(
            properties[props::SOURCES],
            json!({"multi_select": [{"name": "Facebook"}, {"name": "Google"}]})
        );
        assert_eq!(properties[props::CPA_BUYING], json!({"number": 1200.0}));
        assert_eq!(properties[props::CPA_SELLING], json!({"number": 1300.0}));
        assert_eq!(
            properties[props::ADVERTISER],
            json!({"relation": [{"id": "page-7"}]})
        );

        assert!(!properties.contains_key(props::CRG_BUYING));
        assert!(!properties.contains_key(props::CPL_SELLING));
        assert!(!properties.contains_key(props::DEDUCTION));
    }
}
