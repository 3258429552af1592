//! Inline button payloads, encoded as `action:index`.

use crate::deal::PricingModel;
use crate::review::EditField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Approve(usize),
    Reject(usize),
    Next(usize),
    Prev(usize),
    /// Open the edit menu for a deal.
    Edit(usize),
    Field { field: EditField, index: usize },
    ModelMenu(usize),
    Model { model: PricingModel, index: usize },
    /// Leave a menu or a pending edit and show the deal again.
    Back(usize),
    Submit,
    Reprocess,
    Discard,
}

impl Callback {
    pub fn encode(&self) -> String {
        match self {
            Self::Approve(i) => format!("approve:{i}"),
            Self::Reject(i) => format!("reject:{i}"),
            Self::Next(i) => format!("next:{i}"),
            Self::Prev(i) => format!("prev:{i}"),
            Self::Edit(i) => format!("edit:{i}"),
            Self::Field { field, index } => format!("field:{field}:{index}"),
            Self::ModelMenu(i) => format!("modelmenu:{i}"),
            Self::Model { model, index } => format!("model:{}:{index}", model.display_name()),
            Self::Back(i) => format!("back:{i}"),
            Self::Submit => "submit".to_string(),
            Self::Reprocess => "reprocess".to_string(),
            Self::Discard => "discard".to_string(),
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        fn index(raw: &str) -> Option<usize> {
            raw.parse().ok()
        }

        let parts: Vec<&str> = data.split(':').collect();

        let callback = match parts.as_slice() {
            ["approve", i] => Self::Approve(index(i)?),
            ["reject", i] => Self::Reject(index(i)?),
            ["next", i] => Self::Next(index(i)?),
            ["prev", i] => Self::Prev(index(i)?),
            ["edit", i] => Self::Edit(index(i)?),
            ["field", field, i] => Self::Field {
                field: EditField::parse(field)?,
                index: index(i)?,
            },
            ["modelmenu", i] => Self::ModelMenu(index(i)?),
            ["model", model, i] => Self::Model {
                model: PricingModel::parse(model)?,
                index: index(i)?,
            },
            ["back", i] => Self::Back(index(i)?),
            ["submit"] => Self::Submit,
            ["reprocess"] => Self::Reprocess,
            ["discard"] => Self::Discard,
            _ => return None,
        };
        Some(callback)
    }

    /// The deal this button belongs to.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Approve(i)
            | Self::Reject(i)
            | Self::Next(i)
            | Self::Prev(i)
            | Self::Edit(i)
            | Self::ModelMenu(i)
            | Self::Back(i)
            | Self::Field { index: i, .. }
            | Self::Model { index: i, .. } => Some(*i),
            Self::Submit | Self::Reprocess | Self::Discard => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        assert_eq!(Callback::Approve(3).encode(), "approve:3");
        assert_eq!(
            Callback::Field {
                field: EditField::Cpa,
                index: 0
            }
            .encode(),
            "field:cpa:0"
        );
        assert_eq!(
            Callback::Model {
                model: PricingModel::CpaCrg,
                index: 1
            }
            .encode(),
            "model:CPA/CRG:1"
        );
        assert_eq!(Callback::Submit.encode(), "submit");
    }

    #[test]
    fn test_parse_known_payloads() {
        assert_eq!(Callback::parse("reject:12"), Some(Callback::Reject(12)));
        assert_eq!(
            Callback::parse("field:deduction_limit:2"),
            Some(Callback::Field {
                field: EditField::DeductionLimit,
                index: 2
            })
        );
        assert_eq!(
            Callback::parse("model:CPL:0"),
            Some(Callback::Model {
                model: PricingModel::Cpl,
                index: 0
            })
        );
        assert_eq!(Callback::parse("discard"), Some(Callback::Discard));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for data in ["", "approve", "approve:x", "approve:-1", "field:color:0", "model:flat:0", "submit:1"] {
            assert_eq!(Callback::parse(data), None, "data: {data}");
        }
    }

    #[test]
    fn test_index() {
        assert_eq!(Callback::Back(4).index(), Some(4));
        assert_eq!(Callback::Reprocess.index(), None);
    }
}
