//! Per-user review of a parsed batch.
//!
//! A [`ReviewSession`] is a pure state machine: [`ReviewSession::apply`]
//! takes a reviewer action, updates state and says what to show next. It
//! performs no IO.

use chrono::{DateTime, Utc};

use super::edit::{apply_edit, EditField};
use crate::deal::{Candidate, Deal, PricingModel};
use crate::error::ReviewError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DealStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl DealStatus {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Pending => "⏳",
            Self::Approved => "✅",
            Self::Rejected => "❌",
        }
    }
}

/// Something the reviewer did.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewAction {
    Approve(usize),
    Reject(usize),
    Next,
    Prev,
    Select(usize),
    BeginEdit(EditField),
    EditInput(String),
    CancelEdit,
    SetPricingModel(PricingModel),
    Reprocess,
}

/// What the reviewer should see after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    ShowDeal(usize),
    AwaitInput { index: usize, field: EditField },
    ShowSummary(ReviewSummary),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditState {
    pub index: usize,
    pub field: EditField,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    candidates: Vec<Candidate>,
    statuses: Vec<DealStatus>,
    cursor: usize,
    editing: Option<EditState>,
    pub(crate) last_activity: DateTime<Utc>,
}

impl ReviewSession {
    pub fn new(candidates: Vec<Candidate>, now: DateTime<Utc>) -> Self {
        Self {
            statuses: vec![DealStatus::Pending; candidates.len()],
            candidates,
            cursor: 0,
            editing: None,
            last_activity: now,
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn candidate(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn status(&self, index: usize) -> DealStatus {
        self.statuses.get(index).copied().unwrap_or_default()
    }

    pub fn editing(&self) -> Option<EditState> {
        self.editing
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn summary(&self) -> ReviewSummary {
        let count = |wanted: DealStatus| self.statuses.iter().filter(|s| **s == wanted).count();
        ReviewSummary {
            approved: count(DealStatus::Approved),
            rejected: count(DealStatus::Rejected),
            pending: count(DealStatus::Pending),
        }
    }

    /// Submission needs at least one approved deal.
    pub fn can_submit(&self) -> bool {
        self.statuses.contains(&DealStatus::Approved)
    }

    /// Approved deals carrying at least one buying price.
    pub fn submittable(&self) -> Vec<Deal> {
        self.candidates
            .iter()
            .zip(&self.statuses)
            .filter(|(candidate, status)| {
                **status == DealStatus::Approved && candidate.deal.has_buying_price()
            })
            .map(|(candidate, _)| candidate.deal.clone())
            .collect()
    }

    pub fn apply(&mut self, action: ReviewAction) -> Result<ReviewOutcome, ReviewError> {
        match action {
            ReviewAction::Approve(index) => self.mark(index, DealStatus::Approved),
            ReviewAction::Reject(index) => self.mark(index, DealStatus::Rejected),
            ReviewAction::Next => {
                if self.cursor + 1 < self.len() {
                    self.cursor += 1;
                }
                Ok(ReviewOutcome::ShowDeal(self.cursor))
            }
            ReviewAction::Prev => {
                self.cursor = self.cursor.saturating_sub(1);
                Ok(ReviewOutcome::ShowDeal(self.cursor))
            }
            ReviewAction::Select(index) => {
                self.check_index(index)?;
                self.cursor = index;
                Ok(ReviewOutcome::ShowDeal(index))
            }
            ReviewAction::BeginEdit(field) => {
                self.check_index(self.cursor)?;
                let state = EditState {
                    index: self.cursor,
                    field,
                };
                self.editing = Some(state);
                Ok(ReviewOutcome::AwaitInput {
                    index: state.index,
                    field,
                })
            }
            ReviewAction::EditInput(input) => {
                let state = self.editing.ok_or(ReviewError::NotEditing)?;
                let candidate = self.candidates.get_mut(state.index).ok_or(ReviewError::OutOfRange {
                    index: state.index,
                    total: self.statuses.len(),
                })?;
                apply_edit(&mut candidate.deal, state.field, &input)?;
                self.editing = None;
                self.cursor = state.index;
                Ok(ReviewOutcome::ShowDeal(state.index))
            }
            ReviewAction::CancelEdit => {
                self.editing = None;
                Ok(ReviewOutcome::ShowDeal(self.cursor))
            }
            ReviewAction::SetPricingModel(model) => {
                self.check_index(self.cursor)?;
                self.candidates[self.cursor].deal.pricing_model = Some(model);
                self.editing = None;
                Ok(ReviewOutcome::ShowDeal(self.cursor))
            }
            ReviewAction::Reprocess => {
                self.statuses.fill(DealStatus::Pending);
                self.editing = None;
                self.cursor = 0;
                Ok(ReviewOutcome::ShowDeal(0))
            }
        }
    }

    fn mark(&mut self, index: usize, status: DealStatus) -> Result<ReviewOutcome, ReviewError> {
        self.check_index(index)?;
        self.statuses[index] = status;

        if index + 1 < self.len() {
            self.cursor = index + 1;
            Ok(ReviewOutcome::ShowDeal(self.cursor))
        } else {
            self.cursor = index;
            Ok(ReviewOutcome::ShowSummary(self.summary()))
        }
    }

    fn check_index(&self, index: usize) -> Result<(), ReviewError> {
        if index < self.len() {
            Ok(())
        } else {
            Err(ReviewError::OutOfRange {
                index,
                total: self.len(),
            })
        }
    }
}
