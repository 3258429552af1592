//! Message texts and keyboards shown to the reviewer.

use std::fmt::Write;

use super::callback::Callback;
use super::transport::{Button, Keyboard};
use crate::deal::model::is_set;
use crate::deal::{Candidate, LineFailure, PricingModel};
use crate::extraction::BlockOutcome;
use crate::review::{DealStatus, EditField, ReviewSession, ReviewSummary};
use crate::submission::SubmissionReport;

/// Telegram's hard limit on message length, in characters.
pub const MESSAGE_LIMIT: usize = 4096;

const RULE: &str = "━━━━━━━━━━━━━━━";
const NOT_AVAILABLE: &str = "N/A";

pub const WELCOME: &str = "👋 Hi! I'm the Deal Parser Bot.\n\n\
Send me deal strings in this format:\n\
REGION-PARTNER-GEO-LANGUAGE-SOURCE-MODEL-CPA-CRG-CPL-FUNNELS-CR-DEDUCTIONLIMIT\n\n\
Example:\n\
TIER1-FTD Company-UK|IE|NL-Native-Facebook|Google-cpa_crg-1200-0.10-&-QuantumAI-&-0.05";

pub const HELP: &str = "📝 Required Fields:\n\
- Region (TIER1, LATAM, etc)\n\
- Partner name\n\
- GEO (country codes)\n\
- Language\n\
- Source\n\
- Pricing model (cpa_crg, cpa, cpl)\n\
- Funnels\n\n\
Plus relevant pricing fields based on model:\n\
- CPA/CRG: Both CPA and CRG required\n\
- CPA only: CPA required\n\
- CPL only: CPL required";

pub const NOT_A_DEAL: &str = "I can help you submit deals! Send one deal per line in the format \
REGION-PARTNER-GEO-LANGUAGE-SOURCE-MODEL-CPA-CRG-CPL-FUNNELS-CR-DEDUCTIONLIMIT, \
or paste a deal description. Use /help to see the required fields.";

pub const STARTING: &str = "🔄 Starting deal analysis...\nPlease wait while I process your deals.";
pub const TOO_LONG: &str = "❌ Message too long. Please split into smaller batches.";
pub const NO_SESSION: &str = "⌛ This review session has expired. Please send your deals again.";
pub const DISCARDED: &str = "🗑️ Deals Discarded Successfully\n\n\
All deals from this batch have been discarded.\n\
Send new deals whenever you're ready.";
pub const NOTHING_TO_SUBMIT: &str =
    "❌ No approved deals found to submit.\nPlease approve at least one deal before submitting.";
pub const SUBMITTING: &str = "🔄 Processing Submission...\n\n\
1️⃣ Approved deals collected\n\
2️⃣ Notion connection established\n\
3️⃣ Submitting deals...";

pub fn too_many_deals(count: usize, max: usize) -> String {
    format!("❌ Too many deals ({count}). Maximum is {max}.")
}

fn or_na(value: &str) -> &str {
    if value.trim().is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}

fn number(value: Option<f64>) -> String {
    match value {
        Some(v) if is_set(Some(v)) => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Fractions are shown as whole percentages.
fn percent(value: Option<f64>) -> String {
    match value {
        Some(v) if is_set(Some(v)) => format!("{:.0}%", v * 100.0),
        _ => NOT_AVAILABLE.to_string(),
    }
}

fn card_icon(status: DealStatus) -> &'static str {
    match status {
        DealStatus::Pending => "📋",
        other => other.icon(),
    }
}

/// The full card for deal `index` of the session.
pub fn deal_card(session: &ReviewSession, index: usize) -> String {
    let Some(candidate) = session.candidate(index) else {
        return format!("❌ Deal {} not found", index + 1);
    };
    render_candidate(candidate, session.status(index), index, session.len())
}

fn render_candidate(candidate: &Candidate, status: DealStatus, index: usize, total: usize) -> String {
    let deal = &candidate.deal;
    let mut text = format!(
        "{} Deal {} of {}\n\n📝 Original Text:\n{}\n\n",
        card_icon(status),
        index + 1,
        total,
        candidate.raw_text
    );
    if let Some(note) = &candidate.note {
        let _ = write!(text, "⚠️ Could not read this deal automatically: {note}\n\n");
    }

    let funnels = if deal.funnels.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        deal.funnels.join(", ")
    };

    let _ = write!(
        text,
        "📊 Deal Details:\n{RULE}\n\
         🤝 Partner: {}\n\
         🌍 Region: {}\n\
         🗺 GEO: {}\n\
         🗣 Language: {}\n\
         {RULE}\n\
         📱 Source: {}\n\
         💰 Pricing Model: {}\n\
         💵 CPA: {}\n\
         📈 CRG: {}\n\
         🎯 CPL: {}\n\
         {RULE}\n\
         🔄 Funnels: {}\n\
         📊 CR: {}\n\
         📉 Deduction Limit: {}\n\
         {RULE}",
        or_na(&deal.partner),
        or_na(&deal.region),
        or_na(&deal.geo),
        or_na(&deal.language),
        or_na(&deal.source),
        deal.pricing_model
            .map_or(NOT_AVAILABLE, |model| model.display_name()),
        number(deal.cpa),
        percent(deal.crg),
        number(deal.cpl),
        funnels,
        percent(deal.cr),
        percent(deal.deduction_limit),
    );
    text
}

/// Navigation, status and edit buttons under a deal card.
pub fn deal_keyboard(session: &ReviewSession, index: usize) -> Keyboard {
    let total = session.len();
    let mut nav = Vec::new();
    if total > 1 {
        if index > 0 {
            nav.push(Button::new("⬅️ Previous", &Callback::Prev(index)));
        }
        if index + 1 < total {
            nav.push(Button::new("➡️ Next", &Callback::Next(index)));
        }
    }

    let status = session.status(index);
    let approve = if status == DealStatus::Approved {
        "✅ Approved"
    } else {
        "Approve ?"
    };
    let reject = if status == DealStatus::Rejected {
        "❌ Rejected"
    } else {
        "Reject ?"
    };

    Keyboard::new()
        .row(nav)
        .row(vec![
            Button::new(approve, &Callback::Approve(index)),
            Button::new(reject, &Callback::Reject(index)),
        ])
        .row(vec![Button::new("✏️ Edit", &Callback::Edit(index))])
}

/// Field buttons, two per row, then Back.
pub fn edit_menu(index: usize) -> Keyboard {
    let mut keyboard = Keyboard::new();
    for pair in EditField::MENU.chunks(2) {
        let row = pair
            .iter()
            .map(|field| {
                let callback = match field {
                    EditField::PricingModel => Callback::ModelMenu(index),
                    field => Callback::Field {
                        field: *field,
                        index,
                    },
                };
                Button::new(field.label(), &callback)
            })
            .collect();
        keyboard = keyboard.row(row);
    }
    keyboard.row(vec![Button::new("🔙 Back", &Callback::Back(index))])
}

pub fn model_menu(index: usize) -> Keyboard {
    let mut keyboard = Keyboard::new();
    for model in PricingModel::ALL {
        keyboard = keyboard.row(vec![Button::new(
            model.display_name(),
            &Callback::Model { model, index },
        )]);
    }
    keyboard.row(vec![Button::new("🔙 Back", &Callback::Back(index))])
}

pub fn model_prompt(session: &ReviewSession, index: usize) -> String {
    format!("Select pricing model:\n\n{}", deal_card(session, index))
}

pub fn edit_prompt(session: &ReviewSession, index: usize, field: EditField) -> String {
    format!(
        "Please enter new value for {}:\n\n{}\n\nType your new value or click Back to cancel.",
        field.label(),
        deal_card(session, index)
    )
}

pub fn edit_rejected(reason: &str) -> String {
    format!("❌ {reason}\nPlease try again or click Back to cancel.")
}

pub fn back_keyboard(index: usize) -> Keyboard {
    Keyboard::new().row(vec![Button::new("🔙 Back", &Callback::Back(index))])
}

pub fn summary(summary: &ReviewSummary) -> String {
    format!(
        "📊 Deal Review Summary\n\n✅ Approved: {}\n❌ Rejected: {}\n⏳ Pending: {}",
        summary.approved, summary.rejected, summary.pending
    )
}

/// Submit only appears once something is approved.
pub fn summary_keyboard(can_submit: bool) -> Keyboard {
    let submit = if can_submit {
        vec![Button::new("📤 Submit", &Callback::Submit)]
    } else {
        Vec::new()
    };
    Keyboard::new()
        .row(submit)
        .row(vec![
            Button::new("♺ Reprocess", &Callback::Reprocess),
            Button::new("🗑️ Discard All", &Callback::Discard),
        ])
}

/// One `Deal #n` block per rejected line.
pub fn line_failures(failures: &[LineFailure]) -> String {
    failures
        .iter()
        .map(|failure| {
            format!(
                "Deal #{}:\n{RULE}\n📝 Input:\n{}\n\n❌ Error:\n{}\n",
                failure.position, failure.input, failure.error
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn no_valid_deals(failures: &[LineFailure]) -> String {
    format!(
        "❌ No valid deals found.\n\nIssues found:\n\n{}\n\nPlease fix the issues and try again.",
        line_failures(failures)
    )
}

pub fn partial_batch(failures: &[LineFailure], valid: usize) -> String {
    format!(
        "⚠️ Found {} invalid deals:\n\n{}\n\nProceeding with {valid} valid deals...",
        failures.len(),
        line_failures(failures)
    )
}

/// Blocks the oracle could not handle at all.
pub fn failed_blocks(outcomes: &[BlockOutcome]) -> Option<String> {
    let details: Vec<String> = outcomes
        .iter()
        .enumerate()
        .filter_map(|(i, outcome)| match outcome {
            BlockOutcome::Failed { detail } => Some(format!("Deal #{}:\n❌ Error:\n{detail}\n", i + 1)),
            _ => None,
        })
        .collect();

    if details.is_empty() {
        None
    } else {
        Some(format!(
            "⚠️ {} deals could not be processed:\n\n{}",
            details.len(),
            details.join("\n")
        ))
    }
}

pub fn submission_report(report: &SubmissionReport) -> String {
    let mut text = format!(
        "✅ Submission Complete!\n\n⏱️ Completed in: {:.1}s\n{RULE}\n\n📋 Submitted Deals:\n\n",
        report.elapsed.as_secs_f64()
    );

    for (i, submission) in report.submissions.iter().enumerate() {
        let deal = &submission.deal;
        let _ = write!(
            text,
            "Deal #{}: {}\n{RULE}\n🌍 GEO: {}\n🗣 Language: {}\n📱 Source: {}\n",
            i + 1,
            deal.partner,
            deal.geo,
            deal.language,
            deal.source
        );
        if is_set(deal.cpa) {
            let _ = writeln!(text, "💰 CPA: ${}", number(deal.cpa));
        }
        if is_set(deal.crg) {
            let _ = writeln!(text, "📈 CRG: {}", percent(deal.crg));
        }
        if is_set(deal.cpl) {
            let _ = writeln!(text, "🎯 CPL: ${}", number(deal.cpl));
        }
        if !deal.funnels.is_empty() {
            let _ = writeln!(text, "🔄 Funnels: {}", deal.funnels.join(", "));
        }
        match &submission.result {
            Ok(_) => text.push_str("✅ Successfully submitted\n\n"),
            Err(err) => {
                let _ = write!(text, "❌ Failed: {err}\n\n");
            }
        }
    }

    let _ = write!(
        text,
        "📊 Final Results:\n✅ {} deals submitted successfully",
        report.succeeded()
    );
    if report.failed() > 0 {
        let _ = write!(text, "\n❌ {} deals failed", report.failed());
    }
    text
}

/// Split `text` into pieces of at most `limit` characters, preferring line
/// breaks.
pub fn chunk(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > limit {
            // A single overlong line is cut on character boundaries.
            for c in line.chars() {
                if current_len == limit {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                current.push(c);
                current_len += 1;
            }
        } else {
            current.push_str(line);
            current_len += line_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
