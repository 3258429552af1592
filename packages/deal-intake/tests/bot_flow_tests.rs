//! Whole conversations with the bot over recorded transport and store doubles.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use deal_intake::bot::render;
use deal_intake::bot::{DealBot, InboundEvent, MessageRef};
use deal_intake::extraction::{RetryPolicy, StructuredDealExtractor};
use deal_intake::submission::SellingMarkup;
use deal_intake::testing::{MockDealStore, MockOracle, RecordingTransport};
use serde_json::json;

const USER: i64 = 42;
const LINE_A: &str =
    "TIER1-FTD Company-UK|IE|NL-Native-Facebook|Google-cpa_crg-1200-0.10-&-QuantumAI-&-0.05";
const LINE_B: &str = "LATAM-Acme-BR-Native-Google-cpl-&-&-25-Funnel A-&-&";

struct Harness {
    bot: DealBot,
    transport: RecordingTransport,
    store: MockDealStore,
}

impl Harness {
    fn new() -> Self {
        let transport = RecordingTransport::new();
        let store = MockDealStore::new();
        let bot = DealBot::new(
            Arc::new(transport.clone()),
            Arc::new(store.clone()),
            SellingMarkup::default(),
            Duration::from_secs(3600),
        );
        Self {
            bot,
            transport,
            store,
        }
    }

    fn with_oracle(mut self, oracle: &MockOracle) -> Self {
        let extractor = StructuredDealExtractor::new(Arc::new(oracle.clone()))
            .with_retry_policy(RetryPolicy::immediate());
        self.bot = self.bot.with_extractor(extractor);
        self
    }

    async fn say(&mut self, text: &str) {
        let now = Utc::now();
        self.bot
            .handle(
                InboundEvent::Text {
                    user: USER,
                    chat_id: USER,
                    message_id: 1,
                    text: text.to_string(),
                    sent_at: now,
                },
                now,
            )
            .await;
    }

    async fn press(&mut self, message: MessageRef, data: &str) {
        self.bot
            .handle(
                InboundEvent::Button {
                    user: USER,
                    message,
                    callback_id: format!("cb-{data}"),
                    data: data.to_string(),
                },
                Utc::now(),
            )
            .await;
    }

    /// Text currently shown in `message`.
    fn shown(&self, message: MessageRef) -> String {
        self.transport
            .current(message)
            .map(|(text, _)| text)
            .unwrap_or_default()
    }

    fn buttons(&self, message: MessageRef) -> Vec<String> {
        self.transport
            .current(message)
            .and_then(|(_, keyboard)| keyboard)
            .map(|keyboard| keyboard.buttons().map(|b| b.data.clone()).collect())
            .unwrap_or_default()
    }
}

fn first_message() -> MessageRef {
    MessageRef {
        chat_id: USER,
        message_id: 100,
    }
}

#[tokio::test]
async fn test_approve_and_submit_delimited_batch() {
    let mut h = Harness::new();
    let card = first_message();

    h.say(&format!("{LINE_A}\n{LINE_B}")).await;

    assert_eq!(h.transport.sent()[0].text, render::STARTING);
    assert!(h.shown(card).starts_with("📋 Deal 1 of 2"));
    assert_eq!(
        h.buttons(card),
        vec!["next:0", "approve:0", "reject:0", "edit:0"]
    );

    h.press(card, "approve:0").await;
    assert!(h.shown(card).starts_with("📋 Deal 2 of 2"));

    h.press(card, "approve:1").await;
    assert!(h.shown(card).starts_with("📊 Deal Review Summary"));
    assert!(h.shown(card).contains("✅ Approved: 2"));
    assert_eq!(h.buttons(card), vec!["submit", "reprocess", "discard"]);

    h.press(card, "submit").await;

    let report = h.shown(card);
    assert!(report.starts_with("✅ Submission Complete!"));
    assert!(report.contains("Deal #1: FTD Company"));
    assert!(report.contains("Deal #2: Acme"));
    assert!(report.contains("2 deals submitted successfully"));

    let records = h.store.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].cpa_selling, Some(1300.0));
    assert_eq!(records[1].cpl_selling, Some(30.0));
    assert!(h.bot.sessions().is_empty());
    assert_eq!(h.transport.acknowledged().len(), 3);
}

#[tokio::test]
async fn test_partial_batch_warns_then_reviews() {
    let mut h = Harness::new();

    h.say(&format!("{LINE_A}\nTIER1-FTD-UK")).await;

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 2);
    let warning = h.shown(sent[0].message);
    assert!(warning.starts_with("⚠️ Found 1 invalid deals"));
    assert!(warning.contains("Deal #2:"));
    assert!(warning.contains("Expected 12 fields, got 3"));
    assert!(sent[1].text.starts_with("📋 Deal 1 of 1"));
}

#[tokio::test]
async fn test_all_invalid_lines_only_report_errors() {
    let mut h = Harness::new();

    h.say("TIER1-FTD-UK\nTIER1-FTD-UK-Native").await;

    let text = h.shown(first_message());
    assert!(text.starts_with("❌ No valid deals found."));
    assert!(text.contains("Deal #1:") && text.contains("Deal #2:"));
    assert!(h.bot.sessions().is_empty());
}

#[tokio::test]
async fn test_edit_field_by_typing() {
    let mut h = Harness::new();
    let card = first_message();
    h.say(LINE_A).await;

    h.press(card, "edit:0").await;
    assert!(h.buttons(card).contains(&"field:cpa:0".to_string()));

    h.press(card, "field:cpa:0").await;
    assert!(h.shown(card).starts_with("Please enter new value for CPA:"));
    assert_eq!(h.buttons(card), vec!["back:0"]);

    h.say("lots").await;
    let rejection = h.transport.sent().last().cloned().unwrap();
    assert!(rejection.text.contains("Invalid value for cpa: must be a number"));

    h.say("1500").await;
    assert_eq!(h.transport.deleted(), vec![card]);
    let fresh = h.transport.sent().last().cloned().unwrap();
    assert!(fresh.text.starts_with("📋 Deal 1 of 1"));
    assert!(fresh.text.contains("💵 CPA: 1500"));

    // The session now draws into the new message.
    h.press(fresh.message, "approve:0").await;
    assert!(h.shown(fresh.message).contains("✅ Approved: 1"));
}

#[tokio::test]
async fn test_pricing_model_menu() {
    let mut h = Harness::new();
    let card = first_message();
    h.say(LINE_A).await;

    h.press(card, "modelmenu:0").await;
    assert_eq!(
        h.buttons(card),
        vec!["model:CPA/CRG:0", "model:CPA:0", "model:CPL:0", "back:0"]
    );

    h.press(card, "model:CPA:0").await;
    assert!(h.shown(card).contains("💰 Pricing Model: CPA\n"));
}

#[tokio::test]
async fn test_nothing_to_submit_and_discard() {
    let mut h = Harness::new();
    let card = first_message();
    h.say(LINE_A).await;

    h.press(card, "reject:0").await;
    assert_eq!(h.buttons(card), vec!["reprocess", "discard"]);

    h.press(card, "submit").await;
    assert_eq!(h.shown(card), render::NOTHING_TO_SUBMIT);
    assert!(h.store.records().is_empty());

    h.press(card, "reprocess").await;
    assert!(h.shown(card).starts_with("📋 Deal 1 of 1"));

    h.press(card, "discard").await;
    assert_eq!(h.shown(card), render::DISCARDED);
    assert!(h.bot.sessions().is_empty());

    h.press(card, "approve:0").await;
    assert_eq!(h.shown(card), render::NO_SESSION);
}

#[tokio::test]
async fn test_failed_submission_keeps_session() {
    let transport = RecordingTransport::new();
    let store = MockDealStore::new().fail_records();
    let mut h = Harness {
        bot: DealBot::new(
            Arc::new(transport.clone()),
            Arc::new(store.clone()),
            SellingMarkup::default(),
            Duration::from_secs(3600),
        ),
        transport,
        store,
    };
    let card = first_message();
    h.say(LINE_A).await;
    h.press(card, "approve:0").await;
    h.press(card, "submit").await;

    let report = h.shown(card);
    assert!(report.contains("❌ Failed: Error creating deal record"));
    assert!(report.contains("0 deals submitted successfully"));
    assert_eq!(h.bot.sessions().len(), 1);

    let summary = h.transport.sent().last().cloned().unwrap();
    assert!(summary.text.starts_with("📊 Deal Review Summary"));
}

#[tokio::test]
async fn test_free_text_approve_all_skips_priceless_placeholder() {
    let oracle = MockOracle::new()
        .with_structure_json(&json!({
            "sections": [{
                "shared_fields": {"partner": "FTD Company", "source": "Facebook"},
                "deal_blocks": [{"text": "UK eng 1200+10%"}, {"text": "DE ???"}]
            }]
        }))
        .with_parse_json(&json!({
            "parsed_data": {"region": "TIER1", "geo": "UK", "cpa": 1200, "crg": 10, "funnels": "QuantumAI"}
        }))
        .with_parse_reply("not json");
    let mut h = Harness::new().with_oracle(&oracle);
    let card = first_message();

    h.say("Partner: FTD Company\nUK eng 1200+10%\nSource: Facebook\nDE ???").await;

    assert!(oracle.was_called_with("UK eng 1200+10%"));
    assert!(h.shown(card).starts_with("📋 Deal 1 of 2"));

    h.press(card, "approve:0").await;
    let placeholder = h.shown(card);
    assert!(placeholder.contains("📝 Original Text:\nDE ???"));
    assert!(placeholder.contains("🌍 Region: TIER3"));

    h.press(card, "approve:1").await;
    h.press(card, "submit").await;

    let records = h.store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "UK English-FTD Company-Facebook");
    assert!(h.shown(card).contains("1 deals submitted successfully"));
}

#[tokio::test]
async fn test_free_text_ignored_without_oracle() {
    let mut h = Harness::new();

    h.say("Partner: FTD Company\nUK eng 1200+10%\nSource: Facebook").await;

    // Falls back to line parsing, which finds nothing deal-shaped.
    assert_eq!(h.transport.sent()[0].text, render::NOT_A_DEAL);
}
