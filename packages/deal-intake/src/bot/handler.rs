//! Routes inbound chat events through parsing, review and submission.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::callback::Callback;
use super::event::InboundEvent;
use super::render::{self, MESSAGE_LIMIT};
use super::transport::{ChatTransport, Keyboard, MessageRef};
use crate::deal::{parse_batch, Candidate};
use crate::error::{DealParseError, ReviewError};
use crate::extraction::{
    looks_like_free_text_deal, BlockOutcome, ProgressEvent, ProgressSink, StructuredDealExtractor,
};
use crate::review::{ReviewAction, ReviewOutcome, ReviewSession, SessionStore, UserId};
use crate::submission::{submit_deals, DealStore, SellingMarkup};

/// Input limits applied before any parsing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BotLimits {
    pub max_message_chars: usize,
    pub max_deals: usize,
    /// Text older than this when it arrives is ignored.
    pub stale_after: chrono::Duration,
}

impl Default for BotLimits {
    fn default() -> Self {
        Self {
            max_message_chars: 10_000,
            max_deals: 50,
            stale_after: chrono::Duration::seconds(30),
        }
    }
}

/// What a review message should currently display.
#[derive(Debug, Clone, Copy)]
enum View {
    Outcome(ReviewOutcome),
    EditMenu(usize),
    ModelMenu(usize),
}

pub struct DealBot {
    transport: Arc<dyn ChatTransport>,
    extractor: Option<StructuredDealExtractor>,
    store: Arc<dyn DealStore>,
    markup: SellingMarkup,
    sessions: SessionStore,
    /// The chat message each user's review is drawn into.
    anchors: HashMap<UserId, MessageRef>,
    limits: BotLimits,
}

impl DealBot {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        store: Arc<dyn DealStore>,
        markup: SellingMarkup,
        session_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            extractor: None,
            store,
            markup,
            sessions: SessionStore::new(session_timeout),
            anchors: HashMap::new(),
            limits: BotLimits::default(),
        }
    }

    /// Enable free-text deals.
    pub fn with_extractor(mut self, extractor: StructuredDealExtractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_limits(mut self, limits: BotLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handle one event to completion. Chat failures are logged, never
    /// returned.
    #[instrument(skip_all, fields(user_id = event.user()))]
    pub async fn handle(&mut self, event: InboundEvent, now: DateTime<Utc>) {
        self.sessions.sweep(now);
        let sessions = &self.sessions;
        self.anchors.retain(|user, _| sessions.get(*user).is_some());

        match event {
            InboundEvent::Text {
                user,
                chat_id,
                text,
                sent_at,
                ..
            } => {
                if now.signed_duration_since(sent_at) > self.limits.stale_after {
                    debug!(sent_at = %sent_at, "Ignoring stale message");
                    return;
                }
                self.handle_text(user, chat_id, &text, now).await;
            }
            InboundEvent::Button {
                user,
                message,
                callback_id,
                data,
            } => {
                if let Err(err) = self.transport.acknowledge(&callback_id).await {
                    debug!(error = %err, "Failed to acknowledge button press");
                }
                match Callback::parse(&data) {
                    Some(callback) => self.handle_button(user, message, callback, now).await,
                    None => warn!(data = %data, "Unknown button payload"),
                }
            }
        }
    }

    async fn handle_text(&mut self, user: UserId, chat_id: i64, text: &str, now: DateTime<Utc>) {
        let text = text.trim();
        let transport = self.transport.as_ref();

        if let Some(session) = self.sessions.get_mut(user, now) {
            if session.editing().is_some() {
                let mut anchor = self.anchors.remove(&user);
                edit_input(transport, session, &mut anchor, chat_id, text).await;
                remember(&mut self.anchors, user, anchor);
                return;
            }
        }

        if let Some(command) = command(text) {
            let reply = match command {
                "start" => render::WELCOME,
                "help" => render::HELP,
                _ => render::NOT_A_DEAL,
            };
            send(transport, chat_id, reply, None).await;
            return;
        }

        if text.chars().count() > self.limits.max_message_chars {
            send(transport, chat_id, render::TOO_LONG, None).await;
            return;
        }
        let lines = text.lines().filter(|line| !line.trim().is_empty()).count();
        if lines > self.limits.max_deals {
            let reply = render::too_many_deals(lines, self.limits.max_deals);
            send(transport, chat_id, &reply, None).await;
            return;
        }

        let free_text = self.extractor.is_some() && looks_like_free_text_deal(text);
        let Some((candidates, status)) = (if free_text {
            self.extract_free_text(chat_id, text).await
        } else {
            self.parse_delimited(chat_id, text).await
        }) else {
            return;
        };

        info!(user_id = user, deals = candidates.len(), free_text, "Starting review");
        let session = self.sessions.start(user, candidates, now);
        let mut anchor = status;
        show(
            self.transport.as_ref(),
            session,
            &mut anchor,
            chat_id,
            View::Outcome(ReviewOutcome::ShowDeal(0)),
        )
        .await;
        remember(&mut self.anchors, user, anchor);
    }

    /// Delimited lines. Returns the parsed candidates and, when it is free,
    /// the status message to turn into the first card.
    async fn parse_delimited(
        &self,
        chat_id: i64,
        text: &str,
    ) -> Option<(Vec<Candidate>, Option<MessageRef>)> {
        let transport = self.transport.as_ref();
        let batch = parse_batch(text);

        if batch.candidates.is_empty() && is_chatter(&batch.failures) {
            send(transport, chat_id, render::NOT_A_DEAL, None).await;
            return None;
        }

        let status = send(transport, chat_id, render::STARTING, None).await?;
        if batch.candidates.is_empty() {
            info!(failures = batch.failures.len(), "No valid deals in message");
            deliver(transport, status, &render::no_valid_deals(&batch.failures)).await;
            return None;
        }

        if batch.failures.is_empty() {
            return Some((batch.candidates, Some(status)));
        }

        // The status message keeps the warning; the card goes below it.
        let warning = render::partial_batch(&batch.failures, batch.candidates.len());
        deliver(transport, status, &warning).await;
        Some((batch.candidates, None))
    }

    async fn extract_free_text(
        &self,
        chat_id: i64,
        text: &str,
    ) -> Option<(Vec<Candidate>, Option<MessageRef>)> {
        let extractor = self.extractor.as_ref()?;
        let transport = self.transport.as_ref();
        let status = send(transport, chat_id, &ProgressEvent::Init.render(), None).await?;

        let progress = MessageProgress {
            transport: Arc::clone(&self.transport),
            message: status,
        };
        let outcomes = match extractor.extract(text, Some(&progress)).await {
            Ok(outcomes) => outcomes,
            Err(err) => {
                warn!(error = %err, "Free-text extraction failed");
                edit(transport, status, &format!("❌ Error processing deals: {err}"), None).await;
                return None;
            }
        };

        if let Some(failed) = render::failed_blocks(&outcomes) {
            for piece in render::chunk(&failed, MESSAGE_LIMIT) {
                send(transport, chat_id, &piece, None).await;
            }
        }

        let candidates: Vec<Candidate> = outcomes
            .into_iter()
            .filter_map(BlockOutcome::into_candidate)
            .collect();
        if candidates.is_empty() {
            edit(
                transport,
                status,
                "❌ No deals could be extracted from your message.\nPlease check the text and try again.",
                None,
            )
            .await;
            return None;
        }
        Some((candidates, Some(status)))
    }

    async fn handle_button(
        &mut self,
        user: UserId,
        message: MessageRef,
        callback: Callback,
        now: DateTime<Utc>,
    ) {
        match callback {
            Callback::Discard => {
                self.anchors.remove(&user);
                if self.sessions.discard(user).is_some() {
                    info!(user_id = user, "Review session discarded");
                }
                edit(self.transport.as_ref(), message, render::DISCARDED, None).await;
                return;
            }
            Callback::Submit => {
                self.submit(user, message, now).await;
                return;
            }
            _ => {}
        }

        let transport = self.transport.as_ref();
        let Some(session) = self.sessions.get_mut(user, now) else {
            edit(transport, message, render::NO_SESSION, None).await;
            return;
        };
        self.anchors.insert(user, message);

        match navigate(session, callback) {
            Ok(view) => {
                let mut anchor = Some(message);
                show(transport, session, &mut anchor, message.chat_id, view).await;
                remember(&mut self.anchors, user, anchor);
            }
            Err(err) => warn!(error = %err, callback = %callback.encode(), "Button ignored"),
        }
    }

    async fn submit(&mut self, user: UserId, message: MessageRef, now: DateTime<Utc>) {
        let transport = self.transport.as_ref();
        let Some(session) = self.sessions.get_mut(user, now) else {
            edit(transport, message, render::NO_SESSION, None).await;
            return;
        };
        self.anchors.insert(user, message);

        let deals = session.submittable();
        if deals.is_empty() {
            let keyboard = render::summary_keyboard(session.can_submit());
            edit(transport, message, render::NOTHING_TO_SUBMIT, Some(&keyboard)).await;
            return;
        }

        edit(transport, message, render::SUBMITTING, None).await;
        let report = submit_deals(self.store.as_ref(), &deals, &self.markup).await;
        deliver(transport, message, &render::submission_report(&report)).await;

        if report.any_succeeded() {
            self.sessions.discard(user);
            self.anchors.remove(&user);
            info!(user_id = user, submitted = report.succeeded(), "Review session closed");
        } else {
            // Nothing went through; offer the summary again so the user can retry.
            let mut anchor = None;
            let summary = session.summary();
            show(
                transport,
                session,
                &mut anchor,
                message.chat_id,
                View::Outcome(ReviewOutcome::ShowSummary(summary)),
            )
            .await;
            remember(&mut self.anchors, user, anchor);
        }
    }
}

/// `/start@SomeBot args` → `start`.
fn command(text: &str) -> Option<&str> {
    let word = text.strip_prefix('/')?.split_whitespace().next()?;
    Some(word.split('@').next().unwrap_or(word))
}

/// Nothing resembling a deal line: every line lacked separators entirely.
fn is_chatter(failures: &[crate::deal::LineFailure]) -> bool {
    failures
        .iter()
        .all(|failure| matches!(failure.error, DealParseError::FieldCount { actual: 1, .. }))
}

fn focus(session: &mut ReviewSession, index: usize) -> Result<(), ReviewError> {
    if session.cursor() != index {
        session.apply(ReviewAction::Select(index))?;
    }
    Ok(())
}

/// Apply a button press to the session and pick the view to show.
fn navigate(session: &mut ReviewSession, callback: Callback) -> Result<View, ReviewError> {
    let outcome = match callback {
        Callback::Approve(i) => session.apply(ReviewAction::Approve(i))?,
        Callback::Reject(i) => session.apply(ReviewAction::Reject(i))?,
        Callback::Next(i) => {
            focus(session, i)?;
            session.apply(ReviewAction::Next)?
        }
        Callback::Prev(i) => {
            focus(session, i)?;
            session.apply(ReviewAction::Prev)?
        }
        Callback::Edit(i) => {
            focus(session, i)?;
            return Ok(View::EditMenu(i));
        }
        Callback::ModelMenu(i) => {
            focus(session, i)?;
            return Ok(View::ModelMenu(i));
        }
        Callback::Field { field, index } => {
            focus(session, index)?;
            session.apply(ReviewAction::BeginEdit(field))?
        }
        Callback::Model { model, index } => {
            focus(session, index)?;
            session.apply(ReviewAction::SetPricingModel(model))?
        }
        Callback::Back(i) => {
            focus(session, i)?;
            session.apply(ReviewAction::CancelEdit)?
        }
        Callback::Reprocess => session.apply(ReviewAction::Reprocess)?,
        Callback::Submit | Callback::Discard => ReviewOutcome::ShowDeal(session.cursor()),
    };
    Ok(View::Outcome(outcome))
}

fn view_content(session: &ReviewSession, view: View) -> (String, Keyboard) {
    match view {
        View::Outcome(ReviewOutcome::ShowDeal(i)) => {
            (render::deal_card(session, i), render::deal_keyboard(session, i))
        }
        View::Outcome(ReviewOutcome::AwaitInput { index, field }) => (
            render::edit_prompt(session, index, field),
            render::back_keyboard(index),
        ),
        View::Outcome(ReviewOutcome::ShowSummary(summary)) => (
            render::summary(&summary),
            render::summary_keyboard(session.can_submit()),
        ),
        View::EditMenu(i) => (
            format!("Select field to edit:\n\n{}", render::deal_card(session, i)),
            render::edit_menu(i),
        ),
        View::ModelMenu(i) => (render::model_prompt(session, i), render::model_menu(i)),
    }
}

fn remember(anchors: &mut HashMap<UserId, MessageRef>, user: UserId, anchor: Option<MessageRef>) {
    match anchor {
        Some(message) => anchors.insert(user, message),
        None => anchors.remove(&user),
    };
}

/// Draw `view` into `anchor`, or into a new message when there is none.
async fn show(
    transport: &dyn ChatTransport,
    session: &ReviewSession,
    anchor: &mut Option<MessageRef>,
    chat_id: i64,
    view: View,
) {
    let (text, keyboard) = view_content(session, view);
    let text = truncate(&text);

    match *anchor {
        Some(message) => {
            if let Err(err) = transport.edit(message, &text, Some(&keyboard)).await {
                warn!(error = %err, "Failed to update review message");
            }
        }
        None => *anchor = send(transport, chat_id, &text, Some(&keyboard)).await,
    }
}

/// Typed value for the field being edited.
async fn edit_input(
    transport: &dyn ChatTransport,
    session: &mut ReviewSession,
    anchor: &mut Option<MessageRef>,
    chat_id: i64,
    input: &str,
) {
    match session.apply(ReviewAction::EditInput(input.to_string())) {
        Ok(outcome) => {
            // The prompt sits above the user's reply; replace it with a fresh card.
            if let Some(prompt) = anchor.take() {
                if let Err(err) = transport.delete(prompt).await {
                    debug!(error = %err, "Failed to delete edit prompt");
                }
            }
            show(transport, session, anchor, chat_id, View::Outcome(outcome)).await;
        }
        Err(ReviewError::Edit(err)) => {
            debug!(error = %err, "Edit value rejected");
            let index = session.cursor();
            let keyboard = render::back_keyboard(index);
            send(transport, chat_id, &render::edit_rejected(&err.to_string()), Some(&keyboard)).await;
        }
        Err(err) => warn!(error = %err, "Edit input ignored"),
    }
}

fn truncate(text: &str) -> String {
    match render::chunk(text, MESSAGE_LIMIT).into_iter().next() {
        Some(first) => first,
        None => text.to_string(),
    }
}

async fn send(
    transport: &dyn ChatTransport,
    chat_id: i64,
    text: &str,
    keyboard: Option<&Keyboard>,
) -> Option<MessageRef> {
    match transport.send(chat_id, text, keyboard).await {
        Ok(message) => Some(message),
        Err(err) => {
            warn!(chat_id, error = %err, "Failed to send message");
            None
        }
    }
}

async fn edit(transport: &dyn ChatTransport, message: MessageRef, text: &str, keyboard: Option<&Keyboard>) {
    if let Err(err) = transport.edit(message, text, keyboard).await {
        warn!(message_id = message.message_id, error = %err, "Failed to edit message");
    }
}

/// Put `text` into `message`, spilling what does not fit into follow-ups.
async fn deliver(transport: &dyn ChatTransport, message: MessageRef, text: &str) {
    let mut chunks = render::chunk(text, MESSAGE_LIMIT).into_iter();
    if let Some(first) = chunks.next() {
        edit(transport, message, &first, None).await;
    }
    for rest in chunks {
        send(transport, message.chat_id, &rest, None).await;
    }
}

/// Mirrors extraction progress into a status message.
struct MessageProgress {
    transport: Arc<dyn ChatTransport>,
    message: MessageRef,
}

#[async_trait]
impl ProgressSink for MessageProgress {
    async fn report(&self, event: ProgressEvent) {
        if let Err(err) = self.transport.edit(self.message, &event.render(), None).await {
            debug!(error = %err, "Failed to report progress");
        }
    }
}
