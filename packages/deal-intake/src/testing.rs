//! In-memory doubles for the oracle, the deal store and the chat transport.
//!
//! Each double records what it was asked to do so tests can assert on the
//! calls afterwards.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::bot::transport::{ChatTransport, Keyboard, MessageRef};
use crate::error::{OracleError, StoreError, StoreResult, TransportError};
use crate::extraction::prompts::STRUCTURE_SYSTEM_PROMPT;
use crate::extraction::Oracle;
use crate::submission::{DealStore, SubmissionRecord};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Oracle answering from two scripted queues: one for structure analysis,
/// one for per-deal parsing.
#[derive(Clone, Default)]
pub struct MockOracle {
    structure_replies: Arc<Mutex<VecDeque<Result<String, OracleError>>>>,
    parse_replies: Arc<Mutex<VecDeque<Result<String, OracleError>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_structure_reply(self, reply: impl Into<String>) -> Self {
        lock(&self.structure_replies).push_back(Ok(reply.into()));
        self
    }

    /// Serialize `data` as the structure reply.
    pub fn with_structure_json(self, data: &serde_json::Value) -> Self {
        self.with_structure_reply(data.to_string())
    }

    pub fn with_parse_reply(self, reply: impl Into<String>) -> Self {
        lock(&self.parse_replies).push_back(Ok(reply.into()));
        self
    }

    pub fn with_parse_json(self, data: &serde_json::Value) -> Self {
        self.with_parse_reply(data.to_string())
    }

    pub fn with_structure_error(self, error: OracleError) -> Self {
        lock(&self.structure_replies).push_back(Err(error));
        self
    }

    pub fn with_parse_error(self, error: OracleError) -> Self {
        lock(&self.parse_replies).push_back(Err(error));
        self
    }

    /// User prompts received, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn was_called_with(&self, text: &str) -> bool {
        lock(&self.calls).iter().any(|prompt| prompt.contains(text))
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, OracleError> {
        lock(&self.calls).push(user.to_string());

        let queue = if system == STRUCTURE_SYSTEM_PROMPT {
            &self.structure_replies
        } else {
            &self.parse_replies
        };
        lock(queue)
            .pop_front()
            .unwrap_or_else(|| Err(OracleError::Failed("no scripted reply".to_string())))
    }
}

#[derive(Default)]
struct StoreState {
    companies: Vec<(String, String)>,
    records: Vec<SubmissionRecord>,
    failing_companies: HashSet<String>,
    fail_records: bool,
}

/// Deal store keeping companies and records in memory. Company ids are
/// `company-1`, `company-2`, ... in creation order.
#[derive(Clone, Default)]
pub struct MockDealStore {
    state: Arc<Mutex<StoreState>>,
}

impl MockDealStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Company lookups for `name` fail.
    pub fn fail_company(self, name: impl Into<String>) -> Self {
        lock(&self.state).failing_companies.insert(name.into());
        self
    }

    /// Every record write fails.
    pub fn fail_records(self) -> Self {
        lock(&self.state).fail_records = true;
        self
    }

    pub fn records(&self) -> Vec<SubmissionRecord> {
        lock(&self.state).records.clone()
    }

    /// Company names, in creation order.
    pub fn companies(&self) -> Vec<String> {
        lock(&self.state)
            .companies
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl DealStore for MockDealStore {
    async fn find_or_create_company(&self, name: &str) -> StoreResult<String> {
        let mut state = lock(&self.state);
        if state.failing_companies.contains(name) {
            return Err(StoreError::Company {
                name: name.to_string(),
                reason: "simulated failure".to_string(),
            });
        }
        if let Some((_, id)) = state.companies.iter().find(|(existing, _)| existing == name) {
            return Ok(id.clone());
        }
        let id = format!("company-{}", state.companies.len() + 1);
        state.companies.push((name.to_string(), id.clone()));
        Ok(id)
    }

    async fn create_deal_record(&self, record: &SubmissionRecord) -> StoreResult<String> {
        let mut state = lock(&self.state);
        if state.fail_records {
            return Err(StoreError::Record("simulated failure".to_string()));
        }
        state.records.push(record.clone());
        Ok(format!("record-{}", state.records.len()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub message: MessageRef,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditedMessage {
    pub message: MessageRef,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

#[derive(Default)]
struct TransportLog {
    next_message_id: i64,
    sent: Vec<SentMessage>,
    edited: Vec<EditedMessage>,
    deleted: Vec<MessageRef>,
    acknowledged: Vec<String>,
}

/// Chat transport that records every call. Sent messages get ids from 100
/// upwards.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    log: Arc<Mutex<TransportLog>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.log).sent.clone()
    }

    pub fn edited(&self) -> Vec<EditedMessage> {
        lock(&self.log).edited.clone()
    }

    pub fn deleted(&self) -> Vec<MessageRef> {
        lock(&self.log).deleted.clone()
    }

    pub fn acknowledged(&self) -> Vec<String> {
        lock(&self.log).acknowledged.clone()
    }

    /// Text and keyboard most recently shown in `message`.
    pub fn current(&self, message: MessageRef) -> Option<(String, Option<Keyboard>)> {
        let log = lock(&self.log);
        log.edited
            .iter()
            .rev()
            .find(|edit| edit.message == message)
            .map(|edit| (edit.text.clone(), edit.keyboard.clone()))
            .or_else(|| {
                log.sent
                    .iter()
                    .find(|sent| sent.message == message)
                    .map(|sent| (sent.text.clone(), sent.keyboard.clone()))
            })
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, TransportError> {
        let mut log = lock(&self.log);
        let message = MessageRef {
            chat_id,
            message_id: 100 + log.next_message_id,
        };
        log.next_message_id += 1;
        log.sent.push(SentMessage {
            message,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(message)
    }

    async fn edit(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), TransportError> {
        lock(&self.log).edited.push(EditedMessage {
            message,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(())
    }

    async fn delete(&self, message: MessageRef) -> Result<(), TransportError> {
        lock(&self.log).deleted.push(message);
        Ok(())
    }

    async fn acknowledge(&self, callback_id: &str) -> Result<(), TransportError> {
        lock(&self.log).acknowledged.push(callback_id.to_string());
        Ok(())
    }
}
