//! Mock SMS gateway for development and tests
//!
//! Records every message instead of sending it. Failures can be scripted
//! so callers can exercise the dispatch error paths.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use bp_core::errors::GatewayError;
use bp_core::services::verification::{code_from_message, SmsGateway};
use bp_shared::phone::mask_phone_number;

/// A message captured by the mock gateway
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub to: String,
    pub body: String,
    pub message_id: String,
}

#[derive(Default)]
pub struct MockSmsGateway {
    sent: Mutex<Vec<SentMessage>>,
    scripted_failures: Mutex<VecDeque<GatewayError>>,
    message_counter: AtomicU64,
}

impl MockSmsGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next send fail with `error`
    pub fn fail_next(&self, error: GatewayError) {
        self.scripted_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// The 6-digit code in the latest message to `phone`
    pub fn last_code_for(&self, phone: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find(|m| m.to == phone)
            .and_then(|m| code_from_message(&m.body))
    }
}

#[async_trait]
impl SmsGateway for MockSmsGateway {
    async fn send(&self, phone: &str, message: &str) -> Result<String, GatewayError> {
        let scripted = self
            .scripted_failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(err) = scripted {
            info!(phone = %mask_phone_number(phone), error = %err, "[MOCK SMS] Scripted failure");
            return Err(err);
        }

        let sequence = self.message_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let message_id = format!("mock-{}", Uuid::new_v4());

        info!(
            phone = %mask_phone_number(phone),
            message_id = %message_id,
            sequence,
            "[MOCK SMS] Message recorded"
        );

        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentMessage {
                to: phone.to_string(),
                body: message.to_string(),
                message_id: message_id.clone(),
            });

        Ok(message_id)
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn is_available(&self) -> bool {
        true
    }
}
