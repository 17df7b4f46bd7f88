// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/floodhub

//! System risk command publisher

use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{CommandSink, TransportError};
use crate::core::HubContext;
use crate::db::{Journal, JournalEntry, SystemEvent, EVENT_RISK_COMMAND, ORIGIN_HUB};

/// System-wide decision sent to the field unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemRisk {
    High,
    Normal,
}

impl SystemRisk {
    pub fn from_high(high: bool) -> Self {
        if high {
            SystemRisk::High
        } else {
            SystemRisk::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRisk::High => "high",
            SystemRisk::Normal => "normal",
        }
    }
}

/// Wire payload: `{"system_risk":"high"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCommand {
    pub system_risk: SystemRisk,
}

/// What happened to one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// Broker unreachable; the command was dropped
    Disconnected,
    Failed(String),
}

/// Sends the per-cycle command and keeps the audit trail
pub struct AlertPublisher {
    sink: Arc<dyn CommandSink>,
    topic: String,
    context: Arc<HubContext>,
    journal: Arc<dyn Journal>,
}

impl AlertPublisher {
    pub fn new(
        sink: Arc<dyn CommandSink>,
        topic: impl Into<String>,
        context: Arc<HubContext>,
        journal: Arc<dyn Journal>,
    ) -> Self {
        Self {
            sink,
            topic: topic.into(),
            context,
            journal,
        }
    }

    /// Publish the command for this cycle. The event is journaled whether or
    /// not the broker is reachable.
    pub async fn publish(&self, risk: SystemRisk, now: DateTime<Utc>) -> PublishOutcome {
        let command = AlertCommand { system_risk: risk };

        if risk == SystemRisk::High {
            self.context.counters().record_alert();
        }

        let outcome = match self.send(&command).await {
            Ok(()) => {
                info!("Command '{}' published to {}", risk.as_str(), self.topic);
                PublishOutcome::Published
            }
            Err(TransportError::NotConnected) => {
                warn!("Broker disconnected, command '{}' not sent", risk.as_str());
                PublishOutcome::Disconnected
            }
            Err(e) => {
                error!("Failed to publish command '{}': {}", risk.as_str(), e);
                PublishOutcome::Failed(e.to_string())
            }
        };

        self.journal.submit(JournalEntry::Event(SystemEvent {
            timestamp: now,
            event_type: EVENT_RISK_COMMAND.to_string(),
            origin: ORIGIN_HUB.to_string(),
            level: risk.as_str().to_string(),
            detail: serde_json::to_value(command).ok(),
        }));

        outcome
    }

    async fn send(&self, command: &AlertCommand) -> Result<(), TransportError> {
        if !self.sink.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let payload = serde_json::to_vec(command)?;
        self.sink.publish(&self.topic, payload).await
    }
}
