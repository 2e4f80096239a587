/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Carbide Telemetry Engineering. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

// src/model.rs
// Core data model: topics, samples, threshold levels/state, and pending
// emails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Opaque non-empty topic identifier; the primary key for every per-topic
/// map the coordinator owns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicName(String);

impl TopicName {
    pub fn new(topic: impl Into<String>) -> Result<Self, Error> {
        let topic = topic.into();
        if topic.is_empty() {
            return Err(Error::EmptyTopic(topic));
        }
        Ok(Self(topic))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TopicName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single numeric reading with its receipt timestamp. Immutable after
/// creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// The most recent raw payload on a topic, regardless of whether it was
/// decodable into a numeric sample.
#[derive(Debug, Clone)]
pub struct LatestMessage {
    pub payload: String,
    pub timestamp: DateTime<Utc>,
}

/// A threshold level's priority color. "Red" is hard-coded as the single
/// highest-priority, suppressing color; anything else is a free-form
/// operator label carrying no special priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Named(String),
}

impl Color {
    pub fn is_red(&self) -> bool {
        matches!(self, Color::Red)
    }

    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("red") {
            Color::Red
        } else {
            Color::Named(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Color::Red => "red",
            Color::Named(name) => name,
        }
    }
}

/// One rung of a topic's threshold ladder. Invariant: `reset_value <= value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdLevel {
    pub color: Color,
    pub value: f64,
    pub reset_value: f64,
}

impl ThresholdLevel {
    /// Composite key identifying this level within a topic's ladder,
    /// replacing a delimiter-joined string key with a typed, collision-free
    /// pair. `value.to_bits()` is used since the key only needs equality +
    /// hashing, not ordering.
    pub fn key(&self) -> (Color, u64) {
        (self.color.clone(), self.value.to_bits())
    }
}

pub type ThresholdConfig = Vec<ThresholdLevel>;

/// Per-level alert state, keyed by `(topic, level key)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdLevelState {
    pub triggered: bool,
    pub last_alert_time: Option<DateTime<Utc>>,
}

/// An outbound alert awaiting (re)dispatch. `next_eligible` is a
/// `tokio::time::Instant` rather than a wall-clock timestamp because the
/// email worker actually waits on it with tokio timers; tests drive it
/// deterministically via `tokio::time::pause()`/`advance()`.
#[derive(Debug, Clone)]
pub struct PendingEmail {
    pub recipients: Vec<String>,
    pub subject: String,
    pub body: String,
    pub retries: u32,
    pub next_eligible: tokio::time::Instant,
}
