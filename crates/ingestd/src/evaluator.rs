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

// src/evaluator.rs
// Per-topic, per-level threshold state machine deciding when an alert
// fires, with hysteresis and per-level cooldown.
//
// `now` is passed in explicitly rather than read from the system clock
// internally so tests can drive cooldown/hysteresis scenarios with
// arbitrary timestamps without needing wall-clock time to actually pass.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::constants::THRESHOLD_COOLDOWN_PERIOD;
use crate::directory::RecipientDirectory;
use crate::email::EmailQueue;
use crate::model::{Color, PendingEmail, ThresholdLevel, ThresholdLevelState, TopicName};
use crate::thresholds::ThresholdRegistry;

pub struct ThresholdEvaluator {
    registry: Arc<ThresholdRegistry>,
    directory: Arc<RecipientDirectory>,
    email_queue: Arc<EmailQueue>,
    state: DashMap<(TopicName, (Color, u64)), ThresholdLevelState>,
}

impl ThresholdEvaluator {
    pub fn new(
        registry: Arc<ThresholdRegistry>,
        directory: Arc<RecipientDirectory>,
        email_queue: Arc<EmailQueue>,
    ) -> Self {
        Self { registry, directory, email_queue, state: DashMap::new() }
    }

    /// Drops all per-level state for a topic. Called on unsubscribe.
    pub fn clear_topic(&self, topic: &TopicName) {
        self.state.retain(|(t, _), _| t != topic);
    }

    pub async fn evaluate(&self, topic: &TopicName, value: f64, now: DateTime<Utc>) {
        let Some(mut levels) = self.registry.thresholds(topic).await else {
            return;
        };
        if levels.is_empty() {
            return;
        }

        // Stable descending sort on value; color tie-break is unspecified
        // upstream, so equal-value levels keep their configured order.
        levels.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));

        let mut danger_triggered = false;
        for level in &levels {
            let key = (topic.clone(), level.key());

            if value >= level.value {
                if level.color.is_red() {
                    danger_triggered = true;
                } else if danger_triggered {
                    continue;
                }

                let should_alert = {
                    let state = self.state.entry(key.clone()).or_default();
                    !state.triggered
                        || now.signed_duration_since(state.last_alert_time.unwrap_or_default())
                            >= chrono::Duration::from_std(THRESHOLD_COOLDOWN_PERIOD).unwrap()
                };

                if should_alert {
                    self.state.insert(key, ThresholdLevelState { triggered: true, last_alert_time: Some(now) });
                    self.fire_alert(topic, level, value, now).await;
                    if level.color.is_red() {
                        break;
                    }
                }
            } else if value < level.reset_value {
                self.state.insert(key, ThresholdLevelState::default());
            }
            // dead-band: reset_value <= value < level.value leaves state unchanged.
        }
    }

    async fn fire_alert(&self, topic: &TopicName, level: &ThresholdLevel, value: f64, now: DateTime<Utc>) {
        let recipients = self.directory.recipients(topic).await;
        if recipients.is_empty() {
            return;
        }

        let (subject, body) = build_alert(topic, level, value, now);
        self.email_queue
            .enqueue(PendingEmail {
                recipients,
                subject,
                body,
                retries: 0,
                next_eligible: tokio::time::Instant::now(),
            })
            .await;
    }
}

fn build_alert(topic: &TopicName, level: &ThresholdLevel, value: f64, now: DateTime<Utc>) -> (String, String) {
    let is_red = level.color.is_red();
    let kind = if is_red { "Danger" } else { "Warning" };
    let severity = if is_red { "critical" } else { "warning" };

    let subject = format!("{kind}: {topic} Threshold Exceeded");
    let body = format!(
        "{kind} alert for topic {topic}\nCurrent value: {value}\nThreshold value: {}\nSeverity: {severity}\nTimestamp: {}\n{}\n",
        level.value,
        now.to_rfc3339(),
        if is_red {
            "IMMEDIATE ACTION REQUIRED: Critical threshold exceeded!"
        } else {
            "WARNING: Monitor situation closely."
        }
    );
    (subject, body)
}
