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

// src/directory.rs
// TTL-cached read-through over the external employee/supervisor directory.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::warn;

use crate::constants::RECIPIENTS_CACHE_TTL;
use crate::error::Error;
use crate::model::TopicName;

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn employees_by_topic(&self, topic: &TopicName) -> Result<Vec<String>, Error>;
    async fn supervisors_by_topic(&self, topic: &TopicName) -> Result<Vec<String>, Error>;
}

/// Read-through recipient cache. Failures of the external directory are
/// logged and yield an empty recipient list rather than propagating, per
/// the contract: alerting must never wedge on directory unavailability.
pub struct RecipientDirectory {
    store: Arc<dyn DirectoryStore>,
    cache: Cache<TopicName, Vec<String>>,
}

impl RecipientDirectory {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        let cache = Cache::builder().time_to_live(RECIPIENTS_CACHE_TTL).build();
        Self { store, cache }
    }

    pub async fn recipients(&self, topic: &TopicName) -> Vec<String> {
        if let Some(cached) = self.cache.get(topic).await {
            return cached;
        }

        let (employees, supervisors) =
            tokio::join!(self.store.employees_by_topic(topic), self.store.supervisors_by_topic(topic));

        let employees = employees.unwrap_or_else(|e| {
            warn!(%topic, error = %e, "employee directory lookup failed");
            Vec::new()
        });
        let supervisors = supervisors.unwrap_or_else(|e| {
            warn!(%topic, error = %e, "supervisor directory lookup failed");
            Vec::new()
        });

        let mut seen = HashSet::new();
        let mut recipients = Vec::new();
        for email in employees.into_iter().chain(supervisors) {
            if seen.insert(email.clone()) {
                recipients.push(email);
            }
        }

        if !recipients.is_empty() {
            self.cache.insert(topic.clone(), recipients.clone()).await;
        }

        recipients
    }
}
