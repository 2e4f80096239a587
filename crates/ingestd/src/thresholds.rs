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

// src/thresholds.rs
// TTL-cached read-through over the external threshold-config store, with
// write-through invalidation and a periodic full-cache flush covering
// out-of-band writes.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{error, info};

use crate::constants::{THRESHOLDS_CACHE_FULL_FLUSH, THRESHOLDS_CACHE_TTL};
use crate::error::Error;
use crate::model::{ThresholdConfig, TopicName};

#[async_trait]
pub trait ThresholdStore: Send + Sync {
    async fn load_thresholds(&self, topic: &TopicName) -> Result<Option<ThresholdConfig>, Error>;
    async fn upsert_thresholds(&self, topic: &TopicName, levels: ThresholdConfig) -> Result<(), Error>;
}

pub struct ThresholdRegistry {
    store: Arc<dyn ThresholdStore>,
    cache: Cache<TopicName, ThresholdConfig>,
}

impl ThresholdRegistry {
    pub fn new(store: Arc<dyn ThresholdStore>) -> Arc<Self> {
        let cache = Cache::builder().time_to_live(THRESHOLDS_CACHE_TTL).build();
        Arc::new(Self { store, cache })
    }

    /// Spawns the 120s full-cache flush ticker. Keep the returned handle, or
    /// drop it to cancel the ticker (e.g. on shutdown in tests).
    pub fn spawn_full_flush(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(THRESHOLDS_CACHE_FULL_FLUSH);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                registry.cache.invalidate_all();
                info!("flushed entire threshold cache");
            }
        })
    }

    pub async fn thresholds(&self, topic: &TopicName) -> Option<ThresholdConfig> {
        if let Some(cached) = self.cache.get(topic).await {
            return Some(cached);
        }

        match self.store.load_thresholds(topic).await {
            Ok(Some(levels)) => {
                self.cache.insert(topic.clone(), levels.clone()).await;
                Some(levels)
            }
            Ok(None) => None,
            Err(e) => {
                error!(%topic, error = %e, "threshold load failed, treating as no thresholds");
                None
            }
        }
    }

    pub async fn update_thresholds(&self, topic: &TopicName, levels: ThresholdConfig) {
        match self.store.upsert_thresholds(topic, levels).await {
            Ok(()) => {
                self.cache.invalidate(topic).await;
            }
            Err(e) => {
                error!(%topic, error = %e, "threshold update failed, not retrying");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Color, ThresholdLevel};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeThresholdStore {
        levels: Mutex<Option<ThresholdConfig>>,
        load_calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl ThresholdStore for FakeThresholdStore {
        async fn load_thresholds(&self, _topic: &TopicName) -> Result<Option<ThresholdConfig>, Error> {
            self.load_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(self.levels.lock().unwrap().clone())
        }

        async fn upsert_thresholds(&self, _topic: &TopicName, levels: ThresholdConfig) -> Result<(), Error> {
            *self.levels.lock().unwrap() = Some(levels);
            Ok(())
        }
    }

    fn level(color: &str, value: f64, reset_value: f64) -> ThresholdLevel {
        ThresholdLevel { color: Color::parse(color), value, reset_value }
    }

    #[tokio::test]
    async fn caches_loaded_config() {
        let store = Arc::new(FakeThresholdStore {
            levels: Mutex::new(Some(vec![level("yellow", 50.0, 40.0)])),
            load_calls: Default::default(),
        });
        let registry = ThresholdRegistry::new(store.clone());
        let topic = TopicName::new("t").unwrap();

        registry.thresholds(&topic).await;
        registry.thresholds(&topic).await;

        assert_eq!(store.load_calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn update_invalidates_cache_entry() {
        let store = Arc::new(FakeThresholdStore {
            levels: Mutex::new(Some(vec![level("yellow", 50.0, 40.0)])),
            load_calls: Default::default(),
        });
        let registry = ThresholdRegistry::new(store.clone());
        let topic = TopicName::new("t").unwrap();

        let first = registry.thresholds(&topic).await.unwrap();
        assert_eq!(first[0].value, 50.0);

        registry
            .update_thresholds(&topic, vec![level("red", 90.0, 80.0)])
            .await;

        let second = registry.thresholds(&topic).await.unwrap();
        assert_eq!(second[0].value, 90.0);
    }
}
