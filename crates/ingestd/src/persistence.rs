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

// src/persistence.rs
// Per-topic bounded sample queues with a single-flight periodic flush to
// the external store.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::error;

use crate::constants::{BATCH_INTERVAL, BATCH_SIZE, MAX_QUEUE_SIZE};
use crate::error::Error;
use crate::model::{Sample, TopicName};

#[derive(Debug, Clone)]
pub struct AppendOp {
    pub topic: TopicName,
    pub samples: Vec<Sample>,
}

#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn bulk_append_samples(&self, ops: Vec<AppendOp>) -> Result<(), Error>;
}

/// Owns the per-topic QueuedSamples maps and the single-flight flush tick.
/// `processing_batch` guards the flush against re-entry by a late tick, the
/// way the spec's "one logical task per critical region" requires without a
/// coordinator-wide mutex.
pub struct PersistenceBatcher {
    store: Arc<dyn PersistenceStore>,
    queues: DashMap<TopicName, VecDeque<Sample>>,
    processing_batch: AtomicBool,
}

impl PersistenceBatcher {
    pub fn new(store: Arc<dyn PersistenceStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            queues: DashMap::new(),
            processing_batch: AtomicBool::new(false),
        })
    }

    pub fn enqueue(&self, topic: TopicName, sample: Sample) {
        let mut queue = self.queues.entry(topic).or_default();
        queue.push_back(sample);
        while queue.len() > MAX_QUEUE_SIZE {
            queue.pop_front();
        }
    }

    pub fn queue_len(&self, topic: &TopicName) -> usize {
        self.queues.get(topic).map(|q| q.len()).unwrap_or(0)
    }

    /// Torn down synchronously on unsubscribe; buffered unflushed samples
    /// are discarded per contract.
    pub fn clear(&self, topic: &TopicName) {
        self.queues.remove(topic);
    }

    pub fn spawn_flush_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let batcher = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(BATCH_INTERVAL);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                ticker.tick().await;
                batcher.flush().await;
            }
        })
    }

    /// Runs one flush pass: for every topic with a non-empty queue, removes
    /// the first BATCH_SIZE samples and issues one upsert for them. Guarded
    /// against concurrent invocation; a tick arriving mid-flush is a no-op.
    pub async fn flush(&self) {
        if self
            .processing_batch
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let mut ops = Vec::new();
        for mut entry in self.queues.iter_mut() {
            let queue = entry.value_mut();
            if queue.is_empty() {
                continue;
            }
            let take = queue.len().min(BATCH_SIZE);
            let samples: Vec<Sample> = queue.drain(..take).collect();
            ops.push(AppendOp { topic: entry.key().clone(), samples });
        }

        futures::future::join_all(ops.into_iter().map(|op| {
            let store = self.store.clone();
            async move {
                let topic = op.topic.clone();
                if let Err(e) = store.bulk_append_samples(vec![op]).await {
                    error!(%topic, error = %e, "persistence batch failed");
                }
            }
        }))
        .await;

        self.processing_batch.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        appended: Mutex<Vec<AppendOp>>,
    }

    #[async_trait]
    impl PersistenceStore for FakeStore {
        async fn bulk_append_samples(&self, ops: Vec<AppendOp>) -> Result<(), Error> {
            self.appended.lock().unwrap().extend(ops);
            Ok(())
        }
    }

    fn sample(value: f64) -> Sample {
        Sample { value, timestamp: Utc::now() }
    }

    #[tokio::test]
    async fn batch_flush_persists_first_ten_and_keeps_remainder() {
        let store = Arc::new(FakeStore::default());
        let batcher = PersistenceBatcher::new(store.clone());
        let topic = TopicName::new("sensors/a").unwrap();

        for i in 1..=12 {
            batcher.enqueue(topic.clone(), sample(i as f64));
        }

        batcher.flush().await;

        {
            let appended = store.appended.lock().unwrap();
            assert_eq!(appended.len(), 1);
            assert_eq!(appended[0].samples.len(), 10);
            assert_eq!(appended[0].samples[0].value, 1.0);
            assert_eq!(appended[0].samples[9].value, 10.0);
        }

        assert_eq!(batcher.queue_len(&topic), 2);

        batcher.flush().await;
        let appended = store.appended.lock().unwrap();
        assert_eq!(appended.len(), 2);
        assert_eq!(appended[1].samples.len(), 2);
    }

    #[tokio::test]
    async fn drop_oldest_bounds_queue_at_max_size() {
        let store = Arc::new(FakeStore::default());
        let batcher = PersistenceBatcher::new(store);
        let topic = TopicName::new("t").unwrap();

        for i in 0..150 {
            batcher.enqueue(topic.clone(), sample(i as f64));
        }

        assert_eq!(batcher.queue_len(&topic), MAX_QUEUE_SIZE);
    }

    #[tokio::test]
    async fn concurrent_flush_is_single_flight() {
        let store = Arc::new(FakeStore::default());
        let batcher = PersistenceBatcher::new(store.clone());
        let topic = TopicName::new("t").unwrap();
        batcher.enqueue(topic.clone(), sample(1.0));

        let (a, b) = tokio::join!(batcher.flush(), batcher.flush());
        let _ = (a, b);

        assert_eq!(store.appended.lock().unwrap().len(), 1);
    }
}
