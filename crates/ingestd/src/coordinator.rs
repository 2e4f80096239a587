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

// src/coordinator.rs
// Wires the MQTT transport to the ingest pipeline: decode -> latest-message
// update -> batch-enqueue -> threshold-evaluate, and owns the set of
// subscribed topics so a reconnect can re-subscribe them.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use mqttea::{ConnectionState, MqtteaClient, QoS};
use tracing::error;

use crate::constants::PAYLOAD_SAMPLE_CUTOFF_BYTES;
use crate::decode::{DecodedPayload, decode};
use crate::error::{Error, Result};
use crate::evaluator::ThresholdEvaluator;
use crate::model::{LatestMessage, Sample, ThresholdConfig, TopicName};
use crate::persistence::PersistenceBatcher;
use crate::thresholds::ThresholdRegistry;

/// Subscribe QoS for every topic the coordinator owns; not currently
/// configurable since the spec doesn't distinguish per-topic QoS.
const SUBSCRIBE_QOS: QoS = QoS::AtLeastOnce;

pub struct Coordinator {
    mqtt: Arc<MqtteaClient>,
    batcher: Arc<PersistenceBatcher>,
    evaluator: Arc<ThresholdEvaluator>,
    thresholds: Arc<ThresholdRegistry>,
    latest: DashMap<TopicName, LatestMessage>,
    subscribed: DashMap<TopicName, ()>,
}

impl Coordinator {
    pub fn new(
        mqtt: Arc<MqtteaClient>,
        batcher: Arc<PersistenceBatcher>,
        evaluator: Arc<ThresholdEvaluator>,
        thresholds: Arc<ThresholdRegistry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            mqtt,
            batcher,
            evaluator,
            thresholds,
            latest: DashMap::new(),
            subscribed: DashMap::new(),
        })
    }

    /// Registers the ingress handler, connects, and starts the reconnect
    /// watcher. Call once at startup.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let coordinator = self.clone();
        self.mqtt
            .on_message(move |topic, payload| {
                let coordinator = coordinator.clone();
                async move { coordinator.handle_message(topic, payload).await }
            })
            .await;

        self.mqtt.connect().await.map_err(Error::Mqtt)?;
        self.spawn_resubscribe_watcher();
        Ok(())
    }

    async fn handle_message(&self, topic: String, payload: Vec<u8>) {
        let Ok(topic) = TopicName::new(topic) else {
            return;
        };
        let now = Utc::now();

        self.latest.insert(
            topic.clone(),
            LatestMessage { payload: String::from_utf8_lossy(&payload).into_owned(), timestamp: now },
        );

        if payload.len() >= PAYLOAD_SAMPLE_CUTOFF_BYTES {
            return;
        }

        if let DecodedPayload::Number(value) = decode(&payload) {
            self.batcher.enqueue(topic.clone(), Sample { value, timestamp: now });
            self.evaluator.evaluate(&topic, value, now).await;
        }
    }

    pub async fn subscribe_to_topic(&self, topic: TopicName) -> Result<()> {
        self.mqtt.subscribe(topic.as_str(), SUBSCRIBE_QOS).await.map_err(Error::Mqtt)?;
        self.subscribed.insert(topic, ());
        Ok(())
    }

    pub async fn unsubscribe_from_topic(&self, topic: &TopicName) -> Result<()> {
        self.mqtt.unsubscribe(topic.as_str()).await.map_err(Error::Mqtt)?;
        self.subscribed.remove(topic);
        self.batcher.clear(topic);
        self.evaluator.clear_topic(topic);
        self.latest.remove(topic);
        Ok(())
    }

    pub fn is_topic_subscribed(&self, topic: &TopicName) -> bool {
        self.subscribed.contains_key(topic)
    }

    pub fn get_latest_live_message(&self, topic: &TopicName) -> Option<LatestMessage> {
        self.latest.get(topic).map(|entry| entry.value().clone())
    }

    pub async fn update_thresholds(&self, topic: &TopicName, levels: ThresholdConfig) {
        self.thresholds.update_thresholds(topic, levels).await;
    }

    /// Watches the transport's connection state and re-subscribes every
    /// owned topic on each transition into `Connected`, covering both the
    /// first connect and any reconnect after a drop.
    fn spawn_resubscribe_watcher(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let coordinator = self.clone();
        let mut state_rx = self.mqtt.connection_state();
        tokio::spawn(async move {
            let mut previous = *state_rx.borrow();
            while state_rx.changed().await.is_ok() {
                let current = *state_rx.borrow();
                if current == ConnectionState::Connected && previous != ConnectionState::Connected {
                    for entry in coordinator.subscribed.iter() {
                        let topic = entry.key().clone();
                        if let Err(e) = coordinator.mqtt.subscribe(topic.as_str(), SUBSCRIBE_QOS).await {
                            error!(%topic, error = %e, "resubscribe after reconnect failed");
                        }
                    }
                }
                previous = current;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{DirectoryStore, RecipientDirectory};
    use crate::email::EmailQueue;
    use crate::persistence::{AppendOp, PersistenceStore};
    use crate::thresholds::ThresholdStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EmptyDirectoryStore;

    #[async_trait]
    impl DirectoryStore for EmptyDirectoryStore {
        async fn employees_by_topic(&self, _topic: &TopicName) -> std::result::Result<Vec<String>, Error> {
            Ok(vec![])
        }
        async fn supervisors_by_topic(&self, _topic: &TopicName) -> std::result::Result<Vec<String>, Error> {
            Ok(vec![])
        }
    }

    struct EmptyThresholdStore;

    #[async_trait]
    impl ThresholdStore for EmptyThresholdStore {
        async fn load_thresholds(
            &self,
            _topic: &TopicName,
        ) -> std::result::Result<Option<ThresholdConfig>, Error> {
            Ok(None)
        }
        async fn upsert_thresholds(&self, _topic: &TopicName, _levels: ThresholdConfig) -> std::result::Result<(), Error> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        appended: Mutex<Vec<AppendOp>>,
    }

    #[async_trait]
    impl PersistenceStore for RecordingStore {
        async fn bulk_append_samples(&self, ops: Vec<AppendOp>) -> std::result::Result<(), Error> {
            self.appended.lock().unwrap().extend(ops);
            Ok(())
        }
    }

    async fn fixture() -> (Arc<Coordinator>, Arc<RecordingStore>) {
        let mqtt = MqtteaClient::new("127.0.0.1", 1883, "test-client", None).await.unwrap();
        let store = Arc::new(RecordingStore::default());
        let batcher = PersistenceBatcher::new(store.clone());
        let registry = ThresholdRegistry::new(Arc::new(EmptyThresholdStore));
        let directory = Arc::new(RecipientDirectory::new(Arc::new(EmptyDirectoryStore)));
        let mail_gateway: Arc<dyn crate::email::MailGateway> = Arc::new(NoopGateway);
        let email_queue = EmailQueue::new(mail_gateway);
        let evaluator = Arc::new(ThresholdEvaluator::new(registry.clone(), directory, email_queue));
        let coordinator = Coordinator::new(mqtt, batcher, evaluator, registry);
        (coordinator, store)
    }

    struct NoopGateway;

    #[async_trait]
    impl crate::email::MailGateway for NoopGateway {
        async fn send_mail(&self, _recipient: &str, _subject: &str, _body: &str) -> std::result::Result<(), Error> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn decodable_payload_updates_latest_and_batches() {
        let (coordinator, store) = fixture().await;
        let topic = TopicName::new("sensors/a").unwrap();

        coordinator.handle_message(topic.to_string(), b"42.5".to_vec()).await;

        let latest = coordinator.get_latest_live_message(&topic).unwrap();
        assert_eq!(latest.payload, "42.5");
        assert_eq!(coordinator.batcher.queue_len(&topic), 1);

        coordinator.batcher.flush().await;
        assert_eq!(store.appended.lock().unwrap()[0].samples[0].value, 42.5);
    }

    #[tokio::test]
    async fn oversized_payload_updates_latest_but_is_not_batched() {
        let (coordinator, _store) = fixture().await;
        let topic = TopicName::new("sensors/a").unwrap();
        let big_payload = vec![b'9'; PAYLOAD_SAMPLE_CUTOFF_BYTES];

        coordinator.handle_message(topic.to_string(), big_payload).await;

        assert!(coordinator.get_latest_live_message(&topic).is_some());
        assert_eq!(coordinator.batcher.queue_len(&topic), 0);
    }

    #[tokio::test]
    async fn subscribe_and_unsubscribe_track_membership_and_clear_state() {
        let (coordinator, _store) = fixture().await;
        let topic = TopicName::new("sensors/a").unwrap();

        coordinator.subscribe_to_topic(topic.clone()).await.unwrap();
        assert!(coordinator.is_topic_subscribed(&topic));

        coordinator.handle_message(topic.to_string(), b"1.0".to_vec()).await;
        assert_eq!(coordinator.batcher.queue_len(&topic), 1);

        coordinator.unsubscribe_from_topic(&topic).await.unwrap();
        assert!(!coordinator.is_topic_subscribed(&topic));
        assert_eq!(coordinator.batcher.queue_len(&topic), 0);
        assert!(coordinator.get_latest_live_message(&topic).is_none());
    }
}
