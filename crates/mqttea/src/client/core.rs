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

// src/client/core.rs
// Main MQTT client implementation: connection lifecycle, reconnect backoff,
// and raw topic+payload message dispatch.
//
// Message decoding is left entirely to the caller's handler callback -- this
// client only ever deals in (topic, payload bytes). Connection lifecycle is
// broadcast via a watch channel so a caller that owns topic subscriptions
// (e.g. an ingest coordinator) can resubscribe after a reconnect without
// this client needing to track subscription state itself.

use std::pin::Pin;
use std::sync::Arc;

use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, NetworkOptions, Packet, QoS, Transport, TlsConfiguration,
};
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::auth::CredentialsProvider;
use crate::client::options::{ClientOptions, ClientTlsConfig, PublishOptions};
use crate::errors::MqtteaClientError;
use crate::stats::{QueueStats, QueueStatsTracker};

const DEFAULT_KEEP_ALIVE: std::time::Duration = std::time::Duration::from_secs(300);
const DEFAULT_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);
const DEFAULT_QOS: QoS = QoS::AtLeastOnce;
const DEFAULT_RETAIN: bool = false;
const DEFAULT_MESSAGE_CHANNEL_CAPACITY: usize = 1000;
const DEFAULT_CLIENT_QUEUE_SIZE: usize = 5000;

// ConnectionState is the connection lifecycle of the underlying event loop.
// Subscribe with MqtteaClient::connection_state() to react to reconnects
// (e.g. to resubscribe topics the caller owns).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Offline,
}

type RawHandler =
    Arc<dyn Fn(String, Vec<u8>) -> Pin<Box<dyn std::future::Future<Output = ()> + Send>> + Send + Sync>;

struct RawMessage {
    topic: String,
    payload: Vec<u8>,
}

// MqtteaClient wraps a rumqttc AsyncClient/EventLoop pair with reconnect
// backoff, credential refresh on reconnect, and raw message dispatch.
pub struct MqtteaClient {
    // client is the underlying MQTT client for actual network communication.
    client: Arc<AsyncClient>,
    // client_id is passed to rumqttc::AsyncClient, which doesn't expose it
    // back to us, so we keep a copy for logging/identification.
    client_id: String,
    // event_loop is stored to be taken in connect().
    event_loop: Arc<Mutex<Option<EventLoop>>>,
    client_options: Option<ClientOptions>,
    // credentials_provider is kept to refresh credentials on reconnection.
    credentials_provider: Option<Arc<dyn CredentialsProvider>>,
    // handler is the single raw (topic, payload) callback registered via
    // on_message. There is one handler per client; routing within it is the
    // caller's responsibility.
    handler: Arc<RwLock<Option<RawHandler>>>,
    queue_stats: Arc<QueueStatsTracker>,
    connection_state_tx: watch::Sender<ConnectionState>,
}

impl MqtteaClient {
    // new creates a new MQTT client. Call connect() after registering a
    // handler with on_message() to begin processing messages.
    //
    // This is async because credentials may need to be fetched from a
    // credentials provider before the first connection attempt.
    pub async fn new(
        broker_host: &str,
        broker_port: u16,
        client_id: &str,
        client_options: Option<ClientOptions>,
    ) -> Result<Arc<Self>, MqtteaClientError> {
        let mut mqtt_options = MqttOptions::new(client_id, broker_host, broker_port);
        mqtt_options.set_keep_alive(
            client_options
                .as_ref()
                .and_then(|opts| opts.keep_alive)
                .unwrap_or(DEFAULT_KEEP_ALIVE),
        );
        mqtt_options.set_clean_session(
            client_options
                .as_ref()
                .and_then(|opts| opts.clean_session)
                .unwrap_or(false),
        );

        if let Some(tls_config) = client_options.as_ref().and_then(|opts| opts.tls_config.clone()) {
            mqtt_options.set_transport(Transport::Tls(build_tls_configuration(tls_config)?));
        }

        if let Some(provider) = client_options
            .as_ref()
            .and_then(|opts| opts.credentials_provider.as_ref())
        {
            let credentials = provider.get_credentials().await?;
            mqtt_options.set_credentials(credentials.username, credentials.password);
        }

        let (client, mut event_loop) = AsyncClient::new(
            mqtt_options,
            client_options
                .as_ref()
                .and_then(|opts| opts.message_channel_capacity)
                .unwrap_or(DEFAULT_MESSAGE_CHANNEL_CAPACITY),
        );

        let mut network_options = NetworkOptions::new();
        network_options.set_connection_timeout(
            client_options
                .as_ref()
                .and_then(|opts| opts.connect_timeout)
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT)
                .as_secs(),
        );
        event_loop.set_network_options(network_options);

        let queue_stats = Arc::new(QueueStatsTracker::new());
        let credentials_provider = client_options
            .as_ref()
            .and_then(|opts| opts.credentials_provider.clone());
        let (connection_state_tx, _) = watch::channel(ConnectionState::Disconnected);

        info!("Created MQTT client for {}:{}", broker_host, broker_port);

        Ok(Arc::new(Self {
            client: Arc::new(client),
            client_id: client_id.into(),
            event_loop: Arc::new(Mutex::new(Some(event_loop))),
            client_options,
            credentials_provider,
            handler: Arc::new(RwLock::new(None)),
            queue_stats,
            connection_state_tx,
        }))
    }

    // connect connects and starts the event loop for both listening and
    // sending. Spawns two background tasks: one driving the rumqttc event
    // loop and pushing incoming publishes into a local channel, and one
    // draining that channel into the registered handler.
    pub async fn connect(self: &Arc<Self>) -> Result<(), MqtteaClientError> {
        self.clone().start_internal().await
    }

    async fn start_internal(self: Arc<Self>) -> Result<(), MqtteaClientError> {
        let mut event_loop = self
            .event_loop
            .lock()
            .await
            .take()
            .ok_or(MqtteaClientError::AlreadyStartedError)?;

        let (message_queue_tx, mut message_queue_rx) = mpsc::channel::<RawMessage>(
            self.client_options
                .as_ref()
                .and_then(|opts| opts.client_queue_size)
                .unwrap_or(DEFAULT_CLIENT_QUEUE_SIZE),
        );

        let queue_stats_producer = self.queue_stats.clone();
        let credentials_provider = self.credentials_provider.clone();
        let connection_state_tx = self.connection_state_tx.clone();
        let mut backoff_strategy = SuperBasicBackoff::new();

        let _ = connection_state_tx.send(ConnectionState::Connecting);

        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        let _ = connection_state_tx.send(ConnectionState::Connected);
                        backoff_strategy.reset();
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let payload_size = publish.payload.len();
                        let msg = RawMessage {
                            topic: publish.topic.clone(),
                            payload: publish.payload.to_vec(),
                        };
                        match message_queue_tx.try_send(msg) {
                            Ok(_) => {
                                queue_stats_producer.increment_pending(payload_size);
                            }
                            Err(mpsc::error::TrySendError::Full(_)) => {
                                warn!(
                                    "Message queue full, dropping message from topic: {}",
                                    publish.topic
                                );
                                queue_stats_producer.increment_dropped(payload_size);
                            }
                            Err(mpsc::error::TrySendError::Closed(_)) => {
                                error!("Message receiver has been dropped");
                                break;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT event loop connection error: {:?}", e);
                        queue_stats_producer.increment_event_loop_errors();
                        let _ = connection_state_tx.send(ConnectionState::Reconnecting);

                        // Refresh credentials before the next reconnect attempt so we
                        // always present fresh tokens (e.g. OAuth2) on the wire.
                        if let Some(ref provider) = credentials_provider {
                            match provider.get_credentials().await {
                                Ok(credentials) => {
                                    debug!("Refreshed credentials for reconnection");
                                    event_loop
                                        .mqtt_options
                                        .set_credentials(credentials.username, credentials.password);
                                }
                                Err(cred_err) => {
                                    error!("Failed to refresh credentials for reconnection: {cred_err}");
                                }
                            }
                        }

                        let delay = backoff_strategy.next_delay();
                        if delay >= backoff_strategy.max {
                            let _ = connection_state_tx.send(ConnectionState::Offline);
                        }
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        });

        let handler = self.handler.clone();
        let queue_stats_processor = self.queue_stats.clone();
        tokio::spawn(async move {
            while let Some(msg) = message_queue_rx.recv().await {
                let payload_size = msg.payload.len();
                let handler_guard = handler.read().await;
                if let Some(handler_fn) = handler_guard.as_ref() {
                    let handler_fn = handler_fn.clone();
                    drop(handler_guard);
                    handler_fn(msg.topic, msg.payload).await;
                    queue_stats_processor.decrement_pending_increment_processed(payload_size);
                } else {
                    drop(handler_guard);
                    warn!("No handler registered; dropping message on topic '{}'", msg.topic);
                    queue_stats_processor.decrement_pending_increment_failed(payload_size);
                }
            }
        });

        info!("MQTT client started and processing messages");
        Ok(())
    }

    // on_message registers the single raw (topic, payload) callback invoked
    // for every received publish. Registering a new handler replaces the
    // previous one.
    pub async fn on_message<F, Fut>(&self, handler: F)
    where
        F: Fn(String, Vec<u8>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let wrapped: RawHandler = Arc::new(move |topic, payload| Box::pin(handler(topic, payload)));
        *self.handler.write().await = Some(wrapped);
    }

    // subscribe subscribes to a topic (or topic filter) with the given QoS.
    pub async fn subscribe(&self, topic: &str, qos: QoS) -> Result<(), MqtteaClientError> {
        self.client
            .subscribe(topic, qos)
            .await
            .map_err(MqtteaClientError::ConnectionError)?;
        info!("Subscribed to topic: {} (QoS: {:?})", topic, qos);
        Ok(())
    }

    // unsubscribe removes a previously-subscribed topic filter.
    pub async fn unsubscribe(&self, topic: &str) -> Result<(), MqtteaClientError> {
        self.client
            .unsubscribe(topic)
            .await
            .map_err(MqtteaClientError::ConnectionError)?;
        info!("Unsubscribed from topic: {}", topic);
        Ok(())
    }

    pub async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), MqtteaClientError> {
        self.publish_with_opts(
            topic,
            self.client_options.as_ref().and_then(|opts| opts.publish_options),
            payload,
        )
        .await
    }

    // publish_with_opts sends raw bytes to the specified MQTT topic,
    // falling back to the client-wide PublishOptions and then to hardcoded
    // defaults for any field left unset.
    pub async fn publish_with_opts(
        &self,
        topic: &str,
        publish_options: Option<PublishOptions>,
        payload: Vec<u8>,
    ) -> Result<(), MqtteaClientError> {
        let qos = publish_options
            .and_then(|opts| opts.qos)
            .or_else(|| {
                self.client_options
                    .as_ref()
                    .and_then(|client_opts| client_opts.publish_options)
                    .and_then(|opts| opts.qos)
            })
            .unwrap_or(DEFAULT_QOS);
        let retain = publish_options
            .and_then(|opts| opts.retain)
            .or_else(|| {
                self.client_options
                    .as_ref()
                    .and_then(|client_opts| client_opts.publish_options)
                    .and_then(|opts| opts.retain)
            })
            .unwrap_or(DEFAULT_RETAIN);

        self.client
            .publish(topic, qos, retain, payload)
            .await
            .map_err(MqtteaClientError::ConnectionError)?;
        debug!("Published message to topic: {}", topic);
        Ok(())
    }

    // disconnect gracefully shuts down the MQTT client connection.
    pub async fn disconnect(&self) -> Result<(), MqtteaClientError> {
        self.client
            .disconnect()
            .await
            .map_err(MqtteaClientError::ConnectionError)?;
        let _ = self.connection_state_tx.send(ConnectionState::Disconnected);
        info!("MQTT client disconnected");
        Ok(())
    }

    pub fn client_id(&self) -> String {
        self.client_id.clone()
    }

    // connection_state returns a watch::Receiver that observes connection
    // lifecycle transitions. Callers that own topic subscriptions should
    // watch this to resubscribe after a Reconnecting -> Connected edge.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.connection_state_tx.subscribe()
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue_stats.to_stats()
    }

    pub fn is_queue_empty(&self) -> bool {
        self.queue_stats.is_empty()
    }

    // wait_for_queue_empty blocks until all queued messages are processed.
    pub async fn wait_for_queue_empty(&self) {
        while !self.is_queue_empty() {
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        }
    }

    pub fn reset_stats(&self) {
        self.queue_stats.reset_counters();
    }
}

fn build_tls_configuration(tls_config: ClientTlsConfig) -> Result<TlsConfiguration, MqtteaClientError> {
    let client_auth = match tls_config.client_identity {
        Some(identity) => Some((identity.certificate, identity.private_key)),
        None => None,
    };
    Ok(TlsConfiguration::Simple {
        ca: tls_config.ca_certificate,
        alpn: None,
        client_auth,
    })
}

// SuperBasicBackoff backs off event-loop reconnect attempts. Starts at
// 100ms, doubles up to a 30s ceiling.
struct SuperBasicBackoff {
    current: std::time::Duration,
    max: std::time::Duration,
}

impl SuperBasicBackoff {
    fn new() -> Self {
        Self {
            current: std::time::Duration::from_millis(100),
            max: std::time::Duration::from_secs(30),
        }
    }

    fn next_delay(&mut self) -> std::time::Duration {
        let delay = self.current;
        self.current = std::cmp::min(self.current * 2, self.max);
        warn!("Message event loop backoff updated: {}ms", delay.as_millis());
        delay
    }

    fn reset(&mut self) {
        self.current = std::time::Duration::from_millis(100);
    }
}
