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

// src/main.rs
// Bootstraps logging and configuration, wires the coordinator's
// collaborators to their sqlite/SMTP-stub reference implementations, and
// runs it against the topics named in config.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ingestd::config::Config;
use ingestd::coordinator::Coordinator;
use ingestd::email::EmailQueue;
use ingestd::evaluator::ThresholdEvaluator;
use ingestd::model::TopicName;
use ingestd::persistence::PersistenceBatcher;
use ingestd::store::{LogMailGateway, SqliteDirectoryStore, SqlitePersistenceStore, SqliteThresholdStore};
use ingestd::thresholds::ThresholdRegistry;
use mqttea::{ClientOptions, MqtteaClient};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "ingestd")]
#[command(about = "Telemetry-ingest coordinator: MQTT subscriber, threshold evaluator, alert dispatcher")]
struct Cli {
    /// Path to a TOML config file; falls back to built-in defaults and
    /// INGESTD_-prefixed environment variables.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();
    tracing_subscriber::registry().with(tracing_subscriber::fmt::layer()).with(env_filter).init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    tracing::info!(?config, "starting ingestd");

    let pool = ingestd::store::sqlite::connect(&config.database_url).await?;
    let directory = Arc::new(ingestd::directory::RecipientDirectory::new(Arc::new(SqliteDirectoryStore::new(
        pool.clone(),
    ))));
    let thresholds = ThresholdRegistry::new(Arc::new(SqliteThresholdStore::new(pool.clone())));
    thresholds.spawn_full_flush();

    let batcher = PersistenceBatcher::new(Arc::new(SqlitePersistenceStore::new(pool)));
    batcher.spawn_flush_loop();

    let email_queue = EmailQueue::new(Arc::new(LogMailGateway));
    email_queue.clone().spawn_worker();

    let evaluator = Arc::new(ThresholdEvaluator::new(thresholds.clone(), directory, email_queue));

    let mqtt = MqtteaClient::new(
        &config.mqtt_broker_host,
        config.mqtt_broker_port,
        &config.mqtt_client_id,
        Some(ClientOptions::default()),
    )
    .await?;

    let coordinator = Coordinator::new(mqtt, batcher, evaluator, thresholds);
    coordinator.start().await?;

    for topic in &config.topics {
        let topic = TopicName::new(topic.clone())?;
        coordinator.subscribe_to_topic(topic).await?;
    }

    tracing::info!("ingestd running; awaiting messages");
    std::future::pending::<()>().await;
    Ok(())
}
