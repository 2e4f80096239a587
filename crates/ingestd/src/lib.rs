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

// src/lib.rs
// Telemetry-ingest coordinator: subscribes to MQTT topics, decodes numeric
// samples, batches them into a durable store, evaluates a per-topic
// threshold ladder with hysteresis/cooldown, and dispatches retrying alert
// emails.

pub mod config;
pub mod constants;
pub mod coordinator;
pub mod decode;
pub mod directory;
pub mod email;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod persistence;
pub mod store;
pub mod thresholds;

pub use config::Config;
pub use coordinator::Coordinator;
pub use error::{Error, Result};
