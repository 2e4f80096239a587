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

// src/error.rs
// Error taxonomy for the ingest coordinator, one variant per external
// collaborator failure mode (mirrors mqttea::errors::MqtteaClientError).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("mqtt client error: {0}")]
    Mqtt(#[from] mqttea::MqtteaClientError),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("mail gateway error: {0}")]
    Mail(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("topic {0:?} is empty")]
    EmptyTopic(String),
}

pub type Result<T> = std::result::Result<T, Error>;
