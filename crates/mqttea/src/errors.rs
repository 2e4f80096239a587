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

// src/errors.rs
// Error types for the mqttea client. Trimmed to the raw-payload wrapper's
// actual failure modes (no typed message registry in this build).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MqtteaClientError {
    // ConnectionError occurs when MQTT broker communication fails
    // (network issues, auth failures).
    #[error("MQTT connection error: {0}")]
    ConnectionError(#[from] rumqttc::ClientError),
    // AlreadyStartedError occurs when connect() has already
    // been called on the client.
    #[error("already started: connect() has already been called on the client")]
    AlreadyStartedError,
    // CredentialsError occurs when fetching credentials from a provider fails.
    #[error("credentials provider error: {0}")]
    CredentialsError(String),
    // TlsConfigError occurs when the supplied TLS material can't be parsed.
    #[error("TLS configuration error: {0}")]
    TlsConfigError(String),
}

impl MqtteaClientError {
    pub fn credentials_error(message: impl Into<String>) -> Self {
        Self::CredentialsError(message.into())
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}
