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

//! Authentication module for mqttea.
//!
//! This module provides pluggable authentication for MQTT connections:
//!
//! - [`CredentialsProvider`]: trait for providers that supply username + password
//! - [`TokenProvider`]: trait for providers that supply only a token
//! - [`TokenCredentialsProvider`]: combines a [`TokenProvider`] with a fixed username
//! - [`StaticCredentials`]: simple static username/password credentials
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mqttea::auth::StaticCredentials;
//! use mqttea::{MqtteaClient, ClientOptions};
//!
//! let credentials_provider = StaticCredentials::new("device-42", "s3cret");
//! let options = ClientOptions::default()
//!     .with_credentials_provider(Arc::new(credentials_provider));
//!
//! let client = MqtteaClient::new("broker.example.com", 8883, "my-client", Some(options)).await?;
//! ```

mod traits;

pub use traits::{CredentialsProvider, StaticCredentials, TokenCredentialsProvider, TokenProvider};
