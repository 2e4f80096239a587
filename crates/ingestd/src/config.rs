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

// src/config.rs
// Typed configuration: built-in defaults, overridden by an optional TOML
// file, overridden by `INGESTD_`-prefixed environment variables.

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt_broker_host: String,
    pub mqtt_broker_port: u16,
    pub mqtt_client_id: String,
    pub database_url: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt_broker_host: "localhost".into(),
            mqtt_broker_port: 1883,
            mqtt_client_id: "ingestd".into(),
            database_url: "sqlite://ingestd.db".into(),
            topics: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(config_path: Option<&Path>) -> Result<Self, Error> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }
        figment = figment.merge(Env::prefixed("INGESTD_"));
        figment.extract().map_err(|e| Error::Config(e.to_string()))
    }
}
