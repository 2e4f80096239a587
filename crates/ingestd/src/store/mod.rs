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

// src/store/mod.rs
// Reference implementations of the coordinator's external-collaborator
// traits. sqlite stands in for the external directory/threshold/samples
// database; mail stands in for the external SMTP gateway.

pub mod mail;
pub mod sqlite;

pub use mail::LogMailGateway;
pub use sqlite::{SqliteDirectoryStore, SqlitePersistenceStore, SqliteThresholdStore};
