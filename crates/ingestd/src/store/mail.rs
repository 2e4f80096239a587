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

// src/store/mail.rs
// The concrete SMTP server is out of scope; this gateway logs the dispatch
// intent instead of actually sending mail, standing in for a real transport
// (e.g. lettre over SMTP) the way a production deployment would supply.

use async_trait::async_trait;
use tracing::info;

use crate::email::MailGateway;
use crate::error::Error;

pub struct LogMailGateway;

#[async_trait]
impl MailGateway for LogMailGateway {
    async fn send_mail(&self, recipient: &str, subject: &str, body: &str) -> Result<(), Error> {
        info!(recipient, subject, body, "dispatching alert email");
        Ok(())
    }
}
