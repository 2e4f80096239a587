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

// src/constants.rs
// Bit-exact constants from the external interface contract.

use std::time::Duration;

/// Samples removed from a topic's queue and persisted per flush tick.
pub const BATCH_SIZE: usize = 10;
/// Interval between persistence-flush ticks.
pub const BATCH_INTERVAL: Duration = Duration::from_millis(1000);
/// Upper bound on a topic's queued-sample backlog; oldest entries are
/// dropped once exceeded.
pub const MAX_QUEUE_SIZE: usize = 100;
/// Retry cap for a pending email; the item is dropped once exceeded.
pub const MAX_MAIL_RETRIES: u32 = 3;
/// Minimum delay before a retried email becomes eligible for redispatch.
pub const MAIL_RETRY_DELAY: Duration = Duration::from_millis(1000);
/// Minimum elapsed time between two alerts for an already-triggered level.
pub const THRESHOLD_COOLDOWN_PERIOD: Duration = Duration::from_millis(30_000);
/// TTL for cached recipient lookups.
pub const RECIPIENTS_CACHE_TTL: Duration = Duration::from_secs(3600);
/// TTL for cached threshold configs.
pub const THRESHOLDS_CACHE_TTL: Duration = Duration::from_secs(1800);
/// Interval at which the entire threshold cache is dropped, covering
/// out-of-band writes to the external store that per-write invalidation
/// can't see.
pub const THRESHOLDS_CACHE_FULL_FLUSH: Duration = Duration::from_secs(120);
/// Payloads at or above this size are treated as non-sample traffic and
/// skip batching/threshold evaluation, though LatestMessage still updates.
pub const PAYLOAD_SAMPLE_CUTOFF_BYTES: usize = 100;
/// Idle wait when the email queue worker finds nothing eligible to send.
pub const EMAIL_WORKER_IDLE_POLL: Duration = Duration::from_millis(100);
