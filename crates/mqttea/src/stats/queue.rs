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

// src/stats/queue.rs
// Queue statistics tracking for received message processing
// performance monitoring.
//
// Provides thread-safe atomic counters for tracking message
// processing pipeline health. Used to monitor queue depth,
// throughput, and error rates in real-time.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// QueueStats stores a snapshot of received message processing
// statistics.
#[derive(Debug, Clone)]
pub struct QueueStats {
    // pending_messages is count of messages waiting to be
    // processed (current queue depth)
    pub pending_messages: usize,
    // pending_bytes is total size of messages waiting to be
    // processed (current memory usage)
    pub pending_bytes: usize,
    // total_processed is count of messages successfully
    // handled since startup/reset
    pub total_processed: usize,
    // total_failed is count of messages that failed processing
    // since startup/reset.
    pub total_failed: usize,
    // total_bytes_processed is total size of messages
    // successfully handled (throughput metric).
    pub total_bytes_processed: usize,
    // total_dropped is the count of messages that were
    // dropped due to a full message queue.
    pub total_dropped: usize,
    // total_bytes_dropped is the total size of messages
    // dropped due to a full message queue.
    pub total_bytes_dropped: usize,
    // total_event_loop_errors is the number of times
    // a connection error was encountered in the asyncclient
    // event loop.
    pub total_event_loop_errors: usize,
    // total_unmatched_topics is the number of messages
    // received whose topic didn't have a registered handler
    // pattern match.
    pub total_unmatched_topics: usize,
}

// QueueStatsTracker enables thread-safe updates to queue
// statistics using atomic operations. Lock-free. Ensures
// statistics don't impact message processing performance.
#[derive(Debug)]
pub struct QueueStatsTracker {
    pending_count: Arc<AtomicUsize>,
    pending_bytes: Arc<AtomicUsize>,
    processed_count: Arc<AtomicUsize>,
    processed_bytes: Arc<AtomicUsize>,
    dropped_count: Arc<AtomicUsize>,
    dropped_bytes: Arc<AtomicUsize>,
    failed_count: Arc<AtomicUsize>,
    event_loop_errors: Arc<AtomicUsize>,
    unmatched_topics: Arc<AtomicUsize>,
}

impl Default for QueueStatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueStatsTracker {
    pub fn new() -> Self {
        Self {
            pending_count: Arc::new(AtomicUsize::new(0)),
            pending_bytes: Arc::new(AtomicUsize::new(0)),
            processed_count: Arc::new(AtomicUsize::new(0)),
            processed_bytes: Arc::new(AtomicUsize::new(0)),
            dropped_count: Arc::new(AtomicUsize::new(0)),
            dropped_bytes: Arc::new(AtomicUsize::new(0)),
            failed_count: Arc::new(AtomicUsize::new(0)),
            event_loop_errors: Arc::new(AtomicUsize::new(0)),
            unmatched_topics: Arc::new(AtomicUsize::new(0)),
        }
    }

    // increment_pending records a message entering the processing queue.
    pub fn increment_pending(&self, bytes: usize) {
        self.pending_count.fetch_add(1, Ordering::Relaxed);
        self.pending_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    // increment_dropped records a message dropped instead of queued,
    // e.g. on TrySendError::Full from the local message channel.
    pub fn increment_dropped(&self, bytes: usize) {
        self.dropped_count.fetch_add(1, Ordering::Relaxed);
        self.dropped_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn increment_event_loop_errors(&self) {
        self.event_loop_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unmatched_topics(&self) {
        self.unmatched_topics.fetch_add(1, Ordering::Relaxed);
    }

    // decrement_pending_increment_processed atomically moves a message
    // from pending to processed.
    pub fn decrement_pending_increment_processed(&self, bytes: usize) {
        self.pending_count.fetch_sub(1, Ordering::Relaxed);
        self.pending_bytes.fetch_sub(bytes, Ordering::Relaxed);
        self.processed_count.fetch_add(1, Ordering::Relaxed);
        self.processed_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    // decrement_pending_increment_failed atomically moves a message
    // from pending to failed.
    pub fn decrement_pending_increment_failed(&self, bytes: usize) {
        self.pending_count.fetch_sub(1, Ordering::Relaxed);
        self.pending_bytes.fetch_sub(bytes, Ordering::Relaxed);
        self.failed_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_empty(&self) -> bool {
        self.pending_count.load(Ordering::Relaxed) == 0
    }

    // reset_counters clears processed/failed/dropped/error counters back
    // to zero. Pending counts aren't reset since they reflect live state.
    pub fn reset_counters(&self) {
        self.processed_count.store(0, Ordering::Relaxed);
        self.processed_bytes.store(0, Ordering::Relaxed);
        self.dropped_count.store(0, Ordering::Relaxed);
        self.dropped_bytes.store(0, Ordering::Relaxed);
        self.failed_count.store(0, Ordering::Relaxed);
        self.event_loop_errors.store(0, Ordering::Relaxed);
        self.unmatched_topics.store(0, Ordering::Relaxed);
    }

    pub fn to_stats(&self) -> QueueStats {
        QueueStats {
            pending_messages: self.pending_count.load(Ordering::Relaxed),
            pending_bytes: self.pending_bytes.load(Ordering::Relaxed),
            total_processed: self.processed_count.load(Ordering::Relaxed),
            total_failed: self.failed_count.load(Ordering::Relaxed),
            total_bytes_processed: self.processed_bytes.load(Ordering::Relaxed),
            total_bytes_dropped: self.dropped_bytes.load(Ordering::Relaxed),
            total_dropped: self.dropped_count.load(Ordering::Relaxed),
            total_event_loop_errors: self.event_loop_errors.load(Ordering::Relaxed),
            total_unmatched_topics: self.unmatched_topics.load(Ordering::Relaxed),
        }
    }
}
