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

// src/email.rs
// FIFO retry queue for outbound alert emails. A background worker drains
// eligible items, dispatching every recipient of an item concurrently;
// a single recipient failure fails the whole item and re-queues it with
// bumped retry bookkeeping. Driven by a Notify rather than a fixed poll
// interval so a freshly enqueued item is dispatched without waiting out
// an idle tick.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::warn;

use crate::constants::{EMAIL_WORKER_IDLE_POLL, MAIL_RETRY_DELAY, MAX_MAIL_RETRIES};
use crate::error::Error;
use crate::model::PendingEmail;

#[async_trait]
pub trait MailGateway: Send + Sync {
    async fn send_mail(&self, recipient: &str, subject: &str, body: &str) -> Result<(), Error>;
}

pub struct EmailQueue {
    queue: Mutex<VecDeque<PendingEmail>>,
    notify: Notify,
    gateway: Option<Arc<dyn MailGateway>>,
}

impl EmailQueue {
    pub fn new(gateway: Arc<dyn MailGateway>) -> Arc<Self> {
        Arc::new(Self { queue: Mutex::new(VecDeque::new()), notify: Notify::new(), gateway: Some(gateway) })
    }

    /// Builds a queue with no gateway and no running worker, for callers
    /// that only need to enqueue and inspect items (evaluator tests).
    #[cfg(test)]
    pub fn new_unstarted() -> Self {
        Self { queue: Mutex::new(VecDeque::new()), notify: Notify::new(), gateway: None }
    }

    pub async fn enqueue(&self, email: PendingEmail) {
        self.queue.lock().await.push_back(email);
        self.notify.notify_one();
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }

    #[cfg(test)]
    pub async fn drain_for_test(&self) -> Vec<PendingEmail> {
        self.queue.lock().await.drain(..).collect()
    }

    pub fn spawn_worker(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run_worker().await })
    }

    async fn run_worker(&self) {
        loop {
            if !self.dispatch_round().await {
                tokio::select! {
                    _ = self.notify.notified() => {}
                    _ = tokio::time::sleep(EMAIL_WORKER_IDLE_POLL) => {}
                }
            }
        }
    }

    /// Pops every currently-eligible item off the front of the queue and
    /// dispatches all of them concurrently. Returns whether anything was
    /// dispatched this round, so the worker knows whether to idle-wait.
    pub async fn dispatch_round(&self) -> bool {
        let mut batch = Vec::new();
        {
            let mut queue = self.queue.lock().await;
            loop {
                match queue.front() {
                    None => break,
                    Some(head) => {
                        if head.retries >= MAX_MAIL_RETRIES {
                            let dropped = queue.pop_front().unwrap();
                            warn!(subject = %dropped.subject, retries = dropped.retries, "dropping email after exceeding retry cap");
                            continue;
                        }
                        if head.retries > 0 && tokio::time::Instant::now() < head.next_eligible {
                            break;
                        }
                        batch.push(queue.pop_front().unwrap());
                    }
                }
            }
        }

        if batch.is_empty() {
            return false;
        }

        let gateway = self.gateway.clone().expect("email queue worker requires a configured gateway");
        let retries = futures::future::join_all(batch.into_iter().map(|mut email| {
            let gateway = gateway.clone();
            async move {
                let outcomes = futures::future::join_all(email.recipients.iter().map(|recipient| {
                    let gateway = gateway.clone();
                    let recipient = recipient.clone();
                    let subject = email.subject.clone();
                    let body = email.body.clone();
                    async move { gateway.send_mail(&recipient, &subject, &body).await }
                }))
                .await;

                if outcomes.iter().all(Result::is_ok) {
                    None
                } else {
                    email.retries += 1;
                    email.next_eligible = tokio::time::Instant::now() + MAIL_RETRY_DELAY;
                    Some(email)
                }
            }
        }))
        .await;

        let mut queue = self.queue.lock().await;
        for retry in retries.into_iter().flatten() {
            queue.push_back(retry);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Always succeeds for "a"; fails the first two calls for "b", then
    /// succeeds.
    #[derive(Default)]
    struct FlakyGateway {
        b_calls: AtomicUsize,
    }

    #[async_trait]
    impl MailGateway for FlakyGateway {
        async fn send_mail(&self, recipient: &str, _subject: &str, _body: &str) -> Result<(), Error> {
            if recipient != "b" {
                return Ok(());
            }
            let call = self.b_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= 2 {
                Err(Error::Mail("smtp unavailable".into()))
            } else {
                Ok(())
            }
        }
    }

    struct AlwaysFailsGateway;

    #[async_trait]
    impl MailGateway for AlwaysFailsGateway {
        async fn send_mail(&self, _recipient: &str, _subject: &str, _body: &str) -> Result<(), Error> {
            Err(Error::Mail("smtp unavailable".into()))
        }
    }

    fn email(recipients: &[&str]) -> PendingEmail {
        PendingEmail {
            recipients: recipients.iter().map(|s| s.to_string()).collect(),
            subject: "Warning: t Threshold Exceeded".into(),
            body: "body".into(),
            retries: 0,
            next_eligible: tokio::time::Instant::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_three_times_then_succeeds() {
        let gateway = Arc::new(FlakyGateway::default());
        let queue = EmailQueue::new(gateway.clone());
        queue.enqueue(email(&["a", "b"])).await;

        assert!(queue.dispatch_round().await); // attempt 1: b fails, re-queued
        assert_eq!(gateway.b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(queue.len().await, 1);

        tokio::time::advance(MAIL_RETRY_DELAY).await;
        assert!(queue.dispatch_round().await); // attempt 2: b fails again
        assert_eq!(gateway.b_calls.load(Ordering::SeqCst), 2);
        assert_eq!(queue.len().await, 1);

        tokio::time::advance(MAIL_RETRY_DELAY).await;
        assert!(queue.dispatch_round().await); // attempt 3: both succeed
        assert_eq!(gateway.b_calls.load(Ordering::SeqCst), 3);
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn not_yet_eligible_items_are_skipped_this_round() {
        let gateway = Arc::new(FlakyGateway::default());
        let queue = EmailQueue::new(gateway.clone());
        queue.enqueue(email(&["a", "b"])).await;

        queue.dispatch_round().await; // fails, next_eligible bumped
        assert_eq!(queue.len().await, 1);

        // No time advanced yet: the item isn't eligible, nothing to dispatch.
        assert!(!queue.dispatch_round().await);
        assert_eq!(gateway.b_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_after_exceeding_retry_cap() {
        let gateway = Arc::new(AlwaysFailsGateway);
        let queue = EmailQueue::new(gateway);
        queue.enqueue(email(&["a"])).await;

        for _ in 0..MAX_MAIL_RETRIES {
            queue.dispatch_round().await;
            tokio::time::advance(MAIL_RETRY_DELAY).await;
        }
        assert_eq!(queue.len().await, 1);

        // Now at the retry cap: the next round drops it without dispatching.
        assert!(!queue.dispatch_round().await);
        assert_eq!(queue.len().await, 0);
    }
}
