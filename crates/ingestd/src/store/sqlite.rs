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

// src/store/sqlite.rs
// sqlx-sqlite reference implementations of the directory, threshold, and
// persistence stores. Sqlite (rather than the teacher's Postgres) is used so
// the coordinator and its test suite run without an external database; see
// DESIGN.md for the Open Question resolution.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::directory::DirectoryStore;
use crate::error::Error;
use crate::model::{Color, ThresholdConfig, ThresholdLevel, TopicName};
use crate::persistence::{AppendOp, PersistenceStore};
use crate::thresholds::ThresholdStore;

/// Connects to `database_url` and ensures the schema exists. Called once at
/// startup; the reference stores below all share one pool.
pub async fn connect(database_url: &str) -> Result<SqlitePool, Error> {
    let pool = SqlitePool::connect(database_url).await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS samples (
            topic TEXT NOT NULL,
            value REAL NOT NULL,
            timestamp TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS threshold_levels (
            topic TEXT NOT NULL,
            color TEXT NOT NULL,
            value REAL NOT NULL,
            reset_value REAL NOT NULL
        )",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS topic_employees (topic TEXT NOT NULL, email TEXT NOT NULL)",
    )
    .execute(&pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS topic_supervisors (topic TEXT NOT NULL, email TEXT NOT NULL)",
    )
    .execute(&pool)
    .await?;
    Ok(pool)
}

pub struct SqlitePersistenceStore {
    pool: SqlitePool,
}

impl SqlitePersistenceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersistenceStore for SqlitePersistenceStore {
    async fn bulk_append_samples(&self, ops: Vec<AppendOp>) -> Result<(), Error> {
        let mut txn = self.pool.begin().await?;
        for op in ops {
            for sample in op.samples {
                sqlx::query("INSERT INTO samples (topic, value, timestamp) VALUES (?, ?, ?)")
                    .bind(op.topic.as_str())
                    .bind(sample.value)
                    .bind(sample.timestamp.to_rfc3339())
                    .execute(&mut *txn)
                    .await?;
            }
        }
        txn.commit().await?;
        Ok(())
    }
}

pub struct SqliteThresholdStore {
    pool: SqlitePool,
}

impl SqliteThresholdStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ThresholdStore for SqliteThresholdStore {
    async fn load_thresholds(&self, topic: &TopicName) -> Result<Option<ThresholdConfig>, Error> {
        let rows = sqlx::query("SELECT color, value, reset_value FROM threshold_levels WHERE topic = ?")
            .bind(topic.as_str())
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let levels = rows
            .into_iter()
            .map(|row| ThresholdLevel {
                color: Color::parse(row.get::<String, _>("color").as_str()),
                value: row.get("value"),
                reset_value: row.get("reset_value"),
            })
            .collect();
        Ok(Some(levels))
    }

    async fn upsert_thresholds(&self, topic: &TopicName, levels: ThresholdConfig) -> Result<(), Error> {
        let mut txn = self.pool.begin().await?;
        sqlx::query("DELETE FROM threshold_levels WHERE topic = ?")
            .bind(topic.as_str())
            .execute(&mut *txn)
            .await?;
        for level in levels {
            sqlx::query(
                "INSERT INTO threshold_levels (topic, color, value, reset_value) VALUES (?, ?, ?, ?)",
            )
            .bind(topic.as_str())
            .bind(level.color.as_str())
            .bind(level.value)
            .bind(level.reset_value)
            .execute(&mut *txn)
            .await?;
        }
        txn.commit().await?;
        Ok(())
    }
}

pub struct SqliteDirectoryStore {
    pool: SqlitePool,
}

impl SqliteDirectoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DirectoryStore for SqliteDirectoryStore {
    async fn employees_by_topic(&self, topic: &TopicName) -> Result<Vec<String>, Error> {
        let rows = sqlx::query("SELECT email FROM topic_employees WHERE topic = ?")
            .bind(topic.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|row| row.get("email")).collect())
    }

    async fn supervisors_by_topic(&self, topic: &TopicName) -> Result<Vec<String>, Error> {
        let rows = sqlx::query("SELECT email FROM topic_supervisors WHERE topic = ?")
            .bind(topic.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|row| row.get("email")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sample;
    use chrono::Utc;

    async fn memory_pool() -> SqlitePool {
        connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn threshold_round_trip() {
        let pool = memory_pool().await;
        let store = SqliteThresholdStore::new(pool);
        let topic = TopicName::new("sensors/a").unwrap();

        assert!(store.load_thresholds(&topic).await.unwrap().is_none());

        let levels = vec![
            ThresholdLevel { color: Color::parse("yellow"), value: 50.0, reset_value: 40.0 },
            ThresholdLevel { color: Color::Red, value: 90.0, reset_value: 80.0 },
        ];
        store.upsert_thresholds(&topic, levels.clone()).await.unwrap();

        let loaded = store.load_thresholds(&topic).await.unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].value, 50.0);
        assert_eq!(loaded[1].color, Color::Red);
    }

    #[tokio::test]
    async fn directory_lookups_are_scoped_per_topic() {
        let pool = memory_pool().await;
        sqlx::query("INSERT INTO topic_employees (topic, email) VALUES ('sensors/a', 'a@x')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO topic_supervisors (topic, email) VALUES ('sensors/a', 'b@x')")
            .execute(&pool)
            .await
            .unwrap();

        let store = SqliteDirectoryStore::new(pool);
        let topic = TopicName::new("sensors/a").unwrap();
        let other = TopicName::new("sensors/b").unwrap();

        assert_eq!(store.employees_by_topic(&topic).await.unwrap(), vec!["a@x"]);
        assert_eq!(store.supervisors_by_topic(&topic).await.unwrap(), vec!["b@x"]);
        assert!(store.employees_by_topic(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persists_appended_samples() {
        let pool = memory_pool().await;
        let store = SqlitePersistenceStore::new(pool.clone());
        let topic = TopicName::new("sensors/a").unwrap();

        store
            .bulk_append_samples(vec![AppendOp {
                topic: topic.clone(),
                samples: vec![Sample { value: 1.0, timestamp: Utc::now() }, Sample {
                    value: 2.0,
                    timestamp: Utc::now(),
                }],
            }])
            .await
            .unwrap();

        let count: i64 = sqlx::query("SELECT COUNT(*) AS c FROM samples WHERE topic = ?")
            .bind(topic.as_str())
            .fetch_one(&pool)
            .await
            .unwrap()
            .get("c");
        assert_eq!(count, 2);
    }
}
