//! Baseline repository over the `lab_baselines` table

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::domain::LabError;
use crate::domain::baseline::{Baseline, BaselineRepository};
use crate::domain::storage::{Queryable, from_row};

/// Replacing a scenario keeps the original row id
const UPSERT_BASELINE: &str = r#"
    INSERT INTO lab_baselines
        (id, experiment_id, scenario_name, avg_cost, avg_tokens, avg_latency_ms,
         sample_size, created_at)
    VALUES ($1::uuid, $2::uuid, $3, $4::float8, $5::float8, $6::float8, $7, $8::timestamptz)
    ON CONFLICT (experiment_id, scenario_name) DO UPDATE SET
        avg_cost = EXCLUDED.avg_cost,
        avg_tokens = EXCLUDED.avg_tokens,
        avg_latency_ms = EXCLUDED.avg_latency_ms,
        sample_size = EXCLUDED.sample_size,
        created_at = EXCLUDED.created_at
    RETURNING *
"#;

const FIND_BASELINE: &str = r#"
    SELECT * FROM lab_baselines
    WHERE experiment_id = $1::uuid AND scenario_name = $2
"#;

const LIST_BASELINES: &str = r#"
    SELECT * FROM lab_baselines
    WHERE experiment_id = $1::uuid
    ORDER BY scenario_name
"#;

#[derive(Debug, Clone)]
pub struct SqlBaselineRepository {
    db: Arc<dyn Queryable>,
}

impl SqlBaselineRepository {
    pub fn new(db: Arc<dyn Queryable>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BaselineRepository for SqlBaselineRepository {
    async fn upsert(&self, baseline: Baseline) -> Result<Baseline, LabError> {
        let params = [
            json!(baseline.id.to_string()),
            json!(baseline.experiment_id.to_string()),
            json!(baseline.scenario_name),
            json!(baseline.avg_cost),
            json!(baseline.avg_tokens),
            json!(baseline.avg_latency_ms),
            json!(baseline.sample_size),
            json!(baseline.created_at.to_rfc3339()),
        ];

        let row = self
            .db
            .query(UPSERT_BASELINE, &params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LabError::storage("Upsert into lab_baselines returned no row"))?;

        from_row(row)
    }

    async fn find(
        &self,
        experiment_id: Uuid,
        scenario_name: &str,
    ) -> Result<Option<Baseline>, LabError> {
        let params = [json!(experiment_id.to_string()), json!(scenario_name)];

        self.db
            .query(FIND_BASELINE, &params)
            .await?
            .into_iter()
            .next()
            .map(from_row)
            .transpose()
    }

    async fn list(&self, experiment_id: Uuid) -> Result<Vec<Baseline>, LabError> {
        let params = [json!(experiment_id.to_string())];

        self.db
            .query(LIST_BASELINES, &params)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::storage::{MockQueryable, Row};
    use chrono::Utc;
    use serde_json::Value;

    fn baseline(experiment_id: Uuid, scenario: &str) -> Baseline {
        Baseline {
            id: Uuid::new_v4(),
            experiment_id,
            scenario_name: scenario.to_string(),
            avg_cost: 0.25,
            avg_tokens: 1200.5,
            avg_latency_ms: 310.0,
            sample_size: 4,
            created_at: Utc::now(),
        }
    }

    fn row(baseline: &Baseline) -> Row {
        match serde_json::to_value(baseline).unwrap() {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_upsert_uses_conflict_clause() {
        let stored = baseline(Uuid::new_v4(), "before caching");
        let returned = row(&stored);

        let mut db = MockQueryable::new();
        db.expect_query()
            .withf(|sql, params| {
                sql.contains("ON CONFLICT (experiment_id, scenario_name)")
                    && params.len() == 8
                    && params[2] == json!("before caching")
            })
            .times(1)
            .returning(move |_, _| Ok(vec![returned.clone()]));

        let repo = SqlBaselineRepository::new(Arc::new(db));
        let result = repo.upsert(stored.clone()).await.unwrap();

        assert_eq!(result, stored);
    }

    #[tokio::test]
    async fn test_find_missing_returns_none() {
        let mut db = MockQueryable::new();
        db.expect_query()
            .withf(|sql, params| sql.contains("scenario_name = $2") && params.len() == 2)
            .returning(|_, _| Ok(vec![]));

        let repo = SqlBaselineRepository::new(Arc::new(db));

        assert!(repo.find(Uuid::new_v4(), "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_decodes_rows() {
        let experiment = Uuid::new_v4();
        let rows = vec![row(&baseline(experiment, "a")), row(&baseline(experiment, "b"))];

        let mut db = MockQueryable::new();
        db.expect_query()
            .returning(move |_, _| Ok(rows.clone()));

        let repo = SqlBaselineRepository::new(Arc::new(db));
        let baselines = repo.list(experiment).await.unwrap();

        assert_eq!(baselines.len(), 2);
        assert_eq!(baselines[1].scenario_name, "b");
    }

    #[tokio::test]
    async fn test_malformed_row_is_storage_error() {
        let mut db = MockQueryable::new();
        db.expect_query().returning(|_, _| {
            let mut row = Row::new();
            row.insert("id".to_string(), json!("not-a-uuid"));
            Ok(vec![row])
        });

        let repo = SqlBaselineRepository::new(Arc::new(db));
        let err = repo.find(Uuid::new_v4(), "x").await.unwrap_err();

        assert!(matches!(err, LabError::Storage { .. }));
    }
}
