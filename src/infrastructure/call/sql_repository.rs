//! API call repository over the `lab_api_calls` table

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::LabError;
use crate::domain::call::{ApiCallRecord, ApiCallRepository, ExperimentSummary};
use crate::domain::pricing::{TokenBreakdown, round_cost};
use crate::domain::provider::ProviderKind;
use crate::domain::storage::{Queryable, from_row};

const INSERT_CALL: &str = r#"
    INSERT INTO lab_api_calls
        (id, experiment_id, session_id, provider, model,
         input_tokens, output_tokens, system_tokens, cost, latency_ms, created_at)
    VALUES ($1::uuid, $2::uuid, $3, $4, $5, $6, $7, $8, $9, $10, $11::timestamptz)
    RETURNING *
"#;

const LIST_CALLS: &str = r#"
    SELECT * FROM lab_api_calls
    WHERE experiment_id = $1::uuid
    ORDER BY created_at DESC
    LIMIT $2::bigint
"#;

const SUMMARIZE_CALLS: &str = r#"
    SELECT
        COUNT(*)::bigint AS call_count,
        COALESCE(SUM(cost), 0)::float8 AS total_cost,
        COALESCE(SUM(input_tokens), 0)::bigint AS input_tokens,
        COALESCE(SUM(output_tokens), 0)::bigint AS output_tokens,
        COALESCE(SUM(system_tokens), 0)::bigint AS system_tokens,
        COALESCE(AVG(latency_ms), 0)::float8 AS average_latency_ms
    FROM lab_api_calls
    WHERE experiment_id = $1::uuid
"#;

#[derive(Debug, Deserialize)]
struct ApiCallRow {
    id: Uuid,
    experiment_id: Uuid,
    session_id: String,
    provider: ProviderKind,
    model: String,
    input_tokens: u64,
    output_tokens: u64,
    system_tokens: u64,
    cost: f64,
    latency_ms: u64,
    created_at: DateTime<Utc>,
}

impl From<ApiCallRow> for ApiCallRecord {
    fn from(row: ApiCallRow) -> Self {
        ApiCallRecord {
            id: row.id,
            experiment_id: row.experiment_id,
            session_id: row.session_id,
            provider: row.provider,
            model: row.model,
            tokens: TokenBreakdown::new(row.input_tokens, row.output_tokens, row.system_tokens),
            cost: row.cost,
            latency_ms: row.latency_ms,
            timestamp: row.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SummaryRow {
    call_count: u64,
    total_cost: f64,
    input_tokens: u64,
    output_tokens: u64,
    system_tokens: u64,
    average_latency_ms: f64,
}

#[derive(Debug, Clone)]
pub struct SqlApiCallRepository {
    db: Arc<dyn Queryable>,
}

impl SqlApiCallRepository {
    pub fn new(db: Arc<dyn Queryable>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ApiCallRepository for SqlApiCallRepository {
    async fn insert(&self, record: ApiCallRecord) -> Result<ApiCallRecord, LabError> {
        let params = [
            json!(record.id.to_string()),
            json!(record.experiment_id.to_string()),
            json!(record.session_id),
            json!(record.provider.as_str()),
            json!(record.model),
            json!(record.tokens.input),
            json!(record.tokens.output),
            json!(record.tokens.system),
            json!(record.cost),
            json!(record.latency_ms),
            json!(record.timestamp.to_rfc3339()),
        ];

        let row = self
            .db
            .query(INSERT_CALL, &params)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LabError::storage("Insert into lab_api_calls returned no row"))?;

        Ok(from_row::<ApiCallRow>(row)?.into())
    }

    async fn list_by_experiment(
        &self,
        experiment_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<ApiCallRecord>, LabError> {
        let params = [json!(experiment_id.to_string()), json!(limit)];

        self.db
            .query(LIST_CALLS, &params)
            .await?
            .into_iter()
            .map(|row| from_row::<ApiCallRow>(row).map(ApiCallRecord::from))
            .collect()
    }

    async fn summarize(&self, experiment_id: Uuid) -> Result<ExperimentSummary, LabError> {
        let params = [json!(experiment_id.to_string())];

        let Some(row) = self
            .db
            .query(SUMMARIZE_CALLS, &params)
            .await?
            .into_iter()
            .next()
        else {
            return Ok(ExperimentSummary::default());
        };

        let row: SummaryRow = from_row(row)?;
        let tokens = TokenBreakdown::new(row.input_tokens, row.output_tokens, row.system_tokens);

        Ok(ExperimentSummary {
            call_count: row.call_count,
            total_cost: round_cost(row.total_cost),
            total_tokens: tokens.total(),
            tokens,
            average_latency_ms: row.average_latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::NewApiCall;
    use crate::domain::pricing::CostBreakdown;
    use crate::domain::storage::{MockQueryable, Row};
    use serde_json::Value;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn call_row(record: &ApiCallRecord) -> Row {
        row(json!({
            "id": record.id,
            "experiment_id": record.experiment_id,
            "session_id": record.session_id,
            "provider": "openai",
            "model": record.model,
            "input_tokens": record.tokens.input,
            "output_tokens": record.tokens.output,
            "system_tokens": record.tokens.system,
            "cost": record.cost,
            "latency_ms": record.latency_ms,
            "created_at": "2024-05-01T12:00:00.5+00:00",
        }))
    }

    fn sample() -> ApiCallRecord {
        NewApiCall::new(
            Uuid::new_v4(),
            "sess_abc",
            ProviderKind::OpenAi,
            "gpt-4o-mini",
            TokenBreakdown::new(750, 250, 100),
        )
        .with_latency_ms(320)
        .into_record(&CostBreakdown {
            total: 0.2775,
            ..CostBreakdown::default()
        })
    }

    #[tokio::test]
    async fn test_insert_binds_every_column_and_decodes_row() {
        let record = sample();
        let returned = call_row(&record);
        let expected_id = record.id.to_string();

        let mut db = MockQueryable::new();
        db.expect_query()
            .withf(move |sql, params| {
                sql.contains("INSERT INTO lab_api_calls")
                    && sql.contains("RETURNING")
                    && params.len() == 11
                    && params[0] == json!(expected_id)
                    && params[3] == json!("openai")
                    && params[8] == json!(0.2775)
            })
            .times(1)
            .returning(move |_, _| Ok(vec![returned.clone()]));

        let repo = SqlApiCallRepository::new(Arc::new(db));
        let stored = repo.insert(record.clone()).await.unwrap();

        assert_eq!(stored.id, record.id);
        assert_eq!(stored.tokens, TokenBreakdown::new(750, 250, 100));
        assert_eq!(stored.latency_ms, 320);
        assert_eq!(stored.provider, ProviderKind::OpenAi);
    }

    #[tokio::test]
    async fn test_insert_without_returned_row_is_storage_error() {
        let mut db = MockQueryable::new();
        db.expect_query().returning(|_, _| Ok(vec![]));

        let repo = SqlApiCallRepository::new(Arc::new(db));
        let err = repo.insert(sample()).await.unwrap_err();

        assert!(matches!(err, LabError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_list_passes_null_limit_when_unbounded() {
        let record = sample();
        let experiment_id = record.experiment_id;
        let returned = call_row(&record);

        let mut db = MockQueryable::new();
        db.expect_query()
            .withf(move |sql, params| {
                sql.contains("ORDER BY created_at DESC")
                    && params[0] == json!(experiment_id.to_string())
                    && params[1].is_null()
            })
            .returning(move |_, _| Ok(vec![returned.clone()]));

        let repo = SqlApiCallRepository::new(Arc::new(db));
        let calls = repo.list_by_experiment(experiment_id, None).await.unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].session_id, "sess_abc");
    }

    #[tokio::test]
    async fn test_summarize_decodes_aggregate_row() {
        let mut db = MockQueryable::new();
        db.expect_query()
            .withf(|sql, _| sql.contains("COUNT(*)"))
            .returning(|_, _| {
                Ok(vec![row(json!({
                    "call_count": 2,
                    "total_cost": 0.3000000001,
                    "input_tokens": 200,
                    "output_tokens": 100,
                    "system_tokens": 0,
                    "average_latency_ms": 150,
                }))])
            });

        let repo = SqlApiCallRepository::new(Arc::new(db));
        let summary = repo.summarize(Uuid::new_v4()).await.unwrap();

        assert_eq!(summary.call_count, 2);
        assert!((summary.total_cost - 0.3).abs() < 1e-9);
        assert_eq!(summary.total_tokens, 300);
        assert!((summary.average_latency_ms - 150.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_storage_errors_propagate() {
        let mut db = MockQueryable::new();
        db.expect_query()
            .returning(|_, _| Err(LabError::storage("connection refused")));

        let repo = SqlApiCallRepository::new(Arc::new(db));
        let err = repo.summarize(Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, LabError::Storage { .. }));
    }
}
