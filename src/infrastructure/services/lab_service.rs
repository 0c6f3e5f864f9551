//! Lab service - Runs sandboxed provider calls and owns the session lifecycle

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::call::{NewApiCall, RecordedCall};
use crate::domain::pricing::estimate_tokens;
use crate::domain::provider::{GenerateRequest, GeneratedResponse};
use crate::domain::session::{SessionConfig, SessionMetrics, SessionSnapshot};
use crate::domain::LabError;
use crate::infrastructure::api_key::ApiKeyVault;
use crate::infrastructure::call::CostTracker;
use crate::infrastructure::gateway::GatewayRegistry;
use crate::infrastructure::observability::{
    record_lab_call, record_limit_rejection, record_session_event, set_active_sessions,
};
use crate::infrastructure::sandbox::SandboxManager;

/// A call submitted to a session; the model falls back to the session default
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabCallRequest {
    #[serde(default)]
    pub model: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

impl LabCallRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            model: None,
            prompt: prompt.into(),
            system_prompt: None,
            max_output_tokens: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    fn into_generate_request(self, config: &SessionConfig) -> Result<GenerateRequest, LabError> {
        let model = self
            .model
            .filter(|m| !m.trim().is_empty())
            .or_else(|| config.default_model.clone())
            .ok_or_else(|| LabError::validation("Model is required when the session has no default model"))?;

        let mut request = GenerateRequest::new(model, self.prompt);
        request.system_prompt = self.system_prompt;
        request.max_output_tokens = self.max_output_tokens;
        Ok(request)
    }
}

/// Result of a sandboxed call
#[derive(Debug, Clone, Serialize)]
pub struct LabCallOutcome {
    pub response: GeneratedResponse,
    pub metrics: SessionMetrics,
    /// Persisted record when the session belongs to an experiment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded: Option<RecordedCall>,
}

#[derive(Debug, Clone)]
pub struct LabService {
    manager: Arc<Mutex<SandboxManager>>,
    gateways: GatewayRegistry,
    vault: ApiKeyVault,
    tracker: CostTracker,
}

impl LabService {
    pub fn new(
        manager: Arc<Mutex<SandboxManager>>,
        gateways: GatewayRegistry,
        vault: ApiKeyVault,
        tracker: CostTracker,
    ) -> Self {
        Self {
            manager,
            gateways,
            vault,
            tracker,
        }
    }

    pub fn manager(&self) -> &Arc<Mutex<SandboxManager>> {
        &self.manager
    }

    pub async fn create_session(
        &self,
        user_id: &str,
        experiment_id: Option<Uuid>,
        config: SessionConfig,
        now: DateTime<Utc>,
    ) -> Result<SessionSnapshot, LabError> {
        if user_id.trim().is_empty() {
            return Err(LabError::validation("User id is required"));
        }

        // reject sessions no call could ever succeed in
        self.gateways.get(config.provider)?;

        let mut manager = self.manager.lock().await;
        let snapshot = manager.create_session(user_id, experiment_id, config, now);

        record_session_event("created", 1);
        set_active_sessions(manager.active_count());

        Ok(snapshot)
    }

    /// Snapshot regardless of liveness, for ownership checks and post-mortems
    pub async fn get_session(&self, session_id: &str) -> Result<SessionSnapshot, LabError> {
        self.manager.lock().await.snapshot(session_id)
    }

    /// Snapshot of a session that can still take calls
    pub async fn get_live_session(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionSnapshot, LabError> {
        self.manager
            .lock()
            .await
            .live_snapshot(session_id, now)
            .inspect_err(note_rejection)
    }

    pub async fn get_session_metrics(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionMetrics, LabError> {
        self.manager
            .lock()
            .await
            .get_session_metrics(session_id, now)
    }

    pub async fn active_sessions(&self) -> usize {
        self.manager.lock().await.active_count()
    }

    pub async fn list_user_sessions(&self, user_id: &str) -> Vec<SessionSnapshot> {
        self.manager.lock().await.list_user_sessions(user_id)
    }

    pub async fn terminate_session(&self, session_id: &str) -> Result<SessionSnapshot, LabError> {
        let mut manager = self.manager.lock().await;
        let snapshot = manager.terminate_session(session_id)?;

        record_session_event("terminated", 1);
        set_active_sessions(manager.active_count());

        Ok(snapshot)
    }

    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> usize {
        let mut manager = self.manager.lock().await;
        let purged = manager.purge_expired_sessions(now);

        if purged > 0 {
            record_session_event("purged", purged as u64);
        }
        set_active_sessions(manager.active_count());

        purged
    }

    /// Run one provider call inside a session.
    ///
    /// The manager is locked twice: once to admit the call and once to commit
    /// it. Credential resolution and the provider round trip run unlocked, so
    /// a slow provider never stalls other sessions or the purge sweeper. A
    /// session terminated or purged in between rejects the commit.
    ///
    /// A call is rejected before the provider is contacted when the prompt
    /// alone already breaks the quota. On the way back the response is checked
    /// and persisted before the session totals move, so any rejection or
    /// storage failure leaves the totals unchanged.
    pub async fn execute_call(
        &self,
        session_id: &str,
        call: LabCallRequest,
        now: DateTime<Utc>,
    ) -> Result<LabCallOutcome, LabError> {
        let (user_id, config, request) = {
            let mut manager = self.manager.lock().await;
            let session = manager
                .get_session(session_id, now)
                .inspect_err(note_rejection)?;

            let config = session.config().clone();
            let request = call.into_generate_request(&config)?;

            let prompt_tokens = estimate_tokens(&request.prompt).saturating_add(
                request
                    .system_prompt
                    .as_deref()
                    .map(estimate_tokens)
                    .unwrap_or(0),
            );
            session
                .ensure_capacity(prompt_tokens)
                .inspect_err(note_rejection)?;

            (session.user_id().to_string(), config, request)
        };

        let gateway = self.gateways.get(config.provider)?;
        let credential = self.vault.resolve_credential(&user_id, &config).await?;
        let response = gateway.generate(&request, &credential).await?;

        let mut manager = self.manager.lock().await;
        let session = manager
            .get_session(session_id, now)
            .inspect_err(note_rejection)?;
        session
            .ensure_capacity(response.tokens.total())
            .inspect_err(note_rejection)?;

        let recorded = match session.experiment_id() {
            Some(experiment_id) => Some(
                self.tracker
                    .record_call(
                        NewApiCall::new(
                            experiment_id,
                            session_id,
                            response.provider,
                            response.model.clone(),
                            response.tokens,
                        )
                        .with_latency_ms(response.latency_ms)
                        .with_timestamp(response.timestamp),
                    )
                    .await?,
            ),
            None => None,
        };

        session
            .track_response(&response)
            .inspect_err(note_rejection)?;
        let metrics = session.to_metrics();
        drop(manager);

        record_lab_call(
            response.provider.as_str(),
            &response.model,
            response.tokens.total(),
            response.cost.total,
            Duration::from_millis(response.latency_ms),
        );

        tracing::info!(
            session_id,
            provider = %response.provider,
            model = %response.model,
            tokens = response.tokens.total(),
            cost = response.cost.total,
            remaining_calls = metrics.remaining_calls,
            "Executed lab call"
        );

        Ok(LabCallOutcome {
            response,
            metrics,
            recorded,
        })
    }
}

fn note_rejection(error: &LabError) {
    if let LabError::ResourceLimit {
        session_id, reason, ..
    } = error
    {
        tracing::warn!(session_id = %session_id, reason = %reason, "Session rejected call");
        record_limit_rejection(&reason.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::{ApiCallRepository, MockApiCallRepository};
    use crate::domain::pricing::{CostBreakdown, TokenBreakdown, default_pricing_table};
    use crate::domain::provider::{MockProviderGateway, ProviderKind};
    use crate::domain::session::{KeySource, ResourceLimits};
    use crate::domain::ResourceLimitReason;
    use crate::infrastructure::api_key::InMemoryApiKeyRepository;
    use crate::infrastructure::call::InMemoryApiCallRepository;
    use crate::infrastructure::sandbox::SandboxSettings;
    use chrono::{Duration as ChronoDuration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn service_with(limits: ResourceLimits, gateways: GatewayRegistry) -> LabService {
        service_with_calls(limits, gateways, Arc::new(InMemoryApiCallRepository::new()))
    }

    fn service_with_calls(
        limits: ResourceLimits,
        gateways: GatewayRegistry,
        calls: Arc<dyn ApiCallRepository>,
    ) -> LabService {
        let manager = SandboxManager::new(SandboxSettings {
            limits,
            grace_period_ms: 0,
        });
        let vault = ApiKeyVault::new(Arc::new(InMemoryApiKeyRepository::new()))
            .with_platform_key(ProviderKind::OpenAi, "sk-platform");

        LabService::new(
            Arc::new(Mutex::new(manager)),
            gateways,
            vault,
            CostTracker::new(calls),
        )
    }

    fn service(limits: ResourceLimits) -> LabService {
        service_with(
            limits,
            GatewayRegistry::with_simulated_defaults(default_pricing_table()),
        )
    }

    fn openai() -> SessionConfig {
        SessionConfig::new(ProviderKind::OpenAi).with_default_model("gpt-4o-mini")
    }

    #[tokio::test]
    async fn test_execute_call_tracks_and_records() {
        let service = service(ResourceLimits::default());
        let experiment = Uuid::new_v4();
        let session = service
            .create_session("alice", Some(experiment), openai(), now())
            .await
            .unwrap();

        let outcome = service
            .execute_call(&session.id, LabCallRequest::new("a".repeat(400)), now())
            .await
            .unwrap();

        assert_eq!(outcome.response.model, "gpt-4o-mini");
        assert_eq!(outcome.metrics.total_calls, 1);
        assert_eq!(outcome.metrics.total_tokens, outcome.response.tokens.total());

        let recorded = outcome.recorded.unwrap();
        assert_eq!(recorded.record.experiment_id, experiment);
        assert_eq!(recorded.record.session_id, session.id);

        let summary = service.tracker.get_experiment_summary(experiment).await.unwrap();
        assert_eq!(summary.call_count, 1);
    }

    #[tokio::test]
    async fn test_execute_call_without_experiment_is_not_persisted() {
        let service = service(ResourceLimits::default());
        let session = service
            .create_session("alice", None, openai(), now())
            .await
            .unwrap();

        let outcome = service
            .execute_call(&session.id, LabCallRequest::new("hello"), now())
            .await
            .unwrap();

        assert!(outcome.recorded.is_none());
    }

    #[tokio::test]
    async fn test_call_limit_rejects_without_contacting_provider() {
        let mut gateway = MockProviderGateway::new();
        gateway.expect_provider().return_const(ProviderKind::OpenAi);
        gateway.expect_generate().times(1).returning(|request, _| {
            Ok(GeneratedResponse {
                content: "ok".to_string(),
                model: request.model.clone(),
                tokens: TokenBreakdown::new(10, 10, 0),
                cost: CostBreakdown::default(),
                latency_ms: 50,
                timestamp: now(),
                provider: ProviderKind::OpenAi,
            })
        });

        let service = service_with(
            ResourceLimits::default().with_max_calls(1),
            GatewayRegistry::new().with_gateway(Arc::new(gateway)),
        );
        let session = service
            .create_session("alice", None, openai(), now())
            .await
            .unwrap();

        service
            .execute_call(&session.id, LabCallRequest::new("first"), now())
            .await
            .unwrap();

        let err = service
            .execute_call(&session.id, LabCallRequest::new("second"), now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LabError::ResourceLimit {
                reason: ResourceLimitReason::CallLimit,
                ..
            }
        ));
        assert_eq!(
            service
                .get_session_metrics(&session.id, now())
                .await
                .unwrap()
                .total_calls,
            1
        );
    }

    #[tokio::test]
    async fn test_token_limit_rejection_leaves_totals_unchanged() {
        let service = service(ResourceLimits::default().with_max_tokens(50));
        let session = service
            .create_session("alice", None, openai(), now())
            .await
            .unwrap();

        // 100 input tokens plus 50 output
        let err = service
            .execute_call(&session.id, LabCallRequest::new("a".repeat(400)), now())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LabError::ResourceLimit {
                reason: ResourceLimitReason::TokenLimit,
                ..
            }
        ));

        let metrics = service.get_session_metrics(&session.id, now()).await.unwrap();
        assert_eq!(metrics.total_calls, 0);
        assert!(metrics.resource_limit_breached);
    }

    #[tokio::test]
    async fn test_storage_failure_leaves_totals_unchanged() {
        let mut calls = MockApiCallRepository::new();
        calls
            .expect_insert()
            .returning(|_| Err(LabError::storage("down")));

        let service = service_with_calls(
            ResourceLimits::default().with_max_calls(1),
            GatewayRegistry::with_simulated_defaults(default_pricing_table()),
            Arc::new(calls),
        );
        let session = service
            .create_session("alice", Some(Uuid::new_v4()), openai(), now())
            .await
            .unwrap();

        let err = service
            .execute_call(&session.id, LabCallRequest::new("hello"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::Storage { .. }));

        let metrics = service.get_session_metrics(&session.id, now()).await.unwrap();
        assert_eq!(metrics.total_calls, 0);
        assert_eq!(metrics.total_tokens, 0);
        assert_eq!(metrics.remaining_calls, 1);
        assert!(!metrics.resource_limit_breached);
    }

    #[tokio::test]
    async fn test_session_terminated_during_call_is_not_tracked() {
        let service = service(ResourceLimits::default());
        let session = service
            .create_session("alice", None, openai(), now())
            .await
            .unwrap();

        let mut gateway = MockProviderGateway::new();
        gateway.expect_provider().return_const(ProviderKind::OpenAi);
        let manager = service.manager().clone();
        let id = session.id.clone();
        gateway.expect_generate().returning(move |request, _| {
            // the manager is unlocked while the provider works
            let mut manager = manager.try_lock().expect("manager unlocked during generate");
            manager.terminate_session(&id).unwrap();
            Ok(GeneratedResponse {
                content: "ok".to_string(),
                model: request.model.clone(),
                tokens: TokenBreakdown::new(10, 10, 0),
                cost: CostBreakdown::default(),
                latency_ms: 5,
                timestamp: now(),
                provider: ProviderKind::OpenAi,
            })
        });
        let service = LabService::new(
            service.manager().clone(),
            GatewayRegistry::new().with_gateway(Arc::new(gateway)),
            service.vault.clone(),
            service.tracker.clone(),
        );

        let err = service
            .execute_call(&session.id, LabCallRequest::new("hello"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let service = service(ResourceLimits::default().with_max_duration_ms(1_000));
        let session = service
            .create_session("alice", None, openai(), now())
            .await
            .unwrap();

        let err = service
            .execute_call(
                &session.id,
                LabCallRequest::new("hello"),
                now() + ChronoDuration::seconds(5),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LabError::ResourceLimit {
                reason: ResourceLimitReason::Expired,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_model_is_validation_error() {
        let service = service(ResourceLimits::default());
        let session = service
            .create_session("alice", None, SessionConfig::new(ProviderKind::OpenAi), now())
            .await
            .unwrap();

        let err = service
            .execute_call(&session.id, LabCallRequest::new("hello"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::Validation { .. }));

        let ok = service
            .execute_call(
                &session.id,
                LabCallRequest::new("hello").with_model("gpt-4o"),
                now(),
            )
            .await
            .unwrap();
        assert_eq!(ok.response.model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_missing_platform_key_is_provider_unavailable() {
        let service = service(ResourceLimits::default());
        let session = service
            .create_session(
                "alice",
                None,
                SessionConfig::new(ProviderKind::Google).with_default_model("gemini-1.5-flash"),
                now(),
            )
            .await
            .unwrap();

        let err = service
            .execute_call(&session.id, LabCallRequest::new("hello"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_user_key_source_uses_stored_key() {
        let service = service(ResourceLimits::default());
        let key = service
            .vault
            .store("alice", ProviderKind::OpenAi, "sk-alice-0123456789", None, now())
            .await
            .unwrap();

        let config = openai().with_key_source(KeySource::User {
            key_id: key.id().to_string(),
        });
        let session = service
            .create_session("alice", None, config, now())
            .await
            .unwrap();

        assert!(
            service
                .execute_call(&session.id, LabCallRequest::new("hello"), now())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_create_session_requires_gateway() {
        let service = service_with(ResourceLimits::default(), GatewayRegistry::new());

        let err = service
            .create_session("alice", None, openai(), now())
            .await
            .unwrap_err();
        assert!(matches!(err, LabError::ProviderUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_terminate_and_purge() {
        let service = service(ResourceLimits::default().with_max_duration_ms(1_000));
        let a = service
            .create_session("alice", None, openai(), now())
            .await
            .unwrap();
        let b = service
            .create_session("alice", None, openai(), now())
            .await
            .unwrap();

        assert!(service.terminate_session(&a.id).await.unwrap().terminated);
        assert!(matches!(
            service.get_session(&a.id).await,
            Err(LabError::SessionNotFound { .. })
        ));

        assert_eq!(
            service
                .purge_expired_sessions(now() + ChronoDuration::seconds(5))
                .await,
            1
        );
        assert!(service.get_session(&b.id).await.is_err());
        assert!(service.list_user_sessions("alice").await.is_empty());
        assert_eq!(service.active_sessions().await, 0);
    }
}
