//! Sandbox manager: the single owner of live experiment sessions

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::id::SessionIdGenerator;
use crate::domain::LabError;
use crate::domain::session::{
    ExperimentSession, ResourceLimits, SessionConfig, SessionMetrics, SessionSnapshot,
};

/// Grace period applied after a session's maximum duration
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 60_000;

/// Limits and timing applied to every session the manager creates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SandboxSettings {
    pub limits: ResourceLimits,
    pub grace_period_ms: u64,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
        }
    }
}

/// Registry of active sessions keyed by id.
///
/// Only the manager inserts or removes sessions. [`get_session`](Self::get_session)
/// is the one accessor handing out a mutable session; everything else returns
/// snapshots or metrics.
#[derive(Debug, Default)]
pub struct SandboxManager {
    sessions: HashMap<String, ExperimentSession>,
    settings: SandboxSettings,
    ids: SessionIdGenerator,
}

impl SandboxManager {
    pub fn new(settings: SandboxSettings) -> Self {
        Self {
            sessions: HashMap::new(),
            settings,
            ids: SessionIdGenerator::default(),
        }
    }

    pub fn with_id_generator(mut self, ids: SessionIdGenerator) -> Self {
        self.ids = ids;
        self
    }

    pub fn settings(&self) -> &SandboxSettings {
        &self.settings
    }

    pub fn create_session(
        &mut self,
        user_id: &str,
        experiment_id: Option<Uuid>,
        config: SessionConfig,
        now: DateTime<Utc>,
    ) -> SessionSnapshot {
        let id = self.ids.generate();
        let session = ExperimentSession::new(
            id.clone(),
            user_id,
            experiment_id,
            config,
            self.settings.limits,
            self.settings.grace_period_ms,
            now,
        );
        let snapshot = session.to_snapshot();

        let user_sessions = self.user_session_count(user_id);
        if user_sessions >= self.settings.limits.max_concurrent_sessions as usize {
            tracing::warn!(
                user_id,
                active = user_sessions,
                max = self.settings.limits.max_concurrent_sessions,
                "User is above the advertised concurrent session count"
            );
        }

        self.sessions.insert(id.to_string(), session);

        tracing::info!(
            session_id = %id,
            user_id,
            provider = %snapshot.config.provider,
            "Session created"
        );

        snapshot
    }

    /// Live session for the current operation; fails if missing, terminated or expired
    pub fn get_session(
        &mut self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<&mut ExperimentSession, LabError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| LabError::session_not_found(session_id))?;

        session.ensure_active(now)?;
        Ok(session)
    }

    /// Snapshot of a live session; expired sessions fail even before the sweeper drops them
    pub fn live_snapshot(
        &mut self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionSnapshot, LabError> {
        Ok(self.get_session(session_id, now)?.to_snapshot())
    }

    /// Snapshot of a session without the liveness check
    pub fn snapshot(&self, session_id: &str) -> Result<SessionSnapshot, LabError> {
        self.sessions
            .get(session_id)
            .map(ExperimentSession::to_snapshot)
            .ok_or_else(|| LabError::session_not_found(session_id))
    }

    /// Terminate and drop a session; returns its final snapshot
    pub fn terminate_session(&mut self, session_id: &str) -> Result<SessionSnapshot, LabError> {
        let mut session = self
            .sessions
            .remove(session_id)
            .ok_or_else(|| LabError::session_not_found(session_id))?;

        session.terminate();

        tracing::info!(
            session_id,
            calls = session.totals().calls,
            "Session terminated"
        );

        Ok(session.to_snapshot())
    }

    pub fn get_session_metrics(
        &mut self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionMetrics, LabError> {
        Ok(self.get_session(session_id, now)?.to_metrics())
    }

    /// Remove every session past its duration plus grace period
    pub fn purge_expired_sessions(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        let purged = before - self.sessions.len();

        if purged > 0 {
            tracing::info!(purged, remaining = self.sessions.len(), "Purged expired sessions");
        }

        purged
    }

    /// Snapshots of a user's sessions, oldest first
    pub fn list_user_sessions(&self, user_id: &str) -> Vec<SessionSnapshot> {
        let mut sessions: Vec<SessionSnapshot> = self
            .sessions
            .values()
            .filter(|s| s.user_id() == user_id)
            .map(ExperimentSession::to_snapshot)
            .collect();

        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        sessions
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    fn user_session_count(&self, user_id: &str) -> usize {
        self.sessions
            .values()
            .filter(|s| s.user_id() == user_id)
            .count()
    }
}
