//! LLM provider identity and gateway contracts

mod gateway;

pub use gateway::{GenerateRequest, GeneratedResponse, ProviderGateway};

#[cfg(test)]
pub use gateway::MockProviderGateway;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::LabError;

/// External LLM vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(alias = "OpenAI", alias = "OPENAI")]
    OpenAi,
    #[serde(alias = "Anthropic", alias = "ANTHROPIC")]
    Anthropic,
    #[serde(alias = "Google", alias = "GOOGLE")]
    Google,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::OpenAi, Self::Anthropic, Self::Google];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "google" => Ok(Self::Google),
            other => Err(LabError::provider_unavailable(
                other,
                "Unknown provider; expected openai, anthropic or google",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(" google ".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert_eq!("ANTHROPIC".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
    }

    #[test]
    fn test_parse_unknown_provider() {
        let err = "mistral".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, LabError::ProviderUnavailable { .. }));
    }

    #[test]
    fn test_serde_roundtrip_name() {
        let json = serde_json::to_string(&ProviderKind::OpenAi).unwrap();
        assert_eq!(json, "\"openai\"");
    }
}
