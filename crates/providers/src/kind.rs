//! Model identifier classification.
//!
//! Every model string routes to exactly one provider family by prefix.
//! Unrecognized identifiers are a hard error; there is no fallback
//! provider, so a typo in a model name fails loudly instead of being
//! sent to the wrong API.

use quillpad_core::ModelError;

/// The provider family a model identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    /// Classify a model identifier by its prefix family.
    pub fn classify(model: &str) -> Result<Self, ModelError> {
        let m = model.trim();

        if m.starts_with("gpt-")
            || m.starts_with("o1")
            || m.starts_with("o3")
            || m.starts_with("o4")
            || m.starts_with("chatgpt-")
            || m.starts_with("text-embedding-")
        {
            return Ok(ProviderKind::OpenAi);
        }

        if m.starts_with("claude-") {
            return Ok(ProviderKind::Anthropic);
        }

        Err(ModelError::UnknownModel(model.to_string()))
    }

    /// The config key this provider family reads its settings from.
    pub fn config_key(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_family() {
        assert_eq!(
            ProviderKind::classify("gpt-4o").unwrap(),
            ProviderKind::OpenAi
        );
        assert_eq!(
            ProviderKind::classify("gpt-4o-mini").unwrap(),
            ProviderKind::OpenAi
        );
        assert_eq!(
            ProviderKind::classify("o3-mini").unwrap(),
            ProviderKind::OpenAi
        );
    }

    #[test]
    fn anthropic_family() {
        assert_eq!(
            ProviderKind::classify("claude-sonnet-4").unwrap(),
            ProviderKind::Anthropic
        );
        assert_eq!(
            ProviderKind::classify("claude-3-5-haiku-20241022").unwrap(),
            ProviderKind::Anthropic
        );
    }

    #[test]
    fn unknown_model_is_an_error_not_a_default() {
        let err = ProviderKind::classify("frontier-9000").unwrap_err();
        assert!(matches!(err, ModelError::UnknownModel(_)));
        assert!(err.to_string().contains("frontier-9000"));
    }

    #[test]
    fn empty_model_is_unknown() {
        assert!(ProviderKind::classify("").is_err());
    }
}
