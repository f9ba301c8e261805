using forward slashes, no absolute paths and no '..' segments.
Validate all external input, use parameterized queries, never hard-code
credentials or secrets, and prefer the standard library's safe APIs.";

/// Prepends the generation policy to the user's request.
#[derive(Debug, Clone)]
pub struct PolicyEnhancer {
    policy_version: String,
}

impl PolicyEnhancer {
    pub fn new(policy_version: &str) -> Self {
        Self {
            policy_version: policy_version.to_string(),
        }
    }
}

impl Default for PolicyEnhancer {
    fn default() -> Self {
        Self::new(DEFAULT_POLICY_VERSION)
    }
}

impl Enhancer for PolicyEnhancer {
    fn enhance(&self, sanitized_prompt: &str) -> EnhancedPrompt {
        EnhancedPrompt {
            text: format!("{}\n\nTask:\n{}", POLICY, sanitized_prompt),
            policy_version: self.policy_version.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enhance_keeps_request_and_version() {
        let enhanced = PolicyEnhancer::new("v9").enhance("a login form");
        assert_eq!(enhanced.policy_version, "v9");
        assert!(enhanced.text.ends_with("Task:\na login form"));
        assert!(enhanced.text.contains("=== FILE: <relative/path> ==="));
    }
}
