use std::process::Command;

use tracing::debug;

use crate::error::{Error, Result};

/// Resource audience of the Azure DevOps REST API.
pub const AZURE_DEVOPS_RESOURCE: &str = "499b84ac-1321-427f-aa17-267ca6975798";

const REAUTH_HINT: &str = "run `az login` (or export a bearer token) and retry";

/// Source of bearer tokens scoped to a resource audience.
pub trait TokenProvider {
    fn get_token(&self, audience: &str) -> Result<String>;
}

/// Reads a pre-issued bearer token from an environment variable.
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenProvider for EnvTokenProvider {
    fn get_token(&self, _audience: &str) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => {
                debug!(var = %self.var, "using bearer token from environment");
                Ok(token.trim().to_string())
            }
            _ => Err(Error::Auth(format!("${} is not set", self.var))),
        }
    }
}

/// Asks the Azure CLI for an access token for the audience.
pub struct AzCliTokenProvider {
    binary: String,
}

impl AzCliTokenProvider {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl TokenProvider for AzCliTokenProvider {
    fn get_token(&self, audience: &str) -> Result<String> {
        let output = Command::new(&self.binary)
            .args([
                "account",
                "get-access-token",
                "--resource",
                audience,
                "--query",
                "accessToken",
                "--output",
                "tsv",
            ])
            .output()
            .map_err(|e| Error::Auth(format!("failed to run {}: {e}; {REAUTH_HINT}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Auth(format!(
                "{} get-access-token failed: {}; {REAUTH_HINT}",
                self.binary,
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(Error::Auth(format!(
                "{} returned an empty token; {REAUTH_HINT}",
                self.binary
            )));
        }
        debug!(binary = %self.binary, "acquired bearer token from CLI");
        Ok(token)
    }
}

/// Tries each provider in order and returns the first token obtained.
pub struct ChainTokenProvider {
    providers: Vec<Box<dyn TokenProvider>>,
}

impl ChainTokenProvider {
    pub fn new(providers: Vec<Box<dyn TokenProvider>>) -> Self {
        Self { providers }
    }
}

impl TokenProvider for ChainTokenProvider {
    fn get_token(&self, audience: &str) -> Result<String> {
        let mut reasons = Vec::new();
        for provider in &self.providers {
            match provider.get_token(audience) {
                Ok(token) => return Ok(token),
                Err(e) => {
                    debug!(error = %e, "token provider declined");
                    reasons.push(e.to_string());
                }
            }
        }
        Err(Error::Auth(format!(
            "no usable token ({}); {REAUTH_HINT}",
            reasons.join("; ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::StaticTokenProvider;
    use serial_test::serial;

    #[test]
    #[serial]
    fn env_provider_reads_trimmed_token() {
        unsafe { std::env::set_var("ADOREVIEW_TEST_TOKEN", "  abc123\n") };
        let provider = EnvTokenProvider::new("ADOREVIEW_TEST_TOKEN");
        assert_eq!(provider.get_token(AZURE_DEVOPS_RESOURCE).unwrap(), "abc123");
        unsafe { std::env::remove_var("ADOREVIEW_TEST_TOKEN") };
    }

    #[test]
    #[serial]
    fn env_provider_missing_is_auth_error() {
        unsafe { std::env::remove_var("ADOREVIEW_TEST_TOKEN") };
        let provider = EnvTokenProvider::new("ADOREVIEW_TEST_TOKEN");
        let err = provider.get_token(AZURE_DEVOPS_RESOURCE).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }

    #[test]
    #[serial]
    fn env_provider_blank_is_auth_error() {
        unsafe { std::env::set_var("ADOREVIEW_TEST_TOKEN", "   ") };
        let provider = EnvTokenProvider::new("ADOREVIEW_TEST_TOKEN");
        assert!(provider.get_token(AZURE_DEVOPS_RESOURCE).is_err());
        unsafe { std::env::remove_var("ADOREVIEW_TEST_TOKEN") };
    }

    #[test]
    fn az_cli_missing_binary_is_auth_error() {
        let provider = AzCliTokenProvider::new("adoreview-no-such-binary");
        let err = provider.get_token(AZURE_DEVOPS_RESOURCE).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        assert!(err.to_string().contains("az login"));
    }

    #[test]
    fn chain_returns_first_success() {
        let chain = ChainTokenProvider::new(vec![
            Box::new(StaticTokenProvider::failing()),
            Box::new(StaticTokenProvider::new("second")),
            Box::new(StaticTokenProvider::new("third")),
        ]);
        assert_eq!(chain.get_token(AZURE_DEVOPS_RESOURCE).unwrap(), "second");
    }

    #[test]
    fn chain_all_failing_asks_for_reauth() {
        let chain = ChainTokenProvider::new(vec![
            Box::new(StaticTokenProvider::failing()),
            Box::new(StaticTokenProvider::failing()),
        ]);
        let err = chain.get_token(AZURE_DEVOPS_RESOURCE).unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
        assert!(err.to_string().contains("az login"));
    }

    #[test]
    fn static_provider_records_audience() {
        let provider = StaticTokenProvider::new("tok");
        provider.get_token(AZURE_DEVOPS_RESOURCE).unwrap();
        assert_eq!(
            provider.audiences.borrow().as_slice(),
            [AZURE_DEVOPS_RESOURCE.to_string()]
        );
    }
}
