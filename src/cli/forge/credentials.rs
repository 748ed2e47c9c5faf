use crate::{error::HulahoopError, git::ConfigValues};

const TOKEN_NAMESPACE: &str = "git-hulahoop";

/// The git config key holding the access token for `host`.
pub fn token_key(host: &str) -> String {
    format!("{TOKEN_NAMESPACE}.{host}.token")
}

/// Looks up the access token for `host` in the repository's git config.
///
/// # Errors
///
/// Returns [`HulahoopError::CredentialMissing`] if the key isn't set or
/// can't be read.
pub fn lookup_token(config: &dyn ConfigValues, host: &str) -> Result<String, HulahoopError> {
    let key = token_key(host);
    let missing = || HulahoopError::CredentialMissing {
        host: host.to_string(),
        key: key.clone(),
    };

    match config.get_value(&key) {
        Ok(Some(token)) if !token.is_empty() => Ok(token),
        Ok(_) => Err(missing()),
        Err(e) => {
            tracing::debug!("Reading {key} failed: {e:#}");

            Err(missing())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticConfig(Option<&'static str>);

    impl ConfigValues for StaticConfig {
        fn get_value(&self, key: &str) -> anyhow::Result<Option<String>> {
            assert_eq!(key, "git-hulahoop.gitlab.example.com.token");

            Ok(self.0.map(str::to_string))
        }
    }

    struct BrokenConfig;

    impl ConfigValues for BrokenConfig {
        fn get_value(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("git exploded")
        }
    }

    #[test]
    fn test_lookup_token() {
        let token = lookup_token(&StaticConfig(Some("glpat-secret")), "gitlab.example.com");

        assert_eq!(token.unwrap(), "glpat-secret");
    }

    #[test]
    fn test_lookup_token_missing() {
        for config in [
            &StaticConfig(None) as &dyn ConfigValues,
            &StaticConfig(Some("")),
        ] {
            let err = lookup_token(config, "gitlab.example.com").unwrap_err();

            assert!(matches!(
                err,
                HulahoopError::CredentialMissing { ref host, ref key }
                    if host == "gitlab.example.com" && key == "git-hulahoop.gitlab.example.com.token"
            ));
        }
    }

    #[test]
    fn test_lookup_token_read_failure() {
        let err = lookup_token(&BrokenConfig, "gitlab.com").unwrap_err();

        assert!(matches!(err, HulahoopError::CredentialMissing { .. }));
    }
}
