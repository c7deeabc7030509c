use std::time::Duration;

pub const DEFAULT_QUESTION_COUNT: usize = 10;
pub const MAX_QUESTION_COUNT: usize = 30;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub telegram_token: String,
    pub question_count: usize,
    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let question_count = match lookup("QUIZ_QUESTION_COUNT") {
            None => DEFAULT_QUESTION_COUNT,
            Some(value) => match value.trim().parse::<usize>() {
                Ok(count) if (1..=MAX_QUESTION_COUNT).contains(&count) => count,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "QUIZ_QUESTION_COUNT",
                        value,
                        reason: "expected a number from 1 to 30",
                    })
                }
            },
        };

        let request_timeout = match lookup("QUIZ_REQUEST_TIMEOUT_SECS") {
            None => DEFAULT_REQUEST_TIMEOUT,
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "QUIZ_REQUEST_TIMEOUT_SECS",
                        value,
                        reason: "expected a positive number of seconds",
                    })
                }
            },
        };

        Ok(Self {
            openai_api_key: required("OPENAI_API_KEY")?,
            telegram_token: required("TELOXIDE_TOKEN")?,
            question_count,
            request_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const CREDENTIALS: [(&str, &str); 2] = [
        ("OPENAI_API_KEY", "sk-test"),
        ("TELOXIDE_TOKEN", "123:abc"),
    ];

    #[test]
    fn defaults_apply() {
        let config = load(&CREDENTIALS).unwrap();
        assert_eq!(config.openai_api_key, "sk-test");
        assert_eq!(config.telegram_token, "123:abc");
        assert_eq!(config.question_count, DEFAULT_QUESTION_COUNT);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn missing_api_key_is_fatal() {
        assert_eq!(
            load(&[("TELOXIDE_TOKEN", "123:abc")]).unwrap_err(),
            ConfigError::Missing("OPENAI_API_KEY")
        );
        assert_eq!(
            load(&[("OPENAI_API_KEY", "  "), ("TELOXIDE_TOKEN", "123:abc")]).unwrap_err(),
            ConfigError::Missing("OPENAI_API_KEY")
        );
    }

    #[test]
    fn missing_bot_token_is_fatal() {
        assert_eq!(
            load(&[("OPENAI_API_KEY", "sk-test")]).unwrap_err(),
            ConfigError::Missing("TELOXIDE_TOKEN")
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = CREDENTIALS.to_vec();
        vars.push(("QUIZ_QUESTION_COUNT", "6"));
        vars.push(("QUIZ_REQUEST_TIMEOUT_SECS", "45"));

        let config = load(&vars).unwrap();
        assert_eq!(config.question_count, 6);
        assert_eq!(config.request_timeout, Duration::from_secs(45));
    }

    #[test]
    fn bad_overrides_are_rejected() {
        for (key, value) in [
            ("QUIZ_QUESTION_COUNT", "0"),
            ("QUIZ_QUESTION_COUNT", "31"),
            ("QUIZ_QUESTION_COUNT", "ten"),
            ("QUIZ_REQUEST_TIMEOUT_SECS", "0"),
            ("QUIZ_REQUEST_TIMEOUT_SECS", "-5"),
        ] {
            let mut vars = CREDENTIALS.to_vec();
            vars.push((key, value));
            assert!(
                matches!(load(&vars), Err(ConfigError::Invalid { key: k, .. }) if k == key),
                "{key}={value} should be rejected"
            );
        }
    }
}
