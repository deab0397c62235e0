use std::{str::FromStr, time::Duration};

use crate::loader::error::ConfigLoadError;

/// Drop blank values so `FOO=` behaves like an unset variable.
pub fn non_empty(raw: Option<String>) -> Option<String> {
    raw.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Parse a humantime duration such as `30s`, `200ms` or `1m 30s`.
pub fn parse_duration(
    key: &str,
    raw: &str,
) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim()).map_err(|err| {
        ConfigLoadError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: err.to_string(),
        }
    })
}

pub fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigLoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|err: T::Err| ConfigLoadError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_treated_as_unset() {
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(Some(" 8088 ".into())), Some("8088".into()));
        assert_eq!(non_empty(None), None);
    }

    #[test]
    fn durations_accept_humantime_forms() {
        assert_eq!(
            parse_duration("K", "200ms").unwrap(),
            Duration::from_millis(200)
        );
        assert_eq!(
            parse_duration("K", "1m 30s").unwrap(),
            Duration::from_secs(90)
        );
        assert!(matches!(
            parse_duration("K", "soon"),
            Err(ConfigLoadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn numbers_report_the_offending_key() {
        assert_eq!(parse_number::<u32>("K", " 3 ").unwrap(), 3);
        let err = parse_number::<u16>("SERVER_PORT", "99999").unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }
}
