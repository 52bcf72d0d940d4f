//! Workflow configuration.

use std::time::Duration;

/// Tunables for the [`Workflow`](crate::engine::Workflow) façade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Upper bound on one notification send.
    pub notify_timeout: Duration,
    /// Tax rate applied to newly promoted invoices, in basis points.
    pub default_tax_rate_bps: u32,
    /// Due date of a promoted invoice when none is given, in days from now.
    pub default_payment_terms_days: u32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            notify_timeout: Duration::from_secs(10),
            default_tax_rate_bps: 0,
            default_payment_terms_days: 14,
        }
    }
}

impl WorkflowConfig {
    /// Load from environment variables, falling back to defaults:
    ///
    /// - `CATER_NOTIFY_TIMEOUT_SECS` (default: 10)
    /// - `CATER_TAX_RATE_BPS` (default: 0)
    /// - `CATER_PAYMENT_TERMS_DAYS` (default: 14)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let notify_timeout = match parse_var(&lookup, "CATER_NOTIFY_TIMEOUT_SECS")? {
            Some(secs) => Duration::from_secs(u64::from(secs)),
            None => defaults.notify_timeout,
        };
        let default_tax_rate_bps = parse_var(&lookup, "CATER_TAX_RATE_BPS")?
            .unwrap_or(defaults.default_tax_rate_bps);
        if default_tax_rate_bps > 10_000 {
            return Err(ConfigError::Invalid {
                var: "CATER_TAX_RATE_BPS",
                value: default_tax_rate_bps.to_string(),
            });
        }
        let default_payment_terms_days = parse_var(&lookup, "CATER_PAYMENT_TERMS_DAYS")?
            .unwrap_or(defaults.default_payment_terms_days);
        Ok(Self {
            notify_timeout,
            default_tax_rate_bps,
            default_payment_terms_days,
        })
    }
}

fn parse_var<F>(lookup: &F, var: &'static str) -> Result<Option<u32>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(var)
        .map(|raw| {
            raw.trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::Invalid { var, value: raw })
        })
        .transpose()
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let cfg = WorkflowConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg, WorkflowConfig::default());
        assert_eq!(cfg.notify_timeout, Duration::from_secs(10));
    }

    #[test]
    fn overrides_apply() {
        let cfg = WorkflowConfig::from_lookup(|key| match key {
            "CATER_NOTIFY_TIMEOUT_SECS" => Some("3".into()),
            "CATER_TAX_RATE_BPS" => Some(" 825 ".into()),
            "CATER_PAYMENT_TERMS_DAYS" => Some("30".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.notify_timeout, Duration::from_secs(3));
        assert_eq!(cfg.default_tax_rate_bps, 825);
        assert_eq!(cfg.default_payment_terms_days, 30);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = WorkflowConfig::from_lookup(|key| {
            (key == "CATER_PAYMENT_TERMS_DAYS").then(|| "two weeks".to_string())
        })
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "CATER_PAYMENT_TERMS_DAYS",
                value: "two weeks".into()
            }
        );
    }

    #[test]
    fn tax_above_full_rate_is_rejected() {
        let err = WorkflowConfig::from_lookup(|key| {
            (key == "CATER_TAX_RATE_BPS").then(|| "10001".to_string())
        });
        assert!(err.is_err());
    }
}
