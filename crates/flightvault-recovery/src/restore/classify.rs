//! Caller-supplied classification rules.

use chrono::{DateTime, Utc};
use regex::Regex;

use flightvault_core::errors::{FlightVaultError, FlightVaultResult};
use flightvault_core::models::{ChangeKind, ClassificationRule};

/// A rule with its field pattern compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: ClassificationRule,
    pattern: Option<Regex>,
}

impl CompiledRule {
    pub fn compile(rule: &ClassificationRule) -> FlightVaultResult<Self> {
        let pattern = rule
            .field_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| {
                FlightVaultError::ConfigError(format!(
                    "rule {}: invalid field pattern: {e}",
                    rule.name
                ))
            })?;
        Ok(Self {
            rule: rule.clone(),
            pattern,
        })
    }

    /// Every condition the rule sets must hold. A time bound never matches
    /// an unknown change time.
    pub fn matches(
        &self,
        kind: ChangeKind,
        changed_fields: &[String],
        changed_at: Option<DateTime<Utc>>,
    ) -> bool {
        if self.rule.kind.is_some_and(|k| k != kind) {
            return false;
        }
        if let Some(pattern) = &self.pattern {
            if !changed_fields.iter().any(|f| pattern.is_match(f)) {
                return false;
            }
        }
        let bounded = self.rule.changed_after.is_some() || self.rule.changed_before.is_some();
        if bounded {
            let Some(at) = changed_at else {
                return false;
            };
            if self.rule.changed_after.is_some_and(|after| at <= after) {
                return false;
            }
            if self.rule.changed_before.is_some_and(|before| at > before) {
                return false;
            }
        }
        true
    }
}

/// Rules in evaluation order; the first match wins.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    pub fn compile(rules: &[ClassificationRule]) -> FlightVaultResult<Self> {
        Ok(Self {
            rules: rules
                .iter()
                .map(CompiledRule::compile)
                .collect::<FlightVaultResult<_>>()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn first_match(
        &self,
        kind: ChangeKind,
        changed_fields: &[String],
        changed_at: Option<DateTime<Utc>>,
    ) -> Option<&ClassificationRule> {
        self.rules
            .iter()
            .find(|r| r.matches(kind, changed_fields, changed_at))
            .map(|r| &r.rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use flightvault_core::models::RuleAction;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = RuleSet::compile(&[
            ClassificationRule::new("keep-prices", RuleAction::Keep).matching_fields("^price"),
            ClassificationRule::new("restore-modified", RuleAction::Restore)
                .for_kind(ChangeKind::Modified),
        ])
        .unwrap();

        let hit = rules
            .first_match(ChangeKind::Modified, &fields(&["price_eur"]), None)
            .unwrap();
        assert_eq!(hit.name, "keep-prices");

        let hit = rules
            .first_match(ChangeKind::Modified, &fields(&["name"]), None)
            .unwrap();
        assert_eq!(hit.name, "restore-modified");

        assert!(rules.first_match(ChangeKind::Added, &fields(&["name"]), None).is_none());
    }

    #[test]
    fn time_bounds_are_left_open() {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let rule = CompiledRule::compile(
            &ClassificationRule::new("window", RuleAction::Restore)
                .changed_between(t, t + Duration::minutes(5)),
        )
        .unwrap();
        assert!(!rule.matches(ChangeKind::Modified, &[], Some(t)));
        assert!(rule.matches(ChangeKind::Modified, &[], Some(t + Duration::minutes(5))));
        assert!(!rule.matches(ChangeKind::Modified, &[], None));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = RuleSet::compile(&[
            ClassificationRule::new("broken", RuleAction::Keep).matching_fields("(")
        ])
        .unwrap_err();
        assert!(matches!(err, FlightVaultError::ConfigError(_)));
    }
}
