//! Password policy published by the server with the local strategy.
//!
//! The policy is parsed once from the strategy's `passwordPolicy` object and
//! then used synchronously for every candidate password during signup and
//! password change. Violations are reported in a fixed order so that every UI
//! renders them identically.

use serde_json::{Map, Value};

const PLACEHOLDER: char = '#';

/// A single rule family: enabled flag, numeric threshold and optional template.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rule {
    pub enabled: bool,
    pub threshold: usize,
    pub template: Option<String>,
}

impl Rule {
    fn parse(config: &Map<String, Value>, enabled_key: &str, threshold_key: &str) -> Self {
        Self {
            enabled: config.get(enabled_key).is_some_and(truthy),
            threshold: config.get(threshold_key).and_then(count).unwrap_or(0),
            template: template(config, threshold_key),
        }
    }

    fn message(&self, fallback: String) -> String {
        render(self.template.as_deref(), &self.threshold.to_string()).unwrap_or(fallback)
    }
}

/// Restricts which special characters a password may contain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestrictionRule {
    pub enabled: bool,
    pub allowed: String,
    pub template: Option<String>,
}

impl RestrictionRule {
    fn active_set(&self) -> Option<&str> {
        if self.enabled && !self.allowed.is_empty() {
            Some(self.allowed.as_str())
        } else {
            None
        }
    }
}

/// Outcome of validating one password.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyValidation {
    pub is_valid: bool,
    pub violations: Vec<String>,
}

/// Immutable password policy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: Rule,
    pub history: Rule,
    pub numbers: Rule,
    pub uppercase: Rule,
    pub lowercase: Rule,
    pub letters: Rule,
    pub special: Rule,
    pub restricted_special: RestrictionRule,
    pub max_consecutive: Rule,
    pub help_text: Option<String>,
    pub customize_help_text: bool,
}

impl PasswordPolicy {
    /// Parses the server's `passwordPolicy` object. Missing keys disable rules.
    #[must_use]
    pub fn from_config(config: &Map<String, Value>) -> Self {
        Self {
            min_length: Rule::parse(config, "passwordMinLengthEnabled", "passwordMinLength"),
            history: Rule::parse(config, "passwordHistoryCountEnabled", "passwordHistoryCount"),
            numbers: Rule::parse(config, "numbers", "numbersCount"),
            uppercase: Rule::parse(config, "highLetters", "highLettersCount"),
            lowercase: Rule::parse(config, "lowLetters", "lowLettersCount"),
            letters: Rule::parse(config, "minChars", "minCharsCount"),
            special: Rule::parse(config, "specialChars", "specialCharsCount"),
            restricted_special: RestrictionRule {
                enabled: config.get("restrictSpecialChars").is_some_and(truthy),
                allowed: config
                    .get("restrictSpecialCharsList")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                template: template(config, "restrictSpecialCharsList"),
            },
            max_consecutive: Rule::parse(config, "maxConChars", "maxConCharsCount"),
            help_text: config
                .get("helpText")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string),
            customize_help_text: config.get("customizeHelpText").is_some_and(truthy),
        }
    }

    /// Number of previous passwords the server refuses to reuse, if enforced.
    #[must_use]
    pub fn history_count(&self) -> Option<usize> {
        self.history.enabled.then_some(self.history.threshold)
    }

    /// Validates `password`, returning violations in rule order.
    #[must_use]
    pub fn validate(&self, password: &str) -> PolicyValidation {
        let mut violations = Vec::new();

        if self.min_length.enabled && password.chars().count() < self.min_length.threshold {
            violations.push(self.min_length.message(format!(
                "Password must be at least {} characters long.",
                self.min_length.threshold
            )));
        }

        check_count(&self.numbers, password, char::is_numeric, &mut violations, |n| {
            format!("Password must contain at least {n} number(s).")
        });
        check_count(&self.uppercase, password, char::is_uppercase, &mut violations, |n| {
            format!("Password must contain at least {n} uppercase letter(s).")
        });
        check_count(&self.lowercase, password, char::is_lowercase, &mut violations, |n| {
            format!("Password must contain at least {n} lowercase letter(s).")
        });
        check_count(&self.letters, password, char::is_alphabetic, &mut violations, |n| {
            format!("Password must contain at least {n} letter(s).")
        });

        let allowed = self.restricted_special.active_set();

        if self.special.enabled {
            let special = password
                .chars()
                .filter(|c| !c.is_alphanumeric())
                .filter(|c| allowed.map_or(true, |set| set.contains(*c)))
                .count();
            if special < self.special.threshold {
                violations.push(self.special.message(format!(
                    "Password must contain at least {} special character(s).",
                    self.special.threshold
                )));
            }
        }

        if let Some(set) = allowed {
            let disallowed = password
                .chars()
                .any(|c| !c.is_alphanumeric() && !set.contains(c));
            if disallowed {
                violations.push(
                    render(self.restricted_special.template.as_deref(), set).unwrap_or_else(|| {
                        format!("Password may only contain these special characters: {set}")
                    }),
                );
            }
        }

        if self.max_consecutive.enabled
            && self.max_consecutive.threshold > 0
            && longest_run(password) > self.max_consecutive.threshold
        {
            violations.push(self.max_consecutive.message(format!(
                "Password must not contain more than {} consecutive identical characters.",
                self.max_consecutive.threshold
            )));
        }

        let is_valid = violations.is_empty();
        if !is_valid && self.customize_help_text {
            if let Some(help) = &self.help_text {
                violations.insert(0, help.clone());
            }
        }

        PolicyValidation {
            is_valid,
            violations,
        }
    }
}

fn check_count(
    rule: &Rule,
    password: &str,
    predicate: fn(char) -> bool,
    violations: &mut Vec<String>,
    fallback: impl FnOnce(usize) -> String,
) {
    if !rule.enabled {
        return;
    }
    let found = password.chars().filter(|c| predicate(*c)).count();
    if found < rule.threshold {
        violations.push(rule.message(fallback(rule.threshold)));
    }
}

/// Length of the longest run of identical adjacent characters.
fn longest_run(password: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<char> = None;

    for c in password.chars() {
        current = if previous == Some(c) { current + 1 } else { 1 };
        longest = longest.max(current);
        previous = Some(c);
    }

    longest
}

fn render(template: Option<&str>, value: &str) -> Option<String> {
    template.map(|template| format!(". {}", template.replace(PLACEHOLDER, value)))
}

fn template(config: &Map<String, Value>, key: &str) -> Option<String> {
    config
        .get("helpTextTemplate")
        .and_then(|templates| templates.get(key))
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(text.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        _ => false,
    }
}

fn count(value: &Value) -> Option<usize> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
            .and_then(|n| usize::try_from(n).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
