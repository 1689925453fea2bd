//! Model-name directives
//!
//! Gemini model names may carry reasoning flags as suffixes:
//!
//! | Model name                   | Canonical id       | Effect                 |
//! |------------------------------|--------------------|------------------------|
//! | `gemini-2.5-flash-thinking-512` | `gemini-2.5-flash` | reasoning budget 512 |
//! | `gemini-2.5-flash-thinking`  | `gemini-2.5-flash` | reasoning forced on    |
//! | `gemini-2.5-flash-nothinking`| `gemini-2.5-flash` | reasoning forced off   |
//!
//! The suffixes are decoded once into a [`ModelDirective`] and carried as data afterwards.
//! Any run of digits is a budget; budgets past `u64::MAX` saturate, and the value sent
//! upstream is clamped to what `thinkingBudget` can carry.

use once_cell::sync::Lazy;
use regex::Regex;

use super::wire::GeminiThinkingConfig;

static BUDGET_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)-thinking-([0-9]+)$").expect("static regex"));

const THINKING_SUFFIX: &str = "-thinking";
const NO_THINKING_SUFFIX: &str = "-nothinking";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReasoningMode {
    #[default]
    Default,
    ForcedOn,
    ForcedOff,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDirective {
    pub canonical_model_id: String,
    pub reasoning_budget: Option<u64>,
    pub reasoning_mode: ReasoningMode,
}

impl ModelDirective {
    /// A directive that leaves `model` untouched.
    pub fn plain(model: impl Into<String>) -> Self {
        Self {
            canonical_model_id: model.into(),
            reasoning_budget: None,
            reasoning_mode: ReasoningMode::Default,
        }
    }

    /// Decode the suffixes of `model`. Never fails.
    pub fn parse(model: &str, thinking_adapter_enabled: bool) -> Self {
        if !thinking_adapter_enabled {
            return Self::plain(model);
        }

        if let Some(caps) = BUDGET_SUFFIX.captures(model) {
            // digits only, so the parse can fail on overflow alone
            let budget = caps[2].parse::<u64>().unwrap_or(u64::MAX);
            return Self {
                canonical_model_id: caps[1].to_string(),
                reasoning_budget: Some(budget),
                reasoning_mode: ReasoningMode::Default,
            };
        }

        if let Some(base) = strip_non_empty_suffix(model, THINKING_SUFFIX) {
            return Self {
                reasoning_mode: ReasoningMode::ForcedOn,
                ..Self::plain(base)
            };
        }

        if let Some(base) = strip_non_empty_suffix(model, NO_THINKING_SUFFIX) {
            return Self {
                reasoning_mode: ReasoningMode::ForcedOff,
                ..Self::plain(base)
            };
        }

        Self::plain(model)
    }

    pub fn is_plain(&self) -> bool {
        self.reasoning_budget.is_none() && self.reasoning_mode == ReasoningMode::Default
    }

    /// `thinkingConfig` for a generate request, or `None` when the model name set no flag.
    pub fn thinking_config(&self) -> Option<GeminiThinkingConfig> {
        if let Some(budget) = self.reasoning_budget {
            return Some(GeminiThinkingConfig {
                thinking_budget: Some(u32::try_from(budget).unwrap_or(u32::MAX)),
                include_thoughts: Some(true),
            });
        }
        match self.reasoning_mode {
            ReasoningMode::Default => None,
            ReasoningMode::ForcedOn => Some(GeminiThinkingConfig {
                thinking_budget: None,
                include_thoughts: Some(true),
            }),
            ReasoningMode::ForcedOff => Some(GeminiThinkingConfig {
                thinking_budget: Some(0),
                include_thoughts: None,
            }),
        }
    }
}

fn strip_non_empty_suffix<'a>(model: &'a str, suffix: &str) -> Option<&'a str> {
    model.strip_suffix(suffix).filter(|base| !base.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_passes_through() {
        for model in ["foo-thinking-512", "foo-thinking", "foo-nothinking", "gemini-2.0-flash"] {
            assert_eq!(ModelDirective::parse(model, false), ModelDirective::plain(model));
        }
    }

    #[test]
    fn test_budget_suffix() {
        let past_u32 = u64::from(u32::MAX) + 1;
        for budget in [0u64, 1, 512, 24576, past_u32, u64::MAX] {
            let d = ModelDirective::parse(&format!("foo-thinking-{}", budget), true);
            assert_eq!(d.canonical_model_id, "foo");
            assert_eq!(d.reasoning_budget, Some(budget));
            assert_eq!(d.reasoning_mode, ReasoningMode::Default);
        }
    }

    #[test]
    fn test_forced_modes() {
        let on = ModelDirective::parse("foo-thinking", true);
        assert_eq!(on.canonical_model_id, "foo");
        assert_eq!(on.reasoning_mode, ReasoningMode::ForcedOn);
        assert_eq!(on.reasoning_budget, None);

        let off = ModelDirective::parse("foo-nothinking", true);
        assert_eq!(off.canonical_model_id, "foo");
        assert_eq!(off.reasoning_mode, ReasoningMode::ForcedOff);
    }

    #[test]
    fn test_malformed_budget_falls_through() {
        assert_eq!(
            ModelDirective::parse("foo-thinking-abc", true),
            ModelDirective::plain("foo-thinking-abc")
        );
        assert_eq!(ModelDirective::parse("-thinking", true), ModelDirective::plain("-thinking"));
    }

    #[test]
    fn test_huge_budget_saturates() {
        let d = ModelDirective::parse("foo-thinking-4294967296", true);
        assert_eq!(d.canonical_model_id, "foo");
        assert_eq!(d.reasoning_budget, Some(4_294_967_296));
        assert_eq!(d.thinking_config().unwrap().thinking_budget, Some(u32::MAX));

        let d = ModelDirective::parse("foo-thinking-99999999999999999999999", true);
        assert_eq!(d.canonical_model_id, "foo");
        assert_eq!(d.reasoning_budget, Some(u64::MAX));
        assert_eq!(d.thinking_config().unwrap().thinking_budget, Some(u32::MAX));
    }

    #[test]
    fn test_budget_rule_takes_precedence() {
        let d = ModelDirective::parse("a-thinking-b-thinking-8", true);
        assert_eq!(d.canonical_model_id, "a-thinking-b");
        assert_eq!(d.reasoning_budget, Some(8));
    }

    #[test]
    fn test_thinking_config() {
        let cfg = ModelDirective::parse("m-thinking-512", true).thinking_config().unwrap();
        assert_eq!(cfg.thinking_budget, Some(512));
        assert_eq!(cfg.include_thoughts, Some(true));

        let off = ModelDirective::parse("m-nothinking", true).thinking_config().unwrap();
        assert_eq!(off.thinking_budget, Some(0));

        assert!(ModelDirective::plain("m").thinking_config().is_none());
    }
}
