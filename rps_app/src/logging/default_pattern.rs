//! Defines a `"default"` [`PatternEncoder`].
//!
//! This just serves to avoid repeating the pattern for every appender in the
//! configuration.

use log4rs::config::Deserialize;
use log4rs::encode::Encode;
use log4rs::encode::pattern::PatternEncoder;

fn default_true() -> bool {
    true
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultPatternConfig {
    /// Whether to prefix lines with the UTC time.
    #[serde(default = "default_true")]
    time: bool,
    /// Whether to include the log target.
    #[serde(default = "default_true")]
    target: bool,
}

pub struct DefaultPatternDeserializer;

impl Deserialize for DefaultPatternDeserializer {
    type Trait = dyn Encode;
    type Config = DefaultPatternConfig;

    fn deserialize(
        &self,
        config: Self::Config,
        _deserializers: &log4rs::config::Deserializers,
    ) -> anyhow::Result<Box<Self::Trait>> {
        Ok(Box::new(PatternEncoder::new(pattern(&config))))
    }
}

fn pattern(config: &DefaultPatternConfig) -> &'static str {
    match (config.time, config.target) {
        (true, true) => "[{d(%Y-%m-%d %H:%M:%S)(utc)} {h({l:<5})} {t}] {m}{n}",
        (true, false) => "[{d(%Y-%m-%d %H:%M:%S)(utc)} {h({l:<5})}] {m}{n}",
        (false, true) => "[{h({l:<5})} {t}] {m}{n}",
        (false, false) => "[{h({l:<5})}] {m}{n}",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_respects_flags() {
        let none = DefaultPatternConfig {
            time: false,
            target: false,
        };
        assert!(!pattern(&none).contains("{d("), "time must be omitted");
        assert!(!pattern(&none).contains("{t}"), "target must be omitted");

        let all = DefaultPatternConfig {
            time: true,
            target: true,
        };
        assert!(pattern(&all).contains("(utc)"), "time must be in utc");
        assert!(pattern(&all).contains("{t}"), "target must be included");
    }
}
