//! Per-computer-player configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Options every decision algorithm understands, plus free-form extensions
/// an algorithm may define for itself.
///
/// `target_limit` is clamped to `1..=1000` on every assignment, including
/// deserialization; out-of-range values in persisted sessions are accepted
/// rather than rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmOptions {
    #[serde(deserialize_with = "clamped_target_limit")]
    target_limit: u32,
    pub use_random_build: bool,
    pub use_random_place: bool,
    pub use_scripting: bool,
    /// Algorithm-specific extensions, persisted verbatim.
    pub extensions: BTreeMap<String, String>,
}

impl Default for AlgorithmOptions {
    fn default() -> Self {
        Self {
            target_limit: 8,
            use_random_build: false,
            use_random_place: false,
            use_scripting: false,
            extensions: BTreeMap::new(),
        }
    }
}

impl AlgorithmOptions {
    /// How many nearby candidates target selection examines.
    pub fn target_limit(&self) -> u32 {
        self.target_limit
    }

    pub fn set_target_limit(&mut self, value: u32) {
        self.target_limit = value.clamp(1, 1000);
    }

    pub fn with_target_limit(mut self, value: u32) -> Self {
        self.set_target_limit(value);
        self
    }

    pub fn with_random_build(mut self, value: bool) -> Self {
        self.use_random_build = value;
        self
    }

    pub fn with_random_place(mut self, value: bool) -> Self {
        self.use_random_place = value;
        self
    }
}

fn clamped_target_limit<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(u32::deserialize(deserializer)?.clamp(1, 1000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = AlgorithmOptions::default();
        assert_eq!(options.target_limit(), 8);
        assert!(!options.use_random_build);
        assert!(!options.use_random_place);
        assert!(!options.use_scripting);
    }

    #[test]
    fn target_limit_is_clamped_on_assignment() {
        let mut options = AlgorithmOptions::default();
        options.set_target_limit(0);
        assert_eq!(options.target_limit(), 1);
        options.set_target_limit(5000);
        assert_eq!(options.target_limit(), 1000);
    }

    #[test]
    fn target_limit_is_clamped_on_deserialization() {
        let options: AlgorithmOptions =
            serde_json::from_str(r#"{"target_limit": 40000}"#).unwrap();
        assert_eq!(options.target_limit(), 1000);
    }
}
