//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `RunConfig`.
///
/// Any new field added to `RunConfig` must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [run]
        "run",
        "run.channel_count",
        "run.max_window_steps",
        "run.clock",
        "run.scale_override",
        // [dead_time]
        "dead_time",
        "dead_time.lm555_secs",
        "dead_time.crystal_secs",
        // [channels]
        "channels",
        "channels.offsets_secs",
        "channels.perimeter",
        // [light_curve]
        "light_curve",
        "light_curve.bin_duration_secs",
        "light_curve.max_interval_secs",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smallest key so suggestions are stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|&(dist, _)| dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are reported by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| {
            let suggestion = suggest_correction(&key, &known);
            ValidationWarning {
                message: format!("Unknown config key '{key}'"),
                field: key,
                suggestion,
            }
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed `RunConfig`.
///
/// Returns (errors, warnings): errors are impossible values that must
/// prevent the run; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::RunConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let lc = &config.light_curve;
    if !lc.bin_duration_secs.is_finite() || lc.bin_duration_secs <= 0.0 {
        errors.push(format!(
            "light_curve.bin_duration_secs = {} must be > 0 (used as divisor)",
            lc.bin_duration_secs
        ));
    }
    if !lc.max_interval_secs.is_finite() || lc.max_interval_secs < 0.0 {
        errors.push(format!(
            "light_curve.max_interval_secs = {} must be >= 0",
            lc.max_interval_secs
        ));
    }

    // A window wider than one second merges unrelated showers
    let ticks = config.scale().ticks_per_second();
    if ticks.is_finite() && ticks > 0.0 && f64::from(config.run.max_window_steps) > ticks {
        warnings.push(ValidationWarning {
            field: "run.max_window_steps".to_string(),
            message: format!(
                "max_window_steps = {} spans more than one second at {} ticks/s",
                config.run.max_window_steps, ticks
            ),
            suggestion: None,
        });
    }

    let dead_time = config.dead_time_secs();
    if dead_time > 1.0 {
        warnings.push(ValidationWarning {
            field: "dead_time".to_string(),
            message: format!("dead time of {dead_time:.3} s is outside the measured range (0-1 s)"),
            suggestion: None,
        });
    }

    if config.run.channel_count == 1 {
        warnings.push(ValidationWarning {
            field: "run.channel_count".to_string(),
            message: "a single channel can never produce coincidences".to_string(),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("window", "window"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("perimter", "perimeter"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [run]
            channel_count = 4
            [channels]
            perimeter = [0]
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"run".to_string()));
        assert!(keys.contains(&"run.channel_count".to_string()));
        assert!(keys.contains(&"channels.perimeter".to_string()));
    }

    #[test]
    fn test_suggestion_for_typo() {
        let known = known_config_keys();
        assert_eq!(
            suggest_correction("run.chanel_count", &known).as_deref(),
            Some("run.channel_count")
        );
        assert!(suggest_correction("completely.unrelated.key", &known).is_none());
    }

    #[test]
    fn test_zero_bin_duration_is_error() {
        let mut config = super::super::RunConfig::default();
        config.light_curve.bin_duration_secs = 0.0;
        let (errors, _) = validate_physical_ranges(&config);
        assert_eq!(errors.len(), 1);
    }
}
