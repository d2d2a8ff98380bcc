//! Parsing functions for CLI arguments.

use odm_core::models::{NormalizationSpec, OutlierTail};

/// Parse a normalization parameter in format "key=value"
///
/// # Arguments
/// * `param_str` - A string such as "hi=1.0"
///
/// # Returns
/// The key and its value as f64
pub fn parse_norm_param(param_str: &str) -> Result<(String, f64), String> {
    let (key, value) = param_str.split_once('=').ok_or_else(|| {
        format!(
            "Normalization parameter must be in format key=value (e.g., hi=1.0), got: {}",
            param_str
        )
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Missing parameter name in: {}", param_str));
    }

    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("Invalid value for {}: {}", key, value.trim()))?;
    if !value.is_finite() {
        return Err(format!("Value for {} must be finite, got {}", key, value));
    }

    Ok((key.to_string(), value))
}

/// Parse the outlier tail: "high" or "low"
pub fn parse_tail(tail_str: &str) -> Result<OutlierTail, String> {
    tail_str.parse::<OutlierTail>().map_err(|e| e.to_string())
}

/// Merge `--norm` / `--norm-param` flags into the configured normalization.
///
/// A new name replaces the configured strategy (and its parameters); bare
/// parameters are layered onto the configured one.
pub fn merge_normalization(
    current: Option<NormalizationSpec>,
    name: Option<&str>,
    params: &[String],
) -> Result<Option<NormalizationSpec>, String> {
    let mut spec = match (name, current) {
        (Some(name), _) => {
            if name.trim().is_empty() {
                return Err("Normalization name must not be empty".to_string());
            }
            NormalizationSpec::new(name.trim())
        }
        (None, Some(spec)) => spec,
        (None, None) if params.is_empty() => return Ok(None),
        (None, None) => {
            return Err("--norm-param given without a normalization (use --norm NAME)".to_string())
        }
    };

    for param in params {
        let (key, value) = parse_norm_param(param)?;
        spec.params.insert(key, value);
    }
    Ok(Some(spec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_norm_param() {
        assert_eq!(parse_norm_param("hi=1.5").unwrap(), ("hi".to_string(), 1.5));
        assert_eq!(parse_norm_param(" lo = -2 ").unwrap(), ("lo".to_string(), -2.0));
        assert!(parse_norm_param("hi").is_err());
        assert!(parse_norm_param("=1").is_err());
        assert!(parse_norm_param("hi=abc").is_err());
        assert!(parse_norm_param("hi=inf").is_err());
    }

    #[test]
    fn test_parse_tail() {
        assert_eq!(parse_tail("high").unwrap(), OutlierTail::High);
        assert_eq!(parse_tail("LOW").unwrap(), OutlierTail::Low);
        assert!(parse_tail("middle").is_err());
    }

    #[test]
    fn test_merge_normalization_new_name_replaces() {
        let current = Some(NormalizationSpec::new("zscore").with_param("x", 1.0));
        let merged = merge_normalization(current, Some("minmax"), &["hi=1".to_string()])
            .unwrap()
            .unwrap();
        assert_eq!(merged.name, "minmax");
        assert_eq!(merged.params.len(), 1);
        assert_eq!(merged.params.get("hi"), Some(&1.0));
    }

    #[test]
    fn test_merge_normalization_params_layer_onto_config() {
        let current = Some(NormalizationSpec::new("minmax").with_param("lo", 0.0));
        let merged = merge_normalization(current, None, &["hi=10".to_string()])
            .unwrap()
            .unwrap();
        assert_eq!(merged.name, "minmax");
        assert_eq!(merged.params.get("lo"), Some(&0.0));
        assert_eq!(merged.params.get("hi"), Some(&10.0));
    }

    #[test]
    fn test_merge_normalization_nothing() {
        assert_eq!(merge_normalization(None, None, &[]).unwrap(), None);
        assert!(merge_normalization(None, None, &["hi=1".to_string()]).is_err());
    }
}
