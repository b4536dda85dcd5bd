//! Turns raw model text into structured [`AnalysisResult`]s.

use crate::error::EnrichError;
use crate::types::AnalysisResult;

/// Strip the code-fence wrapper the model adds despite being asked not to.
///
/// Handles a leading ```` ```json ```` or bare ```` ``` ```` marker and a
/// trailing ```` ``` ````, trimming whitespace on both ends. Unfenced input
/// passes through unchanged.
#[must_use]
pub fn clean_response(raw: &str) -> &str {
    let mut cleaned = raw.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

/// Parse raw model text into analysis results.
///
/// The cleaned text must be a JSON array of objects. Elements that fail to
/// deserialize (missing `username`, wrong shape) are skipped with a warning
/// rather than failing the whole chunk — the matching store rows simply stay
/// unprocessed for a later run.
///
/// # Errors
///
/// Returns [`EnrichError::MalformedResponse`] when the text is not valid
/// JSON or the top-level value is not an array (prose, a bare object, ...).
pub fn normalize_response(raw: &str) -> Result<Vec<AnalysisResult>, EnrichError> {
    let cleaned = clean_response(raw);

    let value: serde_json::Value = serde_json::from_str(cleaned)
        .map_err(|e| EnrichError::MalformedResponse(format!("not valid JSON: {e}")))?;

    let serde_json::Value::Array(entries) = value else {
        return Err(EnrichError::MalformedResponse(
            "expected a JSON array of analysis objects".to_owned(),
        ));
    };

    let mut results = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<AnalysisResult>(entry) {
            Ok(result) => results.push(result),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unparseable analysis entry");
            }
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CarFlag;

    #[test]
    fn strips_json_fence() {
        assert_eq!(clean_response("```json\n[1,2]\n```"), "[1,2]");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(clean_response("```\n[]\n```"), "[]");
    }

    #[test]
    fn unfenced_input_passes_through() {
        assert_eq!(clean_response("  [1]  "), "[1]");
    }

    #[test]
    fn parses_plain_array() {
        let results =
            normalize_response("[{\"username\":\"a\",\"is_car_profile\":true}]").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].username, "a");
        assert_eq!(results[0].is_car_profile, Some(CarFlag::Flag(true)));
    }

    #[test]
    fn fenced_response_parses_like_the_service_actually_answers() {
        // Concatenation of what the model really sends back: a fence, the
        // array, a closing fence.
        let raw = concat!(
            "```json",
            "[{\"username\":\"a\",\"is_car_profile\":\"True\",\"profile_type\":\"Car Page\"},",
            "{\"username\":\"b\",\"is_car_profile\":false,\"profile_type\":\"\"}]",
            "```"
        );
        let results = normalize_response(raw).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].username, "a");
        assert_eq!(
            results[0].is_car_profile,
            Some(CarFlag::Text("True".to_owned()))
        );
        assert_eq!(results[0].profile_type.as_deref(), Some("Car Page"));
        assert_eq!(results[1].username, "b");
        assert_eq!(results[1].is_car_profile, Some(CarFlag::Flag(false)));
        assert_eq!(results[1].profile_type.as_deref(), Some(""));
    }

    #[test]
    fn prose_is_malformed() {
        let result = normalize_response("I could not classify these profiles.");
        assert!(matches!(result, Err(EnrichError::MalformedResponse(_))));
    }

    #[test]
    fn top_level_object_is_malformed() {
        let result = normalize_response("{\"username\":\"a\"}");
        assert!(matches!(result, Err(EnrichError::MalformedResponse(_))));
    }

    #[test]
    fn entries_without_username_are_skipped() {
        let raw = "[{\"username\":\"a\"},{\"profile_type\":\"business\"},42]";
        let results = normalize_response(raw).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].username, "a");
    }

    #[test]
    fn empty_array_yields_no_results() {
        assert!(normalize_response("[]").unwrap().is_empty());
    }
}
