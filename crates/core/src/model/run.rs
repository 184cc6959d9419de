use serde::{Deserialize, Serialize};

/// Body of a start-run request. Both fields empty means "run everything".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_number: Option<String>,
}

impl RunRequest {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_file(test_file: impl Into<String>, exercise_number: Option<String>) -> Self {
        Self {
            test_file: Some(test_file.into()),
            exercise_number,
        }
    }
}

/// `200` body of a start-run request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAccepted {
    pub message: String,
    pub running: bool,
}

/// `409` body of a start-run request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRejected {
    pub error: String,
    pub running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub running: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_serializes_as_empty_object() {
        assert_eq!(serde_json::to_string(&RunRequest::all()).unwrap(), "{}");
    }

    #[test]
    fn request_uses_camel_case_fields() {
        let request = RunRequest::for_file("03-Session1-Lists.test.tsx", Some("4".into()));
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"testFile":"03-Session1-Lists.test.tsx","exerciseNumber":"4"}"#
        );
        let parsed: RunRequest = serde_json::from_str(r#"{"testFile":"a.test.tsx"}"#).unwrap();
        assert_eq!(parsed.exercise_number, None);
    }
}
