use serde::{Deserialize, Serialize};

// -- Errors --

/// Error body returned by the API on failed requests.
///
/// Both fields default to an empty string so a partial error body still
/// yields a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Stable identifier of the error type.
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

// -- Envelope --

/// `{data, error}` wrapper used by every API response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> Envelope<T> {
    pub fn into_data(self) -> Option<T> {
        self.data
    }

    /// The error body, or an empty one when the payload carried none.
    pub fn error_or_default(&self) -> ApiError {
        self.error.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BotVoteStats;

    #[test]
    fn envelope_with_data() {
        let env: Envelope<BotVoteStats> =
            serde_json::from_str(r#"{"data":{"month_votes":12},"error":null}"#).unwrap();
        assert_eq!(env.into_data(), Some(BotVoteStats { month_votes: 12 }));
    }

    #[test]
    fn envelope_error_without_fields() {
        let env: Envelope<serde_json::Value> = serde_json::from_str(r#"{"error":{}}"#).unwrap();
        assert_eq!(env.error_or_default(), ApiError::default());
        assert!(env.data.is_none());
    }

    #[test]
    fn envelope_missing_error() {
        let env: Envelope<serde_json::Value> = serde_json::from_str(r#"{}"#).unwrap();
        let err = env.error_or_default();
        assert_eq!(err.code, "");
        assert_eq!(err.message, "");
    }
}
