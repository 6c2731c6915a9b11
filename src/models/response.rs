use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

const DEFAULT_FAILURE_MESSAGE: &str = "Request failed";

/// Uniform wrapper returned by every request handler.
///
/// A failed envelope always carries a non-empty `message` and never carries
/// `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope<T = Value> {
    pub success: bool,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ResponseEnvelope<T> {
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            DEFAULT_FAILURE_MESSAGE.to_string()
        } else {
            message
        };

        Self {
            success: false,
            message,
            data: None,
        }
    }

    /// Returns the payload of a successful envelope, or its message as the error.
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.message)
        }
    }
}

impl ResponseEnvelope<Value> {
    /// Wraps any serializable payload, falling back to a failure envelope if
    /// the payload cannot be represented as JSON.
    pub fn ok<T: Serialize>(data: T, message: impl Into<String>) -> Self {
        match serde_json::to_value(data) {
            Ok(value) => Self::success(value, message),
            Err(e) => Self::failure(format!("Failed to serialize response data: {}", e)),
        }
    }

    pub fn decode<T: DeserializeOwned>(self) -> Result<ResponseEnvelope<T>, serde_json::Error> {
        let data = self.data.map(serde_json::from_value).transpose()?;

        Ok(ResponseEnvelope {
            success: self.success,
            message: self.message,
            data,
        })
    }
}
