//! Daemon response validation.

/// Status token of a failed request.
pub const ERROR_MARKER: &str = "-ERROR";
/// Status token of a successful request.
pub const OK_MARKER: &str = "-OK";

/// Check a raw response. Any occurrence of the error marker is a failure;
/// everything else is returned as success evidence.
pub fn validate_response(response: &str) -> Result<&str, ResponseError> {
    if !response.contains(ERROR_MARKER) {
        return Ok(response);
    }
    let mut code = None;
    let mut description = None;
    for line in response.lines() {
        if let Some(v) = line.strip_prefix("Error-Code:") {
            code = v.trim().parse().ok();
        } else if let Some(v) = line.strip_prefix("Error-Description:") {
            description = Some(v.trim().to_string());
        }
    }
    Err(ResponseError::Daemon {
        code,
        description,
        response: response.to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("server error: {response}")]
    Daemon {
        code: Option<u16>,
        description: Option<String>,
        /// Full response text as received.
        response: String,
    },
}
