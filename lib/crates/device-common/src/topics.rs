/// Topic suffixes under `{service}/{project}/{asset}/bwc/control/`.
pub mod suffix {
    /// Inbound command envelopes.
    pub const REQUEST: &str = "request";
    /// Receipt for each accepted request.
    pub const ACK: &str = "request/ack";
    /// Result envelopes.
    pub const RESPONSE: &str = "response";
    /// Startup runtime report.
    pub const RUNTIME: &str = "runtime";
    /// Agent-originated results (e.g. a venv created during a deploy).
    pub const SELF_DEPLOY: &str = "self-deploy";
}

/// Fully-qualified topic names for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    base: String,
}

impl Topics {
    #[must_use]
    pub fn new(service_code: &str, project_code: &str, asset_code: &str) -> Self {
        Self {
            base: format!("{service_code}/{project_code}/{asset_code}/bwc/control"),
        }
    }

    fn topic(&self, suffix: &str) -> String {
        format!("{}/{}", self.base, suffix)
    }

    #[must_use]
    pub fn request(&self) -> String {
        self.topic(suffix::REQUEST)
    }

    #[must_use]
    pub fn ack(&self) -> String {
        self.topic(suffix::ACK)
    }

    #[must_use]
    pub fn response(&self) -> String {
        self.topic(suffix::RESPONSE)
    }

    #[must_use]
    pub fn runtime(&self) -> String {
        self.topic(suffix::RUNTIME)
    }

    #[must_use]
    pub fn self_deploy(&self) -> String {
        self.topic(suffix::SELF_DEPLOY)
    }
}

/// Validate one topic segment (service, project, or asset code).
///
/// MQTT wildcards and separators would let a malformed device config
/// subscribe to other devices' request topics.
pub fn validate_segment(segment: &str) -> Result<(), &'static str> {
    if segment.is_empty() {
        return Err("topic segment must not be empty");
    }
    if segment.contains(['/', '+', '#']) {
        return Err("topic segment must not contain '/', '+' or '#'");
    }
    if segment.chars().any(char::is_control) {
        return Err("topic segment must not contain control characters");
    }
    Ok(())
}
