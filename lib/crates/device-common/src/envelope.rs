use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel for numeric result fields that carry no value (pid, size, model version).
pub const UNKNOWN: i64 = -1;

fn unknown() -> i64 {
    UNKNOWN
}

/// Inbound control message received on the request topic.
///
/// `cmd_info` stays untyped here; the agent decodes it per `cmd_type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEnvelope {
    #[serde(default)]
    pub cmd_type: String,
    #[serde(default)]
    pub sub_cmd_type: String,
    #[serde(default)]
    pub asset_code: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub cmd_info: Value,
}

/// Receipt published before a command is executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub request_id: String,
    pub message: String,
}

impl Ack {
    #[must_use]
    pub fn ok(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            message: "ok".to_string(),
        }
    }
}

/// Completion status of a command.
///
/// The cloud reads `succeed` as an integer flag, so it is serialized as 0/1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(rename = "succeed", with = "succeed_flag")]
    pub succeeded: bool,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(rename = "errMsg", default)]
    pub error_message: String,
}

impl Status {
    #[must_use]
    pub fn ok() -> Self {
        Self::success(200)
    }

    #[must_use]
    pub fn success(status_code: u16) -> Self {
        Self {
            succeeded: true,
            status_code,
            error_message: String::new(),
        }
    }

    #[must_use]
    pub fn failed(status_code: u16, error_message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            status_code,
            error_message: error_message.into(),
        }
    }
}

mod succeed_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(u8::deserialize(d)? != 0)
    }
}

/// Per-application outcome carried inside a [`ResultEnvelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub command: String,
    pub sub_command: String,
    #[serde(default = "unknown")]
    pub pid: i64,
    #[serde(default = "unknown")]
    pub size: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub venv_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub venv_requirement: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameter: Map<String, Value>,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_repo_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model_name: String,
    #[serde(default = "unknown")]
    pub model_version: i64,
}

impl CommandResult {
    /// Blank result for `command`/`sub_command` with every numeric field unknown.
    #[must_use]
    pub fn new(command: &str, sub_command: &str) -> Self {
        Self {
            command: command.to_string(),
            sub_command: sub_command.to_string(),
            pid: UNKNOWN,
            size: UNKNOWN,
            app_name: String::new(),
            app_id: String::new(),
            venv_name: String::new(),
            venv_requirement: String::new(),
            message: String::new(),
            parameter: Map::new(),
            updated_at: 0,
            app_repo_path: String::new(),
            model_id: String::new(),
            model_name: String::new(),
            model_version: UNKNOWN,
        }
    }
}

/// Outbound reply for one command.
///
/// Exactly one of `result` / `results` is populated: use [`ResultEnvelope::single`]
/// for commands addressed to one application and [`ResultEnvelope::group`] for
/// application groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub asset_code: String,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub app_group_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<CommandResult>,
    pub status: Status,
}

impl ResultEnvelope {
    #[must_use]
    pub fn single(asset_code: &str, request_id: &str, result: CommandResult, status: Status) -> Self {
        Self {
            asset_code: asset_code.to_string(),
            request_id: request_id.to_string(),
            app_group_id: String::new(),
            result: Some(result),
            results: Vec::new(),
            status,
        }
    }

    #[must_use]
    pub fn group(
        asset_code: &str,
        request_id: &str,
        app_group_id: &str,
        results: Vec<CommandResult>,
        status: Status,
    ) -> Self {
        Self {
            asset_code: asset_code.to_string(),
            request_id: request_id.to_string(),
            app_group_id: app_group_id.to_string(),
            result: None,
            results,
            status,
        }
    }

    /// Whether this envelope reports a group of applications.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.result.is_none()
    }
}

/// Published once at startup: installed interpreters and agent component versions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    pub python: Vec<String>,
    pub bwc_version: BTreeMap<String, String>,
}
