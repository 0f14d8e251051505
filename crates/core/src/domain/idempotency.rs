use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::rfq::RfqId;

/// Caller-supplied key that makes a retried mutation safe to replay.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationKey(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Publish,
    MoveStatus,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::MoveStatus => "move_status",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "publish" => Some(Self::Publish),
            "move_status" => Some(Self::MoveStatus),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub operation_key: OperationKey,
    pub rfq_id: RfqId,
    pub operation_kind: OperationKind,
    pub payload_hash: String,
    pub result_json: String,
    pub correlation_id: String,
    pub created_at: DateTime<Utc>,
}

/// Hex-encoded SHA-256 of the canonical request payload.
pub fn payload_hash(payload: &str) -> String {
    format!("{:x}", Sha256::digest(payload.as_bytes()))
}
