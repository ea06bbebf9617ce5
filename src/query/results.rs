//! Query result types
//!
//! One tagged result per query kind. Payloads that do not match the expected
//! shape are kept as [`Value`] in an `Unparsed` variant instead of failing.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of file-system entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    #[serde(alias = "dir")]
    Directory,
    #[serde(other)]
    Unknown,
}

/// Result of an `isExist` query
#[derive(Debug, Clone, PartialEq)]
pub enum Existence {
    Known(bool),
    Unparsed(Value),
}

impl Existence {
    pub fn from_value(value: Value) -> Self {
        match &value {
            Value::Bool(exists) => Existence::Known(*exists),
            Value::Object(map) => match map.get("exists") {
                Some(Value::Bool(exists)) => Existence::Known(*exists),
                _ => Existence::Unparsed(value),
            },
            _ => Existence::Unparsed(value),
        }
    }

    pub fn exists(&self) -> Option<bool> {
        match self {
            Existence::Known(exists) => Some(*exists),
            Existence::Unparsed(_) => None,
        }
    }
}

/// Metadata about a single file or directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(rename = "type", alias = "kind")]
    pub entry_type: EntryType,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, alias = "createdAt", alias = "created_at")]
    pub created: Option<u64>,
    #[serde(default, alias = "modifiedAt", alias = "modified_at")]
    pub modified: Option<u64>,
}

/// Result of a `getMetadata` query
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataResult {
    Metadata(FileMetadata),
    Unparsed(Value),
}

impl MetadataResult {
    pub fn from_value(value: Value) -> Self {
        match parse_as(value) {
            Ok(metadata) => MetadataResult::Metadata(metadata),
            Err(value) => MetadataResult::Unparsed(value),
        }
    }
}

/// Placement of a path in the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathInfo {
    #[serde(alias = "parentPath")]
    pub parent_path: String,
    pub depth: u64,
    #[serde(rename = "type", alias = "kind")]
    pub entry_type: EntryType,
}

/// Result of a `getInfo` query
#[derive(Debug, Clone, PartialEq)]
pub enum InfoResult {
    Info(PathInfo),
    Unparsed(Value),
}

impl InfoResult {
    pub fn from_value(value: Value) -> Self {
        match parse_as(value) {
            Ok(info) => InfoResult::Info(info),
            Err(value) => InfoResult::Unparsed(value),
        }
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "type", alias = "kind")]
    pub entry_type: EntryType,
}

/// Result of a `listDirs` query
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Entries(Vec<DirEntry>),
    Unparsed(Value),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListingShape {
    Bare(Vec<DirEntry>),
    Wrapped { entries: Vec<DirEntry> },
}

impl Listing {
    pub fn from_value(value: Value) -> Self {
        match parse_as(value) {
            Ok(ListingShape::Bare(entries)) | Ok(ListingShape::Wrapped { entries }) => {
                Listing::Entries(entries)
            }
            Err(value) => Listing::Unparsed(value),
        }
    }
}

/// Outcome of a previously submitted operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "OutcomeFields")]
pub struct OperationOutcome {
    pub operation_id: Option<String>,
    pub status: Option<String>,
    pub data: Option<Value>,
}

/// Wire shape of an outcome. Servers spell the identifier `fsid` or
/// `operationId` and the payload `message` or `data`, sometimes both at once.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeFields {
    #[serde(default, deserialize_with = "string_or_number")]
    fsid: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    operation_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
}

impl From<OutcomeFields> for OperationOutcome {
    fn from(fields: OutcomeFields) -> Self {
        // `Option<Value>` already maps JSON null to None
        Self {
            operation_id: fields.fsid.or(fields.operation_id),
            status: fields.status,
            data: fields.message.or(fields.data),
        }
    }
}

impl OperationOutcome {
    /// Whether any of identifier, status or payload is present
    pub fn has_content(&self) -> bool {
        self.operation_id.is_some()
            || self.status.is_some()
            || self.data.as_ref().is_some_and(|data| !data.is_null())
    }
}

/// Result of a `getResult` lookup.
///
/// The server computes outcomes asynchronously, so `Pending` is a normal answer.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    Pending,
    Completed(OperationOutcome),
    Unparsed(Value),
}

impl OperationResult {
    pub fn from_value(value: Value) -> Self {
        if value.is_null() {
            return OperationResult::Pending;
        }
        match OperationOutcome::deserialize(&value) {
            Ok(outcome) if outcome.has_content() => OperationResult::Completed(outcome),
            _ => OperationResult::Unparsed(value),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, OperationResult::Pending)
    }
}

/// Deserialize `value` as `T`, handing the original value back on mismatch
fn parse_as<T: DeserializeOwned>(value: Value) -> Result<T, Value> {
    T::deserialize(&value).map_err(|_| value)
}

/// Accept a JSON string or number, yielding its decimal text
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}
