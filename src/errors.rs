use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Format(String),

    #[error("duplicate key in collection {collection}: {id}")]
    DuplicateKey { collection: String, id: String },

    #[error("no fields to update")]
    NoFieldsToUpdate,

    #[error("store error: {0}")]
    Store(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("Decode error: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("Encode error: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("partial deletion ({deleted} deleted): {errors}")]
    PartialDeletion { deleted: u64, errors: CompoundError },
}

impl DbError {
    /// True when the store rejected a write because the `_id` already exists.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    pub fn is_no_fields_to_update(&self) -> bool {
        matches!(self, Self::NoFieldsToUpdate)
    }

    /// Request syntax problems that should be reported back to the caller verbatim.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }

    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Errors collected from independent units of work, keyed by the collection they came from.
#[derive(Debug, Default)]
pub struct CompoundError {
    failures: Vec<(String, DbError)>,
}

impl CompoundError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, collection: impl Into<String>, err: DbError) {
        self.failures.push((collection.into(), err));
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[(String, DbError)] {
        &self.failures
    }

    /// Names of the collections that failed, in the order the failures were collected.
    pub fn collections(&self) -> Vec<&str> {
        self.failures.iter().map(|(c, _)| c.as_str()).collect()
    }
}

impl fmt::Display for CompoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.failures.len() == 1 { "error" } else { "errors" };
        write!(f, "{} {plural} occurred:", self.failures.len())?;
        for (collection, err) in &self.failures {
            write!(f, "\n\t* collection {collection}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompoundError {}
