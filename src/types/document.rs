use crate::consts::{CUSTOMERS_FIELD, DELETED_FIELD, GLOBAL_TENANT, ID_FIELD};
use crate::errors::DbError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Capabilities the data layer needs from every stored payload type.
pub trait DocContent: Serialize + DeserializeOwned + Clone + Send + Sync {
    fn guid(&self) -> &str;
    fn set_guid(&mut self, guid: String);
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    fn attributes(&self) -> Option<&bson::Document>;
    fn set_attributes(&mut self, attributes: bson::Document);
    fn creation_time(&self) -> Option<&str> {
        None
    }
    fn set_creation_time(&mut self, _time: String) {}

    /// Prepares a payload for its first insert: assigns a GUID when missing and stamps
    /// the creation time.
    fn init_new(&mut self) {
        if self.guid().is_empty() {
            self.set_guid(uuid::Uuid::new_v4().to_string());
        }
        self.set_creation_time(now_rfc3339());
    }
}

/// Stored envelope: the payload's fields inlined next to `_id`, `customers` and `deleted`.
#[derive(Debug, Clone, PartialEq)]
pub struct Document<T> {
    pub id: String,
    pub content: T,
    pub customers: Vec<String>,
    pub deleted: bool,
}

impl<T: DocContent> Document<T> {
    /// Envelope owned by `tenant`, keyed by the payload's GUID.
    pub fn new(content: T, tenant: &str) -> Self {
        Self { id: content.guid().to_string(), content, customers: vec![tenant.to_string()], deleted: false }
    }

    /// Envelope visible to every tenant.
    pub fn global(content: T) -> Self {
        Self::new(content, GLOBAL_TENANT)
    }

    #[must_use]
    pub fn with_customers(mut self, customers: Vec<String>) -> Self {
        self.customers = customers;
        self
    }

    /// # Errors
    /// Fails when the payload cannot be encoded as a BSON document.
    pub fn to_bson(&self) -> Result<bson::Document, DbError> {
        let mut doc = bson::to_document(&self.content)?;
        doc.insert(ID_FIELD, self.id.clone());
        doc.insert(CUSTOMERS_FIELD, self.customers.clone());
        if self.deleted {
            doc.insert(DELETED_FIELD, true);
        } else {
            doc.remove(DELETED_FIELD);
        }
        Ok(doc)
    }

    /// # Errors
    /// Fails when the stored shape does not decode into `T`.
    pub fn from_bson(mut doc: bson::Document) -> Result<Self, DbError> {
        let id = match doc.remove(ID_FIELD) {
            Some(bson::Bson::String(s)) => s,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let customers = match doc.remove(CUSTOMERS_FIELD) {
            Some(bson::Bson::Array(items)) => {
                items.into_iter().filter_map(|c| c.as_str().map(str::to_string)).collect()
            }
            _ => Vec::new(),
        };
        let deleted = matches!(doc.remove(DELETED_FIELD), Some(bson::Bson::Boolean(true)));
        Ok(Self { id, content: bson::from_document(doc)?, customers, deleted })
    }
}

/// A tenant record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<bson::Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_posture_scan_triggered: Option<String>,
}

impl Customer {
    pub fn new(guid: impl Into<String>, name: impl Into<String>) -> Self {
        Self { guid: guid.into(), name: name.into(), ..Self::default() }
    }

    /// The tenant record is owned by the tenant itself.
    pub fn into_document(self) -> Document<Self> {
        let guid = self.guid.clone();
        Document::new(self, &guid)
    }
}

impl DocContent for Customer {
    fn guid(&self) -> &str {
        &self.guid
    }
    fn set_guid(&mut self, guid: String) {
        self.guid = guid;
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn set_name(&mut self, name: String) {
        self.name = name;
    }
    fn attributes(&self) -> Option<&bson::Document> {
        self.attributes.as_ref()
    }
    fn set_attributes(&mut self, attributes: bson::Document) {
        self.attributes = Some(attributes);
    }
    fn creation_time(&self) -> Option<&str> {
        self.creation_time.as_deref()
    }
    fn set_creation_time(&mut self, time: String) {
        self.creation_time = Some(time);
    }
}
