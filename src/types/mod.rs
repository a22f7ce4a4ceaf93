mod document;
mod request;
mod schema;

pub use document::{Customer, DocContent, Document, now_rfc3339};
pub use request::{
    AggResult, FieldCount, ListRequest, Metadata, SearchResult, UniqueValuesRequest,
    UniqueValuesResponse,
};
pub use schema::SchemaInfo;
