//! Stored field names, well-known collections and limits shared across the data layer.

pub const ID_FIELD: &str = "_id";
pub const GUID_FIELD: &str = "guid";
pub const NAME_FIELD: &str = "name";
pub const CUSTOMERS_FIELD: &str = "customers";
pub const DELETED_FIELD: &str = "deleted";
pub const ATTRIBUTES_FIELD: &str = "attributes";

/// Collection holding the tenant records themselves.
pub const CUSTOMERS_COLLECTION: &str = "customers";

/// Ownership marker for documents visible to every tenant.
pub const GLOBAL_TENANT: &str = "";

/// Hard cap on page sizes and aggregation limits.
pub const MAX_AGGREGATION_LIMIT: usize = 10_000;

/// Prefix of operator keys in the filter language.
pub const OPERATOR_SIGIL: char = '$';
