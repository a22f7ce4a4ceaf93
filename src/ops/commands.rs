use crate::errors::DbError;
use bson::{Bson, Document, doc};

/// `$addToSet` of every value in `values` into the array at `path`.
pub fn add_to_set_command(path: &str, values: &[Bson]) -> Document {
    let mut target = Document::new();
    target.insert(path, doc! { "$each": values.to_vec() });
    doc! { "$addToSet": target }
}

/// `$pull` of every value in `values` from the array at `path`.
pub fn pull_from_set_command(path: &str, values: &[Bson]) -> Document {
    let mut target = Document::new();
    target.insert(path, doc! { "$in": values.to_vec() });
    doc! { "$pull": target }
}

/// `$set` of every field in `fields`.
///
/// # Errors
/// `DbError::NoFieldsToUpdate` when `fields` is empty.
pub fn set_command(fields: &Document) -> Result<Document, DbError> {
    if fields.is_empty() {
        return Err(DbError::NoFieldsToUpdate);
    }
    Ok(doc! { "$set": fields.clone() })
}
