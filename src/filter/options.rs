use super::FilterBuilder;
use crate::store::FindSpec;
use bson::{Bson, Document};

/// Ordered set of included fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionBuilder {
    fields: Vec<String>,
}

impl ProjectionBuilder {
    pub fn include<S: AsRef<str>>(&mut self, fields: &[S]) -> &mut Self {
        for f in fields {
            let f = f.as_ref();
            if !f.is_empty() && !self.fields.iter().any(|x| x == f) {
                self.fields.push(f.to_string());
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// `None` when nothing was included, which means "all fields".
    pub fn get(&self) -> Option<Document> {
        if self.fields.is_empty() {
            return None;
        }
        Some(self.fields.iter().map(|f| (f.clone(), Bson::Int32(1))).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_bson(self) -> Bson {
        match self {
            Self::Asc => Bson::Int32(1),
            Self::Desc => Bson::Int32(-1),
        }
    }
}

/// Ordered field → direction list; re-adding a field replaces its direction in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortBuilder {
    keys: Vec<(String, Direction)>,
}

impl SortBuilder {
    pub fn by(&mut self, field: &str, dir: Direction) -> &mut Self {
        match self.keys.iter_mut().find(|(f, _)| f == field) {
            Some(slot) => slot.1 = dir,
            None => self.keys.push((field.to_string(), dir)),
        }
        self
    }

    pub fn asc(&mut self, field: &str) -> &mut Self {
        self.by(field, Direction::Asc)
    }

    pub fn desc(&mut self, field: &str) -> &mut Self {
        self.by(field, Direction::Desc)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self) -> Option<Document> {
        if self.keys.is_empty() {
            return None;
        }
        Some(self.keys.iter().map(|(f, d)| (f.clone(), d.as_bson())).collect())
    }
}

/// Filter, projection, sort and paging for one query.
///
/// `FindOptions::default()` matches everything with no sort, projection or paging, and
/// operations treat a missing `FindOptions` the same way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    filter: FilterBuilder,
    projection: ProjectionBuilder,
    sort: SortBuilder,
    skip: u64,
    limit: u64,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&mut self) -> &mut FilterBuilder {
        &mut self.filter
    }

    pub fn projection(&mut self) -> &mut ProjectionBuilder {
        &mut self.projection
    }

    pub fn sort(&mut self) -> &mut SortBuilder {
        &mut self.sort
    }

    pub fn set_skip(&mut self, skip: u64) -> &mut Self {
        self.skip = skip;
        self
    }

    /// Zero means unlimited.
    pub fn set_limit(&mut self, limit: u64) -> &mut Self {
        self.limit = limit;
        self
    }

    pub fn skip(&self) -> u64 {
        self.skip
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn filter_doc(&self) -> Document {
        self.filter.get()
    }

    pub fn sort_doc(&self) -> Option<Document> {
        self.sort.get()
    }

    pub fn projection_doc(&self) -> Option<Document> {
        self.projection.get()
    }

    pub fn to_find_spec(&self) -> FindSpec {
        FindSpec {
            projection: self.projection.get(),
            sort: self.sort.get(),
            skip: self.skip,
            limit: (self.limit > 0).then_some(self.limit),
        }
    }

    /// Sort, skip, limit and projection stages in that order, each only when set.
    pub fn page_stages(&self) -> Vec<Document> {
        let mut stages = Vec::new();
        if let Some(sort) = self.sort.get() {
            stages.push(bson::doc! { "$sort": sort });
        }
        if self.skip > 0 {
            stages.push(bson::doc! { "$skip": i64::try_from(self.skip).unwrap_or(i64::MAX) });
        }
        if self.limit > 0 {
            stages.push(bson::doc! { "$limit": i64::try_from(self.limit).unwrap_or(i64::MAX) });
        }
        if let Some(projection) = self.projection.get() {
            stages.push(bson::doc! { "$project": projection });
        }
        stages
    }

    /// `$match` on the filter followed by [`Self::page_stages`].
    pub fn results_pipeline(&self) -> Vec<Document> {
        let mut stages = vec![bson::doc! { "$match": self.filter.get() }];
        stages.extend(self.page_stages());
        stages
    }
}
