use serde::{Deserialize, Serialize};

/// Static knowledge about which field paths of a collection hold arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaInfo {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub array_paths: Vec<String>,
}

impl SchemaInfo {
    pub fn new<I, S>(array_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { array_paths: array_paths.into_iter().map(Into::into).collect() }
    }

    /// Nearest enclosing array of `path` and the remainder below it.
    ///
    /// Returns `(array_path, sub_path)`; `sub_path` is empty when `path` is the array itself.
    /// When several declared arrays enclose `path`, the longest one wins.
    pub fn array_details<'a>(&'a self, path: &'a str) -> Option<(&'a str, &'a str)> {
        self.array_paths
            .iter()
            .filter_map(|ap| {
                if path == ap {
                    Some((ap.as_str(), ""))
                } else {
                    path.strip_prefix(ap.as_str())
                        .and_then(|rest| rest.strip_prefix('.'))
                        .map(|sub| (ap.as_str(), sub))
                }
            })
            .max_by_key(|(ap, _)| ap.len())
    }

    pub fn is_array_field(&self, path: &str) -> bool {
        self.array_details(path).is_some()
    }
}
