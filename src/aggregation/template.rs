use crate::config::StoreConfig;
use crate::errors::DbError;
use bson::{Bson, Document};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Name of the built-in customers-by-scan-date template.
pub const CUSTOMERS_WITH_SCANS_BETWEEN_DATES: &str = "customersWithScansBetweenDates";

const BUILTIN: &[(&str, &str)] = &[(
    CUSTOMERS_WITH_SCANS_BETWEEN_DATES,
    include_str!("../../templates/customersWithScansBetweenDates.json"),
)];

const TEMPLATE_EXT: &str = "json";

/// Named template arguments; values are substituted as JSON.
pub type TemplateArgs = BTreeMap<String, serde_json::Value>;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

fn valid_variable(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
}

/// A pipeline template split into literal JSON text and `{{name}}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    name: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parses `source`, rejecting malformed placeholders and text that does not form a stage
    /// list once every placeholder is filled.
    ///
    /// # Errors
    /// `DbError::Template` naming the template.
    pub fn parse(name: &str, source: &str) -> Result<Self, DbError> {
        let malformed = || DbError::Template(format!("{name}: malformed placeholder"));
        let mut segments = Vec::new();
        let mut rest = source;
        while let Some(open) = rest.find(OPEN) {
            let after = &rest[open + OPEN.len()..];
            let close = after.find(CLOSE).ok_or_else(malformed)?;
            let var = after[..close].trim();
            if !valid_variable(var) {
                return Err(malformed());
            }
            segments.push(Segment::Text(rest[..open].to_string()));
            segments.push(Segment::Var(var.to_string()));
            rest = &after[close + CLOSE.len()..];
        }
        segments.push(Segment::Text(rest.to_string()));
        let tpl = Self { name: name.to_string(), segments };
        let trial: TemplateArgs = tpl.variables().into_iter().map(|v| (v, serde_json::Value::from(0))).collect();
        tpl.render(&trial)?;
        Ok(tpl)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Placeholder names in first-use order.
    pub fn variables(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for s in &self.segments {
            if let Segment::Var(v) = s
                && !out.contains(v)
            {
                out.push(v.clone());
            }
        }
        out
    }

    /// Substitutes `args` and decodes the result as a pipeline.
    ///
    /// # Errors
    /// `DbError::Template` for a missing argument or text that is not a list of stages.
    pub fn render(&self, args: &TemplateArgs) -> Result<Vec<Document>, DbError> {
        let mut text = String::new();
        for s in &self.segments {
            match s {
                Segment::Text(t) => text.push_str(t),
                Segment::Var(v) => {
                    let value = args.get(v).ok_or_else(|| {
                        DbError::Template(format!("{}: missing argument {v}", self.name))
                    })?;
                    text.push_str(&value.to_string());
                }
            }
        }
        let stages: Vec<serde_json::Value> = serde_json::from_str(&text)
            .map_err(|e| DbError::Template(format!("{}: {e}", self.name)))?;
        stages
            .into_iter()
            .map(|v| match Bson::try_from(v) {
                Ok(Bson::Document(d)) => Ok(d),
                Ok(other) => Err(DbError::Template(format!(
                    "{}: stage is not a document: {other}",
                    self.name
                ))),
                Err(e) => Err(DbError::Template(format!("{}: {e}", self.name))),
            })
            .collect()
    }
}

/// Templates compiled once and looked up by name.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    /// Registry holding only the built-in templates.
    ///
    /// # Errors
    /// `DbError::Template` when a built-in fails to parse.
    pub fn builtin() -> Result<Self, DbError> {
        let mut reg = Self::default();
        for (name, source) in BUILTIN {
            reg.register(name, source)?;
        }
        Ok(reg)
    }

    /// Built-ins plus every `*.json` file in `dir`, named by file stem.
    ///
    /// # Errors
    /// I/O failures and any template that does not parse.
    pub fn load_dir(dir: &Path) -> Result<Self, DbError> {
        let mut reg = Self::builtin()?;
        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|x| x.to_str()) == Some(TEMPLATE_EXT))
            .collect();
        paths.sort();
        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let source = std::fs::read_to_string(&path)?;
            reg.register(name, &source)?;
            log::info!("loaded aggregation template {name} from {}", path.display());
        }
        Ok(reg)
    }

    /// Built-ins plus the configured template directory, when one is set.
    ///
    /// # Errors
    /// Same as [`Self::load_dir`].
    pub fn from_config(config: &StoreConfig) -> Result<Self, DbError> {
        match &config.templates_dir {
            Some(dir) => Self::load_dir(dir),
            None => Self::builtin(),
        }
    }

    /// Parses and stores `source` under `name`, replacing an earlier template of that name.
    ///
    /// # Errors
    /// `DbError::Template` when the source does not parse.
    pub fn register(&mut self, name: &str, source: &str) -> Result<(), DbError> {
        let tpl = Template::parse(name, source)?;
        self.templates.insert(name.to_string(), tpl);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Template, DbError> {
        self.templates.get(name).ok_or_else(|| DbError::TemplateNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// # Errors
    /// `DbError::TemplateNotFound` or a render failure.
    pub fn render(&self, name: &str, args: &TemplateArgs) -> Result<Vec<Document>, DbError> {
        self.get(name)?.render(args)
    }
}
