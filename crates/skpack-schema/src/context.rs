use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable project metadata supplied to the template stage and the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Extra substitution variables.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl ProjectContext {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_owned(),
            version: version.to_owned(),
            description: None,
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<&str>) -> Self {
        self.description = description.map(str::to_owned);
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.properties = properties;
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: &str, value: &str) -> Self {
        self.properties.insert(key.to_owned(), value.to_owned());
        self
    }

    /// `<name>-<version>`, the package directory and archive stem.
    pub fn package_id(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Every variable visible to templates.
    ///
    /// User properties are inserted last and may shadow the `project.*` built-ins.
    pub fn variables(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("project.name".to_owned(), self.name.clone());
        vars.insert("project.artifactId".to_owned(), self.name.clone());
        vars.insert("project.version".to_owned(), self.version.clone());
        vars.insert("project.packageId".to_owned(), self.package_id());
        vars.insert(
            "project.description".to_owned(),
            self.description.clone().unwrap_or_default(),
        );
        for (k, v) in &self.properties {
            vars.insert(k.clone(), v.clone());
        }
        vars
    }
}
