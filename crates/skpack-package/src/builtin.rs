/// Logical root marker shared by every built-in resource location.
pub const RESOURCE_ROOT: &str = "skipper";

/// A resource compiled into the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinResource {
    /// Location including the [`RESOURCE_ROOT`] marker, e.g. `skipper/values.yml`.
    pub location: &'static str,
    pub content: &'static [u8],
}

/// The default Skipper package skeleton.
pub const BUILTIN_RESOURCES: &[BuiltinResource] = &[
    BuiltinResource {
        location: "skipper/package.yml",
        content: include_bytes!("../resources/skipper/package.yml"),
    },
    BuiltinResource {
        location: "skipper/values.yml",
        content: include_bytes!("../resources/skipper/values.yml"),
    },
    BuiltinResource {
        location: "skipper/templates/app.yml",
        content: include_bytes!("../resources/skipper/templates/app.yml"),
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_locations_are_under_root_marker() {
        for r in BUILTIN_RESOURCES {
            assert!(
                r.location.starts_with(&format!("{RESOURCE_ROOT}/")),
                "{} is outside the resource root",
                r.location
            );
        }
    }

    #[test]
    fn locations_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for r in BUILTIN_RESOURCES {
            assert!(seen.insert(r.location), "duplicate {}", r.location);
        }
    }

    #[test]
    fn package_descriptor_references_project_tokens() {
        let pkg = BUILTIN_RESOURCES
            .iter()
            .find(|r| r.location == "skipper/package.yml")
            .unwrap();
        let text = std::str::from_utf8(pkg.content).unwrap();
        assert!(text.contains("${project.artifactId}"));
        assert!(text.contains("${project.version}"));
    }
}
