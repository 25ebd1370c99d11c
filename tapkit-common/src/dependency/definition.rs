// tapkit-common/src/dependency/definition.rs
use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DependencyTag: u8 {
        const RUNTIME     = 0b00000001;
        const BUILD       = 0b00000010;
        const TEST        = 0b00000100;
        const OPTIONAL    = 0b00001000;
    }
}

impl Default for DependencyTag {
    fn default() -> Self {
        Self::RUNTIME
    }
}

impl fmt::Display for DependencyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub tags: DependencyTag,
}

impl Dependency {
    pub fn new_runtime(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: DependencyTag::RUNTIME,
        }
    }

    pub fn new_with_tags(name: impl Into<String>, tags: DependencyTag) -> Self {
        Self {
            name: name.into(),
            tags,
        }
    }
}

// Formula JSON lists dependencies either as bare names (runtime) or as
// `{ "name": ..., "tags": ... }` objects.
impl<'de> Deserialize<'de> for Dependency {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawDependency {
            Name(String),
            Full {
                name: String,
                #[serde(default)]
                tags: DependencyTag,
            },
        }

        Ok(match RawDependency::deserialize(deserializer)? {
            RawDependency::Name(name) => Dependency::new_runtime(name),
            RawDependency::Full { name, tags } => Dependency::new_with_tags(name, tags),
        })
    }
}

pub trait DependencyExt {
    fn filter_by_tags(&self, include: DependencyTag, exclude: DependencyTag) -> Vec<&Dependency>;
    fn runtime(&self) -> Vec<&Dependency>;
}

impl DependencyExt for Vec<Dependency> {
    fn filter_by_tags(&self, include: DependencyTag, exclude: DependencyTag) -> Vec<&Dependency> {
        self.iter()
            .filter(|dep| dep.tags.contains(include) && !dep.tags.intersects(exclude))
            .collect()
    }

    fn runtime(&self) -> Vec<&Dependency> {
        // Optional runtime deps are still runtime deps; build/test-only ones are not.
        self.iter()
            .filter(|dep| dep.tags.intersects(DependencyTag::RUNTIME | DependencyTag::OPTIONAL))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_deserialize_as_runtime() {
        let deps: Vec<Dependency> =
            serde_json::from_str(r#"["bash", {"name": "shellcheck", "tags": "TEST"}]"#).unwrap();
        assert_eq!(deps[0], Dependency::new_runtime("bash"));
        assert_eq!(deps[1].tags, DependencyTag::TEST);
    }

    #[test]
    fn runtime_filter_skips_test_only() {
        let deps = vec![
            Dependency::new_runtime("jq"),
            Dependency::new_with_tags("bats", DependencyTag::TEST),
            Dependency::new_with_tags("coreutils", DependencyTag::RUNTIME | DependencyTag::OPTIONAL),
        ];
        let names: Vec<&str> = deps.runtime().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["jq", "coreutils"]);
        assert_eq!(
            deps.filter_by_tags(DependencyTag::RUNTIME, DependencyTag::OPTIONAL)
                .len(),
            1
        );
    }
}
