use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered path → replacement-content mapping with unique keys.
///
/// JSON object order is preserved so multi-file proposals apply in the order
/// the model wrote them; a repeated path replaces the earlier content while
/// keeping its original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    entries: Vec<(String, String)>,
}

impl FileSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        let content = content.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == path) {
            Some((_, existing_content)) => *existing_content = content,
            None => self.entries.push((path, content)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(path, _)| path.as_str())
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == path)
            .map(|(_, content)| content.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for FileSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut files = Self::new();
        for (path, content) in iter {
            files.insert(path, content);
        }
        files
    }
}

impl Serialize for FileSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (path, content) in &self.entries {
            map.serialize_entry(path, content)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FileSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FileSetVisitor;

        impl<'de> Visitor<'de> for FileSetVisitor {
            type Value = FileSet;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of file path to replacement content")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut files = FileSet::new();
                while let Some((path, content)) = access.next_entry::<String, String>()? {
                    files.insert(path, content);
                }
                Ok(files)
            }
        }

        deserializer.deserialize_map(FileSetVisitor)
    }
}

/// One structured proposal parsed from an assistant message.
///
/// Immutable after parsing; unknown fields in the source block are ignored
/// and an absent `files` object yields an empty mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(default, skip_serializing_if = "FileSet::is_empty")]
    pub files: FileSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl AgentCommand {
    /// Short human-readable identity used by log records about this command.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.files.is_empty() {
            parts.push(format!("{} file(s)", self.files.len()));
        }
        if let Some(directive) = self.command.as_deref() {
            parts.push(format!("run directive '{directive}'"));
        }
        if parts.is_empty() {
            return "empty command".to_string();
        }
        parts.join(" + ")
    }

    /// True when the command requests no mutation at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.command.is_none()
    }
}
