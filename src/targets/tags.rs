//! Flat `key:value` tag parsing
//!
//! Target files carry region metadata as a flat list of `key:value` strings.
//! In memory the tags live in a typed [`TagMap`]; the flat form only exists
//! at the persistence boundary.

use std::collections::HashMap;

/// Key whose values accumulate into an ordered command list
pub const COMMAND_KEY: &str = "command";

/// Internal tag naming the shape a region was authored as
pub const SHAPE_KEY: &str = "_shape";

/// Internal tag carrying the session-unique target name
pub const INTERNAL_NAME_KEY: &str = "_internal_name";

/// Internal tag carrying the source image path for image regions
pub const PATH_KEY: &str = "_path";

/// Internal tag marking a canvas background region
pub const BACKGROUND_KEY: &str = "_background";

/// Typed view of a region's tag list.
///
/// Repeated `command` entries accumulate in encounter order; any other
/// repeated key overwrites (last wins). Keys prefixed `_` are internal and
/// are hidden from [`TagMap::user_tags`], which is what a tag editor must
/// present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagMap {
    entries: HashMap<String, String>,
    commands: Vec<String>,
}

impl TagMap {
    /// Create an empty tag map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a flat tag list.
    ///
    /// Each entry is split at the first `:`; entries without a colon are
    /// ignored silently.
    pub fn parse_tags<S: AsRef<str>>(tag_list: &[S]) -> Self {
        let mut tags = Self::new();

        for tag in tag_list {
            let tag = tag.as_ref();
            let Some((prop, value)) = tag.split_once(':') else {
                continue;
            };

            tags.insert(prop, value);
        }

        tags
    }

    /// Insert a tag, accumulating `command` values
    pub fn insert(&mut self, key: &str, value: &str) {
        if key == COMMAND_KEY {
            self.commands.push(value.to_string());
        } else {
            self.entries.insert(key.to_string(), value.to_string());
        }
    }

    /// Look up a non-command tag value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|v| v.as_str())
    }

    /// Whether the key is present (`command` counts if any command exists)
    pub fn contains(&self, key: &str) -> bool {
        if key == COMMAND_KEY {
            !self.commands.is_empty()
        } else {
            self.entries.contains_key(key)
        }
    }

    /// Remove a tag by key (all commands if `command`)
    pub fn remove(&mut self, key: &str) {
        if key == COMMAND_KEY {
            self.commands.clear();
        } else {
            self.entries.remove(key);
        }
    }

    /// Ordered command list
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// The session-unique target name, if this region belongs to a target
    pub fn internal_name(&self) -> Option<&str> {
        self.get(INTERNAL_NAME_KEY)
    }

    /// Replace the internal target name, dropping any stale one
    pub fn set_internal_name(&mut self, name: &str) {
        self.entries
            .insert(INTERNAL_NAME_KEY.to_string(), name.to_string());
    }

    /// Strip a pre-existing internal target name
    pub fn strip_internal_name(&mut self) {
        self.entries.remove(INTERNAL_NAME_KEY);
    }

    /// Regions tagged `visible:false` are hit-testable but never rendered
    /// and never reported as the topmost hit
    pub fn is_visible(&self) -> bool {
        !matches!(self.get("visible"), Some(v) if v.eq_ignore_ascii_case("false"))
    }

    /// Whether this region is a canvas background
    pub fn is_background(&self) -> bool {
        self.contains(BACKGROUND_KEY)
    }

    /// Tags a user may see and edit (internal `_`-prefixed keys excluded)
    pub fn user_tags(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter(|(k, _)| !k.starts_with('_'))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Re-serialize to the flat `key:value` list, one entry per command
    pub fn flatten(&self) -> Vec<String> {
        let mut flat: Vec<String> = self
            .entries
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect();
        flat.sort();

        for command in &self.commands {
            flat.push(format!("{}:{}", COMMAND_KEY, command));
        }

        flat
    }

    /// Number of distinct keys (commands count as one)
    pub fn len(&self) -> usize {
        self.entries.len() + usize::from(!self.commands.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.commands.is_empty()
    }
}
