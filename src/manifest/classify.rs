//! Singleton classification across the modules of one composition

use std::collections::HashMap;

use crate::manifest::Manifest;

/// URL → whether exactly one module references it
///
/// Built fresh for every composition. A URL that is not in the table counts
/// as shared, so callers hand out a copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SingletonTable {
    flags: HashMap<String, bool>,
}

impl SingletonTable {
    pub fn is_singleton(&self, url: &str) -> bool {
        self.flags.get(url).copied().unwrap_or(false)
    }

    pub fn get(&self, url: &str) -> Option<bool> {
        self.flags.get(url).copied()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.flags.iter().map(|(url, flag)| (url.as_str(), *flag))
    }
}

/// Classifies every URL referenced by `manifests`
///
/// Each manifest counts once per URL, however many names or kinds point at
/// it inside that manifest.
pub fn classify<'a, I>(manifests: I) -> SingletonTable
where
    I: IntoIterator<Item = &'a Manifest>,
{
    let mut flags: HashMap<String, bool> = HashMap::new();
    for manifest in manifests {
        for url in manifest.urls() {
            flags
                .entry(url.to_owned())
                .and_modify(|singleton| *singleton = false)
                .or_insert(true);
        }
    }

    log::debug!(
        "classified {} urls ({} singletons)",
        flags.len(),
        flags.values().filter(|singleton| **singleton).count()
    );
    SingletonTable { flags }
}
