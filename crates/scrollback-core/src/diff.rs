//! Dependency diffs of the project manifest.
//!
//! Root events (`added`/`removed`/`linked`) are the primary source. Once the
//! manifest snapshots from before and after the run are both known, names
//! that only appear on one side fill in the gaps, but never override an
//! entry an event already produced.

use std::collections::{BTreeSet, HashMap, HashSet};

use colored::Colorize;
use semver::Version;

use crate::events::{DependencyType, Deprecation, Manifest, ManifestSnapshot, RootChange};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageDiffEntry {
    pub added: bool,
    pub name: String,
    pub real_name: Option<String>,
    pub version: Option<String>,
    pub latest: Option<String>,
    pub deprecated: bool,
    pub linked: bool,
    pub from: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffSign {
    Added,
    Removed,
    Linked,
}

impl DiffSign {
    pub fn as_char(self) -> char {
        match self {
            DiffSign::Added => '+',
            DiffSign::Removed => '-',
            DiffSign::Linked => '>',
        }
    }
}

/// Identity of an entry within a bucket: an addition and a removal of the
/// same name are distinct entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiffKey {
    pub sign: DiffSign,
    pub name: String,
}

impl DiffKey {
    pub fn new(sign: DiffSign, name: impl Into<String>) -> Self {
        Self {
            sign,
            name: name.into(),
        }
    }
}

/// Insertion-ordered map of diff entries for one dependency type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffBucket {
    entries: Vec<PackageDiffEntry>,
    index: HashMap<DiffKey, usize>,
}

impl DiffBucket {
    /// Insert or replace; a replaced entry keeps its position.
    pub fn insert(&mut self, key: DiffKey, entry: PackageDiffEntry) {
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Append only when no entry with this key exists yet.
    pub fn insert_if_absent(&mut self, key: DiffKey, entry: PackageDiffEntry) -> bool {
        if self.index.contains_key(&key) {
            return false;
        }
        self.insert(key, entry);
        true
    }

    pub fn get(&self, key: &DiffKey) -> Option<&PackageDiffEntry> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    pub fn entries(&self) -> &[PackageDiffEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Diff entries partitioned by dependency type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyTypeDiff {
    prod: DiffBucket,
    optional: DiffBucket,
    dev: DiffBucket,
}

impl DependencyTypeDiff {
    pub fn bucket(&self, dep_type: DependencyType) -> &DiffBucket {
        match dep_type {
            DependencyType::Prod => &self.prod,
            DependencyType::Optional => &self.optional,
            DependencyType::Dev => &self.dev,
        }
    }

    pub fn bucket_mut(&mut self, dep_type: DependencyType) -> &mut DiffBucket {
        match dep_type {
            DependencyType::Prod => &mut self.prod,
            DependencyType::Optional => &mut self.optional,
            DependencyType::Dev => &mut self.dev,
        }
    }

    pub fn is_empty(&self) -> bool {
        DependencyType::ALL
            .iter()
            .all(|dep_type| self.bucket(*dep_type).is_empty())
    }
}

/// Folds deprecations, root changes and manifest snapshots into a diff.
#[derive(Debug, Default)]
pub struct DiffBuilder {
    deprecated: HashSet<String>,
    /// Event-derived entries, with the package id of additions.
    events: DependencyTypeDiff,
    added_ids: HashMap<(DependencyType, String), String>,
    initial: Option<Manifest>,
    updated: Option<Manifest>,
    snapshots_taken: usize,
}

impl DiffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_deprecation(&mut self, log: &Deprecation) {
        self.deprecated.insert(log.pkg_id.clone());
    }

    pub fn on_root(&mut self, change: &RootChange) {
        let dep_type = change.dependency_type();
        match change {
            RootChange::Added(dep) => {
                self.added_ids
                    .insert((dep_type, dep.name.clone()), dep.id.clone());
                self.events.bucket_mut(dep_type).insert(
                    DiffKey::new(DiffSign::Added, &dep.name),
                    PackageDiffEntry {
                        added: true,
                        name: dep.name.clone(),
                        real_name: dep.real_name.clone(),
                        version: dep.version.clone(),
                        latest: dep.latest.clone(),
                        ..Default::default()
                    },
                );
            }
            RootChange::Removed(dep) => {
                self.events.bucket_mut(dep_type).insert(
                    DiffKey::new(DiffSign::Removed, &dep.name),
                    PackageDiffEntry {
                        added: false,
                        name: dep.name.clone(),
                        version: dep.version.clone(),
                        ..Default::default()
                    },
                );
            }
            RootChange::Linked(dep) => {
                self.events.bucket_mut(dep_type).insert(
                    DiffKey::new(DiffSign::Linked, &dep.name),
                    PackageDiffEntry {
                        added: false,
                        name: dep.name.clone(),
                        linked: true,
                        from: Some(dep.from.clone()),
                        ..Default::default()
                    },
                );
            }
        }
    }

    /// Only the first two snapshots count; later ones are ignored.
    pub fn on_manifest(&mut self, snapshot: &ManifestSnapshot) {
        if self.snapshots_taken >= 2 {
            tracing::debug!("ignoring extra manifest snapshot");
            return;
        }
        self.snapshots_taken += 1;
        match snapshot {
            ManifestSnapshot::Initial(manifest) => self.initial = Some(manifest.clone()),
            ManifestSnapshot::Updated(manifest) => self.updated = Some(manifest.clone()),
        }
    }

    /// The current diff: event entries in arrival order, then manifest
    /// inferences for keys no event covered.
    pub fn diff(&self) -> DependencyTypeDiff {
        let mut diff = self.events.clone();
        for dep_type in DependencyType::ALL {
            let bucket = diff.bucket_mut(dep_type);
            for entry in &mut bucket.entries {
                if entry.added
                    && let Some(id) = self.added_ids.get(&(dep_type, entry.name.clone()))
                {
                    entry.deprecated = self.deprecated.contains(id);
                }
            }
        }

        let (Some(initial), Some(updated)) = (&self.initial, &self.updated) else {
            return diff;
        };
        for dep_type in DependencyType::ALL {
            let before = initial.dependencies_of(dep_type);
            let after = updated.dependencies_of(dep_type);
            let before_names: BTreeSet<&String> = before.keys().collect();
            let after_names: BTreeSet<&String> = after.keys().collect();
            let bucket = diff.bucket_mut(dep_type);

            for name in before_names.difference(&after_names) {
                bucket.insert_if_absent(
                    DiffKey::new(DiffSign::Removed, name.as_str()),
                    PackageDiffEntry {
                        added: false,
                        name: name.to_string(),
                        version: before.get(*name).cloned(),
                        ..Default::default()
                    },
                );
            }
            for name in after_names.difference(&before_names) {
                bucket.insert_if_absent(
                    DiffKey::new(DiffSign::Added, name.as_str()),
                    PackageDiffEntry {
                        added: true,
                        name: name.to_string(),
                        version: after.get(*name).cloned(),
                        ..Default::default()
                    },
                );
            }
        }
        diff
    }
}

/// Render one bucket, sorted by name with removals before additions.
///
/// ```text
/// + ava 0.10.0
/// - chalk 1.0.0
/// + chalk 2.0.0
/// ```
pub fn print_diffs(entries: &[PackageDiffEntry]) -> String {
    let mut sorted: Vec<&PackageDiffEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name).then(a.added.cmp(&b.added)));
    sorted
        .into_iter()
        .map(format_entry)
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_entry(pkg: &PackageDiffEntry) -> String {
    let sign = if pkg.added {
        "+".green()
    } else if pkg.linked {
        "#".bright_magenta()
    } else {
        "-".red()
    };
    let mut result = match &pkg.real_name {
        Some(real_name) if *real_name != pkg.name => {
            format!("{sign} {} <- {real_name}", pkg.name)
        }
        _ => format!("{sign} {}", pkg.name),
    };
    if let Some(version) = &pkg.version {
        result.push_str(&format!(" {}", version.dimmed()));
        if let Some(latest) = &pkg.latest
            && is_outdated(version, latest)
        {
            result.push_str(&format!(" {}", format!("({latest} is available)").dimmed()));
        }
    }
    if pkg.deprecated {
        result.push_str(&format!(" {}", "deprecated".red()));
    }
    if pkg.linked {
        let from = pkg.from.as_deref().unwrap_or("???");
        result.push_str(&format!(
            " {} {}",
            "linked from".bright_magenta(),
            from.dimmed()
        ));
    }
    result
}

fn is_outdated(version: &str, latest: &str) -> bool {
    match (Version::parse(version), Version::parse(latest)) {
        (Ok(version), Ok(latest)) => version < latest,
        _ => false,
    }
}

/// The summary panel: each non-empty bucket under its manifest heading.
pub fn render_summary(diff: &DependencyTypeDiff) -> Option<String> {
    if diff.is_empty() {
        return None;
    }
    let mut msg = String::new();
    for dep_type in DependencyType::ALL {
        let bucket = diff.bucket(dep_type);
        if bucket.is_empty() {
            continue;
        }
        msg.push('\n');
        msg.push_str(&format!("{}", format!("{dep_type}:").blue()));
        msg.push('\n');
        msg.push_str(&print_diffs(bucket.entries()));
        msg.push('\n');
    }
    Some(msg)
}
