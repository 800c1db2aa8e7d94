use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::error::ReporterError;

/// Log events emitted by the installation engine.
///
/// The engine writes one JSON object per event, tagged by `name`. Each
/// variant only carries the fields that kind of event defines; names this
/// reporter does not know decode to [`LogEvent::Unknown`] and are dropped by
/// the classifier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum LogEvent {
    /// Resolution and fetch progress of a single package.
    Progress(Progress),
    /// Installation stage transitions.
    Stage(Stage),
    /// A resolved package is marked deprecated in the registry.
    Deprecation(Deprecation),
    /// The engine finished and the summary panel may be printed.
    Summary,
    /// A line of lifecycle script output, or a script exit.
    Lifecycle(Lifecycle),
    /// Net package counts for the run.
    Stats(Stats),
    /// Result of an engine/platform compatibility check.
    InstallCheck(InstallCheck),
    /// Messages from the registry client.
    Registry(Message),
    /// A direct dependency of the project changed.
    Root(RootChange),
    /// A snapshot of the project manifest before or after the run.
    #[serde(rename = "package-json")]
    ManifestSnapshot(ManifestSnapshot),
    /// Messages about linked packages.
    Link(Message),
    /// Generic engine messages.
    Other(Message),
    #[serde(other)]
    Unknown,
}

impl LogEvent {
    /// Decode a single NDJSON line.
    pub fn from_json(line: &str) -> Result<Self, ReporterError> {
        serde_json::from_str(line).map_err(|source| ReporterError::Decode {
            line: line.to_string(),
            source,
        })
    }
}

/// Severity attached to engine messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Progress {
    ResolvingContent {
        #[serde(rename = "pkgId")]
        pkg_id: String,
    },
    Fetched {
        #[serde(rename = "pkgId")]
        pkg_id: String,
    },
    FoundInStore {
        #[serde(rename = "pkgId")]
        pkg_id: String,
    },
    FetchingStarted {
        #[serde(rename = "pkgId")]
        pkg_id: String,
        #[serde(default)]
        size: Option<u64>,
    },
    FetchingProgress {
        #[serde(rename = "pkgId")]
        pkg_id: String,
        downloaded: u64,
    },
    #[serde(other)]
    Other,
}

impl Progress {
    /// The wire name of the status, used by the server passthrough.
    pub fn status(&self) -> &'static str {
        match self {
            Progress::ResolvingContent { .. } => "resolving_content",
            Progress::Fetched { .. } => "fetched",
            Progress::FoundInStore { .. } => "found_in_store",
            Progress::FetchingStarted { .. } => "fetching_started",
            Progress::FetchingProgress { .. } => "fetching_progress",
            Progress::Other => "other",
        }
    }

    pub fn pkg_id(&self) -> Option<&str> {
        match self {
            Progress::ResolvingContent { pkg_id }
            | Progress::Fetched { pkg_id }
            | Progress::FoundInStore { pkg_id }
            | Progress::FetchingStarted { pkg_id, .. }
            | Progress::FetchingProgress { pkg_id, .. } => Some(pkg_id),
            Progress::Other => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum Stage {
    /// Dependency resolution finished (the resolution boundary).
    ResolutionDone,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deprecation {
    pub pkg_name: String,
    pub pkg_version: String,
    pub pkg_id: String,
    /// Deprecation reason published by the package author.
    pub deprecated: String,
    pub depth: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawLifecycle")]
pub struct Lifecycle {
    pub script: String,
    pub pkg_id: String,
    pub level: Level,
    pub output: ScriptOutput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutput {
    Line(String),
    Exit(i32),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLifecycle {
    #[serde(default)]
    script: String,
    pkg_id: String,
    #[serde(default)]
    level: Level,
    line: Option<String>,
    exit_code: Option<i32>,
}

impl TryFrom<RawLifecycle> for Lifecycle {
    type Error = ShapeError;

    fn try_from(raw: RawLifecycle) -> Result<Self, Self::Error> {
        let output = match (raw.line, raw.exit_code) {
            (_, Some(code)) => ScriptOutput::Exit(code),
            (Some(line), None) => ScriptOutput::Line(line),
            (None, None) => return Err(ShapeError("lifecycle event needs `line` or `exitCode`")),
        };
        Ok(Lifecycle {
            script: raw.script,
            pkg_id: raw.pkg_id,
            level: raw.level,
            output,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawStats")]
pub enum Stats {
    Added(u32),
    Removed(u32),
}

#[derive(Deserialize)]
struct RawStats {
    added: Option<u32>,
    removed: Option<u32>,
}

impl TryFrom<RawStats> for Stats {
    type Error = ShapeError;

    fn try_from(raw: RawStats) -> Result<Self, Self::Error> {
        match (raw.added, raw.removed) {
            (Some(added), None) => Ok(Stats::Added(added)),
            (None, Some(removed)) => Ok(Stats::Removed(removed)),
            _ => Err(ShapeError("stats event needs exactly one of `added` or `removed`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallCheck {
    pub code: InstallCheckCode,
    pub pkg_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum InstallCheckCode {
    #[serde(rename = "EBADPLATFORM")]
    BadPlatform,
    #[serde(rename = "ENOTSUP")]
    NotSupported,
    #[serde(other)]
    Other,
}

/// A leveled free-form message (registry, link and generic logs).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub message: String,
}

/// Dependency groups of a project manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Prod,
    Optional,
    Dev,
}

impl DependencyType {
    /// Rendering order of the summary panel.
    pub const ALL: [DependencyType; 3] = [
        DependencyType::Prod,
        DependencyType::Optional,
        DependencyType::Dev,
    ];

    /// The manifest property holding this group.
    pub fn manifest_field(self) -> &'static str {
        match self {
            DependencyType::Prod => "dependencies",
            DependencyType::Optional => "optionalDependencies",
            DependencyType::Dev => "devDependencies",
        }
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.manifest_field())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedDependency {
    pub dependency_type: DependencyType,
    pub name: String,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub latest: Option<String>,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedDependency {
    pub dependency_type: DependencyType,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedDependency {
    pub dependency_type: DependencyType,
    pub name: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawRootChange")]
pub enum RootChange {
    Added(AddedDependency),
    Removed(RemovedDependency),
    Linked(LinkedDependency),
}

impl RootChange {
    pub fn dependency_type(&self) -> DependencyType {
        match self {
            RootChange::Added(dep) => dep.dependency_type,
            RootChange::Removed(dep) => dep.dependency_type,
            RootChange::Linked(dep) => dep.dependency_type,
        }
    }
}

#[derive(Deserialize)]
struct RawRootChange {
    added: Option<AddedDependency>,
    removed: Option<RemovedDependency>,
    linked: Option<LinkedDependency>,
}

impl TryFrom<RawRootChange> for RootChange {
    type Error = ShapeError;

    fn try_from(raw: RawRootChange) -> Result<Self, Self::Error> {
        match (raw.added, raw.removed, raw.linked) {
            (Some(dep), None, None) => Ok(RootChange::Added(dep)),
            (None, Some(dep), None) => Ok(RootChange::Removed(dep)),
            (None, None, Some(dep)) => Ok(RootChange::Linked(dep)),
            _ => Err(ShapeError(
                "root event needs exactly one of `added`, `removed` or `linked`",
            )),
        }
    }
}

/// Dependency names mapped to their version ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl Manifest {
    pub fn dependencies_of(&self, dep_type: DependencyType) -> &BTreeMap<String, String> {
        match dep_type {
            DependencyType::Prod => &self.dependencies,
            DependencyType::Optional => &self.optional_dependencies,
            DependencyType::Dev => &self.dev_dependencies,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawManifestSnapshot")]
pub enum ManifestSnapshot {
    Initial(Manifest),
    Updated(Manifest),
}

#[derive(Deserialize)]
struct RawManifestSnapshot {
    initial: Option<Manifest>,
    updated: Option<Manifest>,
}

impl TryFrom<RawManifestSnapshot> for ManifestSnapshot {
    type Error = ShapeError;

    fn try_from(raw: RawManifestSnapshot) -> Result<Self, Self::Error> {
        match (raw.initial, raw.updated) {
            (Some(manifest), None) => Ok(ManifestSnapshot::Initial(manifest)),
            (None, Some(manifest)) => Ok(ManifestSnapshot::Updated(manifest)),
            _ => Err(ShapeError(
                "package-json event needs exactly one of `initial` or `updated`",
            )),
        }
    }
}

/// An event payload that decoded but has an impossible shape.
#[derive(Debug)]
pub struct ShapeError(&'static str);

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
