use std::fmt;

use crate::events::LogEvent;

/// The channel an event is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Progress,
    Stage,
    Deprecation,
    Summary,
    Lifecycle,
    Stats,
    InstallCheck,
    Registry,
    Root,
    ManifestSnapshot,
    Link,
    Other,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Progress,
        Category::Stage,
        Category::Deprecation,
        Category::Summary,
        Category::Lifecycle,
        Category::Stats,
        Category::InstallCheck,
        Category::Registry,
        Category::Root,
        Category::ManifestSnapshot,
        Category::Link,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Progress => "progress",
            Category::Stage => "stage",
            Category::Deprecation => "deprecation",
            Category::Summary => "summary",
            Category::Lifecycle => "lifecycle",
            Category::Stats => "stats",
            Category::InstallCheck => "install-check",
            Category::Registry => "registry",
            Category::Root => "root",
            Category::ManifestSnapshot => "package-json",
            Category::Link => "link",
            Category::Other => "other",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an event to its category. Unknown events have none.
///
/// Routing is exclusive: every event lands in exactly one channel.
pub fn classify(event: &LogEvent) -> Option<Category> {
    let category = match event {
        LogEvent::Progress(_) => Category::Progress,
        LogEvent::Stage(_) => Category::Stage,
        LogEvent::Deprecation(_) => Category::Deprecation,
        LogEvent::Summary => Category::Summary,
        LogEvent::Lifecycle(_) => Category::Lifecycle,
        LogEvent::Stats(_) => Category::Stats,
        LogEvent::InstallCheck(_) => Category::InstallCheck,
        LogEvent::Registry(_) => Category::Registry,
        LogEvent::Root(_) => Category::Root,
        LogEvent::ManifestSnapshot(_) => Category::ManifestSnapshot,
        LogEvent::Link(_) => Category::Link,
        LogEvent::Other(_) => Category::Other,
        LogEvent::Unknown => return None,
    };
    Some(category)
}

/// Routes events and keeps per-channel counts.
///
/// A channel stays cold until its first event; the first arrival is logged
/// so a trace shows which parts of the pipeline a run exercised.
#[derive(Debug, Default)]
pub struct Classifier {
    counts: [u64; 12],
    dropped: u64,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&mut self, event: &LogEvent) -> Option<Category> {
        let Some(category) = classify(event) else {
            self.dropped += 1;
            tracing::trace!("dropping unrecognized event");
            return None;
        };
        let count = &mut self.counts[category.index()];
        if *count == 0 {
            tracing::debug!(%category, "channel received its first event");
        }
        *count += 1;
        Some(category)
    }

    pub fn count(&self, category: Category) -> u64 {
        self.counts[category.index()]
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
