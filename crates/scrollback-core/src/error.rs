use thiserror::Error;

/// Failures surfaced by the reporter pipeline.
#[derive(Debug, Error)]
pub enum ReporterError {
    /// The event producer failed. The message is rendered as the final line.
    #[error("{0}")]
    Upstream(String),

    /// A line of input could not be decoded into an event.
    #[error("failed to decode event `{line}`: {source}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },
}
