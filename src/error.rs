use std::path::PathBuf;

#[derive(Debug)]
pub enum SimError {
    /// Geometry rejected by [`crate::CacheGeometry::new`].
    InvalidGeometry { reason: String },
    /// A trace line that does not match `<op> <hex address>,<size>`.
    InvalidTraceLine {
        line_number: usize,
        content: String,
        reason: String,
    },
    /// The trace could not be opened or read.
    TraceSourceUnavailable {
        path: Option<PathBuf>,
        source: std::io::Error,
    },
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::InvalidGeometry { reason } => {
                f.write_fmt(format_args!("invalid cache geometry: {reason}"))
            }
            SimError::InvalidTraceLine {
                line_number,
                content,
                reason,
            } => f.write_fmt(format_args!(
                "invalid trace line {line_number} '{content}': {reason}"
            )),
            SimError::TraceSourceUnavailable { path, source } => match path {
                Some(path) => f.write_fmt(format_args!(
                    "unable to read trace file {}: {source}",
                    path.display()
                )),
                None => f.write_fmt(format_args!("unable to read trace: {source}")),
            },
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::TraceSourceUnavailable { source, .. } => Some(source),
            _ => None,
        }
    }
}
