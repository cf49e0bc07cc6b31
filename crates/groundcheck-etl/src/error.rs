use thiserror::Error;

/// Errors raised while loading or merging the input tables.
#[derive(Error, Debug)]
pub enum EtlError {
    /// Failed to open or read a file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed CSV content.
    #[error("Invalid CSV in '{path}': {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// A required column is absent from the header row.
    #[error("'{path}' is missing required column '{column}'")]
    MissingColumn { path: String, column: String },
}

impl EtlError {
    /// Creates an IO error with path context.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Creates a CSV error with path context.
    pub fn csv(path: impl Into<String>, source: csv::Error) -> Self {
        Self::Csv { path: path.into(), source }
    }
}
