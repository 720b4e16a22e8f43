use thiserror::Error;

/// All errors that can occur in oaenrich-core.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Error loading workbook {path}: {message}")]
    WorkbookLoad { path: String, message: String },

    #[error("Error saving workbook {path}: {message}")]
    WorkbookSave { path: String, message: String },

    #[error("Cannot add sheet '{name}': {message}")]
    SheetCreate { name: String, message: String },

    #[error("Sheet '{0}' not found in the workbook")]
    SheetNotFound(String),

    #[error("Required headers ({}) not found in sheet '{sheet}'", missing.join(", "))]
    MissingRequiredHeaders { sheet: String, missing: Vec<String> },

    #[error("Header '{0}' is not mapped")]
    UnknownHeader(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
