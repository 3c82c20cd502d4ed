use thiserror::Error;

pub type E2vResult<T> = Result<T, E2vError>;

#[derive(Error, Debug)]
pub enum E2vError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("'{name}' is not in the list of subscript ranges:\n\t{}", available.join(", "))]
    UnknownSubscriptRange { name: String, available: Vec<String> },

    #[error("Layout error: {0}")]
    Layout(String),

    #[error(
        "Trying to write a cellrange with name '{name}' at '{address}'. \
         However, '{name}' already exist in '{existing}'\n\
         Use force to overwrite it."
    )]
    NameConflict {
        name: String,
        address: String,
        existing: String,
    },

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl E2vError {
    /// Shorthand for configuration errors built from `format!` output.
    pub fn config(message: impl Into<String>) -> Self {
        E2vError::Config(message.into())
    }
}
