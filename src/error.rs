use thiserror::Error;

pub type GlossaResult<T> = Result<T, GlossaError>;

#[derive(Error, Debug)]
pub enum GlossaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Workbook format error: {0}")]
    Format(String),

    #[error("Translation backend error: {0}")]
    Backend(String),

    #[error("Internal contract violation: {0}")]
    ContractViolation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{name}: {source}")]
    InFile {
        name: String,
        #[source]
        source: Box<GlossaError>,
    },
}

impl GlossaError {
    /// Attach the name of the file being processed.
    pub fn in_file(self, name: impl Into<String>) -> Self {
        GlossaError::InFile {
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// True for errors caused by an unreadable or unwritable workbook payload.
    pub fn is_format_error(&self) -> bool {
        match self {
            GlossaError::Format(_)
            | GlossaError::Zip(_)
            | GlossaError::Xml(_)
            | GlossaError::XmlAttr(_) => true,
            GlossaError::InFile { source, .. } => source.is_format_error(),
            _ => false,
        }
    }
}
