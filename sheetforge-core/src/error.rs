//! Error types for sheetforge.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, SheetError>;

/// Errors raised while building or reading a spreadsheet package.
#[derive(Debug, Error)]
pub enum SheetError {
    /// Malformed cell, column or range reference.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// A worksheet with the requested name does not exist.
    #[error("worksheet not found: {0}")]
    SheetNotFound(String),

    /// The package contains no worksheets at all.
    #[error("workbook contains no worksheets")]
    NoWorksheets,

    /// Another worksheet already uses this name.
    #[error("worksheet name already in use: {0}")]
    DuplicateSheetName(String),

    /// The name cannot be used as a worksheet name.
    #[error("invalid worksheet name {0:?}")]
    InvalidSheetName(String),

    /// The style index does not name a registered cell format.
    #[error("style index {0} is not registered")]
    InvalidStyle(u32),

    /// A built-in number format id outside the built-in range.
    #[error("number format id {0} is not built in")]
    InvalidNumberFormat(u32),

    /// A numeric cell token that is not a finite number literal.
    #[error("invalid number literal {0:?}")]
    InvalidNumber(String),

    /// The merge region intersects a region that was already recorded.
    #[error("merge region {region} overlaps existing region {existing}")]
    OverlappingMerge { region: String, existing: String },

    /// The image blob could not be decoded far enough to size it.
    #[error("image source unreadable: {0}")]
    ImageSourceUnreadable(String),

    /// The document was already finalized or closed.
    #[error("document is closed")]
    DocumentClosed,

    /// Failure of the underlying sink or source.
    #[error("package I/O error: {0}")]
    PackageIo(#[from] std::io::Error),

    /// Failure in the ZIP container.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Malformed XML inside a package part.
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The package is structurally not a spreadsheet.
    #[error("invalid package: {0}")]
    InvalidFormat(String),
}

impl SheetError {
    pub(crate) fn reference(reference: impl Into<String>) -> Self {
        SheetError::InvalidReference(reference.into())
    }
}
