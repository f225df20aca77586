use crate::package::Locale;

/// Why an inbound submission was refused before anything was published.
///
/// The `Display` text is sent back to the author verbatim, so every variant
/// names the exact defect.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Unsupported file type {file_name:?}. Send the post as a .txt document.")]
    UnsupportedFileType { file_name: String },

    #[error("File too large ({size} bytes). The limit is {limit} bytes.")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("The document is not valid UTF-8 text.")]
    NotUtf8,

    #[error("Missing /pr command. Put `/pr filename=<name>.mdx` in the caption or on the first line of the file.")]
    MissingCommand,

    #[error("Missing filename parameter. Use `/pr filename=<name>.mdx`.")]
    MissingFilename,

    #[error("Invalid filename {0:?}. Use a plain file name such as post.mdx.")]
    InvalidFilename(String),

    #[error("Missing one or both locale sections (---ES_START---/---ES_END--- and ---EN_START---/---EN_END---).")]
    MissingSections,

    #[error("Missing content block marker inside the {} section (---MDX_START---/---MDX_END---).", .locale.label())]
    MissingContentBlock { locale: Locale },

    #[error(
        "The {} section must declare `locale: {}` (found {}).",
        .section.label(),
        .section.code(),
        .found.as_deref().unwrap_or("nothing")
    )]
    LocaleMismatch {
        section: Locale,
        found: Option<String>,
    },

    #[error("Missing `slug:` in the {} section.", .locale.label())]
    MissingSlug { locale: Locale },

    #[error("Slugs must match: ES has {primary:?}, EN has {secondary:?}.")]
    SlugMismatch { primary: String, secondary: String },

    #[error("Invalid slug {0:?}. Use letters, digits, '-', '_' or '.'.")]
    InvalidSlug(String),
}
