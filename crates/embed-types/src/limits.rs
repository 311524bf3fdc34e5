//! Size limits enforced on documents and their transport.

/// Maximum number of fields in a document.
pub const MAX_FIELDS: usize = 25;

pub const MAX_TITLE_LEN: usize = 256;
pub const MAX_DESCRIPTION_LEN: usize = 4096;
pub const MAX_FIELD_NAME_LEN: usize = 256;
pub const MAX_FIELD_VALUE_LEN: usize = 1024;
pub const MAX_AUTHOR_LEN: usize = 256;
pub const MAX_FOOTER_LEN: usize = 2048;

/// Maximum length of a saved document's name.
pub const MAX_DOCUMENT_NAME_LEN: usize = 50;

/// Exports longer than this are delivered as a file attachment.
pub const EXPORT_INLINE_LIMIT: usize = 1900;

/// Error descriptions shown to a requester are cut to this many chars.
pub const ERROR_PREVIEW_LEN: usize = 100;

/// Number of description chars shown in a session summary.
pub const SUMMARY_DESCRIPTION_PREVIEW: usize = 50;
