// --- Feed sizes ---

/// Number of pictures the list endpoint reads through the feed cache.
pub const FEED_LIMIT: usize = 100;

/// Number of pictures returned when listing a single author's posts.
pub const AUTHOR_FEED_LIMIT: usize = 100;

// --- Validation limits (in characters) ---

pub const MAX_TAG_LENGTH: usize = 30;

pub const MAX_ANSWER_LENGTH: usize = 30;

pub const MAX_AUTHOR_LENGTH: usize = 40;

pub const MAX_SIGNATURE_LENGTH: usize = 40;

// --- Uploads ---

/// Request body limit for picture uploads.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Extension given to every stored picture.
pub const PICTURE_EXTENSION: &str = "png";
