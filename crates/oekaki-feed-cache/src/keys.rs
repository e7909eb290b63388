//! Cache key scheme for tag buckets

/// Tag selecting the bucket that spans every tag. Also the tag of untagged
/// pictures.
pub(crate) const ALL_TAGS: &str = "";

const ENTRY_PREFIX: &str = "tag-entry-";
const EXPIRE_PREFIX: &str = "tag-expire-";

/// The two keys backing one tag bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCacheKeys {
    /// Holds the serialized `TagCacheEntry`
    pub entry_key: String,
    /// Marker whose presence means the entry is known stale
    pub expire_key: String,
}

impl TagCacheKeys {
    pub fn for_tag(tag: &str) -> Self {
        Self {
            entry_key: format!("{ENTRY_PREFIX}{tag}"),
            expire_key: format!("{EXPIRE_PREFIX}{tag}"),
        }
    }
}

/// Buckets a picture with `tag` is visible in: its own tag and the global one
pub(crate) fn affected_buckets(tag: &str) -> Vec<&str> {
    if tag == ALL_TAGS {
        vec![ALL_TAGS]
    } else {
        vec![tag, ALL_TAGS]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_for_tag() {
        let keys = TagCacheKeys::for_tag("cat");
        assert_eq!(keys.entry_key, "tag-entry-cat");
        assert_eq!(keys.expire_key, "tag-expire-cat");
    }

    #[test]
    fn test_keys_for_all_tags() {
        let keys = TagCacheKeys::for_tag(ALL_TAGS);
        assert_eq!(keys.entry_key, "tag-entry-");
        assert_eq!(keys.expire_key, "tag-expire-");
    }

    #[test]
    fn test_affected_buckets() {
        assert_eq!(affected_buckets("cat"), vec!["cat", ""]);
        assert_eq!(affected_buckets(""), vec![""]);
    }
}
