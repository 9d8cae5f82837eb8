//! Video id validation

/// Length of every catalog video id.
pub const VIDEO_ID_LEN: usize = 11;

/// Checks the fixed 11-character `[A-Za-z0-9_-]` shape of a video id.
///
/// Everything keyed on video ids (the track store, the proxy path, playlist
/// URLs) relies on this shape; the proxy rejects requests before touching the
/// store when it does not hold.
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == VIDEO_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_canonical_ids() {
        assert!(is_valid_video_id("dQw4w9WgXcQ"));
        assert!(is_valid_video_id("aaaaaaaaaaa"));
        assert!(is_valid_video_id("A1b2C3d4E5_"));
        assert!(is_valid_video_id("-_-_-_-_-_-"));
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(!is_valid_video_id(""));
        assert!(!is_valid_video_id("short"));
        assert!(!is_valid_video_id("dQw4w9WgXcQQ")); // 12 chars
        assert!(!is_valid_video_id("dQw4w9WgXc!")); // bad alphabet
        assert!(!is_valid_video_id("dQw4w9WgXc ")); // whitespace
        assert!(!is_valid_video_id("dQw4w9WgXé1")); // non-ascii
    }
}
