//! Transient, auto-dismissing messages shown to the editor.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// One-shot confirmation, e.g. after a paste.
    Acknowledgment,
    /// Input was refused; nothing changed.
    Rejection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub expires_at: Instant,
}

/// Queue of notices that drop themselves once expired.
#[derive(Debug, Default)]
pub struct NoticeBoard {
    notices: Vec<Notice>,
}

impl NoticeBoard {
    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>, now: Instant, ttl: Duration) {
        self.notices.push(Notice {
            kind,
            message: message.into(),
            expires_at: now + ttl,
        });
    }

    /// Notices still visible at `now`. Expired ones are discarded.
    pub fn visible(&mut self, now: Instant) -> &[Notice] {
        self.notices.retain(|n| n.expires_at > now);
        &self.notices
    }

    pub fn clear(&mut self) {
        self.notices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notices_expire() {
        let mut board = NoticeBoard::default();
        let now = Instant::now();
        board.push(NoticeKind::Acknowledgment, "Image pasted", now, Duration::from_secs(2));
        assert_eq!(board.visible(now).len(), 1);
        assert_eq!(board.visible(now + Duration::from_secs(1)).len(), 1);
        assert!(board.visible(now + Duration::from_secs(2)).is_empty());
        // Gone for good once dismissed
        assert!(board.visible(now).is_empty());
    }
}
