use serde::{Deserialize, Serialize};
use std::fmt;

/// ペイロード内の写真参照。アップロード完了までは耐久ローカルパス、完了後はサーバーURL。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
    pub fn new(value: String) -> Result<Self, String> {
        if value.trim().is_empty() {
            return Err("Media reference cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    pub fn is_remote(&self) -> bool {
        self.0.starts_with("https://") || self.0.starts_with("http://")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<MediaRef> for String {
    fn from(media_ref: MediaRef) -> Self {
        media_ref.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_paths_are_not_remote() {
        let media_ref = MediaRef::new("/data/media/p1.jpg".to_string()).unwrap();
        assert!(!media_ref.is_remote());
    }

    #[test]
    fn server_urls_are_remote() {
        let media_ref = MediaRef::new("https://cdn/p1.jpg".to_string()).unwrap();
        assert!(media_ref.is_remote());
    }
}
