use serde::{Deserialize, Serialize};

pub const INDEX_FILE_NAME: &str = "index.json";
pub const CHANNEL_FILE_NAME: &str = "channel.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub name: String,
    pub package_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
}

impl Lesson {
    /// Directory and file stem for this lesson's downloads.
    pub fn key(&self) -> String {
        safe_file_stem(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseResource {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseIndex {
    pub source_url: String,
    pub retrieved_at: String,
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub resources: Vec<CourseResource>,
}

/// Keeps a display name usable as a single path component.
pub fn safe_file_stem(name: &str) -> String {
    let stem = name
        .trim()
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect::<String>();
    let stem = stem.trim_matches('.').to_owned();
    if stem.is_empty() {
        "untitled".to_owned()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_file_stem_keeps_spaces_and_drops_separators() {
        assert_eq!(safe_file_stem("Work with computers"), "Work with computers");
        assert_eq!(safe_file_stem("Q&A: files/folders"), "Q&A_ files_folders");
        assert_eq!(safe_file_stem(".."), "untitled");
        assert_eq!(safe_file_stem("  "), "untitled");
    }
}
