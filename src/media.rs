use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use anyhow::Context as _;

pub const VIDEO_EXTENSION: &str = ".mp4";
pub const CAPTION_EXTENSION: &str = "ttml";
const VIDEO_DIR_SEGMENT: &str = "Videos";
const CAPTION_DIR_SEGMENT: &str = "Captions";

/// Video files found under an extracted video archive, in walk order.
#[derive(Debug, Clone, Default)]
pub struct MediaIndex {
    videos: Vec<PathBuf>,
}

impl MediaIndex {
    /// A missing root yields an empty index; lessons without a video archive
    /// simply match nothing.
    pub fn scan(root: &Path) -> anyhow::Result<Self> {
        let mut videos = Vec::new();
        if !root.is_dir() {
            tracing::debug!(root = %root.display(), "no extracted video archive");
            return Ok(Self { videos });
        }

        for entry in walkdir::WalkDir::new(root) {
            let entry =
                entry.with_context(|| format!("walk media dir: {}", root.display()))?;
            if entry.file_type().is_file() && has_video_extension(entry.path()) {
                videos.push(entry.into_path());
            }
        }

        tracing::debug!(root = %root.display(), count = videos.len(), "indexed videos");
        Ok(Self { videos })
    }

    pub fn from_paths(videos: Vec<PathBuf>) -> Self {
        Self { videos }
    }

    pub fn videos(&self) -> &[PathBuf] {
        &self.videos
    }

    /// First indexed path whose string form ends with `fragment`.
    pub fn find(&self, fragment: &str) -> Option<&Path> {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return None;
        }
        self.videos
            .iter()
            .find(|path| path.to_string_lossy().ends_with(fragment))
            .map(PathBuf::as_path)
    }
}

fn has_video_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| name.ends_with(VIDEO_EXTENSION))
}

/// Candidate caption files for a video, in probe order.
pub fn caption_candidates(video: &Path) -> [PathBuf; 2] {
    let mut dir = PathBuf::new();
    if let Some(parent) = video.parent() {
        for component in parent.components() {
            match component {
                Component::Normal(segment) if segment == OsStr::new(VIDEO_DIR_SEGMENT) => {
                    dir.push(CAPTION_DIR_SEGMENT)
                }
                other => dir.push(other.as_os_str()),
            }
        }
    }
    let stem = video
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    [
        dir.join(format!("{stem}_Video_cc.{CAPTION_EXTENSION}")),
        dir.join(format!("{stem}.{CAPTION_EXTENSION}")),
    ]
}

/// The `_Video_cc` caption when it exists, otherwise the bare extension swap.
/// The fallback is not checked; consumers must tolerate a missing caption.
pub fn caption_for(video: &Path) -> PathBuf {
    let [preferred, fallback] = caption_candidates(video);
    if preferred.exists() {
        preferred
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"")?;
        Ok(())
    }

    #[test]
    fn scan_finds_videos_recursively_once_each() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        touch(&temp.path().join("A/x.mp4"))?;
        touch(&temp.path().join("B/tail.mp4"))?;
        touch(&temp.path().join("B/notes.txt"))?;
        touch(&temp.path().join("B/C/deeper.mp4"))?;

        let index = MediaIndex::scan(temp.path())?;
        let mut names = index
            .videos()
            .iter()
            .filter_map(|p| p.file_name().and_then(OsStr::to_str))
            .collect::<Vec<_>>();
        names.sort();
        assert_eq!(names, vec!["deeper.mp4", "tail.mp4", "x.mp4"]);
        Ok(())
    }

    #[test]
    fn scan_skips_directories_named_like_videos() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        std::fs::create_dir_all(temp.path().join("Old.mp4/nested"))?;
        touch(&temp.path().join("Old.mp4/nested/real.mp4"))?;

        let index = MediaIndex::scan(temp.path())?;
        assert_eq!(
            index.videos(),
            &[temp.path().join("Old.mp4/nested/real.mp4")]
        );
        Ok(())
    }

    #[test]
    fn find_matches_suffix_regardless_of_directory() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        touch(&temp.path().join("A/x.mp4"))?;
        touch(&temp.path().join("B/tail.mp4"))?;

        let index = MediaIndex::scan(temp.path())?;
        let found = index.find("tail.mp4").expect("tail.mp4 matched");
        assert_eq!(found, temp.path().join("B/tail.mp4"));
        assert!(index.find("missing.mp4").is_none());
        Ok(())
    }

    #[test]
    fn find_takes_first_of_shared_suffix() {
        let index = MediaIndex::from_paths(vec![
            PathBuf::from("one/Intro_Video.mp4"),
            PathBuf::from("two/Intro_Video.mp4"),
        ]);
        assert_eq!(
            index.find("Intro_Video.mp4"),
            Some(Path::new("one/Intro_Video.mp4"))
        );
        assert!(index.find("").is_none());
    }

    #[test]
    fn scan_of_missing_root_is_empty() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let index = MediaIndex::scan(&temp.path().join("absent"))?;
        assert!(index.videos().is_empty());
        Ok(())
    }

    #[test]
    fn caption_prefers_video_cc_then_bare_swap() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let video = temp.path().join("course/Videos/lesson1.mp4");
        touch(&video)?;

        let [preferred, fallback] = caption_candidates(&video);
        assert_eq!(
            preferred,
            temp.path().join("course/Captions/lesson1_Video_cc.ttml")
        );
        assert_eq!(fallback, temp.path().join("course/Captions/lesson1.ttml"));

        assert_eq!(caption_for(&video), fallback);
        touch(&preferred)?;
        assert_eq!(caption_for(&video), preferred);
        Ok(())
    }
}
