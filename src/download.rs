use std::path::{Path, PathBuf};

use anyhow::Context as _;
use url::Url;

use crate::cli::DownloadArgs;
use crate::formats::{CourseIndex, CourseResource, Lesson, safe_file_stem};
use crate::http::HttpClient;

/// On-disk layout of the chef working directory.
#[derive(Debug, Clone)]
pub struct Workdir {
    root: PathBuf,
}

impl Workdir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package_zip(&self, lesson: &Lesson) -> PathBuf {
        self.root.join("packages").join(format!("{}.zip", lesson.key()))
    }

    pub fn package_dir(&self, lesson: &Lesson) -> PathBuf {
        self.root.join("packages").join(lesson.key())
    }

    pub fn video_zip(&self, lesson: &Lesson) -> PathBuf {
        self.root.join("videos").join(format!("{}.zip", lesson.key()))
    }

    pub fn video_dir(&self, lesson: &Lesson) -> PathBuf {
        self.root.join("videos").join(lesson.key())
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.root.join("resources")
    }

    pub fn resource_path(&self, resource: &CourseResource) -> PathBuf {
        let stem = safe_file_stem(&resource.name);
        let file_name = match resource_extension(&resource.url) {
            Some(ext) => format!("{stem}.{ext}"),
            None => stem,
        };
        self.resources_dir().join(file_name)
    }
}

fn resource_extension(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    let last = url.path_segments()?.next_back()?.to_owned();
    let (_, ext) = last.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    (!ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())).then_some(ext)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub fetched: usize,
    pub skipped: usize,
}

pub fn run(args: &DownloadArgs, client: &HttpClient) -> anyhow::Result<DownloadReport> {
    let index = crate::crawl::read_index(&args.workdir)?;
    download_all(&Workdir::new(&args.workdir), &index, client)
}

/// Fetches and extracts every archive in the index. Items whose fetch fails
/// are logged and skipped; nothing already on disk is fetched again.
pub fn download_all(
    workdir: &Workdir,
    index: &CourseIndex,
    client: &HttpClient,
) -> anyhow::Result<DownloadReport> {
    let mut report = DownloadReport::default();

    for lesson in &index.lessons {
        tracing::info!(lesson = %lesson.name, "downloading lesson");

        let package_zip = workdir.package_zip(lesson);
        if fetch(client, &lesson.package_url, &package_zip, &mut report)? {
            crate::extract::unzip(&package_zip, &workdir.package_dir(lesson))
                .with_context(|| format!("extract package for {:?}", lesson.name))?;
        }

        let Some(video_url) = lesson.video_url.as_deref() else {
            continue;
        };
        let video_zip = workdir.video_zip(lesson);
        if fetch(client, video_url, &video_zip, &mut report)? {
            crate::extract::unzip(&video_zip, &workdir.video_dir(lesson))
                .with_context(|| format!("extract videos for {:?}", lesson.name))?;
        }
    }

    for resource in &index.resources {
        fetch(client, &resource.url, &workdir.resource_path(resource), &mut report)?;
    }

    tracing::info!(
        fetched = report.fetched,
        skipped = report.skipped,
        "downloads finished"
    );
    Ok(report)
}

fn fetch(
    client: &HttpClient,
    url: &str,
    dest: &Path,
    report: &mut DownloadReport,
) -> anyhow::Result<bool> {
    let ok = client.download(url, dest)?;
    if ok {
        report.fetched += 1;
    } else {
        tracing::warn!(url, "download failed; skipping");
        report.skipped += 1;
    }
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_uses_lesson_key() {
        let workdir = Workdir::new("chefdata");
        let lesson = Lesson {
            name: "Files/folders".to_owned(),
            package_url: "https://example.com/a.zip".to_owned(),
            video_url: None,
        };
        assert_eq!(
            workdir.package_zip(&lesson),
            Path::new("chefdata/packages/Files_folders.zip")
        );
        assert_eq!(
            workdir.video_dir(&lesson),
            Path::new("chefdata/videos/Files_folders")
        );
    }

    #[test]
    fn resource_path_keeps_url_extension() {
        let workdir = Workdir::new("w");
        let resource = CourseResource {
            name: "Learner guide".to_owned(),
            url: "https://example.com/docs/guide.DOCX?download=1".to_owned(),
        };
        assert_eq!(
            workdir.resource_path(&resource),
            Path::new("w/resources/Learner guide.docx")
        );

        let bare = CourseResource {
            name: "Handout".to_owned(),
            url: "https://example.com/download".to_owned(),
        };
        assert_eq!(workdir.resource_path(&bare), Path::new("w/resources/Handout"));
    }
}
