use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context as _;

/// Unpacks `archive` into `out_dir`. An existing `out_dir` counts as already
/// extracted. Entries whose names would escape `out_dir` abort extraction.
pub fn unzip(archive: &Path, out_dir: &Path) -> anyhow::Result<()> {
    if out_dir.exists() {
        tracing::debug!(out = %out_dir.display(), "already extracted");
        return Ok(());
    }

    let file =
        File::open(archive).with_context(|| format!("open archive: {}", archive.display()))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("read zip archive: {}", archive.display()))?;

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("create extraction dir: {}", out_dir.display()))?;

    for idx in 0..zip.len() {
        let mut entry = zip
            .by_index(idx)
            .with_context(|| format!("read zip entry {idx}: {}", archive.display()))?;
        let name = entry.name().replace('\\', "/");
        let Some(relative) = enclosed(&name) else {
            anyhow::bail!(
                "zip entry escapes extraction dir: {name:?} in {}",
                archive.display()
            );
        };
        let target = out_dir.join(relative);

        if entry.is_dir() || name.ends_with('/') {
            std::fs::create_dir_all(&target)
                .with_context(|| format!("create dir: {}", target.display()))?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let mut out =
            File::create(&target).with_context(|| format!("create: {}", target.display()))?;
        std::io::copy(&mut entry, &mut out)
            .with_context(|| format!("extract: {}", target.display()))?;
    }

    tracing::info!(archive = %archive.display(), entries = zip.len(), "extracted");
    Ok(())
}

// Archives built on Windows use `\` separators. `ZipFile::enclosed_name`
// checks the raw name, where `..\x` is a single component on Unix, so the
// check runs here on the `/`-normalised name instead.
fn enclosed(name: &str) -> Option<std::path::PathBuf> {
    let mut path = std::path::PathBuf::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains(':') => return None,
            s => path.push(s),
        }
    }
    if name.starts_with('/') {
        return None;
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) -> anyhow::Result<()> {
        let mut zip = zip::ZipWriter::new(File::create(path)?);
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default())?;
            zip.write_all(body)?;
        }
        zip.finish()?;
        Ok(())
    }

    #[test]
    fn unzip_normalizes_backslash_names() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let archive = temp.path().join("pkg.zip");
        write_zip(
            &archive,
            &[
                ("imsmanifest.xml", b"<manifest/>"),
                ("SCO1\\en-us\\pages.xml", b"<pages/>"),
            ],
        )?;

        let out = temp.path().join("pkg");
        unzip(&archive, &out)?;
        assert_eq!(std::fs::read(out.join("imsmanifest.xml"))?, b"<manifest/>");
        assert_eq!(
            std::fs::read(out.join("SCO1").join("en-us").join("pages.xml"))?,
            b"<pages/>"
        );
        Ok(())
    }

    #[test]
    fn unzip_rejects_escaping_entries() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let archive = temp.path().join("evil.zip");
        write_zip(&archive, &[("../outside.txt", b"nope")])?;

        let err = unzip(&archive, &temp.path().join("evil")).unwrap_err();
        assert!(err.to_string().contains("escapes extraction dir"));
        assert!(!temp.path().join("outside.txt").exists());
        Ok(())
    }

    #[test]
    fn unzip_rejects_backslash_parent_entries() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let archive = temp.path().join("evil.zip");
        write_zip(&archive, &[("SCO1\\..\\..\\outside.txt", b"nope")])?;

        let err = unzip(&archive, &temp.path().join("evil")).unwrap_err();
        assert!(err.to_string().contains("escapes extraction dir"));
        assert!(!temp.path().join("outside.txt").exists());
        Ok(())
    }

    #[test]
    fn existing_dir_is_left_alone() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let out = temp.path().join("done");
        std::fs::create_dir_all(&out)?;
        unzip(&temp.path().join("missing.zip"), &out)?;
        Ok(())
    }
}
