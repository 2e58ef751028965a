use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context as _;
use sha2::Digest as _;

use crate::config::ConverterConfig;
use crate::download::Workdir;
use crate::formats::CourseResource;
use crate::nodes::{DocumentNode, FileAttachment, FileKind, NodeDefaults, TopicNode};

const CONVERTIBLE: [&str; 6] = ["doc", "docx", "ppt", "pptx", "xls", "xlsx"];

/// Fails when the office converter cannot be started at all.
pub fn ensure_converter(config: &ConverterConfig) -> anyhow::Result<()> {
    let status = Command::new(&config.bin)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match status {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => anyhow::bail!(
            "office converter {:?} not found; install LibreOffice or set SCORMCHEF_SOFFICE_BIN",
            config.bin
        ),
        Err(err) => {
            Err(err).with_context(|| format!("start office converter: {}", config.bin))
        }
    }
}

/// Converts `input` into `<out_dir>/<stem>.pdf`, reusing an earlier result.
pub fn convert_to_pdf(
    config: &ConverterConfig,
    input: &Path,
    out_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| anyhow::anyhow!("document has no file name: {}", input.display()))?;
    let pdf = out_dir.join(format!("{}.pdf", stem.to_string_lossy()));
    if pdf.exists() {
        return Ok(pdf);
    }

    tracing::info!(bin = %config.bin, input = %input.display(), "convert to pdf");
    let output = Command::new(&config.bin)
        .args(["--headless", "--convert-to", "pdf", "--outdir"])
        .arg(out_dir)
        .arg(input)
        .stdin(Stdio::null())
        .output()
        .with_context(|| format!("run office converter: {}", config.bin))?;
    if !output.status.success() {
        anyhow::bail!(
            "office converter failed ({}): {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    if !pdf.exists() {
        anyhow::bail!("office converter produced no pdf: {}", pdf.display());
    }
    Ok(pdf)
}

fn needs_conversion(path: &Path) -> Option<bool> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if ext == "pdf" {
        Some(false)
    } else if CONVERTIBLE.contains(&ext.as_str()) {
        Some(true)
    } else {
        None
    }
}

/// Builds the "Course resources" topic from downloaded documents. Returns
/// `None` when nothing usable was downloaded.
pub fn resources_topic(
    resources: &[CourseResource],
    workdir: &Workdir,
    converter: &ConverterConfig,
    defaults: &NodeDefaults,
) -> anyhow::Result<Option<TopicNode>> {
    let downloaded = resources
        .iter()
        .map(|resource| (resource, workdir.resource_path(resource)))
        .filter(|(_, path)| path.exists())
        .collect::<Vec<_>>();
    if downloaded.is_empty() {
        return Ok(None);
    }
    if downloaded
        .iter()
        .any(|(_, path)| needs_conversion(path) == Some(true))
    {
        ensure_converter(converter)?;
    }

    let mut topic = TopicNode::new(
        "Course resources",
        "course-resources",
        "Printable course materials.",
        defaults,
    );
    let pdf_dir = workdir.resources_dir().join("pdf");

    for (resource, path) in downloaded {
        let pdf = match needs_conversion(&path) {
            Some(false) => path,
            Some(true) => {
                std::fs::create_dir_all(&pdf_dir)
                    .with_context(|| format!("create pdf dir: {}", pdf_dir.display()))?;
                convert_to_pdf(converter, &path, &pdf_dir)?
            }
            None => {
                tracing::warn!(resource = %resource.name, path = %path.display(), "unsupported document type; skipping");
                continue;
            }
        };

        topic.add_child(DocumentNode {
            title: resource.name.clone(),
            source_id: document_id(&resource.url),
            license: defaults.license.clone(),
            language: defaults.language.clone(),
            tags: defaults.tags.clone(),
            files: vec![FileAttachment {
                kind: FileKind::Document,
                path: pdf.to_string_lossy().into_owned(),
                language: Some(defaults.language.clone()),
            }],
        });
    }

    Ok(Some(topic))
}

fn document_id(url: &str) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(url.as_bytes());
    format!("d_{}", hex::encode(hasher.finalize()))
}
