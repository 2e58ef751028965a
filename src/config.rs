use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::nodes::{License, NodeDefaults};

pub const COURSE_URL: &str = "https://www.microsoft.com/en-us/digital-literacy";

/// Text anchors on the course index page. The listing page is an external
/// contract that changes without notice, so the anchors live in config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexAnchors {
    pub scorm_packages: String,
    pub video_archives: Option<String>,
    pub course_resources: Option<String>,
}

impl Default for IndexAnchors {
    fn default() -> Self {
        Self {
            scorm_packages: "Download the English Digital Literacy SCORM packages by course module."
                .to_owned(),
            video_archives: Some(
                "Download the English Digital Literacy videos by course module.".to_owned(),
            ),
            course_resources: Some("English course resources".to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub title: String,
    pub source_domain: String,
    pub source_id: String,
    pub language: String,
    pub thumbnail: Option<String>,
    pub description: String,
    pub license: String,
    pub copyright_holder: String,
    pub tags: Vec<String>,
    pub anchors: IndexAnchors,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            title: "Microsoft Digital Literacy - English".to_owned(),
            source_domain: COURSE_URL.to_owned(),
            source_id: "ms-digital-literacy-english".to_owned(),
            language: "en".to_owned(),
            thumbnail: None,
            description: "Learn how to gain digital literacy to use devices, software, and the \
                          Internet to collaborate with others and discover, use, and create \
                          information."
                .to_owned(),
            license: "CC BY-NC-SA".to_owned(),
            copyright_holder: "Microsoft".to_owned(),
            tags: vec!["Digital Literacy".to_owned()],
            anchors: IndexAnchors::default(),
        }
    }
}

impl ChannelConfig {
    /// Loads a YAML channel file; fields it leaves out keep their defaults.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let path = Path::new(path);
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read channel config: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&yaml)
            .with_context(|| format!("parse channel config: {}", path.display()))?;
        tracing::debug!(path = %path.display(), source_id = %config.source_id, "loaded channel config");
        Ok(config)
    }

    pub fn node_defaults(&self) -> NodeDefaults {
        NodeDefaults {
            license: License {
                id: self.license.clone(),
                copyright_holder: self.copyright_holder.clone(),
            },
            language: self.language.clone(),
            tags: self.tags.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConverterConfig {
    pub bin: String,
}

impl ConverterConfig {
    pub fn from_env() -> Self {
        let bin = std::env::var("SCORMCHEF_SOFFICE_BIN").unwrap_or_else(|_| "soffice".to_owned());
        Self { bin }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("channel.yaml");
        std::fs::write(
            &path,
            "title: Alfabetización digital\nlanguage: es\nanchors:\n  scorm_packages: Descargar paquetes\n  video_archives: null\n",
        )?;

        let config = ChannelConfig::load(path.to_str())?;
        assert_eq!(config.title, "Alfabetización digital");
        assert_eq!(config.language, "es");
        assert_eq!(config.source_id, "ms-digital-literacy-english");
        assert_eq!(config.anchors.scorm_packages, "Descargar paquetes");
        assert_eq!(config.anchors.video_archives, None);
        assert_eq!(
            config.anchors.course_resources.as_deref(),
            Some("English course resources")
        );

        let defaults = config.node_defaults();
        assert_eq!(defaults.language, "es");
        assert_eq!(defaults.license.copyright_holder, "Microsoft");
        Ok(())
    }

    #[test]
    fn missing_channel_file_is_an_error() {
        assert!(ChannelConfig::load(Some("/definitely/not/here.yaml")).is_err());
    }
}
