use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::xml::Element;

pub const MANIFEST_FILE_NAME: &str = "imsmanifest.xml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseManifest {
    pub title: String,
    pub description: String,
}

pub fn read(package_dir: &Path) -> anyhow::Result<CourseManifest> {
    let path = package_dir.join(MANIFEST_FILE_NAME);
    let root = Element::read(&path)?;
    Ok(from_root(root))
}

pub fn parse(xml: &str) -> anyhow::Result<CourseManifest> {
    let root = Element::parse(xml).context("parse package manifest")?;
    Ok(from_root(root))
}

/// Missing metadata never fails: absent title or description read as empty.
fn from_root(root: Element) -> CourseManifest {
    let Some(mut metadata) = take_metadata(root) else {
        return CourseManifest::default();
    };
    metadata.strip_namespaces();

    let general = metadata.find("lom/general");
    CourseManifest {
        title: general.map(|g| lang_text(g, "title")).unwrap_or_default(),
        description: general
            .map(|g| lang_text(g, "description"))
            .unwrap_or_default(),
    }
}

fn take_metadata(root: Element) -> Option<Element> {
    if root.local_name() == "metadata" {
        return Some(root);
    }
    root.children
        .into_iter()
        .find(|child| child.local_name() == "metadata")
}

// `<title><langstring xml:lang="..">text</langstring></title>`, or the
// SCORM 2004 `<string language="..">` spelling of the same thing.
fn lang_text(general: &Element, field: &str) -> String {
    let Some(field) = general.find(field) else {
        return String::new();
    };
    let value = field
        .children
        .iter()
        .find(|child| matches!(child.tag.as_str(), "langstring" | "string"))
        .map(Element::text)
        .unwrap_or_else(|| field.text());
    value.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_title_and_description_from_namespaced_lom() -> anyhow::Result<()> {
        let manifest = parse(
            r#"<manifest xmlns="http://www.imsglobal.org/xsd/imscp_v1p1"
                         xmlns:imsmd="http://www.imsglobal.org/xsd/imsmd_rootv1p2p1">
                 <metadata>
                   <schema>ADL SCORM</schema>
                   <imsmd:lom>
                     <imsmd:general>
                       <imsmd:title><imsmd:langstring xml:lang="en-US">Work with computers</imsmd:langstring></imsmd:title>
                       <imsmd:description><imsmd:langstring xml:lang="en-US">Learn the basics.</imsmd:langstring></imsmd:description>
                     </imsmd:general>
                   </imsmd:lom>
                 </metadata>
                 <organizations/>
               </manifest>"#,
        )?;
        assert_eq!(manifest.title, "Work with computers");
        assert_eq!(manifest.description, "Learn the basics.");
        Ok(())
    }

    #[test]
    fn reads_scorm_2004_string_values() -> anyhow::Result<()> {
        let manifest = parse(
            r#"<manifest xmlns="http://www.imsglobal.org/xsd/imscp_v1p1">
                 <metadata>
                   <lom xmlns="http://ltsc.ieee.org/xsd/LOM">
                     <general><title><string language="en-US">Online safety</string></title></general>
                   </lom>
                 </metadata>
               </manifest>"#,
        )?;
        assert_eq!(manifest.title, "Online safety");
        assert_eq!(manifest.description, "");
        Ok(())
    }

    #[test]
    fn missing_description_degrades_to_empty() -> anyhow::Result<()> {
        let manifest = parse(
            r#"<manifest><metadata><lom><general>
                 <title><langstring>Only a title</langstring></title>
               </general></lom></metadata></manifest>"#,
        )?;
        assert_eq!(manifest.title, "Only a title");
        assert!(manifest.description.is_empty());
        Ok(())
    }

    #[test]
    fn missing_metadata_degrades_to_empty() -> anyhow::Result<()> {
        assert_eq!(parse("<manifest/>")?, CourseManifest::default());
        assert_eq!(
            parse("<manifest><metadata/></manifest>")?,
            CourseManifest::default()
        );
        Ok(())
    }

    #[test]
    fn malformed_manifest_is_fatal() {
        assert!(parse("<manifest><metadata></manifest>").is_err());
    }
}
