//! Rebuilds a lesson's topic tree from the package's pages document.
//!
//! The pages document nests `level0` sections (subtopics) holding `level1`
//! groups. The first `level1` of a section only carries the section blurb;
//! the rest are either a video group or a knowledge check pointing at a flat
//! `<objective>` record elsewhere in the same document.

use std::path::{Path, PathBuf};

use crate::manifest::CourseManifest;
use crate::media::{self, MediaIndex};
use crate::nodes::{FileAttachment, FileKind, NodeDefaults, TopicNode, VideoNode};
use crate::quiz::{self, Objective};
use crate::xml::Element;

pub const LEVEL0_TAG: &str = "level0";
pub const LEVEL1_TAG: &str = "level1";
pub const VIDEO_TAG: &str = "video";
pub const KNOWLEDGE_CHECK_NAME: &str = "Knowledge check";
pub const DISCARDED_SECTIONS: [&str; 2] = ["Homepage", "Print your certificate"];

/// Location of the pages document inside an extracted package.
pub fn pages_path(package_dir: &Path) -> PathBuf {
    package_dir.join("SCO1").join("en-us").join("pages.xml")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Container,
    Video,
    KnowledgeCheck,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub kind: NodeKind,
    pub name: String,
    pub id: Option<String>,
    pub objectives_ref: Option<String>,
    pub file: Option<String>,
    pub text: Option<String>,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn from_element(element: &Element) -> Self {
        let name = element.attr("name").unwrap_or_default().trim().to_owned();
        let tag = element.local_name();
        let kind = match tag {
            VIDEO_TAG => NodeKind::Video,
            LEVEL1_TAG if name == KNOWLEDGE_CHECK_NAME => NodeKind::KnowledgeCheck,
            LEVEL0_TAG | LEVEL1_TAG => NodeKind::Container,
            _ => NodeKind::Other,
        };

        Self {
            kind,
            name,
            id: element.attr("id").map(str::to_owned),
            objectives_ref: element.attr("objectiveRef").map(str::to_owned),
            file: element.attr("file").map(str::to_owned),
            text: element.text.clone(),
            children: element
                .children
                .iter()
                .map(OutlineNode::from_element)
                .collect(),
        }
    }

    /// Text of the first child's first child's first child. Fixed to the
    /// layout the publisher ships; any other layout reads as empty.
    fn blurb(&self) -> &str {
        self.children
            .first()
            .and_then(|placeholder| placeholder.children.first())
            .and_then(|page| page.children.first())
            .and_then(|node| node.text.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    pub sections: Vec<OutlineNode>,
    pub objectives: Vec<Objective>,
}

impl Outline {
    pub fn read(package_dir: &Path) -> anyhow::Result<Self> {
        let root = Element::read(&pages_path(package_dir))?;
        Ok(Self::from_root(&root))
    }

    pub fn from_root(root: &Element) -> Self {
        Self {
            sections: root.iter(LEVEL0_TAG).map(OutlineNode::from_element).collect(),
            objectives: quiz::parse_objectives(root),
        }
    }
}

pub struct LessonContext<'a> {
    /// Prefix for every source id built for this lesson.
    pub key: &'a str,
    pub media: &'a MediaIndex,
    pub defaults: &'a NodeDefaults,
}

/// One topic per lesson, titled from the package manifest.
pub fn build_lesson_topic(
    lesson_name: &str,
    manifest: &CourseManifest,
    outline: &Outline,
    ctx: &LessonContext<'_>,
) -> anyhow::Result<TopicNode> {
    let title = if manifest.title.trim().is_empty() {
        lesson_name
    } else {
        manifest.title.trim()
    };
    let mut topic = TopicNode::new(title, format!("{}_id", ctx.key), &manifest.description, ctx.defaults);
    for subtopic in walk(outline, ctx)? {
        topic.add_child(subtopic);
    }
    Ok(topic)
}

pub fn walk(outline: &Outline, ctx: &LessonContext<'_>) -> anyhow::Result<Vec<TopicNode>> {
    let mut subtopics = Vec::new();

    for (section_idx, section) in outline.sections.iter().enumerate() {
        if DISCARDED_SECTIONS.contains(&section.name.as_str()) {
            tracing::debug!(section = %section.name, "skipping boilerplate section");
            continue;
        }
        if section.children.len() <= 1 {
            tracing::debug!(section = %section.name, "skipping empty section");
            continue;
        }

        let section_id = section
            .id
            .clone()
            .unwrap_or_else(|| format!("s{section_idx}"));
        let mut subtopic = TopicNode::new(
            &section.name,
            format!("{}-{section_id}", ctx.key),
            section.blurb().trim(),
            ctx.defaults,
        );

        for group in section.children.iter().skip(1) {
            if group.kind == NodeKind::KnowledgeCheck {
                let exercise = quiz::reconstruct(
                    group.objectives_ref.as_deref(),
                    &outline.objectives,
                    &group.name,
                    ctx.key,
                    ctx.defaults,
                )?;
                subtopic.add_child(exercise);
                continue;
            }
            if group.children.is_empty() {
                continue;
            }

            let videos = group
                .children
                .iter()
                .filter(|child| child.kind == NodeKind::Video);
            for (n, item) in videos.enumerate() {
                if let Some(video) = video_node(group, item, n, ctx) {
                    subtopic.add_child(video);
                }
            }
        }

        subtopics.push(subtopic);
    }

    Ok(subtopics)
}

fn video_node(
    group: &OutlineNode,
    item: &OutlineNode,
    n: usize,
    ctx: &LessonContext<'_>,
) -> Option<VideoNode> {
    let fragment = item.file.as_deref().unwrap_or_default();
    let Some(path) = ctx.media.find(fragment) else {
        tracing::debug!(group = %group.name, fragment, "video not shipped in archive");
        return None;
    };

    let title = if n == 0 {
        group.name.clone()
    } else {
        format!("{}-{n} part", group.name)
    };
    let page_id = item.id.as_deref().unwrap_or(fragment);
    let caption = media::caption_for(path);

    Some(VideoNode {
        title,
        source_id: format!("{}-{page_id}", ctx.key),
        license: ctx.defaults.license.clone(),
        language: ctx.defaults.language.clone(),
        tags: ctx.defaults.tags.clone(),
        files: vec![
            FileAttachment {
                kind: FileKind::Video,
                path: path.to_string_lossy().into_owned(),
                language: None,
            },
            FileAttachment {
                kind: FileKind::Subtitles,
                path: caption.to_string_lossy().into_owned(),
                language: Some(ctx.defaults.language.clone()),
            },
        ],
    })
}
