//! Content tree handed to the platform sink.
//!
//! Every node carries the fields the platform validates on import: a title, a
//! stable source id, a language, and, for leaf content, a license and files.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    pub copyright_holder: String,
}

/// Fields shared by every node built for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDefaults {
    pub license: License,
    pub language: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub title: String,
    pub source_domain: String,
    pub source_id: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub description: String,
    pub children: Vec<ContentNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentNode {
    Topic(TopicNode),
    Video(VideoNode),
    Document(DocumentNode),
    Exercise(ExerciseNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicNode {
    pub title: String,
    pub source_id: String,
    pub description: String,
    pub language: String,
    pub tags: Vec<String>,
    pub children: Vec<ContentNode>,
}

impl TopicNode {
    pub fn new(
        title: impl Into<String>,
        source_id: impl Into<String>,
        description: impl Into<String>,
        defaults: &NodeDefaults,
    ) -> Self {
        Self {
            title: title.into(),
            source_id: source_id.into(),
            description: description.into(),
            language: defaults.language.clone(),
            tags: defaults.tags.clone(),
            children: Vec::new(),
        }
    }

    pub fn add_child(&mut self, child: impl Into<ContentNode>) {
        self.children.push(child.into());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Video,
    Subtitles,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub kind: FileKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoNode {
    pub title: String,
    pub source_id: String,
    pub license: License,
    pub language: String,
    pub tags: Vec<String>,
    pub files: Vec<FileAttachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentNode {
    pub title: String,
    pub source_id: String,
    pub license: License,
    pub language: String,
    pub tags: Vec<String>,
    pub files: Vec<FileAttachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryKind {
    DoAll,
    MOfN,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasteryModel {
    pub kind: MasteryKind,
    pub m: u32,
    pub n: u32,
}

impl MasteryModel {
    /// Every question answered, two correct in a row.
    pub fn all_two_in_a_row() -> Self {
        Self {
            kind: MasteryKind::DoAll,
            m: 2,
            n: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SingleSelectQuestion {
    pub id: String,
    pub question: String,
    pub correct_answer: String,
    pub all_answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseNode {
    pub title: String,
    pub source_id: String,
    pub license: License,
    pub language: String,
    pub tags: Vec<String>,
    pub mastery: MasteryModel,
    /// Answer order is shuffled by the platform on presentation.
    pub randomize: bool,
    pub questions: Vec<SingleSelectQuestion>,
}

impl From<TopicNode> for ContentNode {
    fn from(node: TopicNode) -> Self {
        ContentNode::Topic(node)
    }
}

impl From<VideoNode> for ContentNode {
    fn from(node: VideoNode) -> Self {
        ContentNode::Video(node)
    }
}

impl From<DocumentNode> for ContentNode {
    fn from(node: DocumentNode) -> Self {
        ContentNode::Document(node)
    }
}

impl From<ExerciseNode> for ContentNode {
    fn from(node: ExerciseNode) -> Self {
        ContentNode::Exercise(node)
    }
}

impl ContentNode {
    pub fn title(&self) -> &str {
        match self {
            ContentNode::Topic(node) => &node.title,
            ContentNode::Video(node) => &node.title,
            ContentNode::Document(node) => &node.title,
            ContentNode::Exercise(node) => &node.title,
        }
    }

    pub fn source_id(&self) -> &str {
        match self {
            ContentNode::Topic(node) => &node.source_id,
            ContentNode::Video(node) => &node.source_id,
            ContentNode::Document(node) => &node.source_id,
            ContentNode::Exercise(node) => &node.source_id,
        }
    }

    pub fn children(&self) -> &[ContentNode] {
        match self {
            ContentNode::Topic(node) => &node.children,
            _ => &[],
        }
    }
}

impl Channel {
    /// Checks the fields the platform rejects on import. Caption files are
    /// allowed to be missing on disk.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.title.trim().is_empty() {
            anyhow::bail!("channel title is empty");
        }
        if self.source_id.trim().is_empty() {
            anyhow::bail!("channel source id is empty");
        }

        let mut pending = self.children.iter().collect::<Vec<_>>();
        while let Some(node) = pending.pop() {
            if node.title().trim().is_empty() {
                anyhow::bail!("node {} has an empty title", node.source_id());
            }
            if node.source_id().trim().is_empty() {
                anyhow::bail!("node {:?} has an empty source id", node.title());
            }
            match node {
                ContentNode::Topic(topic) => pending.extend(topic.children.iter()),
                ContentNode::Video(video) => {
                    require_file(&video.title, &video.files, FileKind::Video)?
                }
                ContentNode::Document(document) => {
                    require_file(&document.title, &document.files, FileKind::Document)?
                }
                ContentNode::Exercise(exercise) => {
                    if exercise.questions.is_empty() {
                        anyhow::bail!("exercise {:?} has no questions", exercise.title);
                    }
                }
            }
        }
        Ok(())
    }
}

fn require_file(title: &str, files: &[FileAttachment], kind: FileKind) -> anyhow::Result<()> {
    if !files.iter().any(|file| file.kind == kind) {
        anyhow::bail!("node {title:?} has no {kind:?} file");
    }
    Ok(())
}
