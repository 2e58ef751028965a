use std::path::PathBuf;

use anyhow::Context as _;

use crate::cli::TreeArgs;
use crate::config::{ChannelConfig, ConverterConfig};
use crate::download::Workdir;
use crate::export::{ChannelSink as _, JsonFileSink};
use crate::formats::{CHANNEL_FILE_NAME, CourseIndex};
use crate::manifest;
use crate::media::MediaIndex;
use crate::nodes::Channel;
use crate::outline::{self, LessonContext, Outline};

pub fn run(args: &TreeArgs) -> anyhow::Result<Channel> {
    let channel_config =
        ChannelConfig::load(args.channel.as_deref()).context("load channel config")?;
    let index = crate::crawl::read_index(&args.workdir)?;
    let workdir = Workdir::new(&args.workdir);

    let channel = build_channel(&workdir, &index, &channel_config, &ConverterConfig::from_env())?;

    let out = args
        .out
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| workdir.root().join(CHANNEL_FILE_NAME));
    JsonFileSink {
        out,
        force: args.force,
    }
    .publish(&channel)?;

    Ok(channel)
}

/// Assembles the channel from everything already downloaded and extracted.
/// Lessons whose package is missing on disk are skipped.
pub fn build_channel(
    workdir: &Workdir,
    index: &CourseIndex,
    config: &ChannelConfig,
    converter: &ConverterConfig,
) -> anyhow::Result<Channel> {
    let defaults = config.node_defaults();
    let mut channel = Channel {
        title: config.title.clone(),
        source_domain: config.source_domain.clone(),
        source_id: config.source_id.clone(),
        language: config.language.clone(),
        thumbnail: config.thumbnail.clone(),
        description: config.description.clone(),
        children: Vec::new(),
    };

    for lesson in &index.lessons {
        let package_dir = workdir.package_dir(lesson);
        if !package_dir.is_dir() {
            tracing::warn!(lesson = %lesson.name, dir = %package_dir.display(), "package not extracted; skipping");
            continue;
        }

        let manifest = manifest::read(&package_dir)
            .with_context(|| format!("read manifest for {:?}", lesson.name))?;
        let outline = Outline::read(&package_dir)
            .with_context(|| format!("read pages for {:?}", lesson.name))?;
        let media = MediaIndex::scan(&workdir.video_dir(lesson))?;

        let key = lesson.key().replace(' ', "_");
        let ctx = LessonContext {
            key: &key,
            media: &media,
            defaults: &defaults,
        };
        let topic = outline::build_lesson_topic(&lesson.name, &manifest, &outline, &ctx)
            .with_context(|| format!("build topic for {:?}", lesson.name))?;
        tracing::info!(lesson = %lesson.name, subtopics = topic.children.len(), "built lesson topic");
        channel.children.push(topic.into());
    }

    if let Some(resources) =
        crate::documents::resources_topic(&index.resources, workdir, converter, &defaults)?
    {
        channel.children.push(resources.into());
    }

    Ok(channel)
}
