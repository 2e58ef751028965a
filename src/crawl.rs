use std::path::PathBuf;

use anyhow::Context as _;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::cli::CrawlArgs;
use crate::config::{ChannelConfig, IndexAnchors};
use crate::formats::{CourseIndex, CourseResource, INDEX_FILE_NAME, Lesson};
use crate::http::HttpClient;

pub fn run(args: &CrawlArgs, client: &HttpClient) -> anyhow::Result<CourseIndex> {
    let channel = ChannelConfig::load(args.channel.as_deref()).context("load channel config")?;
    let workdir = PathBuf::from(&args.workdir);
    std::fs::create_dir_all(&workdir)
        .with_context(|| format!("create workdir: {}", workdir.display()))?;

    tracing::info!(url = %args.url, "crawling course index");
    let (final_url, html) = client
        .get_text(&args.url)
        .ok_or_else(|| anyhow::anyhow!("course index unavailable: {}", args.url))?;
    let base = Url::parse(&final_url).context("parse course index url")?;

    let index = parse_course_index(&html, &base, &channel.anchors)?;
    tracing::info!(
        lessons = index.lessons.len(),
        resources = index.resources.len(),
        "course index parsed"
    );

    let index_path = workdir.join(INDEX_FILE_NAME);
    let json = serde_json::to_string_pretty(&index).context("serialize course index")?;
    std::fs::write(&index_path, json)
        .with_context(|| format!("write course index: {}", index_path.display()))?;

    Ok(index)
}

pub fn read_index(workdir: &str) -> anyhow::Result<CourseIndex> {
    let path = PathBuf::from(workdir).join(INDEX_FILE_NAME);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("read course index (run `crawl` first): {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parse course index: {}", path.display()))
}

/// The SCORM anchor is required. The video and resource anchors are
/// optional and only warn when the page no longer carries them.
pub fn parse_course_index(
    html: &str,
    base: &Url,
    anchors: &IndexAnchors,
) -> anyhow::Result<CourseIndex> {
    let document = Html::parse_document(html);

    let packages = links_after_anchor(&document, &anchors.scorm_packages, base)?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "course index layout changed: anchor {:?} followed by a list was not found",
                anchors.scorm_packages
            )
        })?;
    if packages.is_empty() {
        anyhow::bail!(
            "course index layout changed: no package links under {:?}",
            anchors.scorm_packages
        );
    }

    let videos = optional_links(&document, anchors.video_archives.as_deref(), base)?;
    let resources = optional_links(&document, anchors.course_resources.as_deref(), base)?;

    let video_urls = pair_videos(&packages, &videos);
    let lessons = packages
        .into_iter()
        .zip(video_urls)
        .map(|((name, package_url), video_url)| {
            if video_url.is_none() {
                tracing::debug!(lesson = %name, "no video archive listed");
            }
            Lesson {
                name,
                package_url,
                video_url,
            }
        })
        .collect();

    Ok(CourseIndex {
        source_url: base.to_string(),
        retrieved_at: chrono::Utc::now().to_rfc3339(),
        lessons,
        resources: resources
            .into_iter()
            .map(|(name, url)| CourseResource { name, url })
            .collect(),
    })
}

/// Pairs each package with a video archive. Link-text matches claim their
/// archive first; every lesson left over takes the next unclaimed archive in
/// list order.
fn pair_videos(
    packages: &[(String, String)],
    videos: &[(String, String)],
) -> Vec<Option<String>> {
    let mut claimed = vec![false; videos.len()];
    let mut paired = packages
        .iter()
        .map(|(name, _)| {
            let idx = (0..videos.len()).find(|&idx| !claimed[idx] && videos[idx].0 == *name)?;
            claimed[idx] = true;
            Some(idx)
        })
        .collect::<Vec<_>>();

    let mut unclaimed = (0..videos.len()).filter(|&idx| !claimed[idx]);
    for slot in paired.iter_mut().filter(|slot| slot.is_none()) {
        *slot = unclaimed.next();
    }

    paired
        .into_iter()
        .map(|idx| idx.map(|idx| videos[idx].1.clone()))
        .collect()
}

fn optional_links(
    document: &Html,
    anchor: Option<&str>,
    base: &Url,
) -> anyhow::Result<Vec<(String, String)>> {
    let Some(anchor) = anchor else {
        return Ok(Vec::new());
    };
    match links_after_anchor(document, anchor, base)? {
        Some(links) => Ok(links),
        None => {
            tracing::warn!(anchor, "course index anchor not found; continuing without it");
            Ok(Vec::new())
        }
    }
}

/// Finds the `<p>` whose text is `anchor` and reads the `li a` links of the
/// next `<ul>` sibling as (link text, absolute url) pairs.
fn links_after_anchor(
    document: &Html,
    anchor: &str,
    base: &Url,
) -> anyhow::Result<Option<Vec<(String, String)>>> {
    let paragraph = selector("p")?;
    let item = selector("li")?;
    let link = selector("a")?;
    let anchor = normalize_text(anchor);

    for p in document.select(&paragraph) {
        if normalize_text(&p.text().collect::<String>()) != anchor {
            continue;
        }
        let Some(list) = p
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "ul")
        else {
            continue;
        };

        let mut links = Vec::new();
        for li in list.select(&item) {
            let Some(a) = li.select(&link).next() else {
                continue;
            };
            let name = normalize_text(&a.text().collect::<String>());
            let Some(href) = a.value().attr("href") else {
                tracing::warn!(name, "listed link has no href");
                continue;
            };
            let url = base
                .join(href.trim())
                .with_context(|| format!("resolve link {href:?} for {name:?}"))?;
            links.push((name, url.to_string()));
        }
        return Ok(Some(links));
    }

    Ok(None)
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|err| anyhow::anyhow!("parse selector {css:?}: {err}"))
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
