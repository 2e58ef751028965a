use anyhow::Context as _;

use crate::cli::{CrawlArgs, RunArgs, TreeArgs};
use crate::download::Workdir;
use crate::export::{ChannelSink as _, HttpUploadSink};
use crate::http::HttpClient;

/// Full chef run: crawl, download, build the tree, then publish it.
pub fn run(args: RunArgs, token: Option<&str>) -> anyhow::Result<()> {
    let upload = match (&args.upload_url, token) {
        (Some(endpoint), Some(token)) => Some((endpoint.clone(), token.to_owned())),
        (Some(_), None) => anyhow::bail!("--upload-url requires --token"),
        (None, _) => None,
    };

    let client = HttpClient::new(args.network.retry_policy(), args.network.timeout())
        .context("build http client")?;

    tracing::info!(url = %args.url, workdir = %args.workdir, "run: crawl");
    let index = crate::crawl::run(
        &CrawlArgs {
            url: args.url.clone(),
            workdir: args.workdir.clone(),
            channel: args.channel.clone(),
            network: args.network.clone(),
        },
        &client,
    )
    .context("crawl")?;

    tracing::info!("run: download");
    crate::download::download_all(&Workdir::new(&args.workdir), &index, &client)
        .context("download")?;

    tracing::info!("run: tree");
    let channel = crate::tree::run(&TreeArgs {
        workdir: args.workdir.clone(),
        channel: args.channel.clone(),
        out: None,
        force: true,
    })
    .context("tree")?;

    if let Some((endpoint, token)) = upload {
        tracing::info!("run: upload");
        HttpUploadSink {
            client: &client,
            endpoint,
            token,
        }
        .publish(&channel)
        .context("upload")?;
    }

    Ok(())
}
