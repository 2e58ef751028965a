use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::PathBuf;

use anyhow::Context as _;

use crate::http::HttpClient;
use crate::nodes::Channel;

/// Terminal consumer of a finished content tree.
pub trait ChannelSink {
    fn publish(&self, channel: &Channel) -> anyhow::Result<()>;
}

pub struct JsonFileSink {
    pub out: PathBuf,
    pub force: bool,
}

impl ChannelSink for JsonFileSink {
    fn publish(&self, channel: &Channel) -> anyhow::Result<()> {
        channel.validate().context("validate channel")?;

        if self.out.exists() && !self.force {
            anyhow::bail!("channel output already exists: {}", self.out.display());
        }
        if let Some(parent) = self.out.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create channel output dir: {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(channel).context("serialize channel")?;
        let mut options = OpenOptions::new();
        options.write(true);
        if self.force {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut file = options
            .open(&self.out)
            .with_context(|| format!("open channel output: {}", self.out.display()))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("write channel output: {}", self.out.display()))?;
        file.flush()
            .with_context(|| format!("flush channel output: {}", self.out.display()))?;

        tracing::info!(out = %self.out.display(), "wrote channel tree");
        Ok(())
    }
}

pub struct HttpUploadSink<'a> {
    pub client: &'a HttpClient,
    pub endpoint: String,
    pub token: String,
}

impl ChannelSink for HttpUploadSink<'_> {
    fn publish(&self, channel: &Channel) -> anyhow::Result<()> {
        channel.validate().context("validate channel")?;

        tracing::info!(endpoint = %self.endpoint, source_id = %channel.source_id, "uploading channel");
        let response = self
            .client
            .post_json(&self.endpoint, &self.token, channel)
            .ok_or_else(|| anyhow::anyhow!("channel upload failed: {}", self.endpoint))?;
        tracing::info!(status = %response.status(), "channel uploaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> Channel {
        Channel {
            title: "Channel".to_owned(),
            source_domain: "example.com".to_owned(),
            source_id: "channel".to_owned(),
            language: "en".to_owned(),
            thumbnail: None,
            description: String::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn json_sink_refuses_to_overwrite_without_force() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let out = temp.path().join("out").join("channel.json");

        JsonFileSink {
            out: out.clone(),
            force: false,
        }
        .publish(&channel())?;
        let written: Channel = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
        assert_eq!(written, channel());

        let again = JsonFileSink {
            out: out.clone(),
            force: false,
        };
        assert!(again.publish(&channel()).is_err());

        JsonFileSink { out, force: true }.publish(&channel())?;
        Ok(())
    }

    #[test]
    fn json_sink_validates_first() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let out = temp.path().join("channel.json");
        let mut invalid = channel();
        invalid.title.clear();

        let sink = JsonFileSink {
            out: out.clone(),
            force: false,
        };
        assert!(sink.publish(&invalid).is_err());
        assert!(!out.exists());
        Ok(())
    }
}
