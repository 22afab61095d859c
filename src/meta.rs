use serde::Deserialize;

/// Title/channel/thumbnail for a video, as shown in saved records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMeta {
    pub title: String,
    pub channel: String,
    pub thumbnail: String,
}

/// Thumbnail URL used whenever a record does not carry its own.
pub fn default_thumbnail(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/hqdefault.jpg")
}

impl VideoMeta {
    /// Placeholder metadata used when the lookup fails or is unavailable.
    pub fn fallback(video_id: &str) -> Self {
        Self {
            title: video_id.to_string(),
            channel: "Unknown Channel".to_string(),
            thumbnail: default_thumbnail(video_id),
        }
    }
}

/// Metadata lookup seam. Implementations must not fail; degraded results
/// fall back to [`VideoMeta::fallback`].
pub trait VideoMetaFetcher {
    fn fetch(&self, video_id: &str) -> VideoMeta;
}

/// Fetcher that always returns the fallback record. Used by tests and by
/// hosts that do not want network access.
pub struct OfflineMetaFetcher;

impl VideoMetaFetcher for OfflineMetaFetcher {
    fn fetch(&self, video_id: &str) -> VideoMeta {
        VideoMeta::fallback(video_id)
    }
}

#[derive(Deserialize)]
struct OembedPayload {
    title: String,
    author_name: String,
}

/// Metadata lookup against the public oEmbed endpoint.
pub struct OembedClient {
    client: reqwest::blocking::Client,
}

impl OembedClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }

    fn lookup(&self, video_id: &str) -> anyhow::Result<VideoMeta> {
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        let endpoint = format!(
            "https://www.youtube.com/oembed?url={}&format=json",
            urlencoding::encode(&watch_url)
        );
        let body = self.client.get(endpoint).send()?.error_for_status()?.text()?;
        let payload: OembedPayload = serde_json::from_str(&body)?;
        Ok(VideoMeta {
            title: payload.title,
            channel: payload.author_name,
            thumbnail: default_thumbnail(video_id),
        })
    }
}

impl Default for OembedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoMetaFetcher for OembedClient {
    fn fetch(&self, video_id: &str) -> VideoMeta {
        match self.lookup(video_id) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::debug!("metadata lookup failed for {video_id}: {e}");
                VideoMeta::fallback(video_id)
            }
        }
    }
}
