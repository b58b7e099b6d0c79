use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use super::LoadError;

/// Raw bytes of one CSV source, tagged with where they came from.
#[derive(Debug, Clone)]
pub struct SourceBytes {
    pub description: String,
    pub bytes: Vec<u8>,
}

impl SourceBytes {
    pub fn new(description: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            description: description.into(),
            bytes: bytes.into(),
        }
    }

    pub fn read_file(path: impl Into<PathBuf>) -> Result<Self, LoadError> {
        let path = path.into();
        let description = path.display().to_string();
        let bytes = std::fs::read(&path).map_err(|e| LoadError::Unreachable {
            location: description.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { description, bytes })
    }
}

#[async_trait]
pub trait CsvSource: Send + Sync {
    fn describe(&self) -> String;
    async fn fetch(&self) -> Result<SourceBytes, LoadError>;
}

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CsvSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<SourceBytes, LoadError> {
        SourceBytes::read_file(self.path.clone())
    }
}

pub struct HttpSource {
    client: Client,
    url: Url,
}

impl HttpSource {
    pub fn new(url: Url, timeout_secs: u64) -> Result<Self, LoadError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LoadError::Unreachable {
                location: url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl CsvSource for HttpSource {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<SourceBytes, LoadError> {
        let unreachable = |e: reqwest::Error| LoadError::Unreachable {
            location: self.url.to_string(),
            reason: e.to_string(),
        };
        let resp = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(unreachable)?
            .error_for_status()
            .map_err(unreachable)?;
        let bytes = resp.bytes().await.map_err(unreachable)?;
        Ok(SourceBytes::new(self.url.to_string(), bytes.to_vec()))
    }
}

/// `http(s)://` locations become [`HttpSource`], anything else a local file.
pub fn open_source(location: &str, timeout_secs: u64) -> Result<Box<dyn CsvSource>, LoadError> {
    match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            Ok(Box::new(HttpSource::new(url, timeout_secs)?))
        }
        _ => Ok(Box::new(FileSource::new(location))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_source_kind_from_location() {
        let remote = open_source("https://example.org/spacex_launch_dash.csv", 5).unwrap();
        assert_eq!(remote.describe(), "https://example.org/spacex_launch_dash.csv");

        let local = open_source("data/spacex_launch_dash.csv", 5).unwrap();
        assert_eq!(local.describe(), "data/spacex_launch_dash.csv");
    }

    #[tokio::test]
    async fn missing_file_is_unreachable() {
        let src = FileSource::new("/definitely/not/here.csv");
        match src.fetch().await {
            Err(LoadError::Unreachable { location, .. }) => assert_eq!(location, "/definitely/not/here.csv"),
            other => panic!("expected Unreachable, got {:?}", other.map(|s| s.description)),
        }
    }
}
