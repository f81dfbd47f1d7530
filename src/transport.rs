// Byte-stream transport for the signed URLs handed out by the service.
// Requests here carry no auth token: the URL (and its signed headers) is
// the credential.

use crate::backend::Transport;
use crate::error::{Result, ShellError};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::{Body, Client};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

const PROGRESS_TEMPLATE: &str = "{msg} [{bar:30}] {bytes}/{total_bytes} ({bytes_per_sec})";

pub struct HttpTransport {
    client: Client,
    show_progress: bool,
}

impl HttpTransport {
    pub fn new(show_progress: bool) -> Result<Self> {
        // Transfers may take arbitrarily long, so no overall request timeout.
        let client = Client::builder()
            .timeout(None)
            .build()
            .map_err(|err| ShellError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(HttpTransport {
            client,
            show_progress,
        })
    }

    fn progress_bar(&self, total: Option<u64>, message: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::with_template(PROGRESS_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar
            }
            None => ProgressBar::new_spinner(),
        };
        bar.set_message(message.to_string());
        bar
    }
}

/// Turns the service's signed header map into request headers.
pub fn signed_headers(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| ShellError::Transfer(format!("bad signed header {name}: {err}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|err| ShellError::Transfer(format!("bad value for signed header {name}: {err}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

impl Transport for HttpTransport {
    fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        let mut res = self
            .client
            .get(url)
            .send()
            .map_err(|err| ShellError::Transfer(err.to_string()))?;
        if !res.status().is_success() {
            return Err(ShellError::Transfer(format!("download answered {}", res.status())));
        }

        let file = File::create(destination)
            .map_err(|err| ShellError::Transfer(format!("{}: {err}", destination.display())))?;
        let bar = self.progress_bar(res.content_length(), "get");
        let mut writer = bar.wrap_write(file);
        let written = res.copy_to(&mut writer).map_err(|err| {
            bar.abandon();
            warn!(path = %destination.display(), "download interrupted, partial file kept");
            ShellError::Transfer(err.to_string())
        })?;
        bar.finish_and_clear();
        debug!(bytes = written, "download stream complete");
        Ok(written)
    }

    fn upload(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        source: &Path,
        size_bytes: u64,
    ) -> Result<u16> {
        let headers = signed_headers(headers)?;
        let file = File::open(source)
            .map_err(|err| ShellError::Transfer(format!("{}: {err}", source.display())))?;
        let bar = self.progress_bar(Some(size_bytes), "put");
        let body = Body::sized(bar.wrap_read(file), size_bytes);

        let res = self
            .client
            .put(url)
            .headers(headers)
            .body(body)
            .send()
            .map_err(|err| {
                bar.abandon();
                ShellError::Transfer(err.to_string())
            })?;
        bar.finish_and_clear();
        debug!(status = %res.status(), bytes = size_bytes, "upload stream complete");
        Ok(res.status().as_u16())
    }
}
