use std::path::{Path, PathBuf};

use reqwest::Url;
use tracing::info;

use crate::errors::ClientError;
use crate::http::{ensure_success, HttpBackend};

const DOWNLOAD_PARAM: &str = "download=true";
const FALLBACK_FILENAME: &str = "quotation.pdf";

/// Document URL that asks the backend to serve the file as an attachment.
pub fn download_url(url: &str) -> String {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };

    let already_requested = without_fragment
        .split_once('?')
        .is_some_and(|(_, query)| query.split('&').any(|pair| pair == DOWNLOAD_PARAM));

    let mut target = without_fragment.to_string();
    if !already_requested {
        target.push(if without_fragment.contains('?') { '&' } else { '?' });
        target.push_str(DOWNLOAD_PARAM);
    }
    if let Some(fragment) = fragment {
        target.push('#');
        target.push_str(fragment);
    }
    target
}

/// Last non-empty path segment of a document URL, still percent-encoded.
pub fn document_filename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

impl HttpBackend {
    pub async fn fetch_document(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        let target = download_url(url);
        let response = self
            .client
            .get(&target)
            .send()
            .await
            .map_err(|source| ClientError::Request { endpoint: target.clone(), source })?;
        let response = ensure_success(&target, response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Request { endpoint: target.clone(), source })?;
        Ok(bytes.to_vec())
    }

    /// Downloads a document into `directory`, named after `filename` or the
    /// URL's last segment.
    pub async fn save_document(
        &self,
        url: &str,
        directory: &Path,
        filename: Option<&str>,
    ) -> Result<PathBuf, ClientError> {
        let name = filename
            .and_then(local_file_name)
            .or_else(|| document_filename(url).as_deref().and_then(local_file_name))
            .unwrap_or_else(|| FALLBACK_FILENAME.to_string());
        let path = directory.join(name);

        let bytes = self.fetch_document(url).await?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| ClientError::Write { path: path.clone(), source })?;

        info!(
            event_name = "client.document.saved",
            path = %path.display(),
            bytes = bytes.len(),
            "quotation document saved"
        );
        Ok(path)
    }
}

/// Reduces a backend-supplied name to its final component so the document
/// always lands inside the chosen directory.
fn local_file_name(raw: &str) -> Option<String> {
    let name = Path::new(raw.trim()).file_name()?.to_str()?;
    (!name.trim().is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::{document_filename, download_url, local_file_name};

    #[test]
    fn appends_download_flag_as_first_query_parameter() {
        assert_eq!(
            download_url("http://127.0.0.1:8000/pdf/Quote_1.pdf"),
            "http://127.0.0.1:8000/pdf/Quote_1.pdf?download=true"
        );
    }

    #[test]
    fn appends_download_flag_to_existing_query() {
        assert_eq!(
            download_url("http://127.0.0.1:8000/pdf/Quote_1.pdf?v=2"),
            "http://127.0.0.1:8000/pdf/Quote_1.pdf?v=2&download=true"
        );
    }

    #[test]
    fn existing_flag_and_fragment_are_preserved() {
        assert_eq!(
            download_url("http://host/pdf/a.pdf?download=true"),
            "http://host/pdf/a.pdf?download=true"
        );
        assert_eq!(download_url("http://host/pdf/a.pdf#page=2"), "http://host/pdf/a.pdf?download=true#page=2");
    }

    #[test]
    fn filename_comes_from_last_segment() {
        assert_eq!(
            document_filename("http://127.0.0.1:8000/pdf/Quote_INV-7.pdf").as_deref(),
            Some("Quote_INV-7.pdf")
        );
        assert_eq!(document_filename("not a url"), None);
    }

    #[test]
    fn backend_names_cannot_leave_the_target_directory() {
        assert_eq!(local_file_name("../evil.pdf").as_deref(), Some("evil.pdf"));
        assert_eq!(local_file_name("/tmp/pwn.pdf").as_deref(), Some("pwn.pdf"));
        assert_eq!(local_file_name("Quote_INV-7.pdf").as_deref(), Some("Quote_INV-7.pdf"));
        assert_eq!(local_file_name(".."), None);
        assert_eq!(local_file_name("/"), None);
        assert_eq!(local_file_name("  "), None);
    }
}
