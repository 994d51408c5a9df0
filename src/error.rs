pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Failures while talking to an upstream JSON endpoint.
///
/// Cloneable so a single failed fetch can be handed to every caller that was
/// waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
    #[error("http {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("unexpected payload from {url}: {message}")]
    Decode { url: String, message: String },
}

impl FetchError {
    pub fn network(url: &str, err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "timed out".to_string()
        } else {
            err.to_string()
        };
        Self::Network {
            url: url.to_string(),
            message,
        }
    }

    pub fn decode(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. } | Self::Status { url, .. } | Self::Decode { url, .. } => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FetchError;

    #[test]
    fn every_variant_reports_its_url() {
        let status = FetchError::Status {
            url: "https://dd.example/api/versions.json".to_string(),
            status: 503,
        };
        assert_eq!(status.url(), "https://dd.example/api/versions.json");
        assert_eq!(status.to_string(), "http 503 from https://dd.example/api/versions.json");

        let decode = FetchError::decode("https://dd.example/x.json", "missing field `name`");
        assert_eq!(decode.url(), "https://dd.example/x.json");
    }
}
