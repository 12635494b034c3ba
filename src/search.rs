//! Web search/scrape capability boundary.
//!
//! "Return a list of pages with URL and extracted markdown" — the provider
//! itself (rate limits, retries, the 15s default timeout) is out of scope;
//! this crate only depends on the shape of the response.

use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub timeout_secs: u64,
    pub limit: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            limit: 5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub url: Option<String>,
    pub markdown: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
    pub data: Vec<SearchPage>,
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse>;
}

/// A page counts as useful input to the summarizer only once its markdown
/// exceeds 100 characters.
pub fn has_useful_content(response: &SearchResponse) -> bool {
    response
        .data
        .iter()
        .any(|p| p.markdown.as_deref().map(|m| m.len() > 100).unwrap_or(false))
}

pub mod testing {
    use super::*;
    use tokio::sync::Mutex;

    pub struct ScriptedSearchClient {
        responses: Mutex<Vec<Result<SearchResponse, String>>>,
    }

    impl ScriptedSearchClient {
        pub fn new(responses: Vec<Result<SearchResponse, String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
            }
        }

        pub fn always_empty() -> Self {
            Self {
                responses: Mutex::new(vec![Ok(SearchResponse::default())]),
            }
        }
    }

    #[async_trait]
    impl SearchClient for ScriptedSearchClient {
        async fn search(&self, _query: &str, _options: &SearchOptions) -> Result<SearchResponse> {
            let mut responses = self.responses.lock().await;
            match responses.pop() {
                Some(Ok(r)) => Ok(r),
                Some(Err(e)) => Err(anyhow::anyhow!(e)),
                None => {
                    if let Some(last) = responses.first() {
                        return last.clone().map_err(|e| anyhow::anyhow!(e));
                    }
                    Ok(SearchResponse::default())
                }
            }
        }
    }
}
