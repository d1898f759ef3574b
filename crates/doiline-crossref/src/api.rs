//! Crossref REST API client

use std::time::Duration;

use anyhow::Context;
use doiline_core::http::user_agent;
use doiline_core::{FetchError, SHARED_RUNTIME, http_client};
use reqwest::{StatusCode, Url};

use crate::doi::Doi;
use crate::record::{WorksResponse, parse_works_body};

/// Whole-request deadline; a 100-DOI filter query is usually answered in a
/// few seconds.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Remote bulk-lookup capability. The only network boundary of the
/// pipeline.
pub trait Registry {
    /// One lookup for the full list of DOIs. Any `Err` makes the fetcher
    /// retry the whole batch.
    fn lookup(&self, dois: &[Doi]) -> Result<WorksResponse, FetchError>;
}

impl<R: Registry + ?Sized> Registry for &R {
    fn lookup(&self, dois: &[Doi]) -> Result<WorksResponse, FetchError> {
        (**self).lookup(dois)
    }
}

/// Crossref `/works` client.
///
/// A one-DOI batch uses `GET /works/{doi}` (single record answer); larger
/// batches use `GET /works?filter=doi:a,doi:b,...&rows=n` (record list).
#[derive(Debug, Clone)]
pub struct CrossrefClient {
    works_url: Url,
    mailto: Option<String>,
}

impl CrossrefClient {
    pub fn new(base_url: &str, mailto: Option<String>) -> anyhow::Result<Self> {
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let works_url = Url::parse(&base)
            .and_then(|u| u.join("works"))
            .with_context(|| format!("Invalid Crossref base URL: {base_url}"))?;
        anyhow::ensure!(
            !works_url.cannot_be_a_base(),
            "Crossref base URL cannot carry a path: {base_url}"
        );
        Ok(Self { works_url, mailto })
    }

    /// `GET /works/{doi}`; the DOI goes in as a single percent-encoded
    /// path segment.
    pub fn single_url(&self, doi: &Doi) -> Url {
        let mut url = self.works_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(doi.as_str());
        }
        self.with_mailto(url)
    }

    /// `GET /works?filter=doi:...&rows=n`
    ///
    /// Filter clauses are comma-separated, so callers must keep DOIs that
    /// contain a comma out of this query (see [`split_filter_safe`]).
    pub fn filter_url<'a>(&self, dois: impl IntoIterator<Item = &'a Doi>) -> Url {
        let clauses: Vec<String> = dois.into_iter().map(|d| format!("doi:{d}")).collect();
        let mut url = self.works_url.clone();
        url.query_pairs_mut()
            .append_pair("filter", &clauses.join(","))
            .append_pair("rows", &clauses.len().to_string());
        self.with_mailto(url)
    }

    fn with_mailto(&self, mut url: Url) -> Url {
        if let Some(mailto) = self.mailto.as_deref().filter(|m| !m.is_empty()) {
            url.query_pairs_mut().append_pair("mailto", mailto);
        }
        url
    }

    /// GET and read the body; `None` for 404.
    fn get(&self, url: Url) -> Result<Option<String>, FetchError> {
        let ua = user_agent(self.mailto.as_deref());
        SHARED_RUNTIME.handle().block_on(async {
            let resp = http_client()
                .get(url)
                .header(reqwest::header::USER_AGENT, ua)
                .timeout(REQUEST_TIMEOUT)
                .send()
                .await
                .map_err(FetchError::from_reqwest)?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let resp = resp.error_for_status().map_err(FetchError::from_reqwest)?;
            resp.text().await.map(Some).map_err(FetchError::from_reqwest)
        })
    }
}

impl CrossrefClient {
    fn lookup_single(&self, doi: &Doi) -> Result<WorksResponse, FetchError> {
        match self.get(self.single_url(doi))? {
            Some(body) => parse_works_body(&body),
            // Unknown DOI: nothing to resolve, not worth retrying
            None => {
                log::debug!("{doi}: not found in Crossref");
                Ok(WorksResponse::List(Vec::new()))
            }
        }
    }

    fn lookup_filter(&self, dois: &[&Doi]) -> Result<WorksResponse, FetchError> {
        match self.get(self.filter_url(dois.iter().copied()))? {
            Some(body) => parse_works_body(&body),
            None => Err(FetchError::Http {
                status: Some(404),
                message: "works endpoint not found".to_string(),
            }),
        }
    }
}

/// Split a batch into DOIs the filter query can carry and DOIs containing a
/// comma, which would break the clause list and need a single lookup each.
pub fn split_filter_safe(dois: &[Doi]) -> (Vec<&Doi>, Vec<&Doi>) {
    dois.iter().partition(|d| !d.as_str().contains(','))
}

impl Registry for CrossrefClient {
    fn lookup(&self, dois: &[Doi]) -> Result<WorksResponse, FetchError> {
        match dois {
            [] => Ok(WorksResponse::List(Vec::new())),
            [doi] => self.lookup_single(doi),
            _ => {
                let (bulk, single) = split_filter_safe(dois);
                if single.is_empty() {
                    return self.lookup_filter(&bulk);
                }
                log::debug!("{} DOIs with commas looked up one by one", single.len());
                let mut records = match bulk.as_slice() {
                    [] => Vec::new(),
                    _ => self.lookup_filter(&bulk)?.into_records(),
                };
                for doi in single {
                    records.extend(self.lookup_single(doi)?.into_records());
                }
                Ok(WorksResponse::List(records))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> CrossrefClient {
        CrossrefClient::new("https://api.crossref.org", Some("me@example.org".into())).unwrap()
    }

    #[test]
    fn base_url_with_or_without_slash() {
        let a = CrossrefClient::new("https://api.crossref.org", None).unwrap();
        let b = CrossrefClient::new("https://api.crossref.org/", None).unwrap();
        assert_eq!(a.works_url, b.works_url);
        assert_eq!(a.works_url.as_str(), "https://api.crossref.org/works");
    }

    #[test]
    fn invalid_base_url() {
        assert!(CrossrefClient::new("not a url", None).is_err());
    }

    #[test]
    fn single_url_encodes_doi_as_one_segment() {
        let url = client().single_url(&Doi::normalize("10.1000/ABC"));
        assert_eq!(
            url.as_str(),
            "https://api.crossref.org/works/10.1000%2Fabc?mailto=me%40example.org"
        );
    }

    #[test]
    fn filter_url_lists_every_doi() {
        let dois = vec![Doi::normalize("10.1/a"), Doi::normalize("10.1/b")];
        let url = client().filter_url(&dois);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("filter".to_string(), "doi:10.1/a,doi:10.1/b".to_string()),
                ("rows".to_string(), "2".to_string()),
                ("mailto".to_string(), "me@example.org".to_string()),
            ]
        );
    }

    #[test]
    fn comma_doi_kept_out_of_filter() {
        let dois = vec![
            Doi::normalize("10.1175/1520-0469(1999)056<1766:a,b>2.0.co;2"),
            Doi::normalize("10.1/c"),
            Doi::normalize("10.1/d"),
        ];
        let (bulk, single) = split_filter_safe(&dois);
        assert_eq!(single, vec![&dois[0]]);
        assert_eq!(bulk, vec![&dois[1], &dois[2]]);

        let url = client().filter_url(bulk);
        let filter = url
            .query_pairs()
            .find(|(k, _)| k == "filter")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        let clauses: Vec<&str> = filter.split(',').collect();
        assert_eq!(clauses, vec!["doi:10.1/c", "doi:10.1/d"]);
        assert!(url.query_pairs().any(|(k, v)| k == "rows" && v == "2"));
    }

    #[test]
    fn comma_doi_single_url_is_one_segment() {
        let doi = Doi::normalize("10.1175/1520-0469(1999)056<1766:a,b>2.0.co;2");
        let url = client().single_url(&doi);
        let segments: Vec<&str> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], "works");
    }

    #[test]
    fn no_mailto_param_when_unset() {
        let c = CrossrefClient::new("https://api.crossref.org", None).unwrap();
        let url = c.filter_url(&[Doi::normalize("10.1/a"), Doi::normalize("10.1/b")]);
        assert!(url.query_pairs().all(|(k, _)| k != "mailto"));
    }

    #[test]
    fn empty_lookup_makes_no_request() {
        // unroutable base: any request would fail
        let c = CrossrefClient::new("http://127.0.0.1:9", None).unwrap();
        assert_eq!(c.lookup(&[]).unwrap(), WorksResponse::List(vec![]));
    }

    /// Live request against Crossref
    /// Run with: cargo test -p doiline-crossref -- --ignored live_lookup
    #[test]
    #[ignore]
    fn live_lookup() {
        let dois = vec![
            Doi::normalize("10.1038/nature12373"),
            Doi::normalize("10.1103/PhysRevLett.116.061102"),
        ];
        let pairs = client().lookup(&dois).unwrap().into_pairs();
        assert_eq!(pairs.len(), 2);
    }
}
