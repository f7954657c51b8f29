//! The document-store client.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use futures::TryStreamExt;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::changes::ChangeStream;
use crate::selector::Selector;
use crate::{Change, Error, Result};

/// The server-side heartbeat interval requested on continuous feeds.
const HEARTBEAT: Duration = Duration::from_secs(10);

/// An opaque update-sequence token.
///
/// Stores issue strings (`"42-g1AAAA…"`) or plain numbers depending on
/// version; the token is carried verbatim and only ever handed back in a
/// `since` parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Seq(serde_json::Value);

impl Seq {
    /// The token addressing the beginning of history.
    pub fn origin() -> Self {
        Self(serde_json::Value::from(0))
    }

    /// The raw form used as a `since` query parameter.
    fn as_param(&self) -> String {
        match &self.0 {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl Default for Seq {
    fn default() -> Self {
        Self::origin()
    }
}

impl Display for Seq {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_param())
    }
}

/// Typed HTTP access to one database.
#[derive(Debug, Clone)]
pub struct DbClient {
    base: reqwest::Url,
    client: reqwest::Client,
    stall: Duration,
}

impl DbClient {
    /// Creates a client for the database at `url`
    /// (e.g. `http://localhost:5984/schematics`).
    pub fn new(url: &str) -> Result<Self> {
        let mut base: reqwest::Url =
            url.parse().map_err(|_| Error::BadUrl(url.to_string()))?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        Ok(Self {
            base,
            client: reqwest::Client::new(),
            stall: HEARTBEAT * 3,
        })
    }

    /// Overrides the stall deadline after which a silent change feed is
    /// treated as a transport failure.
    pub fn with_stall_deadline(mut self, stall: Duration) -> Self {
        self.stall = stall;
        self
    }

    fn endpoint(&self, path: &str) -> Result<reqwest::Url> {
        self.base
            .join(path)
            .map_err(|_| Error::BadUrl(path.to_string()))
    }

    async fn check(res: reqwest::Response) -> Result<reqwest::Response> {
        let status = res.status();
        if status.is_success() {
            return Ok(res);
        }
        let body = res.text().await.unwrap_or_default();
        Err(Error::Status {
            code: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> Result<T> {
        let bytes = res.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Fetches every document whose id falls in `[prefix:, prefix:\u{fff0})`
    /// along with the store's current update-sequence token.
    pub async fn list_by_range<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<(Seq, IndexMap<String, T>)> {
        #[derive(Deserialize)]
        struct Row<T> {
            id: String,
            doc: Option<T>,
        }
        #[derive(Deserialize)]
        struct AllDocs<T> {
            update_seq: Seq,
            rows: Vec<Row<T>>,
        }

        let startkey = format!("\"{}:\"", prefix);
        let endkey = format!("\"{}:\u{fff0}\"", prefix);
        let res = self
            .client
            .get(self.endpoint("_all_docs")?)
            .query(&[
                ("include_docs", "true"),
                ("startkey", startkey.as_str()),
                ("endkey", endkey.as_str()),
                ("update_seq", "true"),
            ])
            .send()
            .await?;
        let body: AllDocs<T> = Self::decode(Self::check(res).await?).await?;
        debug!(prefix, rows = body.rows.len(), "range read");
        let docs = body
            .rows
            .into_iter()
            .filter_map(|row| row.doc.map(|doc| (row.id, doc)))
            .collect();
        Ok((body.update_seq, docs))
    }

    /// One-shot delta poll: every change after `since` matching `selector`.
    pub async fn changes_since<T: DeserializeOwned>(
        &self,
        since: &Seq,
        selector: &Selector,
    ) -> Result<(Seq, Vec<Change<T>>)> {
        #[derive(Deserialize)]
        struct Changes<T> {
            results: Vec<Change<T>>,
            last_seq: Seq,
        }

        let since = since.as_param();
        let res = self
            .client
            .post(self.endpoint("_changes")?)
            .query(&[
                ("filter", "_selector"),
                ("since", since.as_str()),
                ("include_docs", "true"),
            ])
            .json(&serde_json::json!({ "selector": selector.as_json() }))
            .send()
            .await?;
        let body: Changes<T> = Self::decode(Self::check(res).await?).await?;
        debug!(since = %since, changes = body.results.len(), "changes poll");
        Ok((body.last_seq, body.results))
    }

    /// Opens a continuous change feed after `since` matching `selector`.
    ///
    /// The feed is restartable but otherwise infinite; dropping the returned
    /// stream closes the underlying response.
    pub async fn changes_stream<T: DeserializeOwned>(
        &self,
        since: &Seq,
        selector: &Selector,
    ) -> Result<ChangeStream<T>> {
        let heartbeat = HEARTBEAT.as_millis().to_string();
        let since = since.as_param();
        let res = self
            .client
            .post(self.endpoint("_changes")?)
            .query(&[
                ("feed", "continuous"),
                ("heartbeat", heartbeat.as_str()),
                ("filter", "_selector"),
                ("since", since.as_str()),
                ("include_docs", "true"),
            ])
            .json(&serde_json::json!({ "selector": selector.as_json() }))
            .send()
            .await?;
        let res = Self::check(res).await?;
        debug!(since = %since, "change feed open");
        let body = res
            .bytes_stream()
            .map_err(|err| std::io::Error::other(err));
        Ok(ChangeStream::new(Box::pin(body), self.stall))
    }

    /// Writes one document, returning its new revision token.
    pub async fn put_doc<T: Serialize>(&self, id: &str, doc: &T) -> Result<String> {
        #[derive(Deserialize)]
        struct Put {
            rev: String,
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::BadUrl(id.to_string()))?
            .push(id);
        let res = self.client.put(url).json(doc).send().await?;
        let body: Put = Self::decode(Self::check(res).await?).await?;
        debug!(id, rev = %body.rev, "document written");
        Ok(body.rev)
    }
}
