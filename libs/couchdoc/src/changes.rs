//! Change-feed records and the continuous stream.

use std::marker::PhantomData;
use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio_util::io::StreamReader;
use tracing::trace;

use crate::client::Seq;
use crate::{Error, Result};

/// One change-feed record: a created/updated document or a deletion.
#[derive(Debug, Clone, Deserialize)]
pub struct Change<T> {
    /// The sequence token of this change, when the server includes one.
    #[serde(default)]
    pub seq: Option<Seq>,
    /// The id of the changed document.
    pub id: String,
    /// Whether the document was deleted.
    #[serde(default)]
    pub deleted: bool,
    /// The full document body (`include_docs=true`).
    #[serde(default = "Option::default")]
    pub doc: Option<T>,
}

/// The record the server emits when a feed terminates.
#[derive(Debug, Deserialize)]
struct FeedTail {
    #[allow(dead_code)]
    last_seq: Seq,
}

/// Decodes one newline-delimited feed record.
///
/// Returns `Ok(None)` for the terminating `last_seq` record.
pub(crate) fn decode_line<T: DeserializeOwned>(line: &str) -> Result<Option<Change<T>>> {
    match serde_json::from_str::<Change<T>>(line) {
        Ok(change) => Ok(Some(change)),
        Err(err) => {
            if serde_json::from_str::<FeedTail>(line).is_ok() {
                return Ok(None);
            }
            Err(Error::Protocol(err))
        }
    }
}

type BodyReader =
    StreamReader<Pin<Box<dyn Stream<Item = std::io::Result<bytes::Bytes>> + Send>>, bytes::Bytes>;

/// A continuous `_changes` feed.
///
/// The stream is infinite from the server's point of view: it yields one
/// change per record, skips heartbeat lines, and ends only when the
/// connection drops (or the stream is dropped, which closes the response).
/// A gap longer than the stall deadline surfaces as [`Error::Stalled`].
pub struct ChangeStream<T> {
    lines: Lines<BufReader<BodyReader>>,
    stall: Duration,
    _doc: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> ChangeStream<T> {
    pub(crate) fn new(
        body: Pin<Box<dyn Stream<Item = std::io::Result<bytes::Bytes>> + Send>>,
        stall: Duration,
    ) -> Self {
        Self {
            lines: BufReader::new(StreamReader::new(body)).lines(),
            stall,
            _doc: PhantomData,
        }
    }

    /// The next change, or `None` when the server closed the feed.
    pub async fn next(&mut self) -> Result<Option<Change<T>>> {
        loop {
            let line = tokio::time::timeout(self.stall, self.lines.next_line())
                .await
                .map_err(|_| Error::Stalled)??;
            let Some(line) = line else {
                return Ok(None);
            };
            // Empty lines are server heartbeats.
            if line.trim().is_empty() {
                trace!("change feed heartbeat");
                continue;
            }
            match decode_line(&line)? {
                Some(change) => return Ok(Some(change)),
                None => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn decodes_update_and_deletion() {
        let update: Change<Value> = decode_line(
            r#"{"seq":"2-x","id":"top$top:r1-a","changes":[{"rev":"2-y"}],"doc":{"_id":"top$top:r1-a","cell":"resistor"}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(update.id, "top$top:r1-a");
        assert!(!update.deleted);
        assert!(update.doc.is_some());

        let deletion: Change<Value> = decode_line(
            r#"{"seq":"3-x","id":"top$top:r1-a","deleted":true,"doc":{"_id":"top$top:r1-a","_deleted":true}}"#,
        )
        .unwrap()
        .unwrap();
        assert!(deletion.deleted);
    }

    #[test]
    fn feed_tail_ends_the_stream() {
        assert!(decode_line::<Value>(r#"{"last_seq":"9-x","pending":0}"#)
            .unwrap()
            .is_none());
    }

    #[test]
    fn garbage_is_a_protocol_error() {
        assert!(matches!(
            decode_line::<Value>("not json"),
            Err(Error::Protocol(_))
        ));
    }
}
