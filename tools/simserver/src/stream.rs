//! The chunked result read loop.

use arcstr::ArcStr;
use indexmap::IndexMap;
use num::complex::Complex64;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::frame::{Column, Frame};
use crate::simulator_capnp::{vector, vector_set};
use crate::store::ResultStore;
use crate::ResponseHandle;

fn text(reader: capnp::text::Reader<'_>) -> Result<&str> {
    reader
        .to_str()
        .map_err(|_| Error::Rpc(capnp::Error::failed("invalid utf-8 in text field".into())))
}

fn decode_column(vec: vector::Reader<'_>) -> Result<(ArcStr, Column)> {
    let name = ArcStr::from(text(vec.get_name()?)?);
    let column = match vec.get_data().which()? {
        vector::data::Real(list) => Column::Real(list?.iter().collect()),
        vector::data::Complex(list) => Column::Complex(
            list?
                .iter()
                .map(|c| Complex64::new(c.get_real(), c.get_imag()))
                .collect(),
        ),
    };
    Ok((name, column))
}

/// Decodes one VectorSet into a frame keyed by its analysis name.
fn decode_set(set: vector_set::Reader<'_>) -> Result<Option<(ArcStr, Frame)>> {
    let scale = text(set.get_scale()?)?;
    // An empty scale means the set is not initialised yet.
    if scale.is_empty() {
        return Ok(None);
    }
    let scale = ArcStr::from(scale);
    let name = ArcStr::from(text(set.get_name()?)?);
    let mut index = None;
    let mut columns: IndexMap<ArcStr, Column> = IndexMap::new();
    for vec in set.get_data()?.iter() {
        let (colname, column) = decode_column(vec)?;
        if colname == scale {
            index = Some(column);
        } else {
            columns.insert(colname, column);
        }
    }
    let Some(index) = index else {
        return Ok(None);
    };
    Ok(Some((name, Frame::new(scale, index, columns))))
}

/// Reads a command's chunk stream to completion into `store`.
///
/// Chunks append to the newest frame of their analysis key; a column-set
/// change opens a new frame and `on_new_key` fires with the key. On error
/// the partial store is left intact and the error recorded on it.
pub async fn read_stream<F>(
    response: &ResponseHandle,
    store: &mut ResultStore,
    mut on_new_key: F,
) -> Result<()>
where
    F: FnMut(&str),
{
    let run = async {
        loop {
            let reply = response.handle.read_request().send().promise.await?;
            let chunk = reply.get()?;
            let stdout = chunk.get_stdout()?;
            if !stdout.is_empty() {
                debug!(stdout = %String::from_utf8_lossy(stdout), "simulator output");
            }
            for set in chunk.get_data()?.iter() {
                let Some((key, frame)) = decode_set(set)? else {
                    continue;
                };
                trace!(key = %key, rows = frame.len(), "chunk");
                if store.append(key.clone(), frame) {
                    on_new_key(&key);
                }
            }
            if !chunk.get_more() {
                return Ok(());
            }
        }
    };
    match run.await {
        Ok(()) => Ok(()),
        Err(err) => {
            let err: Error = err;
            store.set_error(err.to_string());
            Err(err)
        }
    }
}
