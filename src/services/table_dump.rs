//! Full-table dump
//!
//! Scans the whole table page by page and streams every item into a JSON
//! array. Items are written as pages arrive, so memory use is bounded by the
//! page size rather than the table size.

use futures::{pin_mut, Stream, TryStreamExt};
use std::io::Write;

use crate::db::{ItemStore, PlainItem, StoreError};
use crate::error::MigrateError;

/// Stream every item of the table in scan order
pub fn scan_items<S>(store: &S) -> impl Stream<Item = Result<PlainItem, StoreError>> + Send + '_
where
    S: ItemStore + ?Sized,
{
    async_stream::try_stream! {
        let mut start = None;
        let mut pages = 0usize;

        loop {
            let page = store.scan_page(start.take()).await?;
            pages += 1;
            tracing::debug!(page = pages, items = page.items.len(), "Scanned page");

            for item in page.items {
                yield item;
            }

            match page.last_evaluated_key {
                Some(key) => start = Some(key),
                None => break,
            }
        }
    }
}

/// Dump every item as one JSON array into `writer`, returning the item count
pub async fn dump_table<S, W>(store: &S, mut writer: W) -> Result<usize, MigrateError>
where
    S: ItemStore + ?Sized,
    W: Write,
{
    let items = scan_items(store);
    pin_mut!(items);

    writer.write_all(b"[\n")?;

    let mut count = 0usize;
    while let Some(item) = items.try_next().await? {
        if count > 0 {
            writer.write_all(b",\n")?;
        }
        serde_json::to_writer(&mut writer, &item).map_err(std::io::Error::from)?;
        count += 1;
    }

    writer.write_all(b"\n]\n")?;
    writer.flush()?;

    Ok(count)
}
