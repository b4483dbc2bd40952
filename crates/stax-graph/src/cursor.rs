//! Result cursors
//!
//! A [`ResultCursor`] wraps an engine result handle. It is `Open` until
//! [`close`](ResultCursor::close) runs (explicitly, on drop, or when a
//! [`RecordStream`] finishes) and `Closed` from then on.

use crate::config::ClientConfig;
use crate::engine::ResultHandle;
use stax_core::{Error, Result};
use stax_protocol::{PageRequest, Record, ResultPage};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

/// Paged access to one result set
pub struct ResultCursor {
    handle: Option<Box<dyn ResultHandle>>,
    defaults: PageRequest,
    warn_on_coercion: bool,
    stream_page_size: u32,
}

impl ResultCursor {
    /// Wrap the handle an engine returned for a query.
    ///
    /// A missing handle is an engine integrity failure, not an empty result.
    pub fn new(handle: Option<Box<dyn ResultHandle>>, config: &ClientConfig) -> Result<Self> {
        let handle = handle.ok_or_else(|| {
            Error::Execution("Native result set handle is null; the engine returned no result set".to_string())
        })?;

        Ok(Self {
            handle: Some(handle),
            defaults: config.page_defaults(),
            warn_on_coercion: config.warn_on_page_coercion,
            stream_page_size: config.stream_page_size.max(1),
        })
    }

    /// Fetch a page. Non-positive arguments fall back to the configured
    /// defaults; pages past the end are empty.
    pub fn get_page(&mut self, page_number: i64, page_size: i64) -> Result<ResultPage> {
        let (request, coerced) = PageRequest::coerce(page_number, page_size, self.defaults);
        if coerced && self.warn_on_coercion {
            warn!(
                page_number,
                page_size,
                used_page_number = request.page_number,
                used_page_size = request.page_size,
                "Invalid page arguments replaced with defaults"
            );
        }
        self.fetch(request)
    }

    fn fetch(&mut self, request: PageRequest) -> Result<ResultPage> {
        let handle = self.handle.as_mut().ok_or(Error::CursorClosed)?;
        handle.get_page(request)
    }

    /// Size of the whole result set; 0 once closed
    pub fn total_count(&self) -> u64 {
        self.handle.as_ref().map_or(0, |h| h.total_count())
    }

    /// Release the engine result set. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
            debug!("Result cursor closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Iterate every record, fetching pages lazily. The cursor closes when
    /// the stream ends or is dropped.
    pub fn records(self) -> Result<RecordStream> {
        RecordStream::new(self)
    }
}

impl fmt::Debug for ResultCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCursor")
            .field("closed", &self.is_closed())
            .field("total_count", &self.total_count())
            .finish()
    }
}

impl Drop for ResultCursor {
    fn drop(&mut self) {
        self.close();
    }
}

/// Single-pass iterator over a cursor's records
#[derive(Debug)]
pub struct RecordStream {
    cursor: ResultCursor,
    total: u64,
    yielded: u64,
    next_page: u32,
    buffer: VecDeque<Record>,
    done: bool,
}

impl RecordStream {
    fn new(cursor: ResultCursor) -> Result<Self> {
        if cursor.is_closed() {
            return Err(Error::CursorClosed);
        }
        let total = cursor.total_count();
        Ok(Self {
            cursor,
            total,
            yielded: 0,
            next_page: 1,
            buffer: VecDeque::new(),
            done: false,
        })
    }

    /// Records handed out so far
    pub fn yielded(&self) -> u64 {
        self.yielded
    }

    fn finish(&mut self) {
        self.done = true;
        self.buffer.clear();
        self.cursor.close();
    }
}

impl Iterator for RecordStream {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.yielded >= self.total {
            self.finish();
            return None;
        }

        if self.buffer.is_empty() {
            let request = PageRequest {
                page_number: self.next_page,
                page_size: self.cursor.stream_page_size,
            };
            match self.cursor.fetch(request) {
                Ok(page) if page.is_empty() => {
                    // Short of the total; the engine has nothing more
                    debug!(yielded = self.yielded, total = self.total, "Result stream ended early");
                    self.finish();
                    return None;
                }
                Ok(page) => {
                    self.next_page += 1;
                    self.buffer.extend(page.results);
                }
                Err(e) => {
                    self.finish();
                    return Some(Err(e));
                }
            }
        }

        let record = self.buffer.pop_front()?;
        self.yielded += 1;
        Some(Ok(record))
    }
}
