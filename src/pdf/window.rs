//! Page window resolution and ceilings.

use crate::config::RenderConfig;
use crate::error::RenderError;

/// Inclusive 1-based page range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub start: u32,
    pub end: u32,
}

impl PageWindow {
    /// Page count; a resolved window always holds at least one page.
    pub(crate) fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn contains(&self, page: u32) -> bool {
        (self.start..=self.end).contains(&page)
    }
}

/// Turns an optional requested window into the pages to render.
///
/// Without a window the whole document is rendered, up to
/// `max_document_pages`. An explicit window must satisfy
/// `1 <= start <= end <= total` and fit the per-request ceiling, which
/// drops for sources larger than `large_source_bytes`.
pub fn resolve_window(
    requested: Option<(i64, i64)>,
    total_pages: u32,
    source_bytes: u64,
    config: &RenderConfig,
) -> Result<PageWindow, RenderError> {
    if total_pages == 0 {
        return Err(RenderError::Processing("PDF has no pages".to_string()));
    }

    let (start, end) = match requested {
        None => {
            if total_pages > config.max_document_pages {
                return Err(RenderError::DocumentTooLarge {
                    pages: total_pages,
                    max: config.max_document_pages,
                });
            }
            return Ok(PageWindow {
                start: 1,
                end: total_pages,
            });
        }
        Some(range) => range,
    };

    if start < 1 || end < 1 {
        return Err(RenderError::InvalidRange(format!(
            "Page numbers start at 1 (got start={}, end={})",
            start, end
        )));
    }
    if start > end {
        return Err(RenderError::InvalidRange(format!(
            "Start page {} is after end page {}",
            start, end
        )));
    }
    if end > i64::from(total_pages) {
        return Err(RenderError::InvalidRange(format!(
            "Requested pages {}-{} but the document has {} pages",
            start, end, total_pages
        )));
    }

    // Bounded by total_pages above
    let window = PageWindow {
        start: start as u32,
        end: end as u32,
    };

    let ceiling = config.window_ceiling(source_bytes);
    if window.len() > ceiling {
        return Err(RenderError::RangeTooLarge {
            start: window.start,
            end: window.end,
            requested: window.len(),
            max: ceiling,
        });
    }

    Ok(window)
}
