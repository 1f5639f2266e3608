use std::path::Path;

use tracing::{debug, warn};

use crate::host::{HostError, PageOpener, ProbeSession};

pub const DEFAULT_MAX_PAGES: u32 = 100;
pub const FALLBACK_PAGE_COUNT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProbe {
    pub page_count: u32,
    pub probes: u32,
    pub fell_back: bool,
}

/// Finds the page count by opening pages from `max_pages` downwards until one
/// opens. Every failure, out-of-range or not, moves on to the next lower page;
/// only cancellation stops the probe.
pub fn count_pages<O: PageOpener + ?Sized>(
    opener: &mut O,
    document: &Path,
    max_pages: u32,
) -> Result<PageProbe, HostError> {
    let mut candidate = max_pages;
    let mut probes = 0;

    while candidate >= 1 {
        probes += 1;
        match ProbeSession::open(opener, document, candidate) {
            Ok(_session) => {
                debug!(
                    path = %document.display(),
                    page_count = candidate,
                    probes,
                    "page probe succeeded"
                );
                return Ok(PageProbe {
                    page_count: candidate,
                    probes,
                    fell_back: false,
                });
            }
            Err(HostError::Cancelled) => return Err(HostError::Cancelled),
            Err(HostError::PageOutOfRange { .. }) => {}
            Err(err) => {
                warn!(
                    path = %document.display(),
                    page = candidate,
                    error = %err,
                    "page probe failed; treating as out of range"
                );
            }
        }
        candidate -= 1;
    }

    warn!(
        path = %document.display(),
        max_pages,
        "no page could be opened; falling back to a single page"
    );
    Ok(PageProbe {
        page_count: FALLBACK_PAGE_COUNT,
        probes,
        fell_back: true,
    })
}
