//! Context budget assembler
//!
//! Turns the final ranked candidates into a single bounded text block safe
//! to embed in a generation prompt. Two labeled sections (historical
//! tickets, product guides) with per-type item caps, per-item length caps
//! and a global budget. When an item would overflow the global budget it is
//! truncated to the remaining room (if a useful tail remains) and the
//! assembler stops accepting further items; it never drops from the middle
//! or reorders. Deterministic for identical ranked input.

use crate::retrieval::RetrievalCandidate;
use serde::{Deserialize, Serialize};

const TICKETS_HEADER: &str = "=== HISTORICAL TICKETS ===\n";
const GUIDES_HEADER: &str = "=== PRODUCT GUIDES ===\n";
const ELLIPSIS: &str = "...";

/// Length limits, in bytes of UTF-8 text. Truncation never splits a code
/// point, so effective lengths may fall a few bytes short of a limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextLimits {
    /// Items kept per source type
    pub max_tickets: usize,
    pub max_guides: usize,
    /// Cap on one item's body
    pub max_item_len: usize,
    /// Global budget across both sections
    pub max_total_len: usize,
    /// Minimum useful body length when squeezing a final item into the
    /// remaining budget
    pub min_tail_len: usize,
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_tickets: 5,
            max_guides: 3,
            max_item_len: 1500,
            max_total_len: 15000,
            min_tail_len: 100,
        }
    }
}

/// Assembled context block plus whether the budget forced truncation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledContext {
    pub text: String,
    pub truncated: bool,
}

pub struct ContextAssembler {
    limits: ContextLimits,
}

/// Cut `text` down to at most `max_len` bytes on a char boundary.
fn truncate_at_boundary(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn ticket_header(position: usize, candidate: &RetrievalCandidate) -> String {
    let meta = &candidate.metadata;
    let id = if meta.ticket_id.is_empty() {
        candidate.document_id.as_str()
    } else {
        meta.ticket_id.as_str()
    };

    let mut header = format!("[TICKET {position}] ID: {id}");
    if !meta.subject.is_empty() {
        header.push_str(&format!("\nSubject: {}", meta.subject));
    }
    if !meta.status.is_empty() {
        header.push_str(&format!("\nStatus: {}", meta.status));
    }
    header.push('\n');
    header
}

fn guide_header(position: usize, candidate: &RetrievalCandidate) -> String {
    let meta = &candidate.metadata;
    let mut header = format!("[GUIDE {position}] {}", meta.guide_title);
    if !meta.guide_number.is_empty() {
        header.push_str(&format!(" ({})", meta.guide_number));
    }
    if !meta.section_title.is_empty() {
        header.push_str(&format!(" - {}", meta.section_title));
    }
    header.push('\n');
    header
}

impl ContextAssembler {
    pub fn new(limits: ContextLimits) -> Self {
        Self { limits }
    }

    /// Build the context block. Either section may legitimately be absent
    /// when its candidate list is empty.
    pub fn assemble(
        &self,
        tickets: &[RetrievalCandidate],
        guides: &[RetrievalCandidate],
    ) -> AssembledContext {
        let mut out = String::new();
        let mut truncated = false;
        let mut budget_exhausted = false;

        self.write_section(
            &mut out,
            TICKETS_HEADER,
            tickets,
            self.limits.max_tickets,
            ticket_header,
            &mut truncated,
            &mut budget_exhausted,
        );
        self.write_section(
            &mut out,
            GUIDES_HEADER,
            guides,
            self.limits.max_guides,
            guide_header,
            &mut truncated,
            &mut budget_exhausted,
        );

        AssembledContext {
            text: out,
            truncated,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write_section(
        &self,
        out: &mut String,
        section_header: &str,
        candidates: &[RetrievalCandidate],
        max_items: usize,
        item_header: fn(usize, &RetrievalCandidate) -> String,
        truncated: &mut bool,
        budget_exhausted: &mut bool,
    ) {
        if candidates.is_empty() || *budget_exhausted {
            return;
        }
        if out.len() + section_header.len() >= self.limits.max_total_len {
            *budget_exhausted = true;
            *truncated = true;
            return;
        }

        let mut section_started = false;
        for (i, candidate) in candidates.iter().take(max_items).enumerate() {
            let header = item_header(i + 1, candidate);

            let body = truncate_at_boundary(&candidate.text, self.limits.max_item_len);
            let mut item_truncated = body.len() < candidate.text.len();

            // Room needed for this entry; the section header is paid for
            // once, before the first item that fits.
            let section_cost = if section_started {
                0
            } else {
                section_header.len()
            };
            let overhead = section_cost + header.len() + ELLIPSIS.len() + 2;
            let remaining = self.limits.max_total_len.saturating_sub(out.len());

            let body = if overhead + body.len() > remaining {
                let room = remaining.saturating_sub(overhead);
                if room < self.limits.min_tail_len {
                    *budget_exhausted = true;
                    *truncated = true;
                    return;
                }
                item_truncated = true;
                *budget_exhausted = true;
                truncate_at_boundary(body, room)
            } else {
                body
            };

            if !section_started {
                out.push_str(section_header);
                section_started = true;
            }
            out.push_str(&header);
            out.push_str(body);
            if item_truncated {
                out.push_str(ELLIPSIS);
                *truncated = true;
            }
            out.push_str("\n\n");

            // A squeezed item is the last one accepted, across sections.
            if *budget_exhausted {
                return;
            }
        }
    }
}
