//! # Page Assembly
//!
//! Turns the remote service's content blocks into renderable page strings.
//!
//! Blocks carry their own page numbers. Pages are emitted in ascending page
//! order, blocks within a page in ascending `position`, joined by a blank line.
//! Headings are upper-cased. A page whose blocks are all empty renders as a
//! single space so layout never sees an empty string.
//!
//! Some backends omit page numbers on short documents. In that case
//! [`assemble_pages`] returns nothing and [`paginate_with_fallback`] hands the
//! flattened text to a layout-aware [`Paginator`].

use std::collections::BTreeMap;

use crate::shared::ContentBlock;

/// Separator between blocks on one page
const BLOCK_SEPARATOR: &str = "\n\n";

/// Rendered stand-in for a page without visible text
const BLANK_PAGE: &str = " ";

/// Layout-aware pagination supplied by the renderer
pub trait Paginator: Send + Sync {
    /// Split continuous text into pages
    fn paginate(&self, text: &str) -> Vec<String>;
}

/// Group blocks by page number and render each page
///
/// Blocks with `page_number <= 0` are dropped. Returns an empty vector when no
/// block has a usable page number.
pub fn assemble_pages(blocks: &[ContentBlock]) -> Vec<String> {
    let mut pages: BTreeMap<i32, Vec<&ContentBlock>> = BTreeMap::new();
    for block in blocks.iter().filter(|b| b.page_number > 0) {
        pages.entry(block.page_number).or_default().push(block);
    }

    pages
        .into_values()
        .map(|mut page_blocks| {
            page_blocks.sort_by_key(|b| b.position);
            render_page(&page_blocks)
        })
        .collect()
}

/// Concatenate every block ordered by `(page_number, position)`
pub fn flatten_blocks(blocks: &[ContentBlock]) -> String {
    let mut ordered: Vec<&ContentBlock> = blocks.iter().collect();
    ordered.sort_by_key(|b| (b.page_number, b.position));
    ordered
        .into_iter()
        .map(ContentBlock::rendered_text)
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

/// Assemble pages, falling back to the external paginator when the blocks
/// carry no page numbers
pub fn paginate_with_fallback(blocks: &[ContentBlock], paginator: &dyn Paginator) -> Vec<String> {
    let pages = assemble_pages(blocks);
    if !pages.is_empty() {
        return pages;
    }

    let text = flatten_blocks(blocks);
    if text.is_empty() {
        return Vec::new();
    }

    tracing::debug!(
        blocks = blocks.len(),
        chars = text.len(),
        "No page numbers on content blocks, using fallback paginator"
    );
    let pages = paginator.paginate(&text);
    if pages.is_empty() {
        vec![BLANK_PAGE.to_string()]
    } else {
        pages
    }
}

fn render_page(blocks: &[&ContentBlock]) -> String {
    let text = blocks
        .iter()
        .map(|b| b.rendered_text())
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR);

    if text.is_empty() {
        BLANK_PAGE.to_string()
    } else {
        text
    }
}
