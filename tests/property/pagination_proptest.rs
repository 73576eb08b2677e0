//! Property-based tests for page assembly
//!
//! Uses proptest to generate random inputs and verify properties

use std::collections::BTreeSet;

use proptest::prelude::*;

use offline_reader::client::pagination::{assemble_pages, paginate_with_fallback, Paginator};
use offline_reader::shared::ContentBlock;

struct SingleChunk;

impl Paginator for SingleChunk {
    fn paginate(&self, text: &str) -> Vec<String> {
        vec![text.to_string()]
    }
}

fn block_strategy() -> impl Strategy<Value = ContentBlock> {
    (
        prop_oneof![Just("heading"), Just("paragraph")],
        "[a-z ]{0,12}",
        -2i32..8,
        0i32..5,
    )
        .prop_map(|(kind, text, page, position)| ContentBlock::new(kind, text, page, position))
}

proptest! {
    #[test]
    fn test_one_page_per_numbered_page(blocks in prop::collection::vec(block_strategy(), 0..40)) {
        let numbered: BTreeSet<i32> = blocks
            .iter()
            .map(|b| b.page_number)
            .filter(|p| *p > 0)
            .collect();

        let pages = assemble_pages(&blocks);

        prop_assert_eq!(pages.len(), numbered.len());
        prop_assert!(pages.iter().all(|page| !page.is_empty()));
    }

    #[test]
    fn test_assembly_ignores_input_order(
        mut blocks in prop::collection::vec(block_strategy(), 0..30),
        seed in any::<u64>(),
    ) {
        // Positions must be unique within a page for the order to be defined
        for (i, block) in blocks.iter_mut().enumerate() {
            block.position = i as i32;
        }
        let expected = assemble_pages(&blocks);

        let len = blocks.len().max(1);
        blocks.rotate_left((seed as usize) % len);
        prop_assert_eq!(assemble_pages(&blocks), expected);
    }

    #[test]
    fn test_headings_are_upper_cased(text in "[a-z]{1,10}") {
        let blocks = vec![ContentBlock::new("heading", text.clone(), 1, 0)];
        prop_assert_eq!(assemble_pages(&blocks), vec![text.to_uppercase()]);
    }

    #[test]
    fn test_fallback_only_without_page_numbers(
        blocks in prop::collection::vec(block_strategy(), 1..20)
    ) {
        let assembled = assemble_pages(&blocks);
        let pages = paginate_with_fallback(&blocks, &SingleChunk);

        if assembled.is_empty() {
            prop_assert!(pages.len() <= 1);
        } else {
            prop_assert_eq!(pages, assembled);
        }
    }
}
