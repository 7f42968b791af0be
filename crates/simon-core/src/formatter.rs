// crates/simon-core/src/formatter.rs
//! Token-budget-aware rendering of context blocks for hook injection.

use crate::types::{estimate_tokens, ContextBlock};

const HEADER: &str = "## Focus Context\n\n";

/// Format context blocks into the text injected as additionalContext.
///
/// Sorts by relevance, greedily fills the token budget, and appends an
/// overflow note when blocks were dropped. Returns an empty string when no
/// block fits.
pub fn format_context_blocks(blocks: &[ContextBlock], max_tokens: usize) -> String {
    if blocks.is_empty() {
        return String::new();
    }

    let mut sorted: Vec<&ContextBlock> = blocks.iter().collect();
    sorted.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let header_tokens = estimate_tokens(HEADER);
    let mut remaining = max_tokens.saturating_sub(header_tokens);

    let mut formatted_parts: Vec<String> = Vec::new();
    let mut overflow = 0usize;

    for block in sorted {
        let formatted = format_single_block(block);
        let tokens = estimate_tokens(&formatted);

        if tokens <= remaining && max_tokens > header_tokens {
            remaining -= tokens;
            formatted_parts.push(formatted);
        } else {
            overflow += 1;
        }
    }

    if formatted_parts.is_empty() {
        return String::new();
    }

    let mut result = format!("{}{}", HEADER, formatted_parts.join("\n"));
    if overflow > 0 {
        result.push_str(&format!(
            "\n\n(+{} more — run 'focus search' for details)",
            overflow
        ));
    }

    result
}

fn format_single_block(block: &ContextBlock) -> String {
    format!("[{}] {}", block.source_type.label(), block.content)
}
