//! Content paginator: splits one HTML chapter into reader pages.
//!
//! Pages are built by greedily accumulating the tokenizer's top-level block
//! segments until a size budget is reached, so a page boundary never falls
//! inside an element. A leading heading block is the chapter header and is
//! pinned to the head of page 1 only.

use std::path::PathBuf;

use anyhow::Context as _;

use crate::cli::PaginateArgs;
use crate::tokenizer::{self, SegmentKind, tokenize};

pub const DEFAULT_WORD_BUDGET: usize = 400;

/// Target size per page, measured on the tags-stripped text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Budget {
    Words(usize),
    Chars(usize),
}

impl Budget {
    fn limit(&self) -> usize {
        match self {
            Budget::Words(n) | Budget::Chars(n) => *n,
        }
    }

    fn measure(&self, segment: &tokenizer::Segment) -> usize {
        match self {
            Budget::Words(_) => segment.words,
            Budget::Chars(_) => segment.chars,
        }
    }
}

/// Split `content` into at least one page.
///
/// The budget is a soft ceiling enforced at block granularity: a page is
/// flushed when the next block would push it past the budget, except that a
/// page holding only the chapter header never flushes, and a single block
/// larger than the whole budget is emitted whole. Concatenating the
/// returned pages in order reproduces `content` exactly.
pub fn paginate(content: &str, budget: Budget) -> Vec<String> {
    if content.trim().is_empty() {
        return vec![String::new()];
    }

    let segments = tokenize(content);
    let mut pages = Vec::new();
    let mut acc = String::new();
    let mut acc_size = 0usize;
    let mut acc_blocks = 0usize;

    for (idx, segment) in segments.iter().enumerate() {
        let pinned_header = idx == 0 && matches!(segment.kind, SegmentKind::Heading(_));
        let size = budget.measure(segment);

        if acc_blocks > 0 && acc_size + size > budget.limit() {
            pages.push(std::mem::take(&mut acc));
            acc_size = 0;
            acc_blocks = 0;
        }

        acc.push_str(&segment.raw);
        acc_size += size;
        if !pinned_header {
            acc_blocks += 1;
        }
    }

    if !acc.is_empty() {
        pages.push(acc);
    }

    if pages.is_empty() {
        // No block boundaries detected at all; the whole input is one page.
        return vec![content.to_owned()];
    }
    pages
}

pub fn run(args: PaginateArgs) -> anyhow::Result<()> {
    let input_path = PathBuf::from(&args.input);
    let content = std::fs::read_to_string(&input_path)
        .with_context(|| format!("read chapter html: {}", input_path.display()))?;

    let budget = budget_from_args(&args)?;
    tracing::debug!(?budget, input = %input_path.display(), "paginating chapter");

    let pages = paginate(&content, budget);
    println!("{} page(s)", pages.len());
    for (idx, page) in pages.iter().enumerate() {
        let stripped = tokenizer::stripped_text(page);
        println!(
            "page {}/{}: {} words, {} chars",
            idx + 1,
            pages.len(),
            stripped.split_whitespace().count(),
            stripped.chars().count()
        );
        if args.show_pages {
            println!("{page}");
        }
    }

    Ok(())
}

fn budget_from_args(args: &PaginateArgs) -> anyhow::Result<Budget> {
    match (args.budget_words, args.budget_chars) {
        (Some(_), Some(_)) => {
            anyhow::bail!("--budget-words and --budget-chars are mutually exclusive")
        }
        (Some(words), None) => {
            anyhow::ensure!(words > 0, "--budget-words must be > 0");
            Ok(Budget::Words(words))
        }
        (None, Some(chars)) => {
            anyhow::ensure!(chars > 0, "--budget-chars must be > 0");
            Ok(Budget::Chars(chars))
        }
        (None, None) => Ok(Budget::Words(DEFAULT_WORD_BUDGET)),
    }
}
