//! Minimal HTML block tokenizer.
//!
//! Partitions a chapter's HTML into top-level block segments using a
//! tag-depth stack, so that pagination boundaries can only fall between
//! complete block elements. Segments cover the input exactly: concatenating
//! `Segment::raw` in order reproduces the input byte-for-byte.
//!
//! Upstream content is assumed well-formed (produced by the authoring
//! pipeline). A truncated trailing block is still emitted as a final
//! segment rather than dropped; attribute values containing a literal `>`
//! are not supported.

const BLOCK_TAGS: &[&str] = &[
    "blockquote",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "hr",
    "ol",
    "p",
    "pre",
    "table",
    "ul",
];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Exact byte span of the input covered by this segment.
    pub raw: String,
    pub kind: SegmentKind,
    /// Word count of the tags-stripped text.
    pub words: usize,
    /// Character count of the tags-stripped text.
    pub chars: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Top-level heading block (`h1`..`h6`) with its level.
    Heading(u8),
    /// Any other recognized top-level block element.
    Block,
    /// Content with no recognized block boundary: loose text, or a
    /// truncated trailing block.
    Text,
}

/// Split `html` into top-level block segments.
///
/// An empty input yields no segments. Input with no recognizable block
/// boundary yields a single [`SegmentKind::Text`] segment.
pub fn tokenize(html: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut seg_start = 0usize;
    let mut depth = 0usize;
    let mut top_tag: Option<String> = None;
    let mut cursor = 0usize;

    while let Some(rel) = html[cursor..].find('<') {
        let tag_start = cursor + rel;
        let Some(tag) = scan_tag(&html[tag_start..]) else {
            cursor = tag_start + 1;
            continue;
        };
        let tag_end = tag_start + tag.len;

        match tag.kind {
            TagKind::Open { name, self_closing } => {
                if is_block_tag(&name) {
                    if self_closing || is_void_tag(&name) {
                        // Void blocks (`<hr>`) close a segment on their own
                        // when they appear at the top level.
                        if depth == 0 {
                            segments.push(make_segment(&html[seg_start..tag_end], Some(&name)));
                            seg_start = tag_end;
                        }
                    } else {
                        if depth == 0 {
                            top_tag = Some(name);
                        }
                        depth += 1;
                    }
                }
            }
            TagKind::Close { name } => {
                if is_block_tag(&name) && depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        segments.push(make_segment(
                            &html[seg_start..tag_end],
                            top_tag.take().as_deref(),
                        ));
                        seg_start = tag_end;
                    }
                }
            }
            TagKind::Skip => {}
        }
        cursor = tag_end;
    }

    if seg_start < html.len() {
        let rest = &html[seg_start..];
        if let Some(last) = segments.last_mut()
            && rest.trim().is_empty()
        {
            // Trailing whitespace attaches to the previous segment so the
            // partition still reproduces the input exactly.
            last.raw.push_str(rest);
        } else {
            segments.push(make_segment(rest, None));
        }
    }

    segments
}

/// Text content of `html` with tags and comments removed and whitespace
/// collapsed to single spaces.
pub fn stripped_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0usize;

    while let Some(rel) = html[cursor..].find('<') {
        let start = cursor + rel;
        out.push_str(&html[cursor..start]);
        match scan_tag(&html[start..]) {
            Some(tag) => {
                // Tag boundaries become whitespace so adjacent blocks do
                // not fuse into one word.
                out.push(' ');
                cursor = start + tag.len;
            }
            None => {
                out.push('<');
                cursor = start + 1;
            }
        }
    }

    out.push_str(&html[cursor..]);
    normalize_whitespace(&out)
}

pub fn word_count(html: &str) -> usize {
    stripped_text(html).split_whitespace().count()
}

fn make_segment(raw: &str, top_tag: Option<&str>) -> Segment {
    let kind = match top_tag {
        Some(tag) => heading_level(tag)
            .map(SegmentKind::Heading)
            .unwrap_or(SegmentKind::Block),
        None => SegmentKind::Text,
    };
    let stripped = stripped_text(raw);
    Segment {
        raw: raw.to_owned(),
        kind,
        words: stripped.split_whitespace().count(),
        chars: stripped.chars().count(),
    }
}

fn is_block_tag(name: &str) -> bool {
    BLOCK_TAGS.contains(&name)
}

fn is_void_tag(name: &str) -> bool {
    VOID_TAGS.contains(&name)
}

fn heading_level(name: &str) -> Option<u8> {
    let rest = name.strip_prefix('h')?;
    if rest.len() != 1 {
        return None;
    }
    let level = rest.chars().next()?.to_digit(10)?;
    (1..=6).contains(&level).then_some(level as u8)
}

struct ScannedTag {
    /// Bytes consumed from `<` through the closing `>`.
    len: usize,
    kind: TagKind,
}

enum TagKind {
    Open { name: String, self_closing: bool },
    Close { name: String },
    Skip,
}

fn scan_tag(input: &str) -> Option<ScannedTag> {
    if input.starts_with("<!--") {
        let len = input.find("-->").map(|i| i + 3)?;
        return Some(ScannedTag {
            len,
            kind: TagKind::Skip,
        });
    }
    if input.starts_with("<!") || input.starts_with("<?") {
        let len = input.find('>')? + 1;
        return Some(ScannedTag {
            len,
            kind: TagKind::Skip,
        });
    }

    let close = input.starts_with("</");
    let name_start = if close { 2 } else { 1 };
    let name_len = input[name_start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .count();
    if name_len == 0 {
        return None;
    }
    let name = input[name_start..name_start + name_len].to_ascii_lowercase();

    let gt = input.find('>')?;
    let len = gt + 1;
    if close {
        return Some(ScannedTag {
            len,
            kind: TagKind::Close { name },
        });
    }

    let self_closing = input[..gt].trim_end().ends_with('/');
    Some(ScannedTag {
        len,
        kind: TagKind::Open { name, self_closing },
    })
}

fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_was_space = true;

    for ch in text.chars() {
        if ch.is_whitespace() {
            if !prev_was_space {
                out.push(' ');
                prev_was_space = true;
            }
        } else {
            out.push(ch);
            prev_was_space = false;
        }
    }

    if out.ends_with(' ') {
        out.pop();
    }

    out
}
