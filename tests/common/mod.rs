#![allow(dead_code)]

use std::collections::HashSet;

use anyhow::{Result, ensure};
use tagweave::{Document, Segment, SegmentKind, TagSet, ValueFragment};

pub fn registry() -> TagSet {
    TagSet::from_names(["p", "task", "hint", "b"], ["meta"]).expect("registry")
}

/// Compact one-line rendering of a tree, e.g.
/// `text[text("a") tag(p)[text("b")] template(x)]`.
pub fn outline(segment: &Segment<'_>) -> String {
    let mut out = String::new();
    write_outline(segment, &mut out);
    out
}

fn write_outline(segment: &Segment<'_>, out: &mut String) {
    match segment.kind {
        SegmentKind::Text if segment.children.is_empty() => {
            out.push_str(&format!("text({:?})", segment.content))
        }
        SegmentKind::Text => out.push_str("text"),
        SegmentKind::Template => {
            out.push_str(&format!("template({})", segment.expression.unwrap_or_default()))
        }
        SegmentKind::Tag | SegmentKind::Meta => {
            let label = if segment.kind == SegmentKind::Tag { "tag" } else { "meta" };
            let slash = if segment.self_closing { "/" } else { "" };
            out.push_str(&format!(
                "{}({}{})",
                label,
                segment.tag_name.unwrap_or_default(),
                slash
            ));
        }
    }

    if !segment.children.is_empty() {
        out.push('[');
        for (i, child) in segment.children.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            write_outline(child, out);
        }
        out.push(']');
    }
}

/// Outline of the root followed by one `! Kind` line per diagnostic.
pub fn render(document: &Document<'_>) -> String {
    let mut lines = vec![outline(&document.root)];
    lines.extend(
        document
            .diagnostics()
            .iter()
            .map(|diagnostic| format!("! {:?}", diagnostic.kind)),
    );
    lines.join("\n")
}

/// Attribute keys and values without source offsets.
pub fn attribute_shape(segment: &Segment<'_>) -> Vec<(String, Vec<String>)> {
    segment
        .attributes
        .iter()
        .map(|attribute| {
            let value = attribute
                .value
                .iter()
                .map(|fragment| match fragment {
                    ValueFragment::Literal { text, .. } => format!("lit:{}", text),
                    ValueFragment::Template { expression, .. } => format!("tpl:{}", expression),
                })
                .collect();
            (attribute.key.to_string(), value)
        })
        .collect()
}

/// Checks the structural invariants every document must satisfy.
pub fn check_invariants(document: &Document<'_>) -> Result<()> {
    let source = document.source();
    let root = &document.root;
    ensure!(root.start == 0, "root starts at {}", root.start);
    ensure!(root.end == source.len(), "root ends at {}", root.end);
    ensure!(document.parent(root.id).is_none(), "root has a parent");

    let mut ids = HashSet::new();
    let mut count = 0;
    for segment in document.iter() {
        count += 1;
        ensure!(segment.end >= segment.start, "negative range on {}", segment.id);
        ensure!(
            segment.content == &source[segment.start..segment.end],
            "content of {} is not its source slice",
            segment.id
        );
        ensure!(ids.insert(segment.id), "duplicate id {}", segment.id);
        ensure!(
            document.get(segment.id).map(|s| s.start) == Some(segment.start),
            "lookup of {} failed",
            segment.id
        );
        ensure!(
            segment.tag_name.is_some() == matches!(segment.kind, SegmentKind::Tag | SegmentKind::Meta),
            "tag name presence on {}",
            segment.id
        );
        ensure!(
            segment.expression.is_some() == (segment.kind == SegmentKind::Template),
            "expression presence on {}",
            segment.id
        );
        if matches!(segment.kind, SegmentKind::Template | SegmentKind::Meta) {
            ensure!(segment.children.is_empty(), "{} should be a leaf", segment.id);
        }

        let mut cursor = segment.start;
        for child in &segment.children {
            ensure!(child.start >= cursor, "children of {} overlap", segment.id);
            ensure!(child.end <= segment.end, "child {} escapes its parent", child.id);
            cursor = child.end;

            let parent = document.parent(child.id);
            ensure!(
                parent.map(|p| p.id) == Some(segment.id),
                "parent index of {} is wrong",
                child.id
            );
            ensure!(child.path == segment.path, "path of {} differs", child.id);
        }
    }
    ensure!(count == document.len(), "len() disagrees with iteration");
    Ok(())
}
