/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The tree-walking renderer.
//!
//! Each composite (body, table, row, cell, paragraph) is rewritten in two
//! phases: its children are taken out, walked in order with control-marker
//! matching and block expansion, and the rewritten list replaces them.
//! Block templates are deep-cloned per loop iteration so expanded copies
//! never share nodes. Inline substitution runs per paragraph and is robust
//! to Word splitting one directive across several runs.

use std::path::{Path, PathBuf};

use docfill_ooxml::{DocxPackage, XmlElement, XmlNode};
use tracing::debug;

use crate::context::Context;
use crate::error::{RenderError, RenderResult};
use crate::image::{inline_image_run, resolve_many};
use crate::pipeline::evaluate;
use crate::tag::{
    classify_marker, is_expression_directive, parse_image_tag, ControlMarker, ImageTag,
    MarkerKind, INLINE_TAG,
};
use crate::value::Value;

/// Renders one template body against a context chain.
///
/// A renderer is constructed per render call; it owns the monotone image id
/// counter, so drawing ids increase in emission order within a document.
pub struct TemplateRenderer<'p> {
    package: &'p mut DocxPackage,
    base_dir: PathBuf,
    next_image_id: u32,
}

impl<'p> TemplateRenderer<'p> {
    /// Create a renderer over an opened package. `base_dir` anchors
    /// relative image file paths.
    pub fn new(package: &'p mut DocxPackage, base_dir: &Path) -> Self {
        Self {
            package,
            base_dir: base_dir.to_path_buf(),
            next_image_id: 1,
        }
    }

    /// Rewrite the document body in place.
    pub fn render_body(&mut self, ctx: &Context) -> RenderResult<()> {
        let children = std::mem::take(&mut self.package.body_mut()?.children);
        let rendered = self.render_children(children, ctx)?;
        self.package.body_mut()?.children = rendered;
        Ok(())
    }

    /// Walk a snapshot of a composite's children and build the rewritten
    /// list: control blocks expand or drop, everything else renders
    /// recursively in place.
    fn render_children(
        &mut self,
        mut nodes: Vec<XmlNode>,
        ctx: &Context,
    ) -> RenderResult<Vec<XmlNode>> {
        let mut out = Vec::with_capacity(nodes.len());
        let mut i = 0;

        while i < nodes.len() {
            let marker = nodes[i]
                .as_element()
                .and_then(|el| classify_marker(&el.run_text()));

            let Some(marker) = marker else {
                let node = std::mem::replace(&mut nodes[i], XmlNode::Text(String::new()));
                match node {
                    XmlNode::Element(el) => {
                        out.push(XmlNode::Element(self.render_element(el, ctx)?))
                    }
                    text => out.push(text),
                }
                i += 1;
                continue;
            };

            if !marker.kind.is_start() {
                // An end marker at top level was not consumed by any start:
                // the marker paragraph itself is never emitted.
                i += 1;
                continue;
            }

            let end = find_matching_end(&nodes, i, &marker)?;
            let block = &nodes[i + 1..end];

            match marker.kind {
                MarkerKind::LoopStart => {
                    let value = evaluate(&marker.expression, ctx)?;
                    let items = loop_items(&value);
                    debug!(
                        expression = %marker.expression,
                        items = items.len(),
                        "expanding loop block"
                    );
                    for item in items {
                        let child = ctx.child(item);
                        let rendered = self.render_children(block.to_vec(), &child)?;
                        out.extend(rendered);
                    }
                }
                MarkerKind::IfStart => {
                    let value = evaluate(&marker.expression, ctx)?;
                    let keep = value.is_truthy();
                    debug!(expression = %marker.expression, keep, "conditional block");
                    if keep {
                        let rendered = self.render_children(block.to_vec(), ctx)?;
                        out.extend(rendered);
                    }
                }
                MarkerKind::LoopEnd | MarkerKind::IfEnd => unreachable!(),
            }
            i = end + 1;
        }

        Ok(out)
    }

    fn render_element(&mut self, mut el: XmlElement, ctx: &Context) -> RenderResult<XmlElement> {
        match el.name.as_str() {
            "w:p" => self.render_paragraph(el, ctx),
            "w:tbl" | "w:tr" | "w:tc" => {
                let children = std::mem::take(&mut el.children);
                el.children = self.render_children(children, ctx)?;
                Ok(el)
            }
            _ => Ok(el),
        }
    }

    fn render_paragraph(&mut self, mut p: XmlElement, ctx: &Context) -> RenderResult<XmlElement> {
        let children = std::mem::take(&mut p.children);
        p.children = self.render_children(children, ctx)?;

        if let Some(tag) = parse_image_tag(&p.run_text()) {
            self.render_image_paragraph(&mut p, &tag, ctx)?;
            return Ok(p);
        }

        substitute_inline(&mut p, ctx)?;
        Ok(p)
    }

    /// Replace a pure image-tag paragraph with inline drawings, one per
    /// resolved payload.
    fn render_image_paragraph(
        &mut self,
        p: &mut XmlElement,
        tag: &ImageTag,
        ctx: &Context,
    ) -> RenderResult<()> {
        let value = evaluate(&tag.expression, ctx)?;
        let payloads = resolve_many(&value, &self.base_dir)?;

        p.children
            .retain(|n| !matches!(n.as_element(), Some(el) if el.name == "w:r"));
        if tag.centered {
            center_paragraph(p);
        }

        for payload in payloads {
            let rel_id = self.package.add_image_part(
                &payload.bytes,
                payload.format.extension(),
                payload.format.mime(),
            )?;
            let id = self.next_image_id;
            self.next_image_id += 1;
            debug!(
                relationship = %rel_id,
                width = payload.width_px,
                height = payload.height_px,
                "emitting inline image"
            );
            p.push_element(inline_image_run(&rel_id, id, &payload));
        }
        Ok(())
    }
}

/// Find the end marker matching `marker` at `start`, counting nested
/// markers of the same category. The matching end must carry the same
/// expression, byte for byte.
fn find_matching_end(
    nodes: &[XmlNode],
    start: usize,
    marker: &ControlMarker,
) -> RenderResult<usize> {
    let mut depth = 0usize;
    for (j, node) in nodes.iter().enumerate().skip(start + 1) {
        let Some(candidate) = node
            .as_element()
            .and_then(|el| classify_marker(&el.run_text()))
        else {
            continue;
        };
        if !candidate.kind.same_category(marker.kind) {
            continue;
        }
        if candidate.kind.is_start() {
            depth += 1;
        } else if depth > 0 {
            depth -= 1;
        } else if candidate.expression == marker.expression {
            return Ok(j);
        } else {
            return Err(RenderError::UnmatchedTag {
                expected: marker.expression.clone(),
                found: candidate.expression,
            });
        }
    }
    Err(RenderError::UnclosedTag(marker.raw.clone()))
}

/// What a loop iterates: arrays yield their elements, other truthy values
/// a single iteration over the value itself, null/falsy values none.
fn loop_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        v if v.is_truthy() => vec![v],
        _ => Vec::new(),
    }
}

/// Inline substitution over the text nodes of one paragraph.
///
/// Word may split a single directive across adjacent runs. When all
/// directives fall inside single nodes, each node is replaced on its own
/// and run formatting is untouched. When a directive straddles nodes (the
/// per-node result disagrees with replacing the combined text), the whole
/// combined result lands in the first node and the rest are emptied.
fn substitute_inline(p: &mut XmlElement, ctx: &Context) -> RenderResult<()> {
    let mut texts: Vec<String> = Vec::new();
    p.visit_named("w:t", &mut |t| texts.push(t.text_content()));
    if texts.is_empty() {
        return Ok(());
    }

    if texts.len() == 1 {
        let replaced = replace_inline(&texts[0], ctx)?;
        write_texts(p, &[replaced]);
        return Ok(());
    }

    let combined: String = texts.concat();
    if !combined.contains('{') && !combined.contains('}') {
        let replaced: Vec<String> = texts
            .iter()
            .map(|t| replace_inline(t, ctx))
            .collect::<RenderResult<_>>()?;
        write_texts(p, &replaced);
        return Ok(());
    }

    let combined_replaced = replace_inline(&combined, ctx)?;
    let per_node: Vec<String> = texts
        .iter()
        .map(|t| replace_inline(t, ctx))
        .collect::<RenderResult<_>>()?;

    if per_node.concat() == combined_replaced {
        write_texts(p, &per_node);
    } else {
        let mut flattened = vec![combined_replaced];
        flattened.resize(texts.len(), String::new());
        write_texts(p, &flattened);
    }
    Ok(())
}

/// Replace every directive token in one string.
///
/// Control tokens mixed into text are deleted, image tokens are left for
/// the paragraph-level image pass, expression directives are evaluated,
/// and unrecognized tokens pass through verbatim.
fn replace_inline(text: &str, ctx: &Context) -> RenderResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for captures in INLINE_TAG.captures_iter(text) {
        let token = captures.get(0).expect("match");
        let inner = captures.get(1).expect("group").as_str();
        out.push_str(&text[last..token.start()]);

        let trimmed = inner.trim();
        if trimmed.starts_with(['#', '?', '/']) {
            // Dropped: control markers are block-level constructs.
        } else if trimmed.starts_with('%') {
            out.push_str(token.as_str());
        } else if is_expression_directive(inner) {
            out.push_str(&evaluate(inner, ctx)?.to_text());
        } else {
            out.push_str(token.as_str());
        }
        last = token.end();
    }
    out.push_str(&text[last..]);
    Ok(out)
}

/// Write replacement texts back into the paragraph's `w:t` nodes, in the
/// same document order they were collected.
fn write_texts(p: &mut XmlElement, texts: &[String]) {
    let mut i = 0;
    p.visit_named_mut("w:t", &mut |t| {
        if let Some(text) = texts.get(i) {
            t.set_text(text.clone());
            let boundary_space = text.starts_with(char::is_whitespace)
                || text.ends_with(char::is_whitespace);
            if !text.is_empty() && boundary_space {
                t.set_attribute("xml:space", "preserve");
            }
        }
        i += 1;
    });
}

/// Set the paragraph justification to center, creating `w:pPr` if absent.
fn center_paragraph(p: &mut XmlElement) {
    if p.find_child("w:pPr").is_none() {
        p.children
            .insert(0, XmlNode::Element(XmlElement::new("w:pPr")));
    }
    let ppr = p.find_child_mut("w:pPr").expect("just ensured");
    match ppr.find_child_mut("w:jc") {
        Some(jc) => jc.set_attribute("w:val", "center"),
        None => ppr.push_element(XmlElement::new("w:jc").with_attribute("w:val", "center")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(json: &str) -> Value {
        Value::from_json(serde_json::from_str(json).unwrap())
    }

    fn text_node(text: &str) -> XmlElement {
        let mut t = XmlElement::new("w:t");
        t.set_text(text);
        t
    }

    fn paragraph(run_texts: &[&str]) -> XmlElement {
        let mut p = XmlElement::new("w:p");
        for text in run_texts {
            p.push_element(XmlElement::new("w:r").with_child(text_node(text)));
        }
        p
    }

    #[test]
    fn test_replace_inline_expressions() {
        let root = value(r#"{"patient":{"name":"Alice"},"n":3}"#);
        let ctx = Context::new(&root);
        assert_eq!(
            replace_inline("Patient: {patient.name} ({n})", &ctx).unwrap(),
            "Patient: Alice (3)"
        );
    }

    #[test]
    fn test_replace_inline_drops_control_tokens() {
        let root = value("{}");
        let ctx = Context::new(&root);
        assert_eq!(
            replace_inline("a {#items} b {/items} c {?x} d", &ctx).unwrap(),
            "a  b  c  d"
        );
    }

    #[test]
    fn test_replace_inline_keeps_image_and_literal_tokens() {
        let root = value("{}");
        let ctx = Context::new(&root);
        assert_eq!(
            replace_inline("see {%chart} and {foo bar}", &ctx).unwrap(),
            "see {%chart} and {foo bar}"
        );
    }

    #[test]
    fn test_replace_inline_missing_path_renders_empty() {
        let root = value("{}");
        let ctx = Context::new(&root);
        assert_eq!(replace_inline("[{missing}]", &ctx).unwrap(), "[]");
    }

    #[test]
    fn test_substitute_single_node() {
        let root = value(r#"{"name":"Ada"}"#);
        let ctx = Context::new(&root);
        let mut p = paragraph(&["Hello {name}!"]);
        substitute_inline(&mut p, &ctx).unwrap();
        assert_eq!(p.run_text(), "Hello Ada!");
    }

    #[test]
    fn test_substitute_preserves_runs_when_directives_are_whole() {
        let root = value(r#"{"a":"1","b":"2"}"#);
        let ctx = Context::new(&root);
        let mut p = paragraph(&["x {a} y", " and {b}"]);
        substitute_inline(&mut p, &ctx).unwrap();

        // Each run was replaced independently: run boundaries survive.
        let texts: Vec<String> = p
            .child_elements()
            .map(|r| r.run_text())
            .collect();
        assert_eq!(texts, ["x 1 y", " and 2"]);
    }

    #[test]
    fn test_substitute_flattens_split_directive() {
        let root = value(r#"{"createdAt":"2026-02-24T10:11:12Z"}"#);
        let ctx = Context::new(&root);
        let mut p = paragraph(&["{createdAt|for", "mat:date:yyyy-MM-", "dd}"]);
        substitute_inline(&mut p, &ctx).unwrap();

        assert_eq!(p.run_text(), "2026-02-24");
        // Everything landed in the first text node; the rest are empty.
        let texts: Vec<String> = p.child_elements().map(|r| r.run_text()).collect();
        assert_eq!(texts, ["2026-02-24", "", ""]);
    }

    #[test]
    fn test_substitute_sets_preserve_on_boundary_whitespace() {
        let root = value(r#"{"a":"x "}"#);
        let ctx = Context::new(&root);
        let mut p = paragraph(&["{a}"]);
        substitute_inline(&mut p, &ctx).unwrap();
        let run = p.find_child("w:r").unwrap();
        let t = run.find_child("w:t").unwrap();
        assert_eq!(t.get_attribute("xml:space"), Some("preserve"));
    }

    #[test]
    fn test_loop_items_rules() {
        let arr = value(r#"[1,2]"#);
        assert_eq!(loop_items(&arr).len(), 2);
        let obj = value(r#"{"a":1}"#);
        assert_eq!(loop_items(&obj).len(), 1);
        assert!(loop_items(&Value::Null).is_empty());
        assert!(loop_items(&Value::Bool(false)).is_empty());
        assert_eq!(loop_items(&Value::String("x".into())).len(), 1);
    }

    #[test]
    fn test_center_paragraph_creates_ppr_first() {
        let mut p = paragraph(&["x"]);
        center_paragraph(&mut p);
        let first = p.children[0].as_element().unwrap();
        assert_eq!(first.name, "w:pPr");
        assert_eq!(
            first.find_child("w:jc").unwrap().get_attribute("w:val"),
            Some("center")
        );
    }

    #[test]
    fn test_find_matching_end_nested_and_mismatched() {
        let nodes: Vec<XmlNode> = ["{#a}", "{#a}", "{/a}", "{/a}"]
            .iter()
            .map(|t| XmlNode::Element(paragraph(&[*t])))
            .collect();
        let marker = classify_marker("{#a}").unwrap();
        assert_eq!(find_matching_end(&nodes, 0, &marker).unwrap(), 3);

        let nodes: Vec<XmlNode> = ["{#a}", "{/b}"]
            .iter()
            .map(|t| XmlNode::Element(paragraph(&[*t])))
            .collect();
        assert!(matches!(
            find_matching_end(&nodes, 0, &marker),
            Err(RenderError::UnmatchedTag { .. })
        ));

        let nodes: Vec<XmlNode> = ["{#a}", "text"]
            .iter()
            .map(|t| XmlNode::Element(paragraph(&[*t])))
            .collect();
        assert!(matches!(
            find_matching_end(&nodes, 0, &marker),
            Err(RenderError::UnclosedTag(_))
        ));
    }

    #[test]
    fn test_conditional_end_does_not_close_loop() {
        // A conditional end between loop markers belongs to its own
        // category and is skipped by the loop's depth scan.
        let nodes: Vec<XmlNode> = ["{#a}", "{?x}", "{/?x}", "{/a}"]
            .iter()
            .map(|t| XmlNode::Element(paragraph(&[*t])))
            .collect();
        let marker = classify_marker("{#a}").unwrap();
        assert_eq!(find_matching_end(&nodes, 0, &marker).unwrap(), 3);
    }
}
