/// Terminal rendering of a [`ResultTree`] and of the controller status.
use console::Style;

use crate::config::DisplayConfig;
use crate::controller::{Phase, QueryController};
use crate::markdown::{ColorChoice, MarkdownRenderer, TerminalMarkdown};
use crate::presenter::{RenderNode, ResultTree};

const BODY_INDENT: &str = "      ";

pub struct TerminalView {
    markdown: Box<dyn MarkdownRenderer>,
    truncate_width: usize,
    title: Style,
    label: Style,
    muted: Style,
}

impl TerminalView {
    #[must_use]
    pub fn new(
        markdown: Box<dyn MarkdownRenderer>,
        truncate_width: usize,
        color: ColorChoice,
    ) -> Self {
        Self {
            markdown,
            truncate_width,
            title: color.apply(Style::new().bold().magenta()),
            label: color.apply(Style::new().bold()),
            muted: color.apply(Style::new().dim()),
        }
    }

    #[must_use]
    pub fn from_config(display: &DisplayConfig) -> Self {
        let color = ColorChoice::from_flag(display.color);
        Self::new(
            Box::new(TerminalMarkdown::new(color)),
            display.truncate_width,
            color,
        )
    }

    /// Plain-text view, used by tests and `--no-color`.
    #[must_use]
    pub fn plain(truncate_width: usize) -> Self {
        Self::new(
            Box::new(TerminalMarkdown::plain()),
            truncate_width,
            ColorChoice::Never,
        )
    }

    /// Render the whole result: both sections, then the numbered rows.
    /// Rows are numbered from 1 on screen.
    #[must_use]
    pub fn render(&self, tree: &ResultTree) -> String {
        let mut out = String::new();
        for node in tree.render() {
            match node {
                RenderNode::Section { title, markdown } => {
                    out.push_str(&self.heading(title));
                    let body = self.markdown.render(markdown);
                    if !body.is_empty() {
                        out.push_str(&body);
                        out.push('\n');
                    }
                    out.push('\n');
                }
                RenderNode::ContextHeader { title, count } => {
                    out.push_str(&self.heading(&format!("{title} ({count})")));
                }
                RenderNode::ContextRow {
                    index,
                    file_path,
                    indicator,
                    body,
                } => {
                    let label = console::truncate_str(file_path, self.truncate_width, "…");
                    out.push_str(&format!(
                        "  {} {} {}\n",
                        indicator.glyph(),
                        self.muted.apply_to(format!("[{}]", index + 1)),
                        self.label.apply_to(label)
                    ));
                    if let Some(text) = body {
                        for line in self.markdown.render(text).lines() {
                            if line.is_empty() {
                                out.push('\n');
                            } else {
                                out.push_str(BODY_INDENT);
                                out.push_str(line);
                                out.push('\n');
                            }
                        }
                    }
                }
            }
        }
        out
    }

    fn heading(&self, title: &str) -> String {
        format!("{}\n", self.title.apply_to(format!("── {title} ──")))
    }

    /// One-line summary of the controller state.
    #[must_use]
    pub fn status(&self, controller: &QueryController) -> String {
        let phase = match controller.phase() {
            Phase::Idle => "idle",
            Phase::Submitting => "analyzing",
        };
        let shown = match controller.result() {
            Some(tree) => format!("{} contexts shown", tree.len()),
            None => "no result".to_string(),
        };
        format!(
            "repo: {}\nquery: {}\nstate: {phase}, {shown}, submit {}",
            display_or_dash(controller.repo_url()),
            display_or_dash(controller.query()),
            if controller.can_submit() { "enabled" } else { "disabled" }
        )
    }
}

fn display_or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Document, DocumentMetadata, QueryResponse};

    fn tree(contexts: &[(&str, &str)]) -> ResultTree {
        ResultTree::new(QueryResponse {
            rationale: "R".into(),
            answer: "A".into(),
            contexts: contexts
                .iter()
                .map(|(path, text)| Document {
                    text: text.to_string(),
                    meta_data: DocumentMetadata {
                        file_path: path.to_string(),
                        doc_type: "code".into(),
                        is_code: true,
                        is_implementation: true,
                        title: "auth".into(),
                    },
                })
                .collect(),
        })
    }

    #[test]
    fn test_collapsed_render() {
        let view = TerminalView::plain(60);
        let out = view.render(&tree(&[("src/auth.go", "T1")]));
        assert_eq!(
            out,
            "── Analysis ──\nR\n\n── Answer ──\nA\n\n── Context (1) ──\n  ▸ [1] src/auth.go\n"
        );
        assert!(!out.contains("T1"));
    }

    #[test]
    fn test_expanded_render_shows_body() {
        let view = TerminalView::plain(60);
        let mut t = tree(&[("src/auth.go", "T1")]);
        t.toggle(0).unwrap();
        let out = view.render(&t);
        assert!(out.ends_with("  ▾ [1] src/auth.go\n      T1\n"), "{out:?}");
    }

    #[test]
    fn test_long_path_is_truncated_visually_only() {
        let long = "very/deeply/nested/directory/structure/with/a/long/file_name.rs";
        let view = TerminalView::plain(20);
        let t = tree(&[(long, "body")]);
        let out = view.render(&t);
        assert!(!out.contains(long));
        assert!(out.contains('…'));
        assert_eq!(t.response().contexts[0].meta_data.file_path, long);
    }

    #[test]
    fn test_rows_follow_response_order() {
        let view = TerminalView::plain(60);
        let out = view.render(&tree(&[("z.rs", ""), ("a.rs", ""), ("m.rs", "")]));
        let z = out.find("z.rs").unwrap();
        let a = out.find("a.rs").unwrap();
        let m = out.find("m.rs").unwrap();
        assert!(z < a && a < m);
    }

    #[test]
    fn test_status_line() {
        let view = TerminalView::plain(60);
        let mut c = QueryController::with_repo_url("https://github.com/acme/widgets");
        let status = view.status(&c);
        assert!(status.contains("query: -"));
        assert!(status.contains("submit disabled"));

        c.set_query("How is auth handled?");
        assert!(view.status(&c).contains("submit enabled"));
    }
}
