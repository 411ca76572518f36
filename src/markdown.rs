/// Markdown to terminal text.
///
/// Walks the `pulldown-cmark` event stream and writes wrapped-free plain text
/// with optional ANSI styling. Rendering is a pure function of the source.
use console::Style;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, source: &str) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChoice {
    /// Style only when stdout is a terminal.
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    #[must_use]
    pub fn from_flag(color: bool) -> Self {
        if color { ColorChoice::Auto } else { ColorChoice::Never }
    }

    #[must_use]
    pub fn apply(self, style: Style) -> Style {
        match self {
            ColorChoice::Auto => style,
            ColorChoice::Always => style.force_styling(true),
            ColorChoice::Never => style.force_styling(false),
        }
    }
}

pub struct TerminalMarkdown {
    color: ColorChoice,
}

impl TerminalMarkdown {
    #[must_use]
    pub fn new(color: ColorChoice) -> Self {
        Self { color }
    }

    /// Renderer that never emits escape codes.
    #[must_use]
    pub fn plain() -> Self {
        Self::new(ColorChoice::Never)
    }
}

impl MarkdownRenderer for TerminalMarkdown {
    fn render(&self, source: &str) -> String {
        let mut writer = Writer::new(self.color);
        for event in Parser::new_ext(source, parser_options()) {
            writer.event(event);
        }
        writer.finish()
    }
}

fn parser_options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts.insert(Options::ENABLE_TABLES);
    opts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inline {
    Emphasis,
    Strong,
    Strike,
    Link,
    Heading(HeadingLevel),
}

struct Writer {
    out: String,
    color: ColorChoice,
    inline: Vec<Inline>,
    /// Next number for ordered lists, `None` for bullets.
    lists: Vec<Option<u64>>,
    links: Vec<String>,
    quote_depth: usize,
    code_block: Option<String>,
    at_line_start: bool,
    /// Set right after a list marker; the item's first paragraph continues that line.
    after_marker: bool,
}

impl Writer {
    fn new(color: ColorChoice) -> Self {
        Self {
            out: String::new(),
            color,
            inline: Vec::new(),
            lists: Vec::new(),
            links: Vec::new(),
            quote_depth: 0,
            code_block: None,
            at_line_start: true,
            after_marker: false,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        let after_marker = std::mem::take(&mut self.after_marker);
        match event {
            Event::Start(Tag::Paragraph) if after_marker => {}
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match self.code_block.as_mut() {
                Some(buf) => buf.push_str(&text),
                None => self.write_inline(&text),
            },
            Event::Code(code) => {
                let style = self.color.apply(Style::new().cyan());
                self.write_styled(&code, &style);
            }
            Event::SoftBreak => self.write_inline(" "),
            Event::HardBreak => self.newline(),
            Event::Rule => {
                self.block_break();
                let style = self.color.apply(Style::new().dim());
                self.write_styled(&"─".repeat(40), &style);
                self.newline();
            }
            Event::Html(html) | Event::InlineHtml(html) => self.write_inline(&html),
            Event::TaskListMarker(done) => self.write_inline(if done { "[x] " } else { "[ ] " }),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.block_break(),
            Tag::Heading { level, .. } => {
                self.block_break();
                self.inline.push(Inline::Heading(level));
            }
            Tag::BlockQuote(_) => {
                self.block_break();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.block_break();
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        let style = self.color.apply(Style::new().dim());
                        self.write_styled(&format!("[{lang}]"), &style);
                        self.newline();
                    }
                }
                self.code_block = Some(String::new());
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.block_break();
                } else {
                    self.ensure_newline();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                self.ensure_newline();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let m = format!("{n}. ");
                        *n += 1;
                        m
                    }
                    _ => "• ".to_string(),
                };
                self.write_inline(&format!("{}{marker}", "  ".repeat(depth)));
                self.after_marker = true;
            }
            Tag::Emphasis => self.inline.push(Inline::Emphasis),
            Tag::Strong => self.inline.push(Inline::Strong),
            Tag::Strikethrough => self.inline.push(Inline::Strike),
            Tag::Link { dest_url, .. } => {
                self.links.push(dest_url.to_string());
                self.inline.push(Inline::Link);
            }
            Tag::Image { dest_url, .. } => {
                self.write_inline("[image: ");
                self.links.push(dest_url.to_string());
            }
            Tag::TableRow | Tag::TableHead => self.ensure_newline(),
            Tag::TableCell => {
                if !self.at_line_start {
                    self.write_inline(" | ");
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => self.ensure_newline(),
            TagEnd::Heading(_) => {
                self.inline.pop();
                self.ensure_newline();
            }
            TagEnd::BlockQuote(_) => {
                self.ensure_newline();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                let code = self.code_block.take().unwrap_or_default();
                let style = self.color.apply(Style::new().yellow());
                for line in code.trim_end_matches('\n').lines() {
                    self.write_styled(&format!("    {line}"), &style);
                    self.newline();
                }
            }
            TagEnd::List(_) => {
                self.lists.pop();
                self.ensure_newline();
            }
            TagEnd::Item => self.ensure_newline(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.inline.pop();
            }
            TagEnd::Link => {
                self.inline.pop();
                if let Some(url) = self.links.pop() {
                    let style = self.color.apply(Style::new().dim());
                    self.write_styled(&format!(" <{url}>"), &style);
                }
            }
            TagEnd::Image => {
                if let Some(url) = self.links.pop() {
                    self.write_inline(&format!(" <{url}>]"));
                }
            }
            TagEnd::TableHead | TagEnd::TableRow => self.ensure_newline(),
            _ => {}
        }
    }

    fn current_style(&self) -> Style {
        let mut style = Style::new();
        for kind in &self.inline {
            style = match kind {
                Inline::Emphasis => style.italic(),
                Inline::Strong => style.bold(),
                Inline::Strike => style.dim(),
                Inline::Link => style.underlined().blue(),
                Inline::Heading(HeadingLevel::H1 | HeadingLevel::H2) => style.bold().underlined(),
                Inline::Heading(_) => style.bold(),
            };
        }
        self.color.apply(style)
    }

    fn write_inline(&mut self, text: &str) {
        let style = self.current_style();
        self.write_styled(text, &style);
    }

    fn write_styled(&mut self, text: &str, style: &Style) {
        if text.is_empty() {
            return;
        }
        if self.at_line_start {
            self.line_prefix();
        }
        self.out.push_str(&style.apply_to(text).to_string());
        self.at_line_start = false;
    }

    fn line_prefix(&mut self) {
        if self.quote_depth > 0 {
            let style = self.color.apply(Style::new().dim());
            let bar = "│ ".repeat(self.quote_depth);
            self.out.push_str(&style.apply_to(bar).to_string());
        }
        self.at_line_start = false;
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
    }

    fn ensure_newline(&mut self) {
        if !self.out.is_empty() && !self.at_line_start {
            self.newline();
        }
    }

    /// Blank line between top-level blocks; a plain line break inside lists.
    fn block_break(&mut self) {
        self.ensure_newline();
        if self.out.is_empty() || !self.lists.is_empty() || self.out.ends_with("\n\n") {
            return;
        }
        self.newline();
    }

    fn finish(self) -> String {
        self.out.trim_end().to_string()
    }
}
