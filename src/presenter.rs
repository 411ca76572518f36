/// Result tree: one resolved response plus the expand/collapse state of its
/// context rows.
///
/// Both halves live in one value so replacing the response always discards
/// the expansion flags, whose indices only mean something for one specific
/// `contexts` sequence.
use std::collections::HashMap;

use thiserror::Error;

use crate::api::QueryResponse;

pub const ANALYSIS_TITLE: &str = "Analysis";
pub const ANSWER_TITLE: &str = "Answer";
pub const CONTEXT_TITLE: &str = "Context";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresenterError {
    #[error("context {index} out of range (response has {len} contexts)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Per-context visibility flags. A missing entry means collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    flags: HashMap<usize, bool>,
}

impl ExpansionState {
    #[must_use]
    pub fn is_expanded(&self, index: usize) -> bool {
        self.flags.get(&index).copied().unwrap_or(false)
    }

    /// Flip the flag at `index` and return the new value.
    pub fn toggle(&mut self, index: usize) -> bool {
        let flag = self.flags.entry(index).or_insert(false);
        *flag = !*flag;
        *flag
    }

    pub fn set(&mut self, index: usize, expanded: bool) {
        self.flags.insert(index, expanded);
    }

    /// Indices currently expanded, ascending.
    #[must_use]
    pub fn expanded_indices(&self) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .flags
            .iter()
            .filter_map(|(i, on)| on.then_some(*i))
            .collect();
        out.sort_unstable();
        out
    }
}

/// Header direction marker for a context row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    Collapsed,
    Expanded,
}

impl Indicator {
    #[must_use]
    pub fn glyph(self) -> char {
        match self {
            Indicator::Collapsed => '▸',
            Indicator::Expanded => '▾',
        }
    }
}

/// One node of the render tree, borrowing from the displayed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderNode<'a> {
    /// A titled markdown block (rationale or answer).
    Section { title: &'static str, markdown: &'a str },
    /// Heading that introduces the context rows.
    ContextHeader { title: &'static str, count: usize },
    ContextRow {
        index: usize,
        file_path: &'a str,
        indicator: Indicator,
        /// Present only while the row is expanded.
        body: Option<&'a str>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTree {
    response: QueryResponse,
    expansion: ExpansionState,
}

impl ResultTree {
    /// Wrap a freshly received response; every row starts collapsed.
    #[must_use]
    pub fn new(response: QueryResponse) -> Self {
        Self {
            response,
            expansion: ExpansionState::default(),
        }
    }

    #[must_use]
    pub fn response(&self) -> &QueryResponse {
        &self.response
    }

    #[must_use]
    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.response.contexts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.response.contexts.is_empty()
    }

    #[must_use]
    pub fn is_expanded(&self, index: usize) -> bool {
        self.expansion.is_expanded(index)
    }

    /// Flip the row at `index`. Out-of-range indices leave state untouched.
    pub fn toggle(&mut self, index: usize) -> Result<bool, PresenterError> {
        self.check(index)?;
        Ok(self.expansion.toggle(index))
    }

    pub fn expand_all(&mut self) {
        for i in 0..self.len() {
            self.expansion.set(i, true);
        }
    }

    pub fn collapse_all(&mut self) {
        self.expansion = ExpansionState::default();
    }

    fn check(&self, index: usize) -> Result<(), PresenterError> {
        if index < self.len() {
            Ok(())
        } else {
            Err(PresenterError::IndexOutOfRange {
                index,
                len: self.len(),
            })
        }
    }

    /// Build the render tree: analysis, answer, then one row per context in
    /// response order.
    #[must_use]
    pub fn render(&self) -> Vec<RenderNode<'_>> {
        let mut nodes = Vec::with_capacity(self.len() + 3);
        nodes.push(RenderNode::Section {
            title: ANALYSIS_TITLE,
            markdown: &self.response.rationale,
        });
        nodes.push(RenderNode::Section {
            title: ANSWER_TITLE,
            markdown: &self.response.answer,
        });
        nodes.push(RenderNode::ContextHeader {
            title: CONTEXT_TITLE,
            count: self.len(),
        });

        for (index, doc) in self.response.contexts.iter().enumerate() {
            let expanded = self.is_expanded(index);
            nodes.push(RenderNode::ContextRow {
                index,
                file_path: &doc.meta_data.file_path,
                indicator: if expanded {
                    Indicator::Expanded
                } else {
                    Indicator::Collapsed
                },
                body: expanded.then_some(doc.text.as_str()),
            });
        }
        nodes
    }
}
