//! Rendering of raise contracts into doc text.

use serde::Serialize;
use structex_core::{ExceptionClass, Raises};

use crate::config::DocsConfig;

/// What the rendered section says about one allowed class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionInfo {
    /// Short name.
    pub name: String,
    /// Dotted qualified name.
    pub qualname: String,
    /// Documentation title, if the class has one.
    pub title: Option<String>,
    /// `false` if registered subtypes exist.
    pub is_leaf: bool,
}

impl From<&ExceptionClass> for ExceptionInfo {
    fn from(class: &ExceptionClass) -> Self {
        Self {
            name: class.name().to_string(),
            qualname: class.qualname(),
            title: class.title().map(str::to_string),
            is_leaf: class.is_leaf(),
        }
    }
}

/// Describes each allowed class of `raises`, in declaration order.
pub fn exception_info(raises: &Raises) -> Vec<ExceptionInfo> {
    raises.allowed().iter().map(ExceptionInfo::from).collect()
}

/// Renders the "Raises" section for a contract.
///
/// ```
/// use structex_core::Raises;
/// use structex_docs::{render_raises, DocsConfig};
///
/// let text = render_raises(&Raises::new([structex_core::Allow::native::<std::fmt::Error>()]),
///     &DocsConfig::default());
/// assert_eq!(text, "# Raises\n\n- `core.fmt.Error`\n  (not documented)\n");
/// ```
pub fn render_raises(raises: &Raises, config: &DocsConfig) -> String {
    let indent = " ".repeat(config.title_indent);
    let mut out = format!("{}\n\n", config.heading);

    for info in exception_info(raises) {
        out.push_str("- `");
        out.push_str(&info.qualname);
        out.push('`');
        if !info.is_leaf {
            out.push(' ');
            out.push_str(&config.subclass_note);
        }
        out.push('\n');
        out.push_str(&indent);
        out.push_str(info.title.as_deref().unwrap_or(&config.undocumented));
        out.push('\n');
    }

    out
}

/// Removes the indentation of the first non-blank line from every line.
///
/// Leading blank lines are kept, emptied. Later lines lose at most that
/// much leading whitespace, so less-indented text is never cut.
pub fn undent(text: &str) -> String {
    let mut width = None;
    let mut result = Vec::new();

    for line in text.lines() {
        let width = if let Some(width) = width {
            width
        } else {
            let trimmed = line.trim_start();
            if trimmed.is_empty() {
                result.push(String::new());
                continue;
            }
            let found = line.len() - trimmed.len();
            width = Some(found);
            found
        };
        let cut = line
            .char_indices()
            .take_while(|&(i, c)| i < width && c.is_whitespace())
            .map(|(i, c)| i + c.len_utf8())
            .last()
            .unwrap_or(0);
        result.push(line[cut..].to_string());
    }

    result.join("\n")
}

fn last_line_indent(doc: &str) -> &str {
    let last = doc.rsplit('\n').next().unwrap_or("");
    let trimmed = last.trim_start();
    &last[..last.len() - trimmed.len()]
}

/// Appends `rendered` to a doc string, indented like the doc's last line.
///
/// A doc whose last line is only whitespace (the usual shape of an
/// indented block) contributes that whitespace as the indent.
pub fn extend_doc(doc: &str, rendered: &str) -> String {
    let indent = last_line_indent(doc);
    let mut out = doc.trim_end().to_string();
    if !out.is_empty() {
        out.push_str("\n\n");
    }

    for line in rendered.lines() {
        if !line.is_empty() {
            out.push_str(indent);
            out.push_str(line);
        }
        out.push('\n');
    }

    out
}
