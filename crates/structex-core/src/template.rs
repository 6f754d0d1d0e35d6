//! `{field}` substitution for detail templates.
//!
//! Supports named placeholders, `{{`/`}}` escapes, an optional `!s`
//! conversion and a format spec after `:` of the form
//! `[[fill]align][sign][0][width][,|_][.precision][type]`, where `align` is
//! one of `<>^=`, `sign` one of `+- ` and `type` one of `s`, `d`, `f`, `F`
//! or `%`. Positional placeholders, attribute access, nested specs and
//! other types are rejected with a [`TemplateError`].
//!
//! ```
//! use serde_json::json;
//! use structex_core::template::render;
//!
//! let avail = json!(1234567);
//! let text = render("{avail:>12,} bytes", |_| Some(&avail)).unwrap();
//! assert_eq!(text, "   1,234,567 bytes");
//! ```

use serde_json::{Number, Value};
use thiserror::Error;

/// Why a template could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template names a field the content does not have.
    #[error("missing field '{0}'")]
    MissingField(String),

    /// A `{` was never closed.
    #[error("unmatched '{{' at offset {0}")]
    Unclosed(usize),

    /// A lone `}` outside a placeholder.
    #[error("single '}}' encountered at offset {0}")]
    StrayBrace(usize),

    /// `{}` with no name.
    #[error("positional placeholder at offset {0}")]
    Positional(usize),

    /// A conversion or format spec this renderer does not support.
    #[error("unsupported format spec '{0}'")]
    UnsupportedSpec(String),

    /// The format spec does not apply to the field's value.
    #[error("format spec '{spec}' cannot format {value}")]
    SpecMismatch {
        /// The format spec.
        spec: String,
        /// The rejected value, as JSON.
        value: String,
    },
}

/// Renders a value the way it appears in detail text and `instance` URLs:
/// strings verbatim, everything else as compact JSON.
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitutes `{name}` placeholders using `lookup`.
pub fn render<'a, F>(template: &str, lookup: F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<&'a Value>,
{
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, next)| next == '{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut placeholder = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    placeholder.push(inner);
                }
                if !closed {
                    return Err(TemplateError::Unclosed(offset));
                }
                out.push_str(&substitute(&placeholder, offset, &lookup)?);
            }
            '}' if chars.peek().is_some_and(|&(_, next)| next == '}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(TemplateError::StrayBrace(offset)),
            other => out.push(other),
        }
    }

    Ok(out)
}

fn substitute<'a, F>(placeholder: &str, offset: usize, lookup: &F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<&'a Value>,
{
    let (field, spec) = match placeholder.split_once(':') {
        Some((field, spec)) => (field, Some(spec)),
        None => (placeholder, None),
    };
    let (name, conversion) = match field.split_once('!') {
        Some((name, conversion)) => (name, Some(conversion)),
        None => (field, None),
    };
    if conversion.is_some_and(|c| c != "s") || name.contains(['.', '[']) {
        return Err(TemplateError::UnsupportedSpec(placeholder.to_string()));
    }

    let name = name.trim();
    if name.is_empty() {
        return Err(TemplateError::Positional(offset));
    }
    let value = lookup(name).ok_or_else(|| TemplateError::MissingField(name.to_string()))?;

    match spec.filter(|spec| !spec.is_empty()) {
        None => Ok(display_value(value)),
        Some(spec) => {
            let parsed = FormatSpec::parse(spec)
                .ok_or_else(|| TemplateError::UnsupportedSpec(spec.to_string()))?;
            parsed
                .apply(value, conversion.is_some())
                .ok_or_else(|| TemplateError::SpecMismatch {
                    spec: spec.to_string(),
                    value: value.to_string(),
                })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
    AfterSign,
}

impl Align {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Self::Left),
            '>' => Some(Self::Right),
            '^' => Some(Self::Center),
            '=' => Some(Self::AfterSign),
            _ => None,
        }
    }
}

/// A parsed `[[fill]align][sign][0][width][,|_][.precision][type]` spec.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FormatSpec {
    fill: char,
    align: Option<Align>,
    sign: char,
    zero: bool,
    width: usize,
    grouping: Option<char>,
    precision: Option<usize>,
    kind: Option<char>,
}

impl FormatSpec {
    fn parse(spec: &str) -> Option<Self> {
        let chars: Vec<char> = spec.chars().collect();
        let mut i = 0;
        let mut parsed = Self {
            fill: ' ',
            align: None,
            sign: '-',
            zero: false,
            width: 0,
            grouping: None,
            precision: None,
            kind: None,
        };

        if let Some(align) = chars.get(1).copied().and_then(Align::from_char) {
            parsed.fill = chars[0];
            parsed.align = Some(align);
            i = 2;
        } else if let Some(align) = chars.first().copied().and_then(Align::from_char) {
            parsed.align = Some(align);
            i = 1;
        }
        if let Some(&sign @ ('+' | '-' | ' ')) = chars.get(i) {
            parsed.sign = sign;
            i += 1;
        }
        if chars.get(i) == Some(&'0') {
            parsed.zero = true;
            i += 1;
        }
        let (width, next) = digits(&chars, i);
        parsed.width = width.unwrap_or(0);
        i = next;
        if let Some(&sep @ (',' | '_')) = chars.get(i) {
            parsed.grouping = Some(sep);
            i += 1;
        }
        if chars.get(i) == Some(&'.') {
            let (precision, next) = digits(&chars, i + 1);
            parsed.precision = Some(precision?);
            i = next;
        }
        if let Some(&kind @ ('s' | 'd' | 'f' | 'F' | '%')) = chars.get(i) {
            parsed.kind = Some(kind);
            i += 1;
        }

        (i == chars.len()).then_some(parsed)
    }

    fn apply(&self, value: &Value, stringify: bool) -> Option<String> {
        match value {
            Value::Number(n) if !stringify => self.apply_number(n),
            other => self.apply_text(display_value(other)),
        }
    }

    fn apply_text(&self, text: String) -> Option<String> {
        if self.sign != '-'
            || self.grouping.is_some()
            || !matches!(self.kind, None | Some('s'))
            || self.align == Some(Align::AfterSign)
        {
            return None;
        }
        let text = match self.precision {
            Some(precision) => text.chars().take(precision).collect(),
            None => text,
        };
        let (fill, align) = self.fill_and_align(Align::Left);
        Some(pad("", &text, fill, align, self.width))
    }

    fn apply_number(&self, n: &Number) -> Option<String> {
        let integer = n.as_i64().map(i128::from).or_else(|| n.as_u64().map(i128::from));
        let (negative, digits) = match (self.kind, self.precision, integer) {
            (None | Some('d'), None, Some(i)) => (i < 0, i.unsigned_abs().to_string()),
            (None, None, None) => {
                let f = n.as_f64()?;
                (f < 0.0, n.to_string().trim_start_matches('-').to_string())
            }
            (Some('f' | 'F'), precision, _) => {
                let f = n.as_f64()?;
                (f < 0.0, format!("{:.*}", precision.unwrap_or(6), f.abs()))
            }
            (Some('%'), precision, _) => {
                let f = n.as_f64()? * 100.0;
                (f < 0.0, format!("{:.*}%", precision.unwrap_or(6), f.abs()))
            }
            _ => return None,
        };

        let digits = match self.grouping {
            Some(sep) => group(&digits, sep),
            None => digits,
        };
        let sign = match (negative, self.sign) {
            (true, _) => "-",
            (false, '+') => "+",
            (false, ' ') => " ",
            _ => "",
        };
        let (fill, align) = self.fill_and_align(Align::Right);
        Some(pad(sign, &digits, fill, align, self.width))
    }

    fn fill_and_align(&self, default: Align) -> (char, Align) {
        match (self.align, self.zero) {
            (Some(align), _) => (self.fill, align),
            (None, true) if default == Align::Right => ('0', Align::AfterSign),
            (None, true) => ('0', default),
            (None, false) => (' ', default),
        }
    }
}

fn digits(chars: &[char], start: usize) -> (Option<usize>, usize) {
    let end = chars[start..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map_or(chars.len(), |n| start + n);
    let number: String = chars[start..end].iter().collect();
    (number.parse().ok(), end)
}

fn group(digits: &str, sep: char) -> String {
    let (whole, rest) = digits
        .find(|c: char| !c.is_ascii_digit())
        .map_or((digits, ""), |at| digits.split_at(at));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3 + rest.len());
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(sep);
        }
        grouped.push(c);
    }
    grouped.push_str(rest);
    grouped
}

fn pad(sign: &str, body: &str, fill: char, align: Align, width: usize) -> String {
    let len = sign.chars().count() + body.chars().count();
    let padding = width.saturating_sub(len);
    let fill_str = |n: usize| fill.to_string().repeat(n);
    match align {
        Align::Left => format!("{sign}{body}{}", fill_str(padding)),
        Align::Right => format!("{}{sign}{body}", fill_str(padding)),
        Align::Center => {
            let left = padding / 2;
            format!("{}{sign}{body}{}", fill_str(left), fill_str(padding - left))
        }
        Align::AfterSign => format!("{sign}{}{body}", fill_str(padding)),
    }
}
