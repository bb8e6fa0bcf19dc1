use std::fmt;

/// Inline Markdown elements collected from a paragraph or list item.
/// Displaying a node writes it back as Markdown.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineNode {
    Text(String),
    Strong(Vec<InlineNode>),
    Emphasis(Vec<InlineNode>),
    Strikethrough(Vec<InlineNode>),
    CodeSpan(String),
    Link {
        dest: String,
        title: String,
        content: Vec<InlineNode>,
    },
    Image {
        dest: String,
        title: String,
        alt: Vec<InlineNode>,
    },
    Html(String),
    SoftBreak,
    HardBreak,
}

impl InlineNode {
    /// Whitespace-only text and line breaks.
    pub fn is_blank(&self) -> bool {
        match self {
            InlineNode::Text(s) => s.trim().is_empty(),
            InlineNode::SoftBreak | InlineNode::HardBreak => true,
            _ => false,
        }
    }
}

/// Backslash-escape characters that would otherwise read as inline markup,
/// treating both ends of `s` as paragraph edges.
pub fn escape_text(s: &str) -> String {
    escape_between(s, None, None)
}

/// `before` and `after` are the characters next to `s` once written out;
/// `None` is a paragraph edge.
///
/// Delimiter runs (`*`, `_`, `~`) with whitespace on both sides cannot open
/// or close anything and stay as they are, as do `_` runs inside a word.
fn escape_between(s: &str, before: Option<char>, after: Option<char>) -> String {
    let chars: Vec<char> = s.chars().collect();
    let prev = |i: usize| if i == 0 { before } else { Some(chars[i - 1]) };
    let next = |i: usize| chars.get(i).copied().or(after);
    let spaced = |c: Option<char>| c.is_none_or(char::is_whitespace);
    let in_word = |c: Option<char>| c.is_some_and(char::is_alphanumeric);

    let mut escaped = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if matches!(c, '*' | '_' | '~') {
            let end = chars[i..].iter().position(|&d| d != c).map_or(chars.len(), |n| i + n);
            let (left, right) = (prev(i), next(end));
            let literal = (spaced(left) && spaced(right)) || (c == '_' && in_word(left) && in_word(right));
            for _ in i..end {
                if !literal {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            i = end;
            continue;
        }

        let follower = next(i + 1);
        let needs_escape = match c {
            '`' => true,
            '\\' => follower.is_some_and(|n| n.is_ascii_punctuation() || n == '\n'),
            '<' => follower.is_some_and(|n| n.is_ascii_alphabetic() || matches!(n, '/' | '!' | '?')),
            ']' => follower == Some('('),
            '&' => follower.is_some_and(|n| n.is_ascii_alphanumeric() || n == '#'),
            _ => false,
        };
        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(c);
        i += 1;
    }
    escaped
}

/// First character a node writes, as seen by the text before it.
fn leading_char(node: &InlineNode) -> Option<char> {
    match node {
        InlineNode::SoftBreak | InlineNode::HardBreak => Some('\n'),
        InlineNode::Text(s) => s.chars().next(),
        other => other.to_string().chars().next(),
    }
}

/// Write `nodes` between the delimiters `open` and `close`.
fn write_run(
    f: &mut fmt::Formatter<'_>,
    nodes: &[InlineNode],
    open: Option<char>,
    close: Option<char>,
) -> fmt::Result {
    let mut before = open;
    for (i, node) in nodes.iter().enumerate() {
        let written = match node {
            InlineNode::Text(s) => {
                let after = nodes.get(i + 1).map_or(close, leading_char);
                escape_between(s, before, after)
            }
            other => other.to_string(),
        };
        if let Some(last) = written.chars().last() {
            before = Some(last);
        }
        f.write_str(&written)?;
    }
    Ok(())
}

struct Run<'a>(&'a [InlineNode]);

impl fmt::Display for Run<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_run(f, self.0, None, None)
    }
}

/// Write a run of inline nodes back to Markdown.
pub fn to_markdown(nodes: &[InlineNode]) -> String {
    Run(nodes).to_string()
}

fn write_children(f: &mut fmt::Formatter<'_>, children: &[InlineNode], open: char, close: char) -> fmt::Result {
    write_run(f, children, Some(open), Some(close))
}

fn write_dest(f: &mut fmt::Formatter<'_>, dest: &str, title: &str) -> fmt::Result {
    if dest.chars().any(|c| c.is_whitespace() || c == '(' || c == ')') {
        write!(f, "(<{}>", dest)?;
    } else {
        write!(f, "({}", dest)?;
    }
    if !title.is_empty() {
        write!(f, " \"{}\"", title.replace('"', "\\\""))?;
    }
    write!(f, ")")
}

impl fmt::Display for InlineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InlineNode::Text(s) => write!(f, "{}", escape_text(s)),
            InlineNode::Strong(children) => {
                write!(f, "**")?;
                write_children(f, children, '*', '*')?;
                write!(f, "**")
            }
            InlineNode::Emphasis(children) => {
                write!(f, "*")?;
                write_children(f, children, '*', '*')?;
                write!(f, "*")
            }
            InlineNode::Strikethrough(children) => {
                write!(f, "~~")?;
                write_children(f, children, '~', '~')?;
                write!(f, "~~")
            }
            InlineNode::CodeSpan(code) => {
                if code.contains('`') {
                    write!(f, "`` {} ``", code)
                } else {
                    write!(f, "`{}`", code)
                }
            }
            InlineNode::Link { dest, title, content } => {
                write!(f, "[")?;
                write_children(f, content, '[', ']')?;
                write!(f, "]")?;
                write_dest(f, dest, title)
            }
            InlineNode::Image { dest, title, alt } => {
                write!(f, "![")?;
                write_children(f, alt, '[', ']')?;
                write!(f, "]")?;
                write_dest(f, dest, title)
            }
            InlineNode::Html(html) => write!(f, "{}", html),
            InlineNode::SoftBreak => writeln!(f),
            InlineNode::HardBreak => writeln!(f, "\\"),
        }
    }
}
