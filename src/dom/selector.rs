//! Selector matching for the host-page markers.
//!
//! A selector list is first validated as CSS by `scraper`, then compiled to
//! the subset the scan surface needs so it can run against our own tree:
//! compound selectors built from a tag name, `#id`, `.class` and attribute
//! tests (`[a]`, `[a=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`, `[a~=v]`), joined by
//! the descendant (` `) and child (`>`) combinators. Sibling combinators and
//! pseudo-classes are rejected.

use std::fmt;

use thiserror::Error;

use super::DomNode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unsupported combinator in `{0}`")]
    Combinator(String),
    #[error("unterminated attribute test in `{0}`")]
    Unterminated(String),
    #[error("invalid token `{token}` in `{selector}`")]
    Invalid { selector: String, token: String },
    #[error("`{selector}` is not valid CSS: {message}")]
    Syntax { selector: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals,
    Prefix,
    Suffix,
    Substring,
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    op: AttrOp,
    value: String,
}

impl AttrTest {
    fn matches(&self, node: &DomNode) -> bool {
        let Some(actual) = node.attr(&self.name) else {
            return false;
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == self.value,
            AttrOp::Prefix => !self.value.is_empty() && actual.starts_with(&self.value),
            AttrOp::Suffix => !self.value.is_empty() && actual.ends_with(&self.value),
            AttrOp::Substring => !self.value.is_empty() && actual.contains(&self.value),
            AttrOp::Word => actual.split_whitespace().any(|w| w == self.value),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    fn matches(&self, node: &DomNode) -> bool {
        if !node.is_element() {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !node.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| node.classes().any(|have| have == c)) {
            return false;
        }
        self.attrs.iter().all(|a| a.matches(node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// Compounds left to right; `combinators[i]` joins `compounds[i]` to
/// `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

impl Complex {
    /// `ancestors` runs from the outermost known ancestor down to the
    /// node's parent.
    fn matches(&self, node: &DomNode, ancestors: &[&DomNode]) -> bool {
        self.matches_from(self.compounds.len() - 1, node, ancestors)
    }

    fn matches_from(&self, idx: usize, node: &DomNode, ancestors: &[&DomNode]) -> bool {
        if !self.compounds[idx].matches(node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match self.combinators[idx - 1] {
            Combinator::Child => match ancestors.split_last() {
                Some((parent, rest)) => self.matches_from(idx - 1, parent, rest),
                None => false,
            },
            Combinator::Descendant => (0..ancestors.len())
                .rev()
                .any(|k| self.matches_from(idx - 1, ancestors[k], &ancestors[..k])),
        }
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let source = source.trim();
        let mut alternatives = Vec::new();
        for part in split_list(source)? {
            let part = part.trim();
            if part.is_empty() {
                return Err(SelectorError::Empty);
            }
            alternatives.push(parse_complex(part)?);
        }
        if let Err(e) = scraper::Selector::parse(source) {
            return Err(SelectorError::Syntax {
                selector: source.to_string(),
                message: e.to_string(),
            });
        }
        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    /// Match `node` with no ancestor context. Selectors with combinators
    /// need `matches_in`.
    pub fn matches(&self, node: &DomNode) -> bool {
        self.matches_in(node, &[])
    }

    /// Match `node` given its ancestors, outermost first.
    pub fn matches_in(&self, node: &DomNode, ancestors: &[&DomNode]) -> bool {
        self.alternatives.iter().any(|c| c.matches(node, ancestors))
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

/// Tracks whether a scan position is inside `[...]` or a quoted value.
#[derive(Default)]
struct Nesting {
    in_brackets: bool,
    quote: Option<char>,
}

impl Nesting {
    /// Feed one character; returns true when it sits at the top level.
    fn step(&mut self, c: char) -> bool {
        if !self.in_brackets {
            if c == '[' {
                self.in_brackets = true;
                return false;
            }
            return true;
        }
        match self.quote {
            Some(q) if c == q => self.quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => self.quote = Some(c),
            None if c == ']' => self.in_brackets = false,
            None => {}
        }
        false
    }

    fn is_open(&self) -> bool {
        self.in_brackets
    }
}

/// Split a selector list on its top-level commas.
fn split_list(source: &str) -> Result<Vec<&str>, SelectorError> {
    let mut parts = Vec::new();
    let mut nesting = Nesting::default();
    let mut start = 0;
    for (i, c) in source.char_indices() {
        if nesting.step(c) && c == ',' {
            parts.push(&source[start..i]);
            start = i + 1;
        }
    }
    if nesting.is_open() {
        return Err(SelectorError::Unterminated(source.to_string()));
    }
    parts.push(&source[start..]);
    Ok(parts)
}

fn parse_complex(src: &str) -> Result<Complex, SelectorError> {
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut pending: Option<Combinator> = None;
    let mut nesting = Nesting::default();
    let mut start: Option<usize> = None;

    let dangling = || SelectorError::Invalid {
        selector: src.to_string(),
        token: ">".to_string(),
    };

    for (i, c) in src.char_indices() {
        let top = nesting.step(c);
        if top && (c.is_whitespace() || c == '>') {
            if let Some(from) = start.take() {
                compounds.push(parse_compound(&src[from..i])?);
                pending = Some(Combinator::Descendant);
            }
            if c == '>' {
                if compounds.is_empty() || pending == Some(Combinator::Child) {
                    return Err(dangling());
                }
                pending = Some(Combinator::Child);
            }
            continue;
        }
        if top && (c == '+' || c == '~') {
            return Err(SelectorError::Combinator(src.to_string()));
        }
        if start.is_none() {
            if let Some(combinator) = pending.take() {
                combinators.push(combinator);
            }
            start = Some(i);
        }
    }
    if nesting.is_open() {
        return Err(SelectorError::Unterminated(src.to_string()));
    }
    match start {
        Some(from) => compounds.push(parse_compound(&src[from..])?),
        None if pending == Some(Combinator::Child) => return Err(dangling()),
        None => {}
    }
    if compounds.is_empty() {
        return Err(SelectorError::Empty);
    }

    Ok(Complex {
        compounds,
        combinators,
    })
}

fn parse_compound(src: &str) -> Result<Compound, SelectorError> {
    let chars: Vec<char> = src.chars().collect();
    let mut out = Compound::default();
    let mut i = 0;

    let ident = |start: usize| -> (String, usize) {
        let mut end = start;
        while end < chars.len() && is_ident_char(chars[end]) {
            end += 1;
        }
        (chars[start..end].iter().collect(), end)
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' if i == 0 => i += 1,
            '#' | '.' => {
                let (name, end) = ident(i + 1);
                if name.is_empty() {
                    return Err(SelectorError::Invalid {
                        selector: src.to_string(),
                        token: c.to_string(),
                    });
                }
                if c == '#' {
                    out.id = Some(name);
                } else {
                    out.classes.push(name);
                }
                i = end;
            }
            '[' => {
                let mut nesting = Nesting::default();
                let close = chars[i..]
                    .iter()
                    .position(|&ch| {
                        nesting.step(ch);
                        !nesting.is_open()
                    })
                    .map(|p| i + p)
                    .ok_or_else(|| SelectorError::Unterminated(src.to_string()))?;
                let body: String = chars[i + 1..close].iter().collect();
                out.attrs.push(parse_attr(&body, src)?);
                i = close + 1;
            }
            c if i == 0 && is_ident_char(c) => {
                let (name, end) = ident(i);
                out.tag = Some(name.to_ascii_lowercase());
                i = end;
            }
            other => {
                return Err(SelectorError::Invalid {
                    selector: src.to_string(),
                    token: other.to_string(),
                });
            }
        }
    }

    Ok(out)
}

fn parse_attr(body: &str, src: &str) -> Result<AttrTest, SelectorError> {
    let invalid = || SelectorError::Invalid {
        selector: src.to_string(),
        token: format!("[{body}]"),
    };

    let Some(eq) = body.find('=') else {
        let name = body.trim();
        if name.is_empty() || !name.chars().all(is_ident_char) {
            return Err(invalid());
        }
        return Ok(AttrTest {
            name: name.to_string(),
            op: AttrOp::Exists,
            value: String::new(),
        });
    };

    let (lhs, rhs) = (&body[..eq], &body[eq + 1..]);
    let (name, op) = match lhs.chars().last() {
        Some('^') => (&lhs[..lhs.len() - 1], AttrOp::Prefix),
        Some('$') => (&lhs[..lhs.len() - 1], AttrOp::Suffix),
        Some('*') => (&lhs[..lhs.len() - 1], AttrOp::Substring),
        Some('~') => (&lhs[..lhs.len() - 1], AttrOp::Word),
        _ => (lhs, AttrOp::Equals),
    };
    let name = name.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return Err(invalid());
    }

    let raw = rhs.trim();
    let value = match raw.chars().next() {
        Some(q @ ('"' | '\'')) => {
            if raw.len() < 2 || !raw.ends_with(q) {
                return Err(invalid());
            }
            raw[1..raw.len() - 1].to_string()
        }
        _ => raw.to_string(),
    };

    Ok(AttrTest {
        name: name.to_string(),
        op,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn el(tag: &str, attrs: &[(&str, &str)]) -> DomNode {
        let map: HashMap<String, String> = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DomNode::element(tag, map, Vec::new())
    }

    #[test]
    fn matches_turn_marker() {
        let sel = Selector::parse(r#"article[data-testid^="conversation-turn-"]"#).unwrap();
        assert!(sel.matches(&el("article", &[("data-testid", "conversation-turn-3")])));
        assert!(!sel.matches(&el("div", &[("data-testid", "conversation-turn-3")])));
        assert!(!sel.matches(&el("article", &[("data-testid", "composer")])));
        assert!(!sel.matches(&el("article", &[])));
    }

    #[test]
    fn matches_class_and_attribute_presence() {
        let content = Selector::parse(".whitespace-pre-wrap").unwrap();
        assert!(content.matches(&el("div", &[("class", "text-sm whitespace-pre-wrap")])));
        assert!(!content.matches(&el("div", &[("class", "whitespace")])));

        let root = Selector::parse("[data-scroll-root]").unwrap();
        assert!(root.matches(&el("div", &[("data-scroll-root", "")])));
    }

    #[test]
    fn selector_lists_match_any_alternative() {
        let sel = Selector::parse("main, #thread").unwrap();
        assert!(sel.matches(&el("main", &[])));
        assert!(sel.matches(&el("div", &[("id", "thread")])));
        assert!(!sel.matches(&el("div", &[])));
    }

    #[test]
    fn text_nodes_never_match() {
        let sel = Selector::parse("*").unwrap();
        assert!(!sel.matches(&DomNode::text("x")));
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert_eq!(Selector::parse(""), Err(SelectorError::Empty));
        assert!(matches!(
            Selector::parse("h2 + p"),
            Err(SelectorError::Combinator(_))
        ));
        assert!(matches!(
            Selector::parse("main ~ article"),
            Err(SelectorError::Combinator(_))
        ));
        assert!(matches!(
            Selector::parse("main >"),
            Err(SelectorError::Invalid { .. })
        ));
        assert!(matches!(
            Selector::parse("> article"),
            Err(SelectorError::Invalid { .. })
        ));
        assert!(matches!(
            Selector::parse("main, "),
            Err(SelectorError::Empty)
        ));
        assert!(matches!(
            Selector::parse("[data-x"),
            Err(SelectorError::Unterminated(_))
        ));
        assert!(matches!(
            Selector::parse("div:hover"),
            Err(SelectorError::Invalid { .. })
        ));
    }

    #[test]
    fn css_syntax_is_checked() {
        assert!(matches!(
            Selector::parse("#1st"),
            Err(SelectorError::Syntax { .. })
        ));
    }

    #[test]
    fn commas_inside_quoted_values_do_not_split() {
        let sel = Selector::parse(r#"[aria-label="Copy, share"], #thread"#).unwrap();
        assert!(sel.matches(&el("button", &[("aria-label", "Copy, share")])));
        assert!(!sel.matches(&el("button", &[("aria-label", "Copy")])));
        assert!(sel.matches(&el("div", &[("id", "thread")])));

        let bracket = Selector::parse(r#"[title='a]b']"#).unwrap();
        assert!(bracket.matches(&el("span", &[("title", "a]b")])));
    }

    #[test]
    fn descendant_combinator_looks_through_every_ancestor() {
        let sel = Selector::parse(r#"div.agent-turn [data-message-author-role="user"]"#).unwrap();
        let turn = el("div", &[("class", "agent-turn group")]);
        let wrapper = el("section", &[]);
        let message = el("div", &[("data-message-author-role", "user")]);

        assert!(sel.matches_in(&message, &[&turn, &wrapper]));
        assert!(sel.matches_in(&message, &[&turn]));
        assert!(!sel.matches_in(&message, &[&wrapper]));
        assert!(!sel.matches(&message));
    }

    #[test]
    fn child_combinator_needs_the_direct_parent() {
        let sel = Selector::parse("main > article").unwrap();
        let main = el("main", &[]);
        let wrapper = el("div", &[]);
        let article = el("article", &[]);

        assert!(sel.matches_in(&article, &[&main]));
        assert!(!sel.matches_in(&article, &[&main, &wrapper]));

        let mixed = Selector::parse("body main>div article").unwrap();
        let body = el("body", &[]);
        assert!(mixed.matches_in(&article, &[&body, &main, &wrapper]));
        assert!(!mixed.matches_in(&article, &[&main, &wrapper]));
    }
}
