//! Host pattern compilation and reversal templates.
//!
//! # Responsibilities
//! - Compile a hostname regex so it only matches whole labels: the pattern
//!   must be followed by a literal dot or the end of the string
//! - Extract captured parameters for a hostname
//! - Expand the pattern into literal templates with named holes, one per
//!   alternative, in the order the regex engine would prefer them
//!
//! # Design Decisions
//! - The anchor suffix is non-capturing so positional groups stay the
//!   user's own groups
//! - Templates are computed once at compile time; reversal never re-parses
//! - Unsupported syntax fails at compile time instead of silently producing
//!   a template that can never verify

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;

use crate::error::ConfigError;
use crate::routing::host::HostParams;

/// Upper bound on the number of templates a single pattern may expand to.
const MAX_TEMPLATES: usize = 1024;

/// A compiled hostname pattern.
#[derive(Debug, Clone)]
pub struct HostPattern {
    source: String,
    anchored: Regex,
    verifier: Regex,
    templates: Vec<Template>,
    named: bool,
}

impl HostPattern {
    /// Compile `pattern`, appending the `(\.|$)` label anchor.
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        compile_regex(pattern, pattern)?;
        let anchored = compile_regex(pattern, &format!(r"^(?:{pattern})(?:\.|$)"))?;
        let verifier = compile_regex(pattern, &format!("^(?:{pattern})"))?;
        let templates = normalize(pattern)?;
        let named = anchored.capture_names().flatten().next().is_some();

        Ok(Self {
            source: pattern.to_owned(),
            anchored,
            verifier,
            templates,
            named,
        })
    }

    /// The pattern as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Reversal templates, in preference order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn is_match(&self, hostname: &str) -> bool {
        self.anchored.is_match(hostname)
    }

    /// Match `hostname` and collect its parameters.
    ///
    /// Named groups win; when the pattern has none, unnamed groups are
    /// returned positionally. Groups that did not participate are skipped.
    pub fn captures(&self, hostname: &str) -> Option<HostParams> {
        if self.anchored.captures_len() == 1 {
            return self.anchored.is_match(hostname).then(HostParams::default);
        }

        let caps = self.anchored.captures(hostname)?;
        let params = if self.named {
            HostParams::from_named(self.anchored.capture_names().flatten().filter_map(|name| {
                caps.name(name)
                    .map(|m| (name.to_owned(), m.as_str().to_owned()))
            }))
        } else {
            HostParams::from_positional(caps.iter().skip(1).flatten().map(|m| m.as_str().to_owned()))
        };
        Some(params)
    }

    /// Whether a reversed candidate is accepted by the raw pattern.
    ///
    /// Only the start is anchored: `(\w+)` accepts `www.eggs.spam`.
    pub fn verifies(&self, candidate: &str) -> bool {
        self.verifier.is_match(candidate)
    }
}

fn compile_regex(pattern: &str, expr: &str) -> Result<Regex, ConfigError> {
    Regex::new(expr).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_owned(),
        source,
    })
}

/// A literal string with named holes, produced from one pattern alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    parts: Vec<Part>,
    params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Param(String),
}

impl Template {
    fn from_parts(raw: Vec<Part>) -> Self {
        let mut parts: Vec<Part> = Vec::with_capacity(raw.len());
        let mut params: Vec<String> = Vec::new();

        for part in raw {
            match part {
                Part::Text(text) if text.is_empty() => {}
                Part::Text(text) => match parts.last_mut() {
                    Some(Part::Text(last)) => last.push_str(&text),
                    _ => parts.push(Part::Text(text)),
                },
                Part::Param(name) => {
                    if !params.contains(&name) {
                        params.push(name.clone());
                    }
                    parts.push(Part::Param(name));
                }
            }
        }

        Self { parts, params }
    }

    /// Distinct parameter names, in order of first appearance.
    ///
    /// Unnamed groups are called `_0`, `_1`, ... in pattern order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Fill the i-th parameter with the i-th value. `None` when the counts differ.
    pub fn render_positional(&self, values: &[String]) -> Option<String> {
        if values.len() != self.params.len() {
            return None;
        }
        self.render(|name| {
            self.params
                .iter()
                .position(|p| p == name)
                .map(|i| values[i].as_str())
        })
    }

    /// Fill parameters by name. `None` unless the key set equals the parameter set.
    pub fn render_named(&self, values: &BTreeMap<String, String>) -> Option<String> {
        if values.len() != self.params.len() || !self.params.iter().all(|p| values.contains_key(p)) {
            return None;
        }
        self.render(|name| values.get(name).map(String::as_str))
    }

    /// Render with `args` when given, otherwise with `kwargs`.
    pub fn render_args(&self, args: &[String], kwargs: &BTreeMap<String, String>) -> Option<String> {
        if args.is_empty() {
            self.render_named(kwargs)
        } else {
            self.render_positional(args)
        }
    }

    fn render<'v>(&self, lookup: impl Fn(&str) -> Option<&'v str>) -> Option<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Param(name) => out.push_str(lookup(name)?),
            }
        }
        Some(out)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            match part {
                Part::Text(text) => f.write_str(text)?,
                Part::Param(name) => write!(f, "{{{name}}}")?,
            }
        }
        Ok(())
    }
}

/// Expand `pattern` into its reversal templates.
///
/// Alternatives are enumerated left to right; an optional item containing a
/// group yields the "absent" form before the "present" one. Optional items
/// without groups are dropped, and character classes are represented by
/// their first member. Constructs with no representative only fail when they
/// reach a template.
pub fn normalize(pattern: &str) -> Result<Vec<Template>, ConfigError> {
    let unreversible = |reason: String| ConfigError::Unreversible {
        pattern: pattern.to_owned(),
        reason,
    };

    let mut parser = Parser::new(pattern);
    let branches = parser.parse_branches(false).map_err(unreversible)?;
    let expanded = expand(&[Node::Choice(branches)]).map_err(unreversible)?;

    let mut templates: Vec<Template> = Vec::with_capacity(expanded.len());
    for parts in expanded {
        let template = Template::from_parts(parts);
        if !templates.contains(&template) {
            templates.push(template);
        }
    }
    Ok(templates)
}

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Param(String),
    Choice(Vec<Vec<Node>>),
    Unreversible(String),
}

impl Node {
    fn empty() -> Self {
        Node::Text(String::new())
    }

    fn has_param(&self) -> bool {
        match self {
            Node::Text(_) | Node::Unreversible(_) => false,
            Node::Param(_) => true,
            Node::Choice(branches) => branches.iter().flatten().any(Node::has_param),
        }
    }
}

fn expand(nodes: &[Node]) -> Result<Vec<Vec<Part>>, String> {
    let mut results: Vec<Vec<Part>> = vec![Vec::new()];

    for node in nodes {
        match node {
            Node::Text(text) => {
                for result in &mut results {
                    result.push(Part::Text(text.clone()));
                }
            }
            Node::Param(name) => {
                for result in &mut results {
                    result.push(Part::Param(name.clone()));
                }
            }
            Node::Unreversible(reason) => return Err(reason.clone()),
            Node::Choice(branches) => {
                let mut options = Vec::new();
                for branch in branches {
                    options.extend(expand(branch)?);
                }
                if results.len().saturating_mul(options.len()) > MAX_TEMPLATES {
                    return Err(format!("expands to more than {MAX_TEMPLATES} alternatives"));
                }

                let mut next = Vec::with_capacity(results.len() * options.len());
                for prefix in &results {
                    for option in &options {
                        let mut combined = prefix.clone();
                        combined.extend(option.iter().cloned());
                        next.push(combined);
                    }
                }
                results = next;
            }
        }
    }

    Ok(results)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    positional: usize,
}

impl Parser {
    fn new(pattern: &str) -> Self {
        Self {
            chars: pattern.chars().collect(),
            pos: 0,
            positional: 0,
        }
    }

    fn next(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Parse `a|b|c` up to the end of input, or up to the closing parenthesis
    /// when `nested`.
    fn parse_branches(&mut self, nested: bool) -> Result<Vec<Vec<Node>>, String> {
        let mut branches = Vec::new();
        let mut current: Vec<Node> = Vec::new();

        loop {
            let Some(ch) = self.next() else {
                if nested {
                    return Err("missing closing parenthesis".into());
                }
                break;
            };

            match ch {
                '|' => branches.push(std::mem::take(&mut current)),
                ')' if nested => break,
                ')' => return Err("unbalanced closing parenthesis".into()),
                '(' => {
                    let node = self.parse_group()?;
                    current.push(node);
                }
                '[' => {
                    let node = self.parse_class()?;
                    current.push(node);
                }
                '.' => current.push(Node::Text(".".into())),
                '^' | '$' => current.push(Node::empty()),
                '\\' => {
                    let ch = self.next().ok_or("trailing backslash")?;
                    current.push(Node::Text(escape_repr(ch, false)?));
                }
                '*' | '?' | '+' => {
                    self.eat('?');
                    repeat(&mut current, usize::from(ch == '+'))?;
                }
                '{' => match self.parse_counted() {
                    Some(min) => {
                        self.eat('?');
                        repeat(&mut current, min)?;
                    }
                    None => current.push(Node::Text("{".into())),
                },
                ch => current.push(Node::Text(ch.to_string())),
            }
        }

        branches.push(current);
        Ok(branches)
    }

    /// Called after `(`.
    fn parse_group(&mut self) -> Result<Node, String> {
        if !self.eat('?') {
            let name = format!("_{}", self.positional);
            self.positional += 1;
            self.skip_group()?;
            return Ok(Node::Param(name));
        }

        match self.next() {
            Some(':') => Ok(Node::Choice(self.parse_branches(true)?)),
            Some('P') if self.eat('<') => self.named_group(),
            Some('P') => Err("named backreferences are not reversible".into()),
            Some('<') if matches!(self.peek(), Some('=') | Some('!')) => {
                Err("look-around assertions are not reversible".into())
            }
            Some('<') => self.named_group(),
            Some('=') | Some('!') => Err("look-around assertions are not reversible".into()),
            Some('x') => Err(VERBOSE_UNSUPPORTED.into()),
            Some(ch) if is_flag(ch) => loop {
                match self.next() {
                    Some(')') => return Ok(Node::empty()),
                    Some(':') => return Ok(Node::Choice(self.parse_branches(true)?)),
                    Some('x') => return Err(VERBOSE_UNSUPPORTED.into()),
                    Some(ch) if is_flag(ch) => {}
                    _ => return Err("malformed inline flag group".into()),
                }
            },
            Some(ch) => Err(format!("unsupported group syntax '(?{ch}'")),
            None => Err("missing closing parenthesis".into()),
        }
    }

    fn named_group(&mut self) -> Result<Node, String> {
        let mut name = String::new();
        loop {
            match self.next() {
                Some('>') => break,
                Some(ch) => name.push(ch),
                None => return Err("unterminated group name".into()),
            }
        }
        self.skip_group()?;
        Ok(Node::Param(name))
    }

    /// Skip the body of a capturing group; its content becomes one hole.
    fn skip_group(&mut self) -> Result<(), String> {
        let mut depth = 1usize;
        while let Some(ch) = self.next() {
            match ch {
                '\\' => {
                    self.next();
                }
                '[' => self.skip_class()?,
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err("missing closing parenthesis".into())
    }

    /// Called after `[`; returns a representative member.
    fn parse_class(&mut self) -> Result<Node, String> {
        if self.peek() == Some('^') {
            self.skip_class()?;
            return Ok(Node::Unreversible(
                "negated character classes are not reversible".into(),
            ));
        }
        let repr = match self.next() {
            Some('\\') => {
                let ch = self.next().ok_or("trailing backslash")?;
                escape_repr(ch, true)?
            }
            Some('[') => return Err("nested character classes are not reversible".into()),
            Some(ch) => ch.to_string(),
            None => return Err("unterminated character class".into()),
        };
        self.skip_class_body()?;
        Ok(Node::Text(repr))
    }

    fn skip_class(&mut self) -> Result<(), String> {
        self.eat('^');
        self.eat(']');
        self.skip_class_body()
    }

    fn skip_class_body(&mut self) -> Result<(), String> {
        let mut depth = 1usize;
        while let Some(ch) = self.next() {
            match ch {
                '\\' => {
                    self.next();
                }
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err("unterminated character class".into())
    }

    /// Called after `{`. Restores the position when this is not a counted
    /// repetition, in which case the brace is a literal.
    fn parse_counted(&mut self) -> Option<usize> {
        let start = self.pos;
        let min = self.digits();
        let closed = min.is_some() && {
            if self.eat(',') {
                self.digits();
            }
            self.eat('}')
        };
        if closed {
            min
        } else {
            self.pos = start;
            None
        }
    }

    fn digits(&mut self) -> Option<usize> {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect::<String>().parse().ok()
    }
}

/// Verbose mode would turn whitespace and comments into template text.
const VERBOSE_UNSUPPORTED: &str = "verbose mode (?x) is not reversible";

fn is_flag(ch: char) -> bool {
    matches!(ch, 'i' | 'm' | 's' | 'u' | 'U' | 'R' | '-')
}

fn repeat(current: &mut Vec<Node>, min: usize) -> Result<(), String> {
    let item = current.pop().ok_or("nothing to repeat")?;
    if min == 0 {
        if item.has_param() {
            current.push(Node::Choice(vec![Vec::new(), vec![item]]));
        }
    } else {
        current.extend(std::iter::repeat(item).take(min));
    }
    Ok(())
}

fn escape_repr(ch: char, in_class: bool) -> Result<String, String> {
    let repr = match ch {
        'd' => "0",
        'D' | 'S' | 'w' => "x",
        'W' => "!",
        's' => " ",
        'n' => "\n",
        't' => "\t",
        'r' => "\r",
        'b' | 'B' | 'A' | 'z' if !in_class => "",
        ch if ch.is_ascii_alphanumeric() => return Err(format!("unsupported escape '\\{ch}'")),
        ch => return Ok(ch.to_string()),
    };
    Ok(repr.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(pattern: &str) -> Vec<String> {
        normalize(pattern)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_anchor_matches_whole_labels() {
        let pattern = HostPattern::compile("api").unwrap();
        assert!(pattern.is_match("api"));
        assert!(pattern.is_match("api.example.com"));
        assert!(!pattern.is_match("apiary.example.com"));
        assert!(!pattern.is_match("www.api.example.com"));
    }

    #[test]
    fn test_invalid_regex_is_config_error() {
        let err = HostPattern::compile(r"(\w+").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));

        // Would compile once wrapped, but not on its own.
        let err = HostPattern::compile("a)|(b").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_positional_captures() {
        let pattern = HostPattern::compile(r"(\w+)").unwrap();
        let params = pattern.captures("other.example.com").unwrap();
        assert_eq!(params.positional(), ["other".to_string()]);
        assert!(params.named().is_empty());
    }

    #[test]
    fn test_named_captures_win() {
        let pattern = HostPattern::compile(r"(?P<username>\w+)-(\d+)").unwrap();
        let params = pattern.captures("jezdez-42.example.com").unwrap();
        assert_eq!(params.get("username"), Some("jezdez"));
        assert!(params.positional().is_empty());
    }

    #[test]
    fn test_no_groups_means_empty_params() {
        let pattern = HostPattern::compile(r"static").unwrap();
        assert!(pattern.captures("static.example.com").unwrap().is_empty());
        assert!(pattern.captures("other.example.com").is_none());
    }

    #[test]
    fn test_literal_template() {
        assert_eq!(rendered(r"www\.example\.com"), ["www.example.com"]);
        assert_eq!(rendered(""), [""]);
    }

    #[test]
    fn test_group_templates() {
        assert_eq!(rendered(r"(\w+)"), ["{_0}"]);
        assert_eq!(rendered(r"(?P<username>\w+)"), ["{username}"]);
        assert_eq!(rendered(r"s(?P<subdomain>\w+)"), ["s{subdomain}"]);
        assert_eq!(rendered(r"(?<a>\w+)\.(\d+)"), ["{a}.{_0}"]);
    }

    #[test]
    fn test_alternation_keeps_pattern_order() {
        assert_eq!(rendered(r"|www"), ["", "www"]);
        assert_eq!(rendered(r"api|(?:web|www)\.cdn"), ["api", "web.cdn", "www.cdn"]);
    }

    #[test]
    fn test_optional_group_absent_first() {
        assert_eq!(
            rendered(r"(?:(?P<lang>\w+)\.)?blog"),
            ["blog", "{lang}.blog"]
        );
        let templates = normalize(r"(?:(?P<lang>\w+)\.)?blog").unwrap();
        assert!(templates[0].params().is_empty());
        assert_eq!(templates[1].params(), ["lang".to_string()]);
    }

    #[test]
    fn test_quantifiers_and_classes() {
        assert_eq!(rendered(r"www\d?"), ["www"]);
        assert_eq!(rendered(r"a{3}b+"), ["aaab"]);
        assert_eq!(rendered(r"[a-z]+\.cdn"), ["a.cdn"]);
        assert_eq!(rendered(r"[\w-]+x"), ["xx"]);
        assert_eq!(rendered(r"(?i)api"), ["api"]);
        assert_eq!(rendered(r"^api$"), ["api"]);
    }

    #[test]
    fn test_repeated_group_shares_param() {
        let templates = normalize(r"(?P<id>\d+){2}").unwrap();
        assert_eq!(templates[0].to_string(), "{id}{id}");
        assert_eq!(templates[0].params(), ["id".to_string()]);
    }

    #[test]
    fn test_unsupported_syntax() {
        for pattern in [r"[^.]+", r"(?=x)", r"(?P=name)", r"\x41", r"\pL"] {
            let err = normalize(pattern).unwrap_err();
            assert!(matches!(err, ConfigError::Unreversible { .. }), "{pattern}");
        }
    }

    #[test]
    fn test_verbose_mode_is_rejected() {
        for pattern in [r"(?x) www \. api", r"(?ix)www", r"(?-x:www)"] {
            let err = HostPattern::compile(pattern).unwrap_err();
            assert!(
                matches!(err, ConfigError::Unreversible { ref reason, .. } if reason.contains("(?x)")),
                "{pattern}"
            );
        }
    }

    #[test]
    fn test_negated_class_in_dropped_optional() {
        assert_eq!(rendered(r"(?:[^.]+\.)?www"), ["www"]);
        assert_eq!(rendered(r"(?:x[^.])*api"), ["api"]);

        let pattern = HostPattern::compile(r"(?:[^.]+\.)?www").unwrap();
        assert!(pattern.is_match("www.example.com"));

        let err = normalize(r"www[^.]").unwrap_err();
        assert!(matches!(err, ConfigError::Unreversible { .. }));
    }

    #[test]
    fn test_render() {
        let template = &normalize(r"(?P<a>\w+)\.(?P<b>\w+)").unwrap()[0];
        assert_eq!(
            template.render_positional(&["x".into(), "y".into()]).as_deref(),
            Some("x.y")
        );
        assert_eq!(template.render_positional(&["x".into()]), None);

        let kwargs = BTreeMap::from([("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]);
        assert_eq!(template.render_named(&kwargs).as_deref(), Some("1.2"));

        let wrong = BTreeMap::from([("a".to_string(), "1".to_string()), ("c".to_string(), "2".to_string())]);
        assert_eq!(template.render_named(&wrong), None);
    }

    #[test]
    fn test_verifier_only_anchors_start() {
        let pattern = HostPattern::compile(r"(\w+)").unwrap();
        assert!(pattern.verifies("www.eggs.spam"));
        assert!(!pattern.verifies(".spam"));
    }
}
