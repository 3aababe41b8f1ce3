//! XPath locators evaluated over a parsed HTML tree.
//!
//! Supports the subset used by field configurations: absolute, relative and
//! `//` location paths, `*`, `.`, `..`, `text()` and a trailing `@attr` step,
//! plus predicates built from positions, attribute and text comparisons,
//! `contains`, `starts-with`, `normalize-space`, `not`, `and` and `or`.
//!
//! Results come back in document order without duplicates, so "first match"
//! always means the first node in document order.

use std::collections::{HashMap, HashSet};
use std::fmt;

use ego_tree::{NodeId, NodeRef};
use scraper::node::Node;
use scraper::{ElementRef, Html};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid locator `{expression}` at offset {position}: {message}")]
pub struct LocatorError {
    pub expression: String,
    pub position: usize,
    pub message: String,
}

/// A node selected by a locator.
#[derive(Debug, Clone, Copy)]
pub enum Match<'a> {
    Element(ElementRef<'a>),
    Text(&'a str),
    Attribute(&'a str),
}

/// A compiled XPath expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Locator {
    expression: String,
    steps: Vec<Step>,
}

impl Locator {
    pub fn compile(expression: &str) -> Result<Self, LocatorError> {
        let tokens = tokenize(expression).map_err(|(position, message)| LocatorError {
            expression: expression.to_string(),
            position,
            message,
        })?;
        let mut parser = Parser {
            expression,
            tokens,
            cursor: 0,
        };
        let steps = parser.parse_path()?;
        Ok(Self {
            expression: expression.to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expression
    }

    /// All matches in document order.
    pub fn select<'a>(&self, document: &'a Html) -> Vec<Match<'a>> {
        let order = document_order(document);
        let mut current = vec![document.tree.root()];
        for step in &self.steps {
            if let Step::Attribute(name) = step {
                return current
                    .iter()
                    .filter_map(|node| match node.value() {
                        Node::Element(element) => element.attr(name),
                        _ => None,
                    })
                    .map(Match::Attribute)
                    .collect();
            }
            let next = current.iter().flat_map(|node| step.apply(*node)).collect();
            current = sort_unique(next, &order);
        }
        current.into_iter().filter_map(to_match).collect()
    }

    /// The first match in document order.
    pub fn first<'a>(&self, document: &'a Html) -> Option<Match<'a>> {
        self.select(document).into_iter().next()
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Step {
    /// Expansion of `//`: the context node and all its descendants.
    DescendantOrSelf,
    Child {
        test: NameTest,
        predicates: Vec<Expr>,
    },
    Text {
        predicates: Vec<Expr>,
    },
    Attribute(String),
    SelfNode,
    Parent,
}

impl Step {
    fn apply<'a>(&self, node: NodeRef<'a, Node>) -> Vec<NodeRef<'a, Node>> {
        match self {
            Step::DescendantOrSelf => node.descendants().collect(),
            Step::Child { test, predicates } => filter(
                node.children().filter(|child| test.matches(*child)).collect(),
                predicates,
            ),
            Step::Text { predicates } => filter(
                node.children()
                    .filter(|child| matches!(child.value(), Node::Text(_)))
                    .collect(),
                predicates,
            ),
            Step::SelfNode => vec![node],
            Step::Parent => node.parent().into_iter().collect(),
            Step::Attribute(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NameTest {
    Any,
    Named(String),
}

impl NameTest {
    fn matches(&self, node: NodeRef<'_, Node>) -> bool {
        match (self, node.value()) {
            (NameTest::Any, Node::Element(_)) => true,
            (NameTest::Named(name), Node::Element(element)) => {
                element.name().eq_ignore_ascii_case(name)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Contains(Box<Expr>, Box<Expr>),
    StartsWith(Box<Expr>, Box<Expr>),
    NormalizeSpace(Box<Expr>),
    Literal(String),
    Number(f64),
    Attribute(String),
    /// Concatenated direct text children of the context node.
    Text,
    /// String value of the context node (`.`).
    Context,
    Position,
    Last,
    HasChild(NameTest),
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Bool(bool),
    Number(f64),
    Str(String),
    /// An absent attribute or text node; compares unequal to everything.
    Missing,
}

impl Value {
    fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Missing => false,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Str(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Missing => None,
        }
    }

    fn into_string(self) -> String {
        match self {
            Value::Str(s) => s,
            Value::Number(n) if n.fract() == 0.0 => format!("{}", n as i64),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Missing => String::new(),
        }
    }
}

struct Context<'a> {
    node: NodeRef<'a, Node>,
    position: usize,
    size: usize,
}

fn filter<'a>(nodes: Vec<NodeRef<'a, Node>>, predicates: &[Expr]) -> Vec<NodeRef<'a, Node>> {
    predicates.iter().fold(nodes, |nodes, predicate| {
        let size = nodes.len();
        nodes
            .into_iter()
            .enumerate()
            .filter(|(index, node)| {
                let ctx = Context {
                    node: *node,
                    position: index + 1,
                    size,
                };
                // A bare number is a position test.
                match eval(predicate, &ctx) {
                    Value::Number(n) => n == (index + 1) as f64,
                    other => other.truthy(),
                }
            })
            .map(|(_, node)| node)
            .collect()
    })
}

fn eval(expr: &Expr, ctx: &Context<'_>) -> Value {
    match expr {
        Expr::Or(a, b) => Value::Bool(eval(a, ctx).truthy() || eval(b, ctx).truthy()),
        Expr::And(a, b) => Value::Bool(eval(a, ctx).truthy() && eval(b, ctx).truthy()),
        Expr::Not(a) => Value::Bool(!eval(a, ctx).truthy()),
        Expr::Compare(op, a, b) => Value::Bool(compare(*op, eval(a, ctx), eval(b, ctx))),
        Expr::Contains(a, b) => {
            let haystack = eval(a, ctx).into_string();
            Value::Bool(haystack.contains(&eval(b, ctx).into_string()))
        }
        Expr::StartsWith(a, b) => {
            let haystack = eval(a, ctx).into_string();
            Value::Bool(haystack.starts_with(&eval(b, ctx).into_string()))
        }
        Expr::NormalizeSpace(a) => Value::Str(collapse_whitespace(&eval(a, ctx).into_string())),
        Expr::Literal(s) => Value::Str(s.clone()),
        Expr::Number(n) => Value::Number(*n),
        Expr::Attribute(name) => match ctx.node.value() {
            Node::Element(element) => element
                .attr(name)
                .map(|v| Value::Str(v.to_string()))
                .unwrap_or(Value::Missing),
            _ => Value::Missing,
        },
        Expr::Text => {
            let mut texts = ctx.node.children().filter_map(|child| match child.value() {
                Node::Text(text) => Some(&**text),
                _ => None,
            });
            match texts.next() {
                Some(first) => Value::Str(texts.fold(first.to_string(), |acc, t| acc + t)),
                None => Value::Missing,
            }
        }
        Expr::Context => Value::Str(string_value(ctx.node)),
        Expr::Position => Value::Number(ctx.position as f64),
        Expr::Last => Value::Number(ctx.size as f64),
        Expr::HasChild(test) => Value::Bool(ctx.node.children().any(|child| test.matches(child))),
    }
}

fn compare(op: CmpOp, left: Value, right: Value) -> bool {
    if left == Value::Missing || right == Value::Missing {
        return false;
    }
    if matches!(left, Value::Bool(_)) || matches!(right, Value::Bool(_)) {
        let (l, r) = (left.truthy(), right.truthy());
        return match op {
            CmpOp::Eq => l == r,
            CmpOp::Ne => l != r,
            _ => false,
        };
    }
    let numeric = matches!(left, Value::Number(_))
        || matches!(right, Value::Number(_))
        || !matches!(op, CmpOp::Eq | CmpOp::Ne);
    if numeric {
        let (Some(l), Some(r)) = (left.as_number(), right.as_number()) else {
            return false;
        };
        return match op {
            CmpOp::Eq => l == r,
            CmpOp::Ne => l != r,
            CmpOp::Lt => l < r,
            CmpOp::Le => l <= r,
            CmpOp::Gt => l > r,
            CmpOp::Ge => l >= r,
        };
    }
    let (l, r) = (left.into_string(), right.into_string());
    match op {
        CmpOp::Eq => l == r,
        CmpOp::Ne => l != r,
        _ => false,
    }
}

fn string_value(node: NodeRef<'_, Node>) -> String {
    node.descendants()
        .filter_map(|n| match n.value() {
            Node::Text(text) => Some(&**text),
            _ => None,
        })
        .collect()
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn to_match(node: NodeRef<'_, Node>) -> Option<Match<'_>> {
    match node.value() {
        Node::Element(_) => ElementRef::wrap(node).map(Match::Element),
        Node::Text(text) => Some(Match::Text(&**text)),
        _ => None,
    }
}

fn document_order(document: &Html) -> HashMap<NodeId, usize> {
    document
        .tree
        .root()
        .descendants()
        .enumerate()
        .map(|(index, node)| (node.id(), index))
        .collect()
}

fn sort_unique<'a>(
    mut nodes: Vec<NodeRef<'a, Node>>,
    order: &HashMap<NodeId, usize>,
) -> Vec<NodeRef<'a, Node>> {
    let mut seen = HashSet::new();
    nodes.retain(|node| seen.insert(node.id()));
    nodes.sort_by_key(|node| order.get(&node.id()).copied().unwrap_or(usize::MAX));
    nodes
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Dot,
    DotDot,
    Star,
    Op(CmpOp),
    Name(String),
    Literal(String),
    Number(f64),
}

fn tokenize(expression: &str) -> Result<Vec<(usize, Token)>, (usize, String)> {
    let chars: Vec<(usize, char)> = expression.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (pos, c) = chars[i];
        let peek = chars.get(i + 1).map(|&(_, next)| next);
        let (token, width) = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '/' if peek == Some('/') => (Token::DoubleSlash, 2),
            '/' => (Token::Slash, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '@' => (Token::At, 1),
            ',' => (Token::Comma, 1),
            '*' => (Token::Star, 1),
            '.' if peek == Some('.') => (Token::DotDot, 2),
            '.' => (Token::Dot, 1),
            '=' => (Token::Op(CmpOp::Eq), 1),
            '!' if peek == Some('=') => (Token::Op(CmpOp::Ne), 2),
            '<' if peek == Some('=') => (Token::Op(CmpOp::Le), 2),
            '<' => (Token::Op(CmpOp::Lt), 1),
            '>' if peek == Some('=') => (Token::Op(CmpOp::Ge), 2),
            '>' => (Token::Op(CmpOp::Gt), 1),
            '"' | '\'' => {
                let start = i + 1;
                let len = chars[start..]
                    .iter()
                    .position(|&(_, ch)| ch == c)
                    .ok_or((pos, "unterminated string literal".to_string()))?;
                let literal = chars[start..start + len].iter().map(|&(_, ch)| ch).collect();
                tokens.push((pos, Token::Literal(literal)));
                i = start + len + 1;
                continue;
            }
            c if c.is_ascii_digit() => {
                let len = chars[i..]
                    .iter()
                    .take_while(|&&(_, ch)| ch.is_ascii_digit() || ch == '.')
                    .count();
                let text: String = chars[i..i + len].iter().map(|&(_, ch)| ch).collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| (pos, format!("invalid number `{text}`")))?;
                tokens.push((pos, Token::Number(value)));
                i += len;
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let len = chars[i..]
                    .iter()
                    .take_while(|&&(_, ch)| ch.is_alphanumeric() || ch == '-' || ch == '_')
                    .count();
                let name = chars[i..i + len].iter().map(|&(_, ch)| ch).collect();
                tokens.push((pos, Token::Name(name)));
                i += len;
                continue;
            }
            other => return Err((pos, format!("unexpected character `{other}`"))),
        };
        tokens.push((pos, token));
        i += width;
    }
    Ok(tokens)
}

struct Parser<'e> {
    expression: &'e str,
    tokens: Vec<(usize, Token)>,
    cursor: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor).map(|(_, token)| token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.cursor)
            .map(|(pos, _)| *pos)
            .unwrap_or(self.expression.len())
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).map(|(_, token)| token.clone());
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(Token::Name(name)) if name == keyword) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), LocatorError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn error(&self, message: impl Into<String>) -> LocatorError {
        LocatorError {
            expression: self.expression.to_string(),
            position: self.position(),
            message: message.into(),
        }
    }

    fn parse_path(&mut self) -> Result<Vec<Step>, LocatorError> {
        if self.peek().is_none() {
            return Err(self.error("empty expression"));
        }
        let mut steps = Vec::new();
        if self.eat(&Token::DoubleSlash) {
            steps.push(Step::DescendantOrSelf);
        } else {
            self.eat(&Token::Slash);
        }
        loop {
            let step = self.parse_step()?;
            let terminal = matches!(step, Step::Attribute(_) | Step::Text { .. });
            steps.push(step);
            let descend = if self.eat(&Token::Slash) {
                false
            } else if self.eat(&Token::DoubleSlash) {
                true
            } else {
                break;
            };
            if terminal {
                return Err(self.error("text() and @attribute must be the last step"));
            }
            if descend {
                steps.push(Step::DescendantOrSelf);
            }
        }
        if self.peek().is_some() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(steps)
    }

    fn parse_step(&mut self) -> Result<Step, LocatorError> {
        match self.bump() {
            Some(Token::Dot) => Ok(Step::SelfNode),
            Some(Token::DotDot) => Ok(Step::Parent),
            Some(Token::At) => self.parse_attribute_name().map(Step::Attribute),
            Some(Token::Star) => Ok(Step::Child {
                test: NameTest::Any,
                predicates: self.parse_predicates()?,
            }),
            Some(Token::Name(name)) if self.peek() == Some(&Token::LParen) => {
                if name != "text" {
                    return Err(self.error(format!("unsupported node test `{name}()`")));
                }
                self.bump();
                self.expect(&Token::RParen, "`)`")?;
                Ok(Step::Text {
                    predicates: self.parse_predicates()?,
                })
            }
            Some(Token::Name(name)) => Ok(Step::Child {
                test: NameTest::Named(name.to_ascii_lowercase()),
                predicates: self.parse_predicates()?,
            }),
            Some(_) => {
                self.cursor -= 1;
                Err(self.error("expected a location step"))
            }
            None => Err(self.error("expected a location step")),
        }
    }

    fn parse_attribute_name(&mut self) -> Result<String, LocatorError> {
        match self.peek().cloned() {
            Some(Token::Name(name)) => {
                self.bump();
                Ok(name)
            }
            _ => Err(self.error("expected attribute name after `@`")),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, LocatorError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_or()?);
            self.expect(&Token::RBracket, "`]`")?;
        }
        Ok(predicates)
    }

    fn parse_or(&mut self) -> Result<Expr, LocatorError> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            left = Expr::Or(Box::new(left), Box::new(self.parse_and()?));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, LocatorError> {
        let mut left = self.parse_comparison()?;
        while self.eat_keyword("and") {
            left = Expr::And(Box::new(left), Box::new(self.parse_comparison()?));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, LocatorError> {
        let left = self.parse_primary()?;
        if let Some(Token::Op(op)) = self.peek().cloned() {
            self.bump();
            let right = self.parse_primary()?;
            return Ok(Expr::Compare(op, Box::new(left), Box::new(right)));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr, LocatorError> {
        match self.bump() {
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Dot) => Ok(Expr::Context),
            Some(Token::Star) => Ok(Expr::HasChild(NameTest::Any)),
            Some(Token::At) => self.parse_attribute_name().map(Expr::Attribute),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(&Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some(Token::Name(name)) if self.peek() == Some(&Token::LParen) => {
                self.bump();
                self.parse_function(&name)
            }
            Some(Token::Name(name)) => Ok(Expr::HasChild(NameTest::Named(
                name.to_ascii_lowercase(),
            ))),
            Some(_) => {
                self.cursor -= 1;
                Err(self.error("expected an expression"))
            }
            None => Err(self.error("expected an expression")),
        }
    }

    fn parse_function(&mut self, name: &str) -> Result<Expr, LocatorError> {
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.parse_or()?);
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
            self.expect(&Token::RParen, "`)`")?;
        }
        let mut args = args.into_iter().map(Box::new);
        let arity = args.len();
        let expr = match (name, arity) {
            ("text", 0) => Expr::Text,
            ("position", 0) => Expr::Position,
            ("last", 0) => Expr::Last,
            ("normalize-space", 0) => Expr::NormalizeSpace(Box::new(Expr::Context)),
            ("normalize-space", 1) => Expr::NormalizeSpace(args.next().unwrap_or_default()),
            ("not", 1) => Expr::Not(args.next().unwrap_or_default()),
            ("contains", 2) => Expr::Contains(
                args.next().unwrap_or_default(),
                args.next().unwrap_or_default(),
            ),
            ("starts-with", 2) => Expr::StartsWith(
                args.next().unwrap_or_default(),
                args.next().unwrap_or_default(),
            ),
            (
                "text" | "position" | "last" | "normalize-space" | "not" | "contains"
                | "starts-with",
                _,
            ) => {
                return Err(self.error(format!(
                    "wrong number of arguments ({arity}) for `{name}()`"
                )))
            }
            _ => return Err(self.error(format!("unknown function `{name}()`"))),
        };
        Ok(expr)
    }
}

impl Default for Expr {
    fn default() -> Self {
        Expr::Literal(String::new())
    }
}
