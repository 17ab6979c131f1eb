//! Terms, actions and propositions.
//!
//! An [`Action`] is a predicate name plus argument terms, some of which may be
//! unbound variables when the action is proposed. Executing an action yields
//! zero or more [`Bindings`]; substituting a binding set into the action gives a
//! [`Proposition`], the key used by the belief store and activation memory.
//!
//! Text syntax: `predicate(arg, ...)`. Bare identifiers are variables, integers
//! are integers, `"quoted"` text is an atom, `[a, b]` is a list and `p(x)` nested
//! inside an argument list is a compound term.

use std::collections::BTreeMap;
use std::fmt;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

use crate::error::TermError;

/// Variable name → bound value, produced by a successful action.
pub type Bindings = BTreeMap<String, Term>;

// ---------------------------------------------------------------------------
// Term
// ---------------------------------------------------------------------------

/// A single argument of an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    /// Unbound variable, bound at execution time.
    Var(String),
    /// Opaque constant text.
    Atom(String),
    Int(i64),
    List(Vec<Term>),
    /// A nested action, e.g. the inner term of `performed(P)`.
    Compound(Action),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }

    pub fn atom(text: impl Into<String>) -> Self {
        Self::Atom(text.into())
    }

    /// Whether this term contains no variables.
    pub fn is_ground(&self) -> bool {
        match self {
            Self::Var(_) => false,
            Self::Atom(_) | Self::Int(_) => true,
            Self::List(items) => items.iter().all(Term::is_ground),
            Self::Compound(action) => action.is_ground(),
        }
    }

    /// Replace bound variables; unbound ones are left in place.
    pub fn substitute(&self, bindings: &Bindings) -> Term {
        match self {
            Self::Var(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            Self::Atom(_) | Self::Int(_) => self.clone(),
            Self::List(items) => Self::List(items.iter().map(|t| t.substitute(bindings)).collect()),
            Self::Compound(action) => Self::Compound(action.substitute_raw(bindings)),
        }
    }

    /// One-way match of this pattern against `other`, extending `bindings`.
    fn match_into(&self, other: &Term, bindings: &mut Bindings) -> bool {
        match (self, other) {
            (Self::Var(name), _) => match bindings.get(name) {
                Some(bound) => bound == other,
                None => {
                    bindings.insert(name.clone(), other.clone());
                    true
                }
            },
            (Self::Atom(a), Self::Atom(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(p, o)| p.match_into(o, bindings))
            }
            (Self::Compound(a), Self::Compound(b)) => a.match_into(b, bindings),
            _ => false,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(name) => f.write_str(name),
            Self::Atom(text) => {
                f.write_str("\"")?;
                for c in text.chars() {
                    if c == '"' || c == '\\' {
                        f.write_str("\\")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("\"")
            }
            Self::Int(n) => write!(f, "{n}"),
            Self::List(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Self::Compound(action) => write!(f, "{action}"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Term]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Something the agent can attempt: a predicate plus arguments.
///
/// Identity is structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action {
    predicate: String,
    args: Vec<Term>,
}

impl Action {
    pub fn new(predicate: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            predicate: predicate.into(),
            args,
        }
    }

    /// An action with no arguments.
    pub fn named(predicate: impl Into<String>) -> Self {
        Self::new(predicate, Vec::new())
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }

    pub fn is_ground(&self) -> bool {
        self.args.iter().all(Term::is_ground)
    }

    /// Ground this action with one binding set.
    pub fn substitute(&self, bindings: &Bindings) -> Proposition {
        Proposition(self.substitute_raw(bindings))
    }

    fn substitute_raw(&self, bindings: &Bindings) -> Action {
        Action {
            predicate: self.predicate.clone(),
            args: self.args.iter().map(|t| t.substitute(bindings)).collect(),
        }
    }

    /// Match this action, used as a pattern, against a proposition.
    ///
    /// Returns the variable bindings that make the two equal.
    pub fn matches(&self, proposition: &Proposition) -> Option<Bindings> {
        let mut bindings = Bindings::new();
        self.match_into(&proposition.0, &mut bindings)
            .then_some(bindings)
    }

    fn match_into(&self, other: &Action, bindings: &mut Bindings) -> bool {
        self.predicate == other.predicate
            && self.args.len() == other.args.len()
            && self
                .args
                .iter()
                .zip(&other.args)
                .all(|(p, o)| p.match_into(o, bindings))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.predicate)?;
        if !self.args.is_empty() {
            f.write_str("(")?;
            write_joined(f, &self.args)?;
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl FromStr for Action {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser::new(s);
        let action = parser.action()?;
        parser.skip_ws();
        match parser.chars.next() {
            None => Ok(action),
            Some((offset, found)) => Err(parser.unexpected(offset, found)),
        }
    }
}

// ---------------------------------------------------------------------------
// Proposition
// ---------------------------------------------------------------------------

/// An action after substitution: the unit stored in beliefs and activation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Proposition(Action);

impl Proposition {
    pub fn predicate(&self) -> &str {
        self.0.predicate()
    }

    pub fn as_action(&self) -> &Action {
        &self.0
    }

    pub fn into_action(self) -> Action {
        self.0
    }

    /// The `performed(P)` wrapper recorded next to the plain fact.
    pub fn performed(&self) -> Proposition {
        Proposition(Action::new(
            PERFORMED,
            vec![Term::Compound(self.0.clone())],
        ))
    }
}

/// Predicate of the wrapper written by [`Proposition::performed`].
pub const PERFORMED: &str = "performed";

impl From<Action> for Proposition {
    fn from(action: Action) -> Self {
        Self(action)
    }
}

impl fmt::Display for Proposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Proposition {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Proposition)
    }
}

// ---------------------------------------------------------------------------
// Naming conventions
// ---------------------------------------------------------------------------

/// Convert a mixed-case name to the word-separated form.
///
/// `checkForAlerts` → `check_for_alerts`, `readHTTPStatus` → `read_http_status`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn eof(&self) -> TermError {
        TermError::UnexpectedEnd {
            input: self.input.to_string(),
        }
    }

    fn unexpected(&self, offset: usize, found: char) -> TermError {
        TermError::Unexpected {
            input: self.input.to_string(),
            found,
            offset,
        }
    }

    fn identifier(&mut self) -> Option<String> {
        let mut ident = String::new();
        if let Some((_, c)) = self.chars.next_if(|(_, c)| c.is_alphabetic() || *c == '_') {
            ident.push(c);
        } else {
            return None;
        }
        while let Some((_, c)) = self.chars.next_if(|(_, c)| c.is_alphanumeric() || *c == '_') {
            ident.push(c);
        }
        Some(ident)
    }

    fn action(&mut self) -> Result<Action, TermError> {
        self.skip_ws();
        let predicate = self.identifier().ok_or_else(|| TermError::MissingPredicate {
            input: self.input.to_string(),
        })?;
        self.skip_ws();
        let args = if self.chars.next_if(|(_, c)| *c == '(').is_some() {
            self.sequence(')')?
        } else {
            Vec::new()
        };
        Ok(Action::new(predicate, args))
    }

    /// Comma-separated terms up to `close`; the opening delimiter is consumed.
    fn sequence(&mut self, close: char) -> Result<Vec<Term>, TermError> {
        let mut items = Vec::new();
        self.skip_ws();
        if self.chars.next_if(|(_, c)| *c == close).is_some() {
            return Ok(items);
        }
        loop {
            items.push(self.term()?);
            self.skip_ws();
            match self.chars.next() {
                Some((_, ',')) => continue,
                Some((_, c)) if c == close => return Ok(items),
                Some((offset, c)) => return Err(self.unexpected(offset, c)),
                None => return Err(self.eof()),
            }
        }
    }

    fn term(&mut self) -> Result<Term, TermError> {
        self.skip_ws();
        let (offset, c) = match self.chars.peek().copied() {
            Some(next) => next,
            None => return Err(self.eof()),
        };
        match c {
            '"' => {
                self.chars.next();
                self.quoted().map(Term::Atom)
            }
            '[' => {
                self.chars.next();
                self.sequence(']').map(Term::List)
            }
            '-' | '0'..='9' => self.integer().map(Term::Int),
            c if c.is_alphabetic() || c == '_' => {
                let name = self.identifier().ok_or_else(|| self.eof())?;
                self.skip_ws();
                if self.chars.next_if(|(_, c)| *c == '(').is_some() {
                    let args = self.sequence(')')?;
                    Ok(Term::Compound(Action::new(name, args)))
                } else {
                    Ok(Term::Var(name))
                }
            }
            _ => Err(self.unexpected(offset, c)),
        }
    }

    fn quoted(&mut self) -> Result<String, TermError> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(text),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, c)) => text.push(c),
                    None => return Err(self.eof()),
                },
                Some((_, c)) => text.push(c),
                None => return Err(self.eof()),
            }
        }
    }

    fn integer(&mut self) -> Result<i64, TermError> {
        let mut digits = String::new();
        if let Some((_, c)) = self.chars.next_if(|(_, c)| *c == '-') {
            digits.push(c);
        }
        while let Some((_, c)) = self.chars.next_if(|(_, c)| c.is_ascii_digit()) {
            digits.push(c);
        }
        if digits == "-" {
            return match self.chars.next() {
                Some((offset, c)) => Err(self.unexpected(offset, c)),
                None => Err(self.eof()),
            };
        }
        digits.parse().map_err(|_| TermError::IntOutOfRange {
            input: self.input.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(s: &str) -> Action {
        s.parse().unwrap()
    }

    #[test]
    fn parse_variables_constants_and_nesting() {
        let a = action(r#"forget([checkForAlerts(x), sleep(1)], "HH", -3)"#);
        assert_eq!(a.predicate(), "forget");
        assert_eq!(a.args().len(), 3);
        assert_eq!(
            a.args()[0],
            Term::List(vec![
                Term::Compound(Action::new("checkForAlerts", vec![Term::var("x")])),
                Term::Compound(Action::new("sleep", vec![Term::Int(1)])),
            ])
        );
        assert_eq!(a.args()[1], Term::atom("HH"));
        assert_eq!(a.args()[2], Term::Int(-3));
        assert!(!a.is_ground());
    }

    #[test]
    fn display_parses_back() {
        let a = action(r#"note("say \"hi\"", [1, 2], inner(y))"#);
        assert_eq!(action(&a.to_string()), a);
        assert_eq!(action("ping").to_string(), "ping");
        assert_eq!(action("ping()"), Action::named("ping"));
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(
            "check(".parse::<Action>(),
            Err(TermError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            "(x)".parse::<Action>(),
            Err(TermError::MissingPredicate { .. })
        ));
        assert!(matches!(
            "a(b) c".parse::<Action>(),
            Err(TermError::Unexpected { found: 'c', .. })
        ));
        assert!(matches!(
            "a(99999999999999999999)".parse::<Action>(),
            Err(TermError::IntOutOfRange { .. })
        ));
    }

    #[test]
    fn substitute_leaves_unbound_variables() {
        let a = action("move(from, to)");
        let mut b = Bindings::new();
        b.insert("from".into(), Term::atom("tank1"));
        let p = a.substitute(&b);
        assert_eq!(p.to_string(), r#"move("tank1", to)"#);
        assert!(!p.as_action().is_ground());
    }

    #[test]
    fn pattern_matching_binds_and_checks_consistency() {
        let pattern = action("pair(x, x)");
        let same: Proposition = r#"pair("a", "a")"#.parse().unwrap();
        let diff: Proposition = r#"pair("a", "b")"#.parse().unwrap();
        let bound = pattern.matches(&same).unwrap();
        assert_eq!(bound.get("x"), Some(&Term::atom("a")));
        assert!(pattern.matches(&diff).is_none());
        assert!(action("other(x, x)").matches(&same).is_none());
    }

    #[test]
    fn performed_wrapper() {
        let p: Proposition = "ping".parse().unwrap();
        assert_eq!(p.performed().to_string(), "performed(ping)");
        assert_eq!(p.performed().predicate(), PERFORMED);
    }

    #[test]
    fn snake_case_conversion() {
        assert_eq!(to_snake_case("checkForAlerts"), "check_for_alerts");
        assert_eq!(to_snake_case("drainTank2"), "drain_tank2");
        assert_eq!(to_snake_case("readHTTPStatus"), "read_http_status");
        assert_eq!(to_snake_case("sleep"), "sleep");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }
}
