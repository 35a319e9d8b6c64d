//! Recursive-descent parser: builds a [`CsgTree`] from tokens.
//!
//! Grammar, informally:
//!
//! ```text
//! expr       := op | multmatrix | color | primitive
//! op         := ("union" | "difference" | "intersection") "(" ")" "{" expr [";"] expr [";"] "}"
//! multmatrix := "multmatrix" "(" matrix ")" "{" expr [";"] "}"
//! color      := "color" "(" "[" num "," num "," num ["," num] "]" ")" "{" expr [";"] "}"
//! primitive  := ("sphere" | "cube" | "cylinder") "(" params ")" [";"]
//! matrix     := "[" row "," row "," row "," row "]"
//! params     := ([ident ["="]] value [","])*
//! ```
//!
//! Punctuation and number problems are reported and skipped over. A
//! production that needed a child and did not get one fails with
//! [`Structural`], which unwinds to the top and leaves the scene without a
//! root.

use csgrn_ir::{Color, CsgNode, CsgTree, OpKind, PrimitiveKind};
use csgrn_math::Transform;

use crate::diagnostic::{ChildSide, Diagnostic, DiagnosticKind};
use crate::error::{Result, SceneError};
use crate::lexer::{tokenize, Position, SpannedToken, Token};

/// A required child expression was missing, so the enclosing node could
/// not be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Structural;

/// Result of one production.
///
/// `Ok(None)` means no expression was found here (a closing brace, the end of
/// input, or a skipped unknown token). The caller decides whether that is
/// acceptable.
pub type Production = std::result::Result<Option<CsgNode>, Structural>;

/// Tree and diagnostics produced by [`Parser::parse`].
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// The scene, or `None` if no root node could be built.
    pub tree: Option<CsgTree>,
    /// Everything reported, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    /// Treat a missing root as a failed scene load.
    ///
    /// Recoverable diagnostics are returned alongside the tree.
    pub fn into_result(self) -> Result<(CsgTree, Vec<Diagnostic>)> {
        match self.tree {
            Some(tree) => Ok((tree, self.diagnostics)),
            None => Err(SceneError::NoRoot {
                diagnostics: self.diagnostics,
            }),
        }
    }
}

/// Parse scene source.
pub fn parse_scene(source: &str) -> ParseOutcome {
    Parser::new(source).parse()
}

#[derive(Debug, Clone, Copy)]
enum Keyword {
    Op(OpKind),
    Multmatrix,
    Color,
    Primitive(PrimitiveKind),
}

impl Keyword {
    fn lookup(word: &str) -> Option<Self> {
        Some(match word {
            "union" => Self::Op(OpKind::Union),
            "difference" => Self::Op(OpKind::Difference),
            "intersection" => Self::Op(OpKind::Intersection),
            "multmatrix" => Self::Multmatrix,
            "color" => Self::Color,
            "sphere" => Self::Primitive(PrimitiveKind::Sphere),
            "cube" => Self::Primitive(PrimitiveKind::Cube),
            "cylinder" => Self::Primitive(PrimitiveKind::Cylinder),
            _ => return None,
        })
    }
}

/// A parameter value as written. Numbers are checked when the value is used.
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Scalar(String),
    Vector(Vec<String>),
}

impl Value {
    fn text(&self) -> String {
        match self {
            Value::Scalar(s) => s.clone(),
            Value::Vector(v) => format!("[{}]", v.join(",")),
        }
    }
}

/// One entry of a primitive's parameter list. `at` is the token index of the
/// value, used to place diagnostics.
#[derive(Debug, Clone)]
struct Param {
    name: Option<String>,
    value: Value,
    at: usize,
}

/// True if `word` can name a parameter. Numbers and booleans are always
/// values, so `key value` pairs and runs of bare values stay distinct.
fn is_key(word: &str) -> bool {
    !(word.parse::<f32>().is_ok() || word == "true" || word == "false")
}

/// Parameters a shape accepts without a name, in order.
fn positional_names(kind: PrimitiveKind) -> &'static [&'static str] {
    match kind {
        PrimitiveKind::Sphere => &["r"],
        PrimitiveKind::Cube => &["size", "center"],
        PrimitiveKind::Cylinder => &["h", "r1", "r2", "center"],
    }
}

/// Parser for scene source.
pub struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    /// Tokenize `source` and set up a parser at its first token.
    pub fn new(source: &str) -> Self {
        Self::from_tokens(tokenize(source))
    }

    /// Parser over an existing token sequence.
    pub fn from_tokens(tokens: Vec<SpannedToken>) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Parse one root expression.
    pub fn parse(mut self) -> ParseOutcome {
        if self.tokens.is_empty() {
            self.report(DiagnosticKind::EmptyInput);
            return self.finish(None);
        }

        let root = match self.parse_expression() {
            Ok(Some(node)) => Some(node),
            Ok(None) => {
                self.report(DiagnosticKind::MissingChild {
                    parent: "scene".into(),
                    side: ChildSide::Only,
                });
                None
            }
            Err(Structural) => None,
        };

        if root.is_some() {
            self.skip_semicolon();
            if let Some(token) = self.peek() {
                let text = token.to_string();
                self.report(DiagnosticKind::TrailingInput(text));
            }
        }

        self.finish(root.map(CsgTree::new))
    }

    fn finish(self, tree: Option<CsgTree>) -> ParseOutcome {
        ParseOutcome {
            tree,
            diagnostics: self.diagnostics,
        }
    }

    /// Parse the expression at the cursor, dispatching on its keyword.
    pub fn parse_expression(&mut self) -> Production {
        let Some(token) = self.peek().cloned() else {
            return Ok(None);
        };

        let keyword = match &token {
            Token::RBrace => return Ok(None),
            Token::Word(w) => Keyword::lookup(w),
            _ => None,
        };

        let Some(keyword) = keyword else {
            self.report(DiagnosticKind::UnknownToken(token.to_string()));
            self.consume();
            return Ok(None);
        };

        self.consume();
        match keyword {
            Keyword::Op(op) => self.parse_operator(op),
            Keyword::Multmatrix => self.parse_multmatrix(),
            Keyword::Color => self.parse_color(),
            Keyword::Primitive(kind) => Ok(Some(self.parse_primitive(kind))),
        }
    }

    fn parse_operator(&mut self, op: OpKind) -> Production {
        tracing::debug!(op = op.keyword(), pos = self.pos, "parsing operator");
        self.expect(Token::LParen);
        self.expect(Token::RParen);
        self.expect(Token::LBrace);

        let left = self.require_child(op.keyword(), ChildSide::Left)?;
        self.skip_semicolon();
        let right = self.require_child(op.keyword(), ChildSide::Right)?;
        self.skip_semicolon();
        self.expect(Token::RBrace);

        Ok(Some(CsgNode::operation(op, left, right)))
    }

    fn parse_multmatrix(&mut self) -> Production {
        tracing::debug!(pos = self.pos, "parsing multmatrix");
        self.expect(Token::LParen);
        let matrix = self.parse_matrix();
        self.expect(Token::RParen);
        self.expect(Token::LBrace);

        let mut child = self.require_child("multmatrix", ChildSide::Only)?;
        self.skip_semicolon();
        self.expect(Token::RBrace);

        child.pre_transform(&matrix);
        Ok(Some(child))
    }

    fn parse_color(&mut self) -> Production {
        tracing::debug!(pos = self.pos, "parsing color");
        self.expect(Token::LParen);
        self.expect(Token::LBracket);
        let r = self.parse_number(1.0);
        self.expect(Token::Comma);
        let g = self.parse_number(1.0);
        self.expect(Token::Comma);
        let b = self.parse_number(1.0);
        if self.peek() == Some(&Token::Comma) {
            // alpha is accepted and dropped
            self.consume();
            self.consume();
        }
        self.expect(Token::RBracket);
        self.expect(Token::RParen);
        self.expect(Token::LBrace);

        let mut child = self.require_child("color", ChildSide::Only)?;
        self.skip_semicolon();
        self.expect(Token::RBrace);

        child.set_color(Color::new(r, g, b));
        Ok(Some(child))
    }

    fn require_child(
        &mut self,
        parent: &str,
        side: ChildSide,
    ) -> std::result::Result<CsgNode, Structural> {
        match self.parse_expression()? {
            Some(node) => Ok(node),
            None => {
                self.report(DiagnosticKind::MissingChild {
                    parent: parent.to_string(),
                    side,
                });
                Err(Structural)
            }
        }
    }

    fn parse_primitive(&mut self, kind: PrimitiveKind) -> CsgNode {
        tracing::debug!(primitive = kind.keyword(), pos = self.pos, "parsing primitive");
        let params = self.parse_params();
        self.skip_semicolon();

        let named = bind_params(kind, params);
        let transform = match kind {
            PrimitiveKind::Sphere => self.sphere_transform(&named),
            PrimitiveKind::Cube => self.cube_transform(&named),
            PrimitiveKind::Cylinder => self.cylinder_transform(&named),
        };
        CsgNode::primitive_with_transform(kind, transform)
    }

    /// Read `( name = value, name value, bare, ... )`.
    fn parse_params(&mut self) -> Vec<Param> {
        self.expect(Token::LParen);
        let mut params = Vec::new();

        loop {
            match self.peek() {
                None
                | Some(Token::RParen)
                | Some(Token::Semicolon)
                | Some(Token::LBrace)
                | Some(Token::RBrace) => break,
                Some(Token::LBracket) => {
                    let at = self.pos;
                    let value = Value::Vector(self.parse_vector());
                    params.push(Param {
                        name: None,
                        value,
                        at,
                    });
                }
                Some(Token::Word(_)) => {
                    let at = self.pos;
                    let Some(Token::Word(word)) = self.consume() else {
                        break;
                    };
                    if self.peek() == Some(&Token::Equals) {
                        self.consume();
                        let at = self.pos;
                        if let Some(value) = self.parse_value() {
                            params.push(Param {
                                name: Some(word),
                                value,
                                at,
                            });
                        }
                    } else if is_key(&word)
                        && matches!(self.peek(), Some(Token::Word(_)) | Some(Token::LBracket))
                    {
                        let at = self.pos;
                        if let Some(value) = self.parse_value() {
                            params.push(Param {
                                name: Some(word),
                                value,
                                at,
                            });
                        }
                    } else {
                        params.push(Param {
                            name: None,
                            value: Value::Scalar(word),
                            at,
                        });
                    }
                }
                Some(other) => {
                    let found = other.to_string();
                    self.report(DiagnosticKind::UnexpectedToken {
                        expected: "parameter".into(),
                        found,
                    });
                    self.consume();
                }
            }

            if self.peek() == Some(&Token::Comma) {
                self.consume();
            }
        }

        self.expect(Token::RParen);
        params
    }

    fn parse_value(&mut self) -> Option<Value> {
        match self.peek() {
            Some(Token::LBracket) => Some(Value::Vector(self.parse_vector())),
            Some(Token::Word(_)) => match self.consume() {
                Some(Token::Word(w)) => Some(Value::Scalar(w)),
                _ => None,
            },
            other => {
                let found = other.map(Token::to_string).unwrap_or_default();
                self.report(DiagnosticKind::UnexpectedToken {
                    expected: "value".into(),
                    found,
                });
                None
            }
        }
    }

    /// Read `[ a, b, ... ]` as raw words.
    fn parse_vector(&mut self) -> Vec<String> {
        self.expect(Token::LBracket);
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBracket) => {
                    self.consume();
                    break;
                }
                Some(Token::Comma) => {
                    self.consume();
                }
                Some(Token::Word(_)) => {
                    if let Some(Token::Word(w)) = self.consume() {
                        items.push(w);
                    }
                }
                _ => {
                    self.expect(Token::RBracket);
                    break;
                }
            }
        }
        items
    }

    fn sphere_transform(&mut self, params: &[(String, Value, usize)]) -> Transform {
        let mut radius = 1.0;
        for (name, value, at) in params {
            match name.as_str() {
                "r" => radius = self.number_value(value, *at, radius),
                _ => skip_param(name),
            }
        }
        Transform::uniform_scale(radius)
    }

    fn cube_transform(&mut self, params: &[(String, Value, usize)]) -> Transform {
        let mut size = [1.0f32; 3];
        let mut center = true;
        for (name, value, at) in params {
            match name.as_str() {
                "size" => size = self.vec3_value(value, *at, size),
                "center" => center = self.bool_value(value, *at, center),
                _ => skip_param(name),
            }
        }

        let mut transform = Transform::scale(size[0], size[1], size[2]);
        if !center {
            transform = transform.then(&Transform::translation(0.5, 0.5, 0.5));
        }
        Transform::z_up_to_y_up().then(&transform)
    }

    fn cylinder_transform(&mut self, params: &[(String, Value, usize)]) -> Transform {
        let mut height = 1.0;
        let mut r1 = 1.0;
        let mut r2 = 1.0;
        let mut center = true;
        for (name, value, at) in params {
            match name.as_str() {
                "h" | "height" => height = self.number_value(value, *at, height),
                "r1" | "radius" => r1 = self.number_value(value, *at, r1),
                "r2" => r2 = self.number_value(value, *at, r2),
                "center" => center = self.bool_value(value, *at, center),
                _ => skip_param(name),
            }
        }
        if r2 != r1 {
            tracing::debug!(r1, r2, "cylinder r2 is not rendered, using r1");
        }

        let mut transform = Transform::scale(r1, height, r1);
        if !center {
            transform = transform.then(&Transform::translation(0.0, 0.5, 0.0));
        }
        transform
    }

    fn number_value(&mut self, value: &Value, at: usize, default: f32) -> f32 {
        match value {
            Value::Scalar(s) => self.number_text(s, at).unwrap_or(default),
            Value::Vector(_) => {
                self.report_at(DiagnosticKind::InvalidNumber(value.text()), at);
                default
            }
        }
    }

    fn vec3_value(&mut self, value: &Value, at: usize, default: [f32; 3]) -> [f32; 3] {
        match value {
            Value::Scalar(s) => self.number_text(s, at).map(|v| [v; 3]).unwrap_or(default),
            Value::Vector(items) if items.len() == 3 => {
                let mut out = default;
                for (slot, item) in out.iter_mut().zip(items) {
                    if let Some(v) = self.number_text(item, at) {
                        *slot = v;
                    }
                }
                out
            }
            Value::Vector(items) => {
                self.report_at(
                    DiagnosticKind::InvalidVector {
                        expected: 3,
                        found: items.len(),
                    },
                    at,
                );
                default
            }
        }
    }

    fn bool_value(&mut self, value: &Value, at: usize, default: bool) -> bool {
        match value {
            Value::Scalar(s) if s == "true" => true,
            Value::Scalar(s) if s == "false" => false,
            _ => {
                self.report_at(DiagnosticKind::InvalidBoolean(value.text()), at);
                default
            }
        }
    }

    fn number_text(&mut self, text: &str, at: usize) -> Option<f32> {
        match text.parse::<f32>() {
            Ok(v) if v.is_finite() => Some(v),
            _ => {
                self.report_at(DiagnosticKind::InvalidNumber(text.to_string()), at);
                None
            }
        }
    }

    /// Consume one token as a number. Failures are reported and give `default`.
    fn parse_number(&mut self, default: f32) -> f32 {
        let at = self.pos;
        match self.consume() {
            Some(Token::Word(w)) => self.number_text(&w, at).unwrap_or(default),
            Some(other) => {
                self.report_at(DiagnosticKind::InvalidNumber(other.to_string()), at);
                default
            }
            None => default,
        }
    }

    /// Read a 4x4 literal written row by row and move it into Y-up space.
    fn parse_matrix(&mut self) -> Transform {
        let mut values = [0.0f32; 16];
        self.expect(Token::LBracket);
        for row in 0..4 {
            self.expect(Token::LBracket);
            for col in 0..4 {
                values[row * 4 + col] = self.parse_number(0.0);
                if col < 3 {
                    self.expect(Token::Comma);
                }
            }
            self.expect(Token::RBracket);
            if row < 3 {
                self.expect(Token::Comma);
            }
        }
        self.expect(Token::RBracket);

        Transform::from_row_major(&values).to_y_up()
    }

    fn skip_semicolon(&mut self) {
        if self.peek() == Some(&Token::Semicolon) {
            self.consume();
        }
    }

    /// Token at the cursor, or `None` at end of input.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    /// Take the token at the cursor. At end of input this reports and
    /// returns `None` without failing.
    fn consume(&mut self) -> Option<Token> {
        match self.tokens.get(self.pos) {
            Some(t) => {
                let token = t.token.clone();
                self.pos += 1;
                Some(token)
            }
            None => {
                self.report(DiagnosticKind::UnexpectedEof);
                None
            }
        }
    }

    /// Consume `token` if it is next. Otherwise report and stay put.
    fn expect(&mut self, token: Token) {
        if self.peek() == Some(&token) {
            self.pos += 1;
        } else {
            let found = self.peek().map(Token::to_string).unwrap_or_default();
            self.report(DiagnosticKind::UnexpectedToken {
                expected: token.to_string(),
                found,
            });
        }
    }

    fn report(&mut self, kind: DiagnosticKind) {
        self.report_at(kind, self.pos);
    }

    fn report_at(&mut self, kind: DiagnosticKind, position: usize) {
        let location = self
            .tokens
            .get(position)
            .or_else(|| self.tokens.last())
            .map(|t| t.pos)
            .unwrap_or(Position { line: 1, col: 1 });
        let diagnostic = Diagnostic {
            kind,
            position,
            location,
        };
        tracing::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }
}

/// Resolve positional entries to names. Entries beyond the shape's
/// positional list are dropped.
fn bind_params(kind: PrimitiveKind, params: Vec<Param>) -> Vec<(String, Value, usize)> {
    let positional = positional_names(kind);
    let mut next_positional = 0;
    let mut named = Vec::with_capacity(params.len());

    for param in params {
        let name = match param.name {
            Some(name) => name,
            None => match positional.get(next_positional) {
                Some(name) => {
                    next_positional += 1;
                    name.to_string()
                }
                None => {
                    tracing::debug!(value = %param.value.text(), "skipping extra positional parameter");
                    continue;
                }
            },
        };
        named.push((name, param.value, param.at));
    }
    named
}

fn skip_param(name: &str) {
    tracing::debug!(name, "skipping unrecognized parameter");
}
