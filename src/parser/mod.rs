//! # Parser (C3)
//!
//! Hand-rolled recursive-descent parser for the pattern / view / query
//! surface syntax (`4.3` of the design). Whitespace-insensitive,
//! identifiers are case-preserving, string literals are double-quoted.
//! Keywords are matched case-insensitively, matching the capitalized style
//! used throughout the surface grammar (`MATCH`, `CONSTRUCT`, `SET`, ...).
//!
//! Errors always carry the byte offset they were raised at, via
//! [`GraphViewError::ParseError`].

use crate::ast::{
    CompareOp, ConstructElement, DeleteSpec, Expr, Literal, Mapping, Pattern, PatternEdge,
    PatternNode, PropertyPredicate, Query, RuleBlock, SkolemBinding, ViewDef, ViewKind,
};
use crate::error::{GraphViewError, Result};

/// A tiny character-position scanner shared by every grammar production
/// below. `pos` always points at the next unconsumed byte.
pub struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Parser { input, chars: input.chars().collect(), pos: 0 }
    }

    fn err(&self, msg: impl Into<String>) -> GraphViewError {
        GraphViewError::ParseError { pos: self.pos, msg: msg.into() }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn expect_char(&mut self, c: char) -> Result<()> {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.err(format!("expected '{c}'")))
        }
    }

    fn try_char(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Case-insensitive keyword match. Consumes the keyword (and any
    /// leading whitespace) only on success.
    fn try_keyword(&mut self, kw: &str) -> bool {
        self.skip_ws();
        let kw_chars: Vec<char> = kw.chars().collect();
        if self.pos + kw_chars.len() > self.chars.len() {
            return false;
        }
        for (i, kc) in kw_chars.iter().enumerate() {
            if self.chars[self.pos + i].to_ascii_uppercase() != kc.to_ascii_uppercase() {
                return false;
            }
        }
        // Require a word boundary after the keyword.
        if let Some(next) = self.peek_at(kw_chars.len()) {
            if next.is_alphanumeric() || next == '_' {
                return false;
            }
        }
        self.pos += kw_chars.len();
        true
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<()> {
        if self.try_keyword(kw) {
            Ok(())
        } else {
            Err(self.err(format!("expected keyword '{kw}'")))
        }
    }

    /// `[A-Za-z_][A-Za-z0-9_]*`
    fn parse_ident(&mut self) -> Result<String> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {
                self.pos += 1;
            }
            _ => return Err(self.err("expected identifier")),
        }
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_string_literal(&mut self) -> Result<String> {
        self.skip_ws();
        self.expect_char('"')?;
        let mut s = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some(c) => s.push(c),
                None => return Err(self.err("unterminated string literal")),
            }
        }
        Ok(s)
    }

    fn at_keyword(&mut self, kw: &str) -> bool {
        let save = self.pos;
        let hit = self.try_keyword(kw);
        self.pos = save;
        hit
    }

    // ------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------

    /// `pattern := patternChain ("," patternChain)*`
    /// `patternChain := node (edge node)*`
    pub fn parse_pattern(&mut self) -> Result<Pattern> {
        let mut pattern = Pattern::new();
        loop {
            self.parse_pattern_chain(&mut pattern)?;
            self.skip_ws();
            if self.try_char(',') {
                continue;
            }
            break;
        }
        Ok(pattern)
    }

    fn parse_pattern_chain(&mut self, pattern: &mut Pattern) -> Result<()> {
        let mut prev_var = self.parse_pattern_node(pattern)?;
        loop {
            self.skip_ws();
            if self.peek() != Some('-') {
                break;
            }
            let (edge_var, next_var) = self.parse_pattern_edge_and_node(pattern, &prev_var)?;
            let _ = edge_var;
            prev_var = next_var;
        }
        Ok(())
    }

    /// `(var[:Label][props])`
    fn parse_pattern_node(&mut self, pattern: &mut Pattern) -> Result<String> {
        self.expect_char('(')?;
        let var = self.parse_ident()?;
        let label = if self.try_char(':') { Some(self.parse_ident()?) } else { None };
        let props = self.parse_optional_props(&var)?;
        self.expect_char(')')?;
        if !pattern.nodes.iter().any(|n| n.var == var) {
            pattern.nodes.push(PatternNode { var: var.clone(), label, props });
        }
        Ok(var)
    }

    /// `-[var[:Label][*]]->(var2[:Label2][props])`
    fn parse_pattern_edge_and_node(
        &mut self,
        pattern: &mut Pattern,
        src: &str,
    ) -> Result<(String, String)> {
        self.expect_char('-')?;
        self.expect_char('[')?;
        let var = self.parse_ident()?;
        let label = if self.try_char(':') { Some(self.parse_ident()?) } else { None };
        let star = self.try_char('*');
        let props = self.parse_optional_props(&var)?;
        self.expect_char(']')?;
        self.expect_char('-')?;
        self.expect_char('>')?;
        let dst = self.parse_pattern_node(pattern)?;
        pattern.edges.push(PatternEdge {
            var: var.clone(),
            src: src.to_string(),
            dst: dst.clone(),
            label,
            star,
            props,
        });
        Ok((var, dst))
    }

    /// Optional inline property predicates: `{key op "value", ...}`.
    fn parse_optional_props(&mut self, var: &str) -> Result<Vec<PropertyPredicate>> {
        self.skip_ws();
        if self.peek() != Some('{') {
            return Ok(Vec::new());
        }
        self.pos += 1;
        let mut props = Vec::new();
        loop {
            self.skip_ws();
            if self.try_char('}') {
                break;
            }
            let key = self.parse_ident()?;
            let op = self.parse_compare_op()?;
            let rhs = self.parse_scalar_expr(var)?;
            props.push(PropertyPredicate { key, op, rhs });
            self.skip_ws();
            if !self.try_char(',') {
                self.expect_char('}')?;
                break;
            }
        }
        Ok(props)
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp> {
        self.skip_ws();
        if self.try_keyword(">=") || self.try_char_seq(">=") {
            return Ok(CompareOp::Ge);
        }
        if self.try_char_seq("<=") {
            return Ok(CompareOp::Le);
        }
        if self.try_char_seq("!=") {
            return Ok(CompareOp::Ne);
        }
        if self.try_char_seq("==") || self.peek() == Some('=') {
            self.try_char('=');
            return Ok(CompareOp::Eq);
        }
        match self.peek() {
            Some('>') => {
                self.pos += 1;
                Ok(CompareOp::Gt)
            }
            Some('<') => {
                self.pos += 1;
                Ok(CompareOp::Lt)
            }
            _ => Err(self.err("expected comparison operator")),
        }
    }

    fn try_char_seq(&mut self, seq: &str) -> bool {
        self.skip_ws();
        let sc: Vec<char> = seq.chars().collect();
        if self.pos + sc.len() > self.chars.len() {
            return false;
        }
        if self.chars[self.pos..self.pos + sc.len()] == sc[..] {
            self.pos += sc.len();
            true
        } else {
            false
        }
    }

    /// `var.key` as an `Expr::Ref`, a string/number literal, or a fresh
    /// implicit reference to `var`'s own key (used by inline `{key op
    /// val}` props where the left side is implicit).
    fn parse_scalar_expr(&mut self, implicit_var: &str) -> Result<Expr> {
        let _ = implicit_var;
        self.parse_atom_expr()
    }

    fn parse_atom_expr(&mut self) -> Result<Expr> {
        self.skip_ws();
        if self.peek() == Some('"') {
            return Ok(Expr::Lit(Literal::String(self.parse_string_literal()?)));
        }
        if matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '-') {
            return Ok(Expr::Lit(Literal::Number(self.parse_number()?)));
        }
        let var = self.parse_ident()?;
        if self.try_char('.') {
            let key = self.parse_ident()?;
            Ok(Expr::Ref(var, key))
        } else {
            // Bare identifier: treat as a string literal constant, matching
            // the source-language convention that lowercase bare atoms are
            // constants rather than references.
            Ok(Expr::Lit(Literal::String(var)))
        }
    }

    fn parse_number(&mut self) -> Result<f64> {
        self.skip_ws();
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .parse::<f64>()
            .map_err(|_| self.err("invalid number literal"))
    }

    // ------------------------------------------------------------------
    // WHERE expressions: comparison ( (AND|OR) comparison )*
    // ------------------------------------------------------------------

    pub fn parse_where_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_comparison()?;
        loop {
            self.skip_ws();
            if self.try_keyword("AND") {
                let rhs = self.parse_comparison()?;
                lhs = Expr::BinOp(CompareOp::And, Box::new(lhs), Box::new(rhs));
            } else if self.try_keyword("OR") {
                let rhs = self.parse_comparison()?;
                lhs = Expr::BinOp(CompareOp::Or, Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let lhs = self.parse_ref_or_lit()?;
        let op = self.parse_compare_op()?;
        let rhs = self.parse_ref_or_lit()?;
        Ok(Expr::BinOp(op, Box::new(lhs), Box::new(rhs)))
    }

    fn parse_ref_or_lit(&mut self) -> Result<Expr> {
        self.parse_atom_expr()
    }

    // ------------------------------------------------------------------
    // Rule blocks and views
    // ------------------------------------------------------------------

    /// `ruleBlock := match [where] [mapping*] [construct] [add*] [delete*] [set*]`
    pub fn parse_rule_block(&mut self) -> Result<RuleBlock> {
        self.expect_keyword("MATCH")?;
        let pattern = self.parse_pattern()?;

        let where_expr = if self.at_keyword("WHERE") {
            self.expect_keyword("WHERE")?;
            Some(self.parse_where_expr()?)
        } else {
            None
        };

        let mut mappings = Vec::new();
        while self.at_keyword("MAP") {
            self.expect_keyword("MAP")?;
            let from = self.parse_ident()?;
            self.expect_char('-')?;
            self.expect_char('>')?;
            let to = self.parse_ident()?;
            mappings.push(Mapping { from, to });
        }

        let construct = if self.at_keyword("CONSTRUCT") {
            self.expect_keyword("CONSTRUCT")?;
            self.parse_construct_list()?
        } else {
            Vec::new()
        };

        let mut adds = Vec::new();
        while self.at_keyword("ADD") {
            self.expect_keyword("ADD")?;
            adds.extend(self.parse_construct_list()?);
        }

        let mut deletes = Vec::new();
        while self.at_keyword("DELETE") {
            self.expect_keyword("DELETE")?;
            self.expect_char('(')?;
            let target_var = self.parse_ident()?;
            self.expect_char(')')?;
            deletes.push(DeleteSpec { target_var });
        }

        let mut skolems = Vec::new();
        while self.at_keyword("SET") {
            self.expect_keyword("SET")?;
            let var = self.parse_ident()?;
            self.expect_char('=')?;
            self.expect_keyword("SK")?;
            self.expect_char('(')?;
            let fn_name = self.parse_string_literal()?;
            let mut args = Vec::new();
            while self.try_char(',') {
                args.push(self.parse_ident()?);
            }
            self.expect_char(')')?;
            skolems.push(SkolemBinding { var, fn_name, args });
        }

        Ok(RuleBlock { pattern, where_expr, mappings, construct, adds, deletes, skolems })
    }

    /// A construct pattern list shares the node/edge grammar but every
    /// element requires an explicit label.
    fn parse_construct_list(&mut self) -> Result<Vec<ConstructElement>> {
        let mut out = Vec::new();
        loop {
            self.expect_char('(')?;
            let var = self.parse_ident()?;
            self.expect_char(':')?;
            let label = self.parse_ident()?;
            self.expect_char(')')?;

            self.skip_ws();
            if self.peek() == Some('-') {
                self.expect_char('-')?;
                self.expect_char('[')?;
                let edge_var = self.parse_ident()?;
                self.expect_char(':')?;
                let edge_label = self.parse_ident()?;
                self.expect_char(']')?;
                self.expect_char('-')?;
                self.expect_char('>')?;
                self.expect_char('(')?;
                let dst_var = self.parse_ident()?;
                self.expect_char(':')?;
                let _dst_label = self.parse_ident()?;
                self.expect_char(')')?;
                out.push(ConstructElement::Edge {
                    var: edge_var,
                    src: var,
                    dst: dst_var,
                    label: edge_label,
                });
            } else {
                out.push(ConstructElement::Node { var, label });
            }

            self.skip_ws();
            if !self.try_char(',') {
                break;
            }
        }
        Ok(out)
    }

    /// `view := "CREATE" kind "VIEW" Id "ON" Id ["WITH" "DEFAULT" "MAP"]
    ///          "(" ruleBlock ("UNION" ruleBlock)* ")"`
    pub fn parse_view_def(&mut self) -> Result<ViewDef> {
        self.expect_keyword("CREATE")?;
        let kind = if self.try_keyword("VIRTUAL") {
            ViewKind::Virtual
        } else if self.try_keyword("MATERIALIZED") {
            ViewKind::Materialized
        } else if self.try_keyword("HYBRID") {
            ViewKind::Hybrid
        } else {
            return Err(self.err("expected view kind (virtual|materialized|hybrid)"));
        };
        self.expect_keyword("VIEW")?;
        let name = self.parse_ident()?;
        self.expect_keyword("ON")?;
        let source = self.parse_ident()?;

        let with_default_map = if self.at_keyword("WITH") {
            self.expect_keyword("WITH")?;
            self.expect_keyword("DEFAULT")?;
            self.expect_keyword("MAP")?;
            true
        } else {
            false
        };

        self.expect_char('(')?;
        let mut blocks = vec![self.parse_rule_block()?];
        while self.at_keyword("UNION") {
            self.expect_keyword("UNION")?;
            blocks.push(self.parse_rule_block()?);
        }
        self.expect_char(')')?;

        Ok(ViewDef { name, source, kind, with_default_map, blocks })
    }

    /// `query := "MATCH" pattern "FROM" Id ["WHERE" expr]
    ///           "RETURN" (var){,(var)}`
    pub fn parse_query(&mut self) -> Result<Query> {
        self.expect_keyword("MATCH")?;
        let pattern = self.parse_pattern()?;
        self.expect_keyword("FROM")?;
        let source = self.parse_ident()?;
        let where_expr = if self.at_keyword("WHERE") {
            self.expect_keyword("WHERE")?;
            Some(self.parse_where_expr()?)
        } else {
            None
        };
        self.expect_keyword("RETURN")?;
        let mut returns = Vec::new();
        loop {
            self.expect_char('(')?;
            returns.push(self.parse_ident()?);
            self.expect_char(')')?;
            self.skip_ws();
            if !self.try_char(',') {
                break;
            }
        }
        Ok(Query { pattern, source, where_expr, returns })
    }

    /// Confirm the parser consumed the whole input (ignoring a single
    /// trailing `.` and whitespace), surfacing leftover garbage as an error.
    pub fn expect_end(&mut self) -> Result<()> {
        self.skip_ws();
        self.try_char('.');
        self.skip_ws();
        if self.eof() {
            Ok(())
        } else {
            Err(self.err(format!(
                "unexpected trailing input: {:?}",
                &self.input[self.pos.min(self.input.len())..]
            )))
        }
    }
}

/// Parse a complete `CREATE ... VIEW` statement.
pub fn parse_view(input: &str) -> Result<ViewDef> {
    let mut p = Parser::new(input);
    let view = p.parse_view_def()?;
    p.expect_end()?;
    Ok(view)
}

/// Parse a complete `MATCH ... FROM ... RETURN ...` statement.
pub fn parse_query(input: &str) -> Result<Query> {
    let mut p = Parser::new(input);
    let query = p.parse_query()?;
    p.expect_end()?;
    Ok(query)
}

/// Parse a bare pattern (used by tests and by embedders).
pub fn parse_pattern(input: &str) -> Result<Pattern> {
    let mut p = Parser::new(input);
    let pattern = p.parse_pattern()?;
    p.expect_end()?;
    Ok(pattern)
}
