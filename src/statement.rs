//! # Surface Statement Grammar
//!
//! The REPL/CLI command language: session management (`connect`,
//! `create graph`, `use`, `list`), schema (`create node`, `create edge`,
//! `schema`), data (`insert N|E|NP|EP`, `import ... from "..."`), views
//! (`CREATE ... VIEW`, `drop view`, `views`), queries (`MATCH ... FROM ...
//! RETURN ...`), and session options (`option <name> on|off`, `program`,
//! `egds`, `quit`). View/query bodies are delegated to [`crate::parser`];
//! everything else is scanned by hand in the same small-function style
//! (`split_top_level`, `parse_call`) as the pattern grammar.

use crate::ast::{Query, ViewDef};
use crate::error::{GraphViewError, Result};
use crate::parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Node,
    Edge,
    NodeProp,
    EdgeProp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Connect(String),
    Disconnect,
    CreateGraph(String),
    DropGraph(String),
    UseGraph(String),
    ListGraphs,
    CreateNodeLabel(String),
    CreateEdgeLabel { label: String, src: String, dst: String },
    Schema,
    InsertNode { id: String, label: String },
    InsertEdge { id: String, src: String, dst: String, label: String },
    InsertNodeProp { node_id: String, key: String, value: String },
    InsertEdgeProp { edge_id: String, key: String, value: String },
    Import { relation: Relation, path: String },
    CreateView(ViewDef),
    DropView(String),
    Query(Query),
    ListViews,
    Program,
    Egds,
    OptionSet { name: String, on: bool },
    Quit,
}

fn err(msg: impl Into<String>) -> GraphViewError {
    GraphViewError::ParseError { pos: 0, msg: msg.into() }
}

/// Split a line on whitespace, treating a `"..."` span as one token
/// (quotes retained so callers can tell a quoted literal from a bare word).
fn split_top_level(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => {
                current.push(c);
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn unquote(token: &str) -> String {
    token.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(token).to_string()
}

/// Parse `Name(arg1, arg2, ...)` into its name and comma-split arguments,
/// each individually unquoted and trimmed.
fn parse_call(s: &str) -> Result<(String, Vec<String>)> {
    let open = s.find('(').ok_or_else(|| err("expected '('"))?;
    let close = s.rfind(')').ok_or_else(|| err("expected ')'"))?;
    if close < open {
        return Err(err("mismatched parentheses"));
    }
    let name = s[..open].trim().to_string();
    let inner = &s[open + 1..close];
    let args = split_by_comma(inner).into_iter().map(|a| unquote(a.trim())).collect();
    Ok((name, args))
}

/// Split on top-level commas (none of our call arguments nest parens or
/// contain commas inside quotes other than the field separator itself).
fn split_by_comma(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn starts_with_keyword(line: &str, kw: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.len() < kw.len() {
        return false;
    }
    trimmed[..kw.len()].eq_ignore_ascii_case(kw)
        && trimmed[kw.len()..].chars().next().map_or(true, |c| c.is_whitespace() || c == '(')
}

/// Parse one complete surface statement.
///
/// # Errors
/// Returns [`GraphViewError::ParseError`] for malformed input.
pub fn parse_statement(line: &str) -> Result<Statement> {
    let trimmed = line.trim().trim_end_matches('.').trim();
    if trimmed.is_empty() {
        return Err(err("empty statement"));
    }

    if starts_with_keyword(trimmed, "MATCH") {
        return Ok(Statement::Query(parser::parse_query(trimmed)?));
    }
    if starts_with_keyword(trimmed, "CREATE")
        && (starts_with_keyword(&trimmed[6..].trim_start(), "VIRTUAL")
            || starts_with_keyword(&trimmed[6..].trim_start(), "MATERIALIZED")
            || starts_with_keyword(&trimmed[6..].trim_start(), "HYBRID"))
    {
        return Ok(Statement::CreateView(parser::parse_view(trimmed)?));
    }

    let tokens = split_top_level(trimmed);
    let head = tokens[0].to_ascii_lowercase();

    match head.as_str() {
        "connect" => {
            let backend = tokens.get(1).ok_or_else(|| err("expected backend name"))?;
            Ok(Statement::Connect(unquote(backend)))
        }
        "disconnect" => Ok(Statement::Disconnect),
        "quit" | "exit" => Ok(Statement::Quit),
        "list" => Ok(Statement::ListGraphs),
        "views" => Ok(Statement::ListViews),
        "program" => Ok(Statement::Program),
        "egds" => Ok(Statement::Egds),
        "schema" => Ok(Statement::Schema),
        "use" => {
            let name = tokens.get(1).ok_or_else(|| err("expected graph name"))?;
            Ok(Statement::UseGraph(unquote(name)))
        }
        "create" => parse_create(&tokens, trimmed),
        "drop" => parse_drop(&tokens),
        "insert" => parse_insert(trimmed),
        "import" => parse_import(&tokens),
        "option" => parse_option(&tokens),
        other => Err(err(format!("unrecognized statement: {other}"))),
    }
}

fn parse_create(tokens: &[String], trimmed: &str) -> Result<Statement> {
    match tokens.get(1).map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("graph") => {
            let name = tokens.get(2).ok_or_else(|| err("expected graph name"))?;
            Ok(Statement::CreateGraph(unquote(name)))
        }
        Some("node") => {
            let label = tokens.get(2).ok_or_else(|| err("expected node label"))?;
            Ok(Statement::CreateNodeLabel(unquote(label)))
        }
        Some("edge") => {
            // `create edge Label(Src -> Dst)`
            let rest = trimmed
                .splitn(3, char::is_whitespace)
                .nth(2)
                .ok_or_else(|| err("expected edge label definition"))?;
            let open = rest.find('(').ok_or_else(|| err("expected '(' in edge definition"))?;
            let close = rest.rfind(')').ok_or_else(|| err("expected ')' in edge definition"))?;
            let label = rest[..open].trim().to_string();
            let inner = &rest[open + 1..close];
            let (src, dst) = inner
                .split_once("->")
                .ok_or_else(|| err("expected 'Src -> Dst' in edge definition"))?;
            Ok(Statement::CreateEdgeLabel {
                label,
                src: src.trim().to_string(),
                dst: dst.trim().to_string(),
            })
        }
        _ => Err(err("expected 'graph', 'node', or 'edge' after 'create'")),
    }
}

fn parse_drop(tokens: &[String]) -> Result<Statement> {
    match tokens.get(1).map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("graph") => {
            let name = tokens.get(2).ok_or_else(|| err("expected graph name"))?;
            Ok(Statement::DropGraph(unquote(name)))
        }
        Some("view") => {
            let name = tokens.get(2).ok_or_else(|| err("expected view name"))?;
            Ok(Statement::DropView(unquote(name)))
        }
        _ => Err(err("expected 'graph' or 'view' after 'drop'")),
    }
}

fn parse_insert(trimmed: &str) -> Result<Statement> {
    let rest = trimmed[6..].trim_start();
    let (name, args) = parse_call(rest)?;
    match name.to_ascii_uppercase().as_str() {
        "N" => {
            let [id, label] = take2(&args, "N(id, label)")?;
            Ok(Statement::InsertNode { id, label })
        }
        "E" => {
            if args.len() != 4 {
                return Err(err("expected E(id, src, dst, label)"));
            }
            Ok(Statement::InsertEdge {
                id: args[0].clone(),
                src: args[1].clone(),
                dst: args[2].clone(),
                label: args[3].clone(),
            })
        }
        "NP" => {
            if args.len() != 3 {
                return Err(err("expected NP(node_id, key, value)"));
            }
            Ok(Statement::InsertNodeProp {
                node_id: args[0].clone(),
                key: args[1].clone(),
                value: args[2].clone(),
            })
        }
        "EP" => {
            if args.len() != 3 {
                return Err(err("expected EP(edge_id, key, value)"));
            }
            Ok(Statement::InsertEdgeProp {
                edge_id: args[0].clone(),
                key: args[1].clone(),
                value: args[2].clone(),
            })
        }
        other => Err(err(format!("unknown insert relation '{other}'"))),
    }
}

fn take2(args: &[String], expected: &str) -> Result<[String; 2]> {
    if args.len() != 2 {
        return Err(err(format!("expected {expected}")));
    }
    Ok([args[0].clone(), args[1].clone()])
}

fn parse_import(tokens: &[String]) -> Result<Statement> {
    let relation = match tokens.get(1).map(|s| s.to_ascii_uppercase()).as_deref() {
        Some("N") => Relation::Node,
        Some("E") => Relation::Edge,
        Some("NP") => Relation::NodeProp,
        Some("EP") => Relation::EdgeProp,
        _ => return Err(err("expected 'N', 'E', 'NP', or 'EP' after 'import'")),
    };
    if tokens.get(2).map(|s| s.to_ascii_lowercase()).as_deref() != Some("from") {
        return Err(err("expected 'from' after relation name"));
    }
    let path = tokens.get(3).ok_or_else(|| err("expected a quoted path"))?;
    Ok(Statement::Import { relation, path: unquote(path) })
}

fn parse_option(tokens: &[String]) -> Result<Statement> {
    let name = tokens.get(1).ok_or_else(|| err("expected option name"))?.clone();
    let state = tokens.get(2).ok_or_else(|| err("expected 'on' or 'off'"))?.to_ascii_lowercase();
    let on = match state.as_str() {
        "on" => true,
        "off" => false,
        _ => return Err(err("expected 'on' or 'off'")),
    };
    Ok(Statement::OptionSet { name, on })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_create_graph() {
        assert_eq!(parse_statement("create graph g1").unwrap(), Statement::CreateGraph("g1".into()));
    }

    #[test]
    fn parses_create_edge_label_with_endpoints() {
        let stmt = parse_statement("create edge Knows(Person -> Person)").unwrap();
        assert_eq!(
            stmt,
            Statement::CreateEdgeLabel { label: "Knows".into(), src: "Person".into(), dst: "Person".into() }
        );
    }

    #[test]
    fn parses_insert_node() {
        let stmt = parse_statement(r#"insert N(1, "Person")"#).unwrap();
        assert_eq!(stmt, Statement::InsertNode { id: "1".into(), label: "Person".into() });
    }

    #[test]
    fn parses_insert_edge() {
        let stmt = parse_statement(r#"insert E(e1, 1, 2, "Knows")"#).unwrap();
        assert_eq!(
            stmt,
            Statement::InsertEdge { id: "e1".into(), src: "1".into(), dst: "2".into(), label: "Knows".into() }
        );
    }

    #[test]
    fn parses_import() {
        let stmt = parse_statement(r#"import N from "nodes.csv""#).unwrap();
        assert_eq!(stmt, Statement::Import { relation: Relation::Node, path: "nodes.csv".into() });
    }

    #[test]
    fn parses_option_toggle() {
        assert_eq!(
            parse_statement("option typecheck on").unwrap(),
            Statement::OptionSet { name: "typecheck".into(), on: true }
        );
    }

    #[test]
    fn parses_query_statement() {
        let stmt =
            parse_statement(r#"MATCH (a:Person) FROM g RETURN (a)"#).unwrap();
        assert!(matches!(stmt, Statement::Query(_)));
    }

    #[test]
    fn parses_view_statement() {
        let stmt = parse_statement(
            r#"CREATE virtual VIEW D ON g (MATCH (a:Person) CONSTRUCT (a:Person))"#,
        )
        .unwrap();
        assert!(matches!(stmt, Statement::CreateView(_)));
    }

    #[test]
    fn unrecognized_statement_is_rejected() {
        assert!(parse_statement("frobnicate everything").is_err());
    }
}
