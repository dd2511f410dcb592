//! `graphview` - an interactive shell (and batch runner) for the property
//! graph view engine. Thin by design: all of the actual logic lives in the
//! library crate; this binary wires a [`Session`] and a
//! [`backend::reference::ReferenceBackend`] to stdin/stdout (or a script
//! file) and maps [`GraphViewError`] to the documented exit codes.

use clap::Parser as ClapParser;
use graphview::backend::reference::ReferenceBackend;
use graphview::backend::Backend;
use graphview::config::AppConfig;
use graphview::error::GraphViewError;
use graphview::execution::Deadline;
use graphview::session::Session;
use graphview::statement::{self, Statement};
use graphview::typecheck::TypePolicy;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[derive(ClapParser, Debug)]
#[command(name = "graphview", about = "A property-graph view engine shell")]
struct Cli {
    /// Path to a flat `key = value` config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run statements from a script file instead of reading stdin
    /// interactively; exits with the first error's documented exit code.
    #[arg(long)]
    script: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let config = match graphview::config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(2);
        }
    };

    init_tracing(&config.log_level);
    info!(log_level = %config.log_level, "graphview starting");

    if config.platform != "reference" {
        eprintln!("unsupported platform '{}': only 'reference' is implemented", config.platform);
        std::process::exit(GraphViewError::BackendError(config.platform).exit_code());
    }

    let mut app = App::new(config);
    if let Some(workspace) = app.config.workspace.clone() {
        if app.session.create_graph(workspace.clone()).is_ok() {
            let _ = app.session.use_graph(&workspace);
        }
    }

    let exit_code = if let Some(path) = cli.script {
        match std::fs::read_to_string(&path) {
            Ok(contents) => app.run_script(&contents),
            Err(e) => {
                eprintln!("could not read script '{}': {e}", path.display());
                2
            }
        }
    } else {
        app.run_repl()
    };

    std::process::exit(exit_code);
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}

struct App {
    config: AppConfig,
    session: Session,
    backend: ReferenceBackend,
}

impl App {
    fn new(config: AppConfig) -> Self {
        let mut backend = ReferenceBackend::new();
        let _ = backend.open();
        App { config, session: Session::new(), backend }
    }

    fn policy(&self) -> TypePolicy {
        TypePolicy { typecheck: self.config.typecheck, prunequery: self.config.prunequery }
    }

    fn deadline(&self) -> Deadline {
        if self.config.timeout_ms == 0 {
            Deadline::none()
        } else {
            Deadline::with_timeout(
                graphview::execution::CancelToken::new(),
                Duration::from_millis(self.config.timeout_ms),
            )
        }
    }

    /// Returns the process exit code.
    fn run_repl(&mut self) -> i32 {
        let stdin = io::stdin();
        print!("graphview> ");
        let _ = io::stdout().flush();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                print!("graphview> ");
                let _ = io::stdout().flush();
                continue;
            }
            match self.execute_line(&line) {
                Ok(Some(output)) => println!("{output}"),
                Ok(None) => {}
                Err(e) if matches!(e, GraphViewError::Cancelled) && should_quit(&line) => {
                    return 0;
                }
                Err(e) => {
                    error!(error = %e, "command failed");
                    println!("error: {e}");
                }
            }
            print!("graphview> ");
            let _ = io::stdout().flush();
        }
        0
    }

    /// Run every line of a script, stopping and returning the documented
    /// exit code at the first error.
    fn run_script(&mut self, contents: &str) -> i32 {
        for line in contents.lines() {
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            match self.execute_line(line) {
                Ok(Some(output)) => println!("{output}"),
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "script command failed");
                    eprintln!("error: {e}");
                    return e.exit_code();
                }
            }
        }
        0
    }

    fn execute_line(&mut self, line: &str) -> Result<Option<String>, GraphViewError> {
        let statement = statement::parse_statement(line)?;
        if matches!(statement, Statement::Quit) {
            return Ok(Some("bye".to_string()));
        }
        self.dispatch(statement)
    }

    fn dispatch(&mut self, statement: Statement) -> Result<Option<String>, GraphViewError> {
        match statement {
            Statement::Connect(name) => {
                if name != "reference" {
                    return Err(GraphViewError::BackendError(format!("unknown backend '{name}'")));
                }
                Ok(Some(format!("connected to {name}")))
            }
            Statement::Disconnect => {
                self.backend.close()?;
                Ok(Some("disconnected".to_string()))
            }
            Statement::CreateGraph(name) => {
                self.session.create_graph(name.clone())?;
                Ok(Some(format!("created graph {name}")))
            }
            Statement::DropGraph(name) => {
                self.session.drop_graph(&name)?;
                Ok(Some(format!("dropped graph {name}")))
            }
            Statement::UseGraph(name) => {
                self.session.use_graph(&name)?;
                Ok(Some(format!("using {name}")))
            }
            Statement::ListGraphs => {
                let mut names = self.session.list_graphs();
                names.sort_unstable();
                Ok(Some(names.join("\n")))
            }
            Statement::CreateNodeLabel(label) => {
                let handle = self.session.current_handle()?;
                handle.write().schema.add_node_label(label.clone());
                Ok(Some(format!("created node label {label}")))
            }
            Statement::CreateEdgeLabel { label, src, dst } => {
                let handle = self.session.current_handle()?;
                handle.write().schema.add_edge_label(label.clone(), src, dst)?;
                Ok(Some(format!("created edge label {label}")))
            }
            Statement::Schema => {
                let handle = self.session.current_handle()?;
                let guard = handle.read();
                let mut lines: Vec<String> = guard.schema.node_labels().map(|l| format!("node {l}")).collect();
                lines.extend(guard.schema.edge_labels().map(|l| format!("edge {l}")));
                lines.sort();
                Ok(Some(lines.join("\n")))
            }
            Statement::InsertNode { id, label } => {
                let handle = self.session.current_handle()?;
                handle.write().insert_node(id, label)?;
                Ok(None)
            }
            Statement::InsertEdge { id, src, dst, label } => {
                let handle = self.session.current_handle()?;
                handle.write().insert_edge(id, src, dst, label)?;
                Ok(None)
            }
            Statement::InsertNodeProp { node_id, key, value } => {
                let handle = self.session.current_handle()?;
                handle.write().insert_node_prop(node_id, key, value)?;
                Ok(None)
            }
            Statement::InsertEdgeProp { edge_id, key, value } => {
                let handle = self.session.current_handle()?;
                handle.write().insert_edge_prop(edge_id, key, value)?;
                Ok(None)
            }
            Statement::Import { relation, path } => self.run_import(relation, &path).map(Some),
            Statement::CreateView(def) => {
                let handle = self.session.current_handle()?;
                let mut graph = handle.write();
                let schema = graph.schema.clone();
                graph.catalog.register(def.clone(), &schema, self.policy())?;
                Ok(Some(format!("created view {}", def.name)))
            }
            Statement::DropView(name) => {
                let handle = self.session.current_handle()?;
                handle.write().catalog.drop_view(&name)?;
                Ok(Some(format!("dropped view {name}")))
            }
            Statement::ListViews => {
                let handle = self.session.current_handle()?;
                let guard = handle.read();
                let mut names: Vec<String> = guard.catalog.names().into_iter().map(str::to_string).collect();
                names.sort();
                Ok(Some(names.join("\n")))
            }
            Statement::Program | Statement::Egds => {
                Ok(Some("not implemented by the reference backend".to_string()))
            }
            Statement::OptionSet { name, on } => {
                match name.as_str() {
                    "typecheck" => self.config.typecheck = on,
                    "prunequery" => self.config.prunequery = on,
                    other => return Err(GraphViewError::BackendError(format!("unknown option '{other}'"))),
                }
                Ok(Some(format!("{name} = {on}")))
            }
            Statement::Quit => unreachable!("handled in execute_line"),
            Statement::Query(query) => self.run_query(query).map(Some),
        }
    }

    fn run_import(&mut self, relation: graphview::statement::Relation, path: &str) -> Result<String, GraphViewError> {
        use graphview::csv_io::{self, EDGE_COLUMNS, EDGE_PROP_COLUMNS, NODE_COLUMNS, NODE_PROP_COLUMNS};
        use graphview::statement::Relation;

        let contents = std::fs::read_to_string(path)
            .map_err(|e| GraphViewError::BackendError(format!("reading '{path}': {e}")))?;
        let rows = csv_io::parse_csv(&contents)?;
        let handle = self.session.current_handle()?;
        let mut graph = handle.write();
        let mut count = 0;
        match relation {
            Relation::Node => {
                for row in csv_io::strip_known_header(&rows, &NODE_COLUMNS) {
                    graph.insert_node(row[0].clone(), row[1].clone())?;
                    count += 1;
                }
            }
            Relation::Edge => {
                for row in csv_io::strip_known_header(&rows, &EDGE_COLUMNS) {
                    graph.insert_edge(row[0].clone(), row[1].clone(), row[2].clone(), row[3].clone())?;
                    count += 1;
                }
            }
            Relation::NodeProp => {
                for row in csv_io::strip_known_header(&rows, &NODE_PROP_COLUMNS) {
                    graph.insert_node_prop(row[0].clone(), row[1].clone(), row[2].clone())?;
                    count += 1;
                }
            }
            Relation::EdgeProp => {
                for row in csv_io::strip_known_header(&rows, &EDGE_PROP_COLUMNS) {
                    graph.insert_edge_prop(row[0].clone(), row[1].clone(), row[2].clone())?;
                    count += 1;
                }
            }
        }
        Ok(format!("imported {count} rows from {path}"))
    }

    fn run_query(&mut self, query: graphview::ast::Query) -> Result<String, GraphViewError> {
        let handle = self.session.current_handle()?;
        let graph = handle.read();

        let check = graphview::typecheck::check_pattern(&query.pattern, &graph.schema);
        if !graphview::typecheck::apply_policy(&check, self.policy())? {
            return Ok(String::new());
        }

        let view = graphview::ast::ViewDef {
            name: "__query".to_string(),
            source: query.source.clone(),
            kind: graphview::ast::ViewKind::Virtual,
            with_default_map: true,
            blocks: vec![graphview::ast::RuleBlock {
                pattern: query.pattern.clone(),
                where_expr: query.where_expr.clone(),
                ..graphview::ast::RuleBlock::default()
            }],
        };

        let mut rules = if graph.catalog.contains(&query.source) {
            graphview::rewriter::unfold_view(&graph.catalog, &query.source)?
        } else {
            Vec::new()
        };
        rules.extend(graphview::compiler::compile_view(
            &view,
            &graph.schema,
            self.policy(),
            graphview::ir::RuleTag::Virtual,
        )?);
        rules.extend(graphview::compiler::transitive_closure_rules(&view, graphview::ir::RuleTag::Virtual));

        let program = graphview::assembler::assemble(rules)?;
        drop(graph);

        let base_facts = self.session.current_handle()?.read().base_facts(&query.source);
        self.backend.insert_facts(&query.source, base_facts)?;

        let deadline = self.deadline();
        let node_facts = self.backend.evaluate(&program, "N___query", &deadline)?;
        let edge_facts = self.backend.evaluate(&program, "E___query", &deadline)?;

        if !self.config.answer {
            return Ok(format!("{}", node_facts.len() + edge_facts.len()));
        }

        let mut lines: Vec<String> = Vec::new();
        for atom in node_facts.iter().chain(edge_facts.iter()) {
            lines.push(format!("{:?}", atom.args));
        }
        Ok(lines.join("\n"))
    }
}

fn should_quit(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "quit" | "exit")
}
