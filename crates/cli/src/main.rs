use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use compass_canvas::{to_mermaid, GraphSynchronizer, LayoutConfig, LayoutEngine, Orientation};
use compass_enhancer::{
    EnhancementScheduler, EnhancerConfig, NoopSuggester, RelationshipEnhancer,
    RelationshipSuggester, SchedulerConfig,
};
use compass_graph::{AlignmentEngine, Lexicon};
use compass_protocol::{
    parse_snapshot, serialize_json, serialize_json_pretty, AlignmentMetrics, GraphLayout, NodeType,
    OntologyGraph, Position, StatementSnapshot, StoreCommand,
};
use compass_store::{IdentityStore, SnippetLibrary};
use serde::Serialize;
use serde_json::json;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod suggesters;

use suggesters::{FileSuggester, HttpSuggester};

const LEXICON_ENV: &str = "COMPASS_LEXICON";

#[derive(Parser)]
#[command(name = "compass")]
#[command(about = "Ontology and alignment graph engine for team identity statements", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(long, global = true)]
    quiet: bool,

    /// Lexicon profile, JSON or TOML (overrides COMPASS_LEXICON)
    #[arg(long, global = true)]
    lexicon: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the ontology graph, detect conflicts and score alignment
    Evaluate(SnapshotArgs),

    /// Compute canvas positions, honouring the saved layout
    Layout(LayoutArgs),

    /// Add suggested relationships from a file or HTTP endpoint
    Enhance(EnhanceArgs),

    /// Export the graph as a Mermaid flowchart
    Export(LayoutArgs),

    /// Rename the statement behind a node (writes the snapshot)
    #[command(name = "edit-node")]
    EditNode(EditNodeArgs),

    /// Draw a user-defined relationship between two nodes (writes the snapshot)
    Connect(ConnectArgs),

    /// Pin a node to a position in the saved layout (writes the snapshot)
    #[command(name = "move-node")]
    MoveNode(MoveNodeArgs),

    /// List snippets from a snippet library file
    Snippets(SnippetsArgs),

    /// Print the JSON schema of an input or output document
    Schema(SchemaArgs),
}

#[derive(Args)]
struct SnapshotArgs {
    /// Snapshot JSON file, or `-` for stdin
    snapshot: PathBuf,
}

#[derive(Args)]
struct LayoutArgs {
    /// Snapshot JSON file, or `-` for stdin
    snapshot: PathBuf,

    /// Layout direction: tb|lr
    #[arg(long, default_value = "tb", value_parser = parse_orientation)]
    orientation: Orientation,
}

#[derive(Args)]
struct EnhanceArgs {
    /// Snapshot JSON file (must be a file when --save is used)
    snapshot: PathBuf,

    /// JSON file with suggestions to replay
    #[arg(long, conflicts_with = "endpoint")]
    suggestions: Option<PathBuf>,

    /// HTTP endpoint that receives the graph summary and returns suggestions
    #[arg(long)]
    endpoint: Option<String>,

    /// Give up on the suggestion capability after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Quiet period before the capability is called
    #[arg(long, default_value_t = 0)]
    debounce_ms: u64,

    /// Persist accepted suggestions into the snapshot's relationship list
    #[arg(long)]
    save: bool,
}

#[derive(Args)]
struct EditNodeArgs {
    /// Snapshot JSON file
    snapshot: PathBuf,

    /// Node id, e.g. `mission` or `value-v1`
    id: String,

    /// New label text
    label: String,

    /// Node type (inferred from the id prefix when omitted)
    #[arg(long, value_parser = parse_node_type)]
    node_type: Option<NodeType>,
}

#[derive(Args)]
struct ConnectArgs {
    /// Snapshot JSON file
    snapshot: PathBuf,

    source: String,

    target: String,
}

#[derive(Args)]
struct MoveNodeArgs {
    /// Snapshot JSON file
    snapshot: PathBuf,

    id: String,

    #[arg(long, allow_negative_numbers = true)]
    x: f64,

    #[arg(long, allow_negative_numbers = true)]
    y: f64,
}

#[derive(Args)]
struct SnippetsArgs {
    /// Snippet library JSON file (array of {node_type, text})
    library: PathBuf,

    /// Only list snippets for this node type
    #[arg(long, value_parser = parse_node_type)]
    node_type: Option<NodeType>,
}

#[derive(Args)]
struct SchemaArgs {
    #[arg(value_enum)]
    document: SchemaDocument,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaDocument {
    Snapshot,
    Graph,
    Metrics,
    Layout,
    Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let output = Output { pretty: cli.pretty };
    let engine = AlignmentEngine::new(load_lexicon(cli.lexicon.as_deref())?);

    match cli.command {
        Commands::Evaluate(args) => run_evaluate(&engine, args, output)?,
        Commands::Layout(args) => run_layout(&engine, args, output)?,
        Commands::Enhance(args) => run_enhance(&engine, args, output).await?,
        Commands::Export(args) => run_export(&engine, args)?,
        Commands::EditNode(args) => run_edit_node(args, output)?,
        Commands::Connect(args) => run_connect(args, output)?,
        Commands::MoveNode(args) => run_move_node(&engine, args, output)?,
        Commands::Snippets(args) => run_snippets(args, output)?,
        Commands::Schema(args) => run_schema(args)?,
    }

    Ok(())
}

#[derive(Clone, Copy)]
struct Output {
    pretty: bool,
}

impl Output {
    fn json<T: Serialize>(self, value: &T) -> Result<()> {
        let text = if self.pretty {
            serialize_json_pretty(value)?
        } else {
            serialize_json(value)?
        };
        print_stdout(&text)
    }
}

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn load_lexicon(flag: Option<&Path>) -> Result<Lexicon> {
    let path = flag
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(LEXICON_ENV).map(PathBuf::from));
    match path {
        Some(path) => {
            let lexicon = Lexicon::from_file(&path)
                .with_context(|| format!("Failed to load lexicon {}", path.display()))?;
            log::debug!("Using lexicon '{}' from {}", lexicon.name(), path.display());
            Ok(lexicon)
        }
        None => Ok(Lexicon::bundled()),
    }
}

fn read_snapshot(path: &Path) -> Result<StatementSnapshot> {
    let bytes = if path == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read snapshot from stdin")?;
        buf
    } else {
        fs::read(path).with_context(|| format!("Failed to read snapshot {}", path.display()))?
    };
    parse_snapshot(&bytes)
}

fn parse_orientation(raw: &str) -> std::result::Result<Orientation, String> {
    Orientation::parse(raw).ok_or_else(|| format!("unknown orientation '{raw}' (expected tb or lr)"))
}

fn parse_node_type(raw: &str) -> std::result::Result<NodeType, String> {
    NodeType::parse(raw).ok_or_else(|| format!("unknown node type '{raw}'"))
}

fn layout_engine(orientation: Orientation) -> LayoutEngine {
    LayoutEngine::new(LayoutConfig {
        orientation,
        ..LayoutConfig::default()
    })
}

fn run_evaluate(engine: &AlignmentEngine, args: SnapshotArgs, output: Output) -> Result<()> {
    let snapshot = read_snapshot(&args.snapshot)?;
    output.json(&engine.evaluate(&snapshot))
}

fn run_layout(engine: &AlignmentEngine, args: LayoutArgs, output: Output) -> Result<()> {
    let snapshot = read_snapshot(&args.snapshot)?;
    let graph = engine.build_graph(&snapshot);
    let mut sync = GraphSynchronizer::new(layout_engine(args.orientation));
    sync.sync(&graph, &snapshot);
    output.json(sync.rendered())
}

fn run_export(engine: &AlignmentEngine, args: LayoutArgs) -> Result<()> {
    let snapshot = read_snapshot(&args.snapshot)?;
    let graph = engine.build_graph(&snapshot);
    print_stdout(to_mermaid(&graph, args.orientation).trim_end())
}

async fn run_enhance(engine: &AlignmentEngine, args: EnhanceArgs, output: Output) -> Result<()> {
    if args.save && args.snapshot == Path::new("-") {
        bail!("--save needs a snapshot file, not stdin");
    }
    let snapshot = read_snapshot(&args.snapshot)?;
    let timeout = args.timeout_ms.map(Duration::from_millis);

    let suggester: Arc<dyn RelationshipSuggester> = match (args.suggestions, args.endpoint) {
        (Some(path), _) => Arc::new(FileSuggester::new(path)),
        (None, Some(endpoint)) => Arc::new(HttpSuggester::new(endpoint, timeout)?),
        (None, None) => {
            log::warn!("No --suggestions or --endpoint given; nothing will be added");
            Arc::new(NoopSuggester)
        }
    };
    let enhancer = RelationshipEnhancer::new(
        suggester,
        EnhancerConfig {
            timeout,
            ..EnhancerConfig::default()
        },
    );
    let scheduler = EnhancementScheduler::new(
        enhancer,
        SchedulerConfig {
            debounce: Duration::from_millis(args.debounce_ms),
            ..SchedulerConfig::default()
        },
    );

    let base = engine.build_graph(&snapshot);
    let base_edges = base.relationships.len();
    let mut results = scheduler.subscribe();
    let generation = scheduler.submit(base);
    let enhanced = loop {
        if let Some(result) = results.borrow_and_update().clone() {
            if result.generation == generation {
                break result;
            }
        }
        results
            .changed()
            .await
            .context("Enhancement scheduler stopped before publishing")?;
    };
    let added = enhanced.graph.relationships.len() - base_edges;
    let metrics: AlignmentMetrics = engine.score(&snapshot, &enhanced.graph);

    let mut saved = 0usize;
    if args.save {
        saved = save_suggestions(&args.snapshot, &enhanced.graph)?;
    }

    output.json(&json!({
        "added": added,
        "saved": saved,
        "graph": enhanced.graph,
        "metrics": metrics,
    }))
}

fn save_suggestions(path: &Path, graph: &OntologyGraph) -> Result<usize> {
    let mut store = IdentityStore::load(path)?;
    let mut sync = GraphSynchronizer::new(LayoutEngine::default());
    sync.sync(graph, store.snapshot());
    let saved = sync.save_suggestions(&mut store)?;
    if saved > 0 {
        store.save()?;
    }
    Ok(saved)
}

fn run_edit_node(args: EditNodeArgs, output: Output) -> Result<()> {
    let node_type = match args.node_type {
        Some(node_type) => node_type,
        None => {
            let prefix = args.id.split_once('-').map_or(args.id.as_str(), |(p, _)| p);
            NodeType::parse(prefix)
                .with_context(|| format!("Cannot infer node type from '{}'; pass --node-type", args.id))?
        }
    };
    let command = StoreCommand::EditNode {
        id: args.id,
        node_type,
        new_label: args.label,
    };
    apply_command(&args.snapshot, command, output)
}

fn run_connect(args: ConnectArgs, output: Output) -> Result<()> {
    let command = StoreCommand::AddManualEdge {
        source_id: args.source,
        target_id: args.target,
    };
    apply_command(&args.snapshot, command, output)
}

fn apply_command(path: &Path, command: StoreCommand, output: Output) -> Result<()> {
    let mut store = IdentityStore::load(path)?;
    let changed = store.dispatch(command)?;
    if changed {
        store.save()?;
    }
    output.json(&json!({ "changed": changed, "revision": store.revision() }))
}

fn run_move_node(engine: &AlignmentEngine, args: MoveNodeArgs, output: Output) -> Result<()> {
    let mut store = IdentityStore::load(&args.snapshot)?;
    let graph = engine.build_graph(store.snapshot());
    let mut sync = GraphSynchronizer::new(LayoutEngine::default());
    sync.sync(&graph, store.snapshot());
    sync.move_node(&args.id, Position::new(args.x, args.y))?;
    let layout: GraphLayout = sync.end_drag(&args.id, &mut store)?;
    store.save()?;
    output.json(&layout)
}

fn run_snippets(args: SnippetsArgs, output: Output) -> Result<()> {
    let bytes = fs::read(&args.library)
        .with_context(|| format!("Failed to read snippet library {}", args.library.display()))?;
    let library = SnippetLibrary::from_json(&bytes)?;
    match args.node_type {
        Some(node_type) => output.json(&library.list(node_type)),
        None => output.json(&library.grouped()),
    }
}

fn run_schema(args: SchemaArgs) -> Result<()> {
    let schema = match args.document {
        SchemaDocument::Snapshot => schemars::schema_for!(StatementSnapshot),
        SchemaDocument::Graph => schemars::schema_for!(OntologyGraph),
        SchemaDocument::Metrics => schemars::schema_for!(AlignmentMetrics),
        SchemaDocument::Layout => schemars::schema_for!(GraphLayout),
        SchemaDocument::Command => schemars::schema_for!(StoreCommand),
    };
    print_stdout(&serde_json::to_string_pretty(&schema)?)
}
