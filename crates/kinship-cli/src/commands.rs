//! CLI command implementations.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use kinship_core::{TreeId, TreeScope, TreeSnapshot};
use kinship_graph::{
    DirectorySource, GraphIndex, IndexCache, LabelRenderer, LabelTable, RelationshipResolver,
    ResolutionResponse, ResolveRequest, ResolverConfig, SnapshotSource,
};
use kinship_server::{KinshipServer, ServerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const CONFIG_DIR: &str = ".kinship";
const CONFIG_FILE: &str = "config.json";

/// Settings stored in `.kinship/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CliConfig {
    pub resolver: ResolverConfig,
    /// Directory holding `<tree>.json` snapshots.
    pub data_dir: Option<PathBuf>,
    /// Extra label tables, one JSON file per language.
    pub label_tables: Vec<PathBuf>,
}

/// Reads the config under `root`, or the defaults when there is none.
pub fn load_config(root: &Path) -> Result<CliConfig> {
    let path = root.join(CONFIG_DIR).join(CONFIG_FILE);
    if !path.exists() {
        return Ok(CliConfig::default());
    }
    debug!("Reading config from {}", path.display());
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

/// Builds a resolver with the configured label tables. Relative table
/// paths are read from `root`.
pub fn build_resolver(config: &CliConfig, root: &Path) -> Result<RelationshipResolver> {
    let mut labels = LabelRenderer::new(LabelTable::english());
    for path in &config.label_tables {
        let path = root.join(path);
        let table = LabelTable::from_json(&fs::read_to_string(&path)?)
            .map_err(|e| format!("{}: {}", path.display(), e))?;
        debug!("Loaded {} labels from {}", table.language, path.display());
        labels = labels.with_table(table);
    }
    Ok(RelationshipResolver::new(config.resolver.clone(), labels))
}

/// Picks the snapshot directory: flag, then config, then `./trees`, then
/// the user data directory.
fn data_dir(flag: Option<&Path>, config: &CliConfig) -> Result<PathBuf> {
    if let Some(dir) = flag.map(Path::to_path_buf).or_else(|| config.data_dir.clone()) {
        return Ok(dir);
    }
    let local = PathBuf::from("trees");
    if local.is_dir() {
        return Ok(local);
    }
    dirs::data_dir()
        .map(|dir| dir.join("kinship").join("trees"))
        .ok_or_else(|| "no data directory; pass --data".into())
}

/// Initialize Kinship in a directory.
pub fn init(path: &Path) -> Result<()> {
    let kinship_dir = path.join(CONFIG_DIR);

    if kinship_dir.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    fs::create_dir_all(&kinship_dir)?;
    fs::create_dir_all(path.join("trees"))?;

    let config = CliConfig {
        data_dir: Some(PathBuf::from("trees")),
        ..CliConfig::default()
    };
    fs::write(
        kinship_dir.join(CONFIG_FILE),
        serde_json::to_string_pretty(&config)?,
    )?;

    println!("{} Initialized Kinship in {}", "✓".green(), path.display());
    println!(
        "  Put tree snapshots in {} and run {}",
        "trees/<tree>.json".cyan(),
        "kinship resolve <a> <b>".cyan()
    );

    Ok(())
}

/// Arguments of `kinship resolve`.
pub struct ResolveArgs {
    pub person1: String,
    pub person2: String,
    pub data: Option<PathBuf>,
    pub trees: Vec<String>,
    pub file: Option<PathBuf>,
    pub depth: Option<usize>,
    pub lang: Option<String>,
    pub json: bool,
}

/// Resolve the relationship between two persons.
pub fn resolve(args: ResolveArgs) -> Result<()> {
    let root = std::env::current_dir()?;
    let config = load_config(&root)?;
    let resolver = build_resolver(&config, &root)?;

    let mut request = ResolveRequest::new(args.person1.as_str(), args.person2.as_str());
    request.max_search_depth = args.depth;
    request.language = args.lang;

    let response = match &args.file {
        Some(file) => {
            let index = GraphIndex::build(&TreeSnapshot::load(file)?)?;
            resolver.resolve(&index, &request)?
        }
        None => {
            if !args.trees.is_empty() {
                request.tree_scope = Some(TreeScope::merged(
                    args.trees.iter().map(|t| TreeId::new(t.as_str())),
                ));
            }
            let source = DirectorySource::new(data_dir(args.data.as_deref(), &config)?);
            let cache = IndexCache::new(source, config.resolver.cache_ttl())
                .with_max_scopes(config.resolver.cache_max_scopes);
            resolver.resolve_cached(&cache, &request)?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_resolution(&request, &response);
    }

    Ok(())
}

fn print_resolution(request: &ResolveRequest, response: &ResolutionResponse) {
    if !response.path_found {
        println!(
            "{} {}",
            "✗".red(),
            response
                .error_message
                .as_deref()
                .unwrap_or("no relationship found")
        );
        return;
    }

    let name = |i: usize| {
        response
            .path
            .get(i)
            .map(|n| n.display_fields.name.clone())
            .unwrap_or_default()
    };

    println!(
        "{} {} is {}'s {}",
        "✓".green(),
        name(response.path.len().saturating_sub(1)).cyan(),
        name(0).cyan(),
        response
            .relationship_label
            .as_deref()
            .unwrap_or("relative")
            .bold()
    );

    let mut chain = name(0);
    for (i, node) in response.path.iter().enumerate() {
        if let Some(relation) = &node.relation_to_next {
            chain.push_str(&format!(" ─({})→ {}", relation, name(i + 1)));
        }
    }
    println!("  {}", chain.dimmed());

    for ancestor in &response.common_ancestors {
        println!(
            "  common ancestor {} ({} up from {}, {} up from {}){}",
            ancestor.person_id.to_string().yellow(),
            ancestor.generations_from_person1,
            request.person1_id,
            ancestor.generations_from_person2,
            request.person2_id,
            if ancestor.by_marriage { " by marriage" } else { "" }
        );
    }

    if let Some(key) = &response.relationship_label_key {
        println!("  {} {} hops", key.dimmed(), response.path_length);
    }
}

/// Show statistics and cycles of a tree.
pub fn inspect(tree: &str, data: Option<&Path>, json: bool) -> Result<()> {
    let root = std::env::current_dir()?;
    let config = load_config(&root)?;
    let source = DirectorySource::new(data_dir(data, &config)?);
    let tree = TreeId::new(tree);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!("Indexing {}...", tree));

    let generation = source.generation(&tree)?;
    let index = GraphIndex::build(&source.snapshot(&tree)?)?;

    spinner.finish_and_clear();

    let stats = index.stats();
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "tree": tree,
                "generation": generation,
                "stats": stats
            }))?
        );
        return Ok(());
    }

    println!("{} {}", "Tree".cyan().bold(), tree);
    println!("  persons         {}", stats.person_count.to_string().cyan());
    println!("  parent links    {}", stats.lineage_edge_count.to_string().cyan());
    println!("  spouse pairs    {}", stats.spouse_pair_count.to_string().cyan());
    if stats.skipped_edge_count > 0 {
        println!(
            "  {} {} edge(s) point outside the tree",
            "⚠".yellow(),
            stats.skipped_edge_count
        );
    }

    if stats.cycle_members.is_empty() {
        println!("{} No parent-child cycles", "✓".green());
    } else {
        println!(
            "{} Parent-child cycle through {} person(s):",
            "✗".red(),
            stats.cycle_members.len()
        );
        for person in &stats.cycle_members {
            println!("  {}", person.to_string().red());
        }
        println!("  Relationships touching these persons cannot be resolved");
    }

    Ok(())
}

/// Start the Kinship server.
pub async fn serve(port: u16, headless: bool, data: Option<&Path>) -> Result<()> {
    let bind_addr = if headless { "0.0.0.0" } else { "127.0.0.1" };

    if headless {
        println!("{}", "Starting Kinship server in headless mode...".cyan());
    } else {
        println!("{}", "Starting Kinship server...".cyan());
    }

    let root = std::env::current_dir()?;
    let config = load_config(&root)?;
    let resolver = build_resolver(&config, &root)?;
    let dir = data_dir(data, &config)?;
    let source = DirectorySource::new(&dir);

    let trees = source.trees()?;
    println!(
        "{} Serving {} tree(s) from {}",
        "✓".green(),
        trees.len(),
        dir.display()
    );

    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;
    let server = KinshipServer::new(Box::new(source), resolver, ServerConfig { addr });

    println!("{} Listening on ws://{}", "✓".green(), addr);
    if headless {
        println!("  Headless mode: accepting connections from any host");
    }
    println!("  Press {} to stop", "Ctrl+C".cyan());

    server.run().await?;

    Ok(())
}
