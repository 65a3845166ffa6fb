//! settree binary.
//!
//! Reads `settree.toml` (or the path given with `--config`), opens the SQLite
//! store, and either serves the REST API or runs a one-shot command against
//! the store.
//!
//! ```text
//! settree                         # serve
//! settree import outline.txt --parent <id> --description "from ops"
//! settree tree
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use settree_core::actor::Actor;
use settree_engine::{SettingTree, SettingsEngine};
use settree_server::ServerConfig;
use settree_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about = "Hierarchical settings engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "settree.toml")]
  config: PathBuf,

  /// Actor id stamped on changes made by one-shot commands.
  #[arg(long, default_value = "cli", global = true)]
  actor_id: String,

  /// Display name stamped on changes made by one-shot commands.
  #[arg(long, default_value = "cli", global = true)]
  actor_name: String,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the REST API (the default).
  Serve,
  /// Create variables from an indented outline file.
  Import {
    file:        PathBuf,
    /// Node to import under; roots otherwise.
    #[arg(long)]
    parent:      Option<Uuid>,
    #[arg(long, default_value = "")]
    description: String,
  },
  /// Print the settings tree.
  Tree {
    #[arg(long)]
    parent: Option<Uuid>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = server_cfg.resolved_store_path();
  if let Some(dir) = store_path.parent().filter(|d| !d.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(dir)
      .await
      .with_context(|| format!("failed to create {dir:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  let engine = Arc::new(SettingsEngine::with_config(
    Arc::new(store),
    server_cfg.engine.clone(),
  ));

  let actor = Actor::new(cli.actor_id, cli.actor_name);

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(engine, &server_cfg).await,
    Command::Import { file, parent, description } => {
      let text = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("failed to read {file:?}"))?;
      let created = engine
        .import_hierarchy(text.lines(), parent, &description, &actor)
        .await
        .context("import failed")?;
      println!("imported {} settings", created.len());
      Ok(())
    }
    Command::Tree { parent } => {
      let forest = engine.load_tree(parent).await.context("failed to load tree")?;
      print_forest(&forest);
      Ok(())
    }
  }
}

async fn serve(engine: Arc<SettingsEngine<SqliteStore>>, cfg: &ServerConfig) -> anyhow::Result<()> {
  let app = settree_server::router(engine);
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

/// One line per node, indented by depth.
fn print_forest(forest: &[SettingTree]) {
  let mut stack: Vec<(usize, &SettingTree)> = forest.iter().rev().map(|t| (0, t)).collect();
  while let Some((depth, tree)) = stack.pop() {
    let node = &tree.node;
    let marker = if node.is_variable() { "-" } else { "+" };
    println!("{:indent$}{marker} {}  [{}]", "", node.name, node.path, indent = depth * 2);
    stack.extend(tree.children.iter().rev().map(|c| (depth + 1, c)));
  }
}
