//! Entrylinks CLI: manage an entry's links and look up backlinks.
//!
//! Usage:
//!   entrylinks --identity ID --secret S links list <entry>
//!   entrylinks --identity ID --secret S links add <entry> <type> <reference>
//!   entrylinks --identity ID --secret S links remove <entry> <edge-id>
//!   entrylinks --identity ID --secret S backlinks <entry> [--enable]
//!   entrylinks --identity ID entries

use clap::{Parser, Subcommand};
use entrylinks::config::{default_config_path, open_store};
use entrylinks::{
    AesGcmCipher, BacklinkConfig, BacklinkResolver, Config, EdgeId, EntryScope, GraphCipher,
    Identity, LinkError, LinkManager, LinkType, LinkUpdate, PayloadStore, SessionKey,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "entrylinks",
    version,
    about = "Encrypted links and backlinks for journal entries"
)]
struct Cli {
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Identity whose payloads to use
    #[arg(long, global = true)]
    identity: Option<String>,
    /// Secret the session key is derived from
    #[arg(long, global = true)]
    secret: Option<String>,
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage an entry's links
    Links {
        #[command(subcommand)]
        action: LinkAction,
    },
    /// List entries linking to an entry
    Backlinks {
        /// Entry to find backlinks for
        entry: String,
        /// Scan even if backlinks are disabled in the config
        #[arg(long)]
        enable: bool,
    },
    /// List entries with stored links
    Entries,
}

#[derive(Subcommand)]
enum LinkAction {
    /// Show an entry's active links
    List {
        entry: String,
    },
    /// Link an entry to a tag, source or other entry
    Add {
        entry: String,
        /// reflection, tag or source
        link_type: LinkType,
        reference: String,
    },
    /// Remove a link by edge id
    Remove {
        entry: String,
        edge_id: String,
    },
}

struct App {
    store: Arc<dyn PayloadStore>,
    cipher: Arc<dyn GraphCipher>,
    config: Config,
    identity: Identity,
}

impl App {
    fn manager(&self) -> LinkManager {
        LinkManager::new(self.store.clone(), self.cipher.clone())
    }

    fn scope(&self, entry: &str) -> EntryScope {
        EntryScope::new(self.identity.clone(), entry)
    }
}

fn session_key(secret: Option<&str>) -> Result<SessionKey, String> {
    secret
        .map(|s| SessionKey::derive_from_secret(s.as_bytes()))
        .ok_or_else(|| "--secret is required for this command".to_string())
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn open_app(cli: &Cli) -> Result<App, String> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)
        .map_err(|e| format!("Failed to load config {}: {}", config_path.display(), e))?;
    if let Some(db) = &cli.db {
        config.database = Some(db.clone());
    }
    let identity = cli
        .identity
        .as_deref()
        .map(Identity::new)
        .ok_or_else(|| "--identity is required".to_string())?;

    Ok(App {
        store: open_store(&config.database_path()),
        cipher: Arc::new(AesGcmCipher::new()),
        config,
        identity,
    })
}

fn report(err: &LinkError) -> i32 {
    if err.is_rejection() {
        eprintln!("{}", err.user_message());
    } else {
        eprintln!("Error: {}", err);
    }
    1
}

fn warn_unsaved(update: &LinkUpdate) {
    if !update.is_persisted() {
        eprintln!("Warning: storage unavailable, the change was not saved");
    }
}

async fn cmd_links_list(app: &App, key: &SessionKey, entry: &str) -> i32 {
    let scope = app.scope(entry);
    let graph = app.manager().load(&scope, key).await;
    let Some(owner) = graph.owner_node(entry) else {
        println!("No links.");
        return 0;
    };
    let grouped = graph.outgoing_edges_by_type(&owner.id);
    if grouped.is_empty() {
        println!("No links.");
        return 0;
    }
    println!("{:<10}  {:<32}  {}", "TYPE", "EDGE", "TARGET");
    println!("{}", "-".repeat(72));
    for (link_type, links) in grouped {
        for (edge, target) in links {
            println!("{:<10}  {:<32}  {}", link_type, edge.id, target.kind.reference());
        }
    }
    0
}

async fn cmd_links_add(app: &App, key: &SessionKey, entry: &str, link_type: LinkType, reference: &str) -> i32 {
    let manager = app.manager();
    let scope = app.scope(entry);
    let graph = manager.load(&scope, key).await;
    match manager.add_link(&scope, key, &graph, link_type, reference).await {
        Ok(update) => {
            println!("Linked '{}' to {} '{}'", entry, link_type, reference.trim());
            warn_unsaved(&update);
            0
        }
        Err(e) => report(&e),
    }
}

async fn cmd_links_remove(app: &App, key: &SessionKey, entry: &str, edge_id: &str) -> i32 {
    let manager = app.manager();
    let scope = app.scope(entry);
    let graph = manager.load(&scope, key).await;
    let edge_id = EdgeId::from(edge_id);
    if graph.edge(&edge_id).map(|e| e.is_active()) != Some(true) {
        eprintln!("Warning: no active link '{}' on '{}'", edge_id, entry);
        return 1;
    }
    match manager.remove_link(&scope, key, &graph, &edge_id).await {
        Ok(update) => {
            println!("Removed link '{}'", edge_id);
            warn_unsaved(&update);
            0
        }
        Err(e) => report(&e),
    }
}

async fn cmd_backlinks(app: &App, key: &SessionKey, entry: &str, enable: bool) -> i32 {
    let config = BacklinkConfig {
        enabled: enable || app.config.backlinks_enabled,
    };
    if !config.enabled {
        println!("Backlinks are not yet available (enable with --enable or backlinks_enabled: true).");
        return 0;
    }
    let resolver = BacklinkResolver::new(app.store.clone(), app.cipher.clone(), config);
    match resolver.find_backlinks(&app.identity, entry, key).await {
        Ok(found) => {
            if found.backlinks.is_empty() {
                println!("No backlinks.");
            }
            for backlink in &found.backlinks {
                println!("{}", backlink.source_entry_id);
            }
            if found.skipped > 0 {
                eprintln!("Note: {} of {} entries could not be read", found.skipped, found.scanned);
            }
            0
        }
        Err(e) => report(&e),
    }
}

async fn cmd_entries(app: &App) -> i32 {
    match app.store.list_ids(&app.identity).await {
        Ok(ids) if ids.is_empty() => {
            println!("No entries.");
            0
        }
        Ok(ids) => {
            for id in ids {
                println!("{}", id);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn run(cli: Cli) -> i32 {
    let app = match open_app(&cli) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    if let Commands::Entries = cli.command {
        return cmd_entries(&app).await;
    }

    let key = match session_key(cli.secret.as_deref()) {
        Ok(key) => key,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match &cli.command {
        Commands::Links { action } => match action {
            LinkAction::List { entry } => cmd_links_list(&app, &key, entry).await,
            LinkAction::Add { entry, link_type, reference } => {
                cmd_links_add(&app, &key, entry, *link_type, reference).await
            }
            LinkAction::Remove { entry, edge_id } => cmd_links_remove(&app, &key, entry, edge_id).await,
        },
        Commands::Backlinks { entry, enable } => cmd_backlinks(&app, &key, entry, *enable).await,
        Commands::Entries => cmd_entries(&app).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let code = run(cli).await;
    std::process::exit(code);
}
