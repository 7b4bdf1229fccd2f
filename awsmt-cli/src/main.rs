mod config;
mod display;
mod engine;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;

use awsmt_core::interpreter::Interpreter;
use awsmt_core::provider::Provider;
use awsmt_core::resolver;
use awsmt_core::resource::{Resource, ResourceId, attributes_from_json};
use awsmt_core::schema::ResourceSchema;
use awsmt_provider::{MediaTailorProvider, schemas};
use awsmt_state::{LockInfo, StateBackend, StateFile, create_backend};

use config::{ConfigFile, SchemaIndex};
use display::{format_value, print_plan};

#[derive(Parser)]
#[command(name = "awsmt")]
#[command(about = "Manage AWS Elemental MediaTailor infrastructure", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, short, global = true, default_value = "awsmt.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate,
    /// Show execution plan without applying changes
    Plan,
    /// Apply changes to reach the desired state
    Apply,
    /// Destroy all resources recorded in the state
    Destroy {
        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Bring an existing MediaTailor object under management
    Import {
        /// Resource type (e.g., awsmt_channel)
        resource_type: String,
        /// Resource name in the configuration
        name: String,
        /// Provider identifier (e.g., channel name, "<source_location>,<vod_source>")
        identifier: String,
    },
    /// Show resources recorded in the state
    Show,
    /// Print resource and data source schemas as JSON
    Schema {
        /// Only this resource type
        resource_type: Option<String>,
    },
    /// Remove a state lock left behind by an interrupted run
    ForceUnlock {
        /// Lock ID reported by the failing command
        lock_id: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate => run_validate(&cli.config),
        Commands::Plan => run_plan(&cli.config).await,
        Commands::Apply => run_apply(&cli.config).await,
        Commands::Destroy { auto_approve } => run_destroy(&cli.config, auto_approve).await,
        Commands::Import {
            resource_type,
            name,
            identifier,
        } => run_import(&cli.config, &resource_type, &name, &identifier).await,
        Commands::Show => run_show(&cli.config).await,
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        Commands::ForceUnlock { lock_id } => run_force_unlock(&cli.config, &lock_id).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Parsed and validated configuration
struct Workspace {
    config: ConfigFile,
    /// Data sources and resources sorted by dependencies
    resources: Vec<Resource>,
    schemas: SchemaIndex,
}

impl Workspace {
    fn load(path: &Path) -> Result<Self, String> {
        let config = ConfigFile::load(path)?;
        config.provider.validate()?;
        let resources = config.resources()?;
        let schemas = SchemaIndex::new(schemas::all_schemas());
        schemas.validate(&resources)?;
        if let Some(cycle) = resolver::find_dependency_cycle(&resources) {
            return Err(format!("Dependency cycle: {}", cycle.join(" -> ")));
        }
        Ok(Self {
            config,
            resources: resolver::sort_resources_by_dependencies(&resources),
            schemas,
        })
    }

    fn backend(&self) -> Result<Box<dyn StateBackend>, String> {
        create_backend(&self.config.backend).map_err(|e| e.to_string())
    }

    async fn provider(&self) -> MediaTailorProvider {
        MediaTailorProvider::new(&self.config.provider).await
    }
}

async fn lock(backend: &dyn StateBackend, operation: &str) -> Result<LockInfo, String> {
    backend.init().await.map_err(|e| e.to_string())?;
    let lock = backend
        .acquire_lock(operation)
        .await
        .map_err(|e| e.to_string())?;
    log::debug!("Acquired state lock {}", lock);
    Ok(lock)
}

async fn unlock(backend: &dyn StateBackend, lock: &LockInfo) {
    if let Err(e) = backend.release_lock(lock).await {
        eprintln!(
            "{} Failed to release state lock {}: {}",
            "Warning:".yellow().bold(),
            lock.id,
            e
        );
    }
}

async fn read_state(backend: &dyn StateBackend) -> Result<StateFile, String> {
    Ok(backend
        .read_state()
        .await
        .map_err(|e| e.to_string())?
        .unwrap_or_default())
}

async fn write_state(backend: &dyn StateBackend, state_file: &mut StateFile) -> Result<(), String> {
    state_file.increment_serial();
    backend
        .write_state(state_file)
        .await
        .map_err(|e| format!("Failed to save state: {}", e))
}

fn run_validate(path: &Path) -> Result<(), String> {
    println!("{}", "Validating...".cyan());

    let workspace = Workspace::load(path)?;

    println!(
        "{}",
        format!(
            "✓ {} resources validated successfully.",
            workspace.resources.len()
        )
        .green()
        .bold()
    );

    for resource in &workspace.resources {
        let prefix = if resource.is_data_source() { "data." } else { "" };
        println!("  • {}{}", prefix, resource.id);
    }

    Ok(())
}

async fn run_plan(path: &Path) -> Result<(), String> {
    let workspace = Workspace::load(path)?;
    let backend = workspace.backend()?;
    let lock = lock(backend.as_ref(), "plan").await?;
    let result = plan_locked(&workspace, backend.as_ref()).await;
    unlock(backend.as_ref(), &lock).await;
    result
}

async fn plan_locked(workspace: &Workspace, backend: &dyn StateBackend) -> Result<(), String> {
    let state_file = read_state(backend).await?;
    let provider = workspace.provider().await;

    let planned =
        engine::plan_changes(&provider, &workspace.resources, &workspace.schemas, &state_file)
            .await?;
    print_plan(&planned.plan, &workspace.schemas);
    Ok(())
}

async fn run_apply(path: &Path) -> Result<(), String> {
    let workspace = Workspace::load(path)?;
    let backend = workspace.backend()?;
    let lock = lock(backend.as_ref(), "apply").await?;
    let result = apply_locked(&workspace, backend.as_ref()).await;
    unlock(backend.as_ref(), &lock).await;
    result
}

async fn apply_locked(workspace: &Workspace, backend: &dyn StateBackend) -> Result<(), String> {
    let mut state_file = read_state(backend).await?;
    let provider = workspace.provider().await;

    let mut planned =
        engine::plan_changes(&provider, &workspace.resources, &workspace.schemas, &state_file)
            .await?;
    engine::record_refresh(&mut state_file, provider.name(), &planned.current_states);

    if planned.plan.mutation_count() == 0 {
        write_state(backend, &mut state_file).await?;
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    print_plan(&planned.plan, &workspace.schemas);
    println!();
    println!("{}", "Applying changes...".cyan().bold());
    println!();

    let interpreter = Interpreter::new(provider);
    let result = engine::apply_plan(
        &interpreter,
        &planned.plan,
        &mut planned.binding_map,
        &mut state_file,
    )
    .await;

    write_state(backend, &mut state_file).await?;

    println!();
    if result.is_success() {
        println!(
            "{}",
            format!("Apply complete! {} changes applied.", result.success_count)
                .green()
                .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Apply failed. {} succeeded, {} failed.",
            result.success_count, result.failure_count
        ))
    }
}

async fn run_destroy(path: &Path, auto_approve: bool) -> Result<(), String> {
    let workspace = Workspace::load(path)?;
    let backend = workspace.backend()?;
    let lock = lock(backend.as_ref(), "destroy").await?;
    let result = destroy_locked(&workspace, backend.as_ref(), auto_approve).await;
    unlock(backend.as_ref(), &lock).await;
    result
}

async fn destroy_locked(
    workspace: &Workspace,
    backend: &dyn StateBackend,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state_file = read_state(backend).await?;
    if state_file.resources.is_empty() {
        println!("{}", "No resources recorded in state.".yellow());
        return Ok(());
    }

    let provider = workspace.provider().await;
    let current_states = engine::refresh(&provider, &state_file).await?;
    engine::record_refresh(&mut state_file, provider.name(), &current_states);

    let plan = engine::destroy_plan(&workspace.resources, &state_file, &current_states);
    if plan.is_empty() {
        write_state(backend, &mut state_file).await?;
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        println!("  {} {}", "-".red().bold(), effect.resource_id());
    }
    println!();
    println!("Plan: {} to destroy.", plan.effects().len().to_string().red());
    println!();

    if !auto_approve && !confirm_destroy()? {
        println!();
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let interpreter = Interpreter::new(provider);
    let mut binding_map = resolver::BindingMap::new();
    let result =
        engine::apply_plan(&interpreter, &plan, &mut binding_map, &mut state_file).await;

    write_state(backend, &mut state_file).await?;

    println!();
    if result.is_success() {
        println!(
            "{}",
            format!(
                "Destroy complete! {} resources destroyed.",
                result.success_count
            )
            .green()
            .bold()
        );
        Ok(())
    } else {
        Err(format!(
            "Destroy failed. {} succeeded, {} failed.",
            result.success_count, result.failure_count
        ))
    }
}

fn confirm_destroy() -> Result<bool, String> {
    println!(
        "{}",
        "Do you really want to destroy all resources?"
            .yellow()
            .bold()
    );
    println!(
        "  {}",
        "This action cannot be undone. Type 'yes' to confirm.".yellow()
    );
    print!("\n  Enter a value: ");
    std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    println!();

    Ok(input.trim() == "yes")
}

async fn run_import(
    path: &Path,
    resource_type: &str,
    name: &str,
    identifier: &str,
) -> Result<(), String> {
    let workspace = Workspace::load(path)?;
    if !workspace.schemas.resources.contains_key(resource_type) {
        return Err(format!("Unknown resource type '{}'", resource_type));
    }

    let backend = workspace.backend()?;
    let lock = lock(backend.as_ref(), "import").await?;
    let result = import_locked(
        &workspace,
        backend.as_ref(),
        ResourceId::new(resource_type, name),
        identifier,
    )
    .await;
    unlock(backend.as_ref(), &lock).await;
    result
}

async fn import_locked(
    workspace: &Workspace,
    backend: &dyn StateBackend,
    id: ResourceId,
    identifier: &str,
) -> Result<(), String> {
    let mut state_file = read_state(backend).await?;
    if state_file
        .find_resource(&id.resource_type, &id.name)
        .is_some()
    {
        return Err(format!("{} is already managed", id));
    }

    let provider = workspace.provider().await;
    let state = provider
        .read(&id, identifier)
        .await
        .map_err(|e| e.to_string())?;
    if !state.exists {
        return Err(format!(
            "Cannot import {}: '{}' does not exist",
            id, identifier
        ));
    }

    state_file.record(provider.name(), &state);
    write_state(backend, &mut state_file).await?;

    println!(
        "{}",
        format!("Imported {} ({}).", id, identifier).green().bold()
    );
    let declared = workspace
        .resources
        .iter()
        .any(|r| !r.is_data_source() && r.id == id);
    if !declared {
        println!(
            "{}",
            format!(
                "{} is not declared in the configuration; the next apply will destroy it.",
                id
            )
            .yellow()
        );
    }
    Ok(())
}

async fn run_show(path: &Path) -> Result<(), String> {
    let config = ConfigFile::load(path)?;
    let backend = create_backend(&config.backend).map_err(|e| e.to_string())?;
    let Some(state_file) = backend.read_state().await.map_err(|e| e.to_string())? else {
        println!("{}", "No state.".yellow());
        return Ok(());
    };

    println!(
        "{} serial {}, lineage {}",
        "State:".cyan().bold(),
        state_file.serial,
        state_file.lineage
    );

    for resource in &state_file.resources {
        println!();
        let protected = if resource.protected { " (protected)" } else { "" };
        println!("{}{}", resource.id().to_string().cyan().bold(), protected);
        if let Some(identifier) = &resource.identifier {
            println!("    {}: {}", "identifier".bold(), identifier);
        }
        let attributes: BTreeMap<_, _> = attributes_from_json(&resource.attributes)
            .into_iter()
            .collect();
        for (key, value) in &attributes {
            println!("    {}: {}", key, format_value(value));
        }
    }

    Ok(())
}

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let index = SchemaIndex::new(schemas::all_schemas());
    let output = schema_json(&index, resource_type)?;
    let text = serde_json::to_string_pretty(&output).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}

fn schema_json(
    index: &SchemaIndex,
    resource_type: Option<&str>,
) -> Result<serde_json::Value, String> {
    let select = |schemas: &HashMap<String, ResourceSchema>| {
        schemas
            .iter()
            .filter(|(name, _)| resource_type.is_none_or(|t| t == name.as_str()))
            .map(|(name, schema)| (name.clone(), schema.to_json()))
            .collect::<serde_json::Map<_, _>>()
    };

    let resources = select(&index.resources);
    let data_sources = select(&index.data_sources);
    if let Some(t) = resource_type
        && resources.is_empty()
        && data_sources.is_empty()
    {
        return Err(format!("Unknown resource type '{}'", t));
    }

    Ok(serde_json::json!({
        "resources": resources,
        "data_sources": data_sources,
    }))
}

async fn run_force_unlock(path: &Path, lock_id: &str) -> Result<(), String> {
    let config = ConfigFile::load(path)?;
    let backend = create_backend(&config.backend).map_err(|e| e.to_string())?;
    backend
        .force_unlock(lock_id)
        .await
        .map_err(|e| e.to_string())?;
    println!("{}", format!("Lock {} released.", lock_id).green());
    Ok(())
}
