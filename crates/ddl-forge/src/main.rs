//! ddl-forge CLI
//!
//! Captures a schema into a definition file, scripts a definition as DDL
//! files, and diffs two definitions into a change set or migration script.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use ddl_forge::prelude::*;

/// Capture, compare and script relational database schemas.
#[derive(Parser)]
#[command(name = "ddl-forge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a live schema into a definition file.
    ImportSchema {
        /// Connection string (`dialect://[user:pass@]host/database` or `sqlite://<path>`).
        #[arg(short, long, env = "DDL_FORGE_CONNECTION")]
        connection: ConnectionString,

        /// Definition file to write.
        #[arg(short, long)]
        output: PathBuf,

        /// Database name recorded in the definition.
        #[arg(short, long)]
        name: Option<String>,

        /// Import options (`exclude-views=true;...`), merged over the
        /// connection string's.
        #[arg(long)]
        options: Option<ImportOptions>,
    },

    /// Write per-object DDL scripts from a definition file.
    ExportSchema {
        /// Definition file to read.
        #[arg(short, long)]
        definition: PathBuf,

        /// Output directory.
        #[arg(short, long)]
        output: PathBuf,

        /// Target dialect (defaults to the imported dialect).
        #[arg(long, env = "DDL_FORGE_DIALECT")]
        dialect: Option<Dialect>,
    },

    /// Compare two definition files.
    DiffSchema {
        /// Definition of the current schema.
        #[arg(short, long)]
        current: PathBuf,

        /// Definition of the target schema.
        #[arg(short, long)]
        target: PathBuf,

        /// Write the change set as a definition file.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a migration script.
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// Script dialect (defaults to the target's imported dialect).
        #[arg(long, env = "DDL_FORGE_DIALECT")]
        dialect: Option<Dialect>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::ImportSchema {
            connection,
            output,
            name,
            options,
        } => {
            info!(%connection, "Importing schema");
            let options = match &options {
                Some(extra) => connection.options.clone().merge(extra),
                None => connection.options.clone(),
            };
            let adaptor = adaptor_for(&connection).await?;
            let database = adaptor.import_schema(name.as_deref(), &options).await?;
            write_definition(&output, &database)?;
        }

        Commands::ExportSchema {
            definition,
            output,
            dialect,
        } => {
            let database = read_definition(&definition)?;
            let dialect = dialect
                .or(database.imported_dialect)
                .context("No --dialect given and the definition records no imported dialect")?;
            std::fs::create_dir_all(&output)?;
            ScriptWriter::new(dialect).write_schema(&database, &output)?;
        }

        Commands::DiffSchema {
            current,
            target,
            output,
            script,
            dialect,
        } => {
            let current = read_definition(&current)?;
            let target = read_definition(&target)?;
            let change_set = diff(&current, &target);

            if change_set.is_empty() {
                info!("Schemas are identical.");
            } else {
                println!("\nChanges ({}):", change_set.change_summary());
                println!("{:-<60}", "");
                print_changes(&change_set.uddts);
                print_changes(&change_set.udtts);
                print_changes(&change_set.tables);
                print_changes(&change_set.views);
                print_changes(&change_set.functions);
                print_changes(&change_set.stored_procedures);
                println!();
            }

            if let Some(output) = output {
                write_definition(&output, &change_set)?;
            }

            if let Some(script) = script {
                let dialect = dialect
                    .or(change_set.imported_dialect)
                    .context("No --dialect given and the target records no imported dialect")?;
                let sql = render_change_script(&change_set, &current, dialect_for(dialect).as_ref())?;
                std::fs::write(&script, sql)?;
                info!(path = %script.display(), "Wrote change script");
            }
        }
    }

    Ok(())
}

fn print_changes<T: SchemaObject>(objects: &[T]) {
    for object in objects {
        let marker = match object.operation() {
            OperationType::Create => "+",
            OperationType::Drop => "-",
            OperationType::Modify => "~",
            OperationType::Retain => " ",
        };
        println!(" [{marker}] {} {}", object.object_type(), object.name());
    }
}
