// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use voice_rag::utils::logging::{format_error, format_step, format_success, format_warning};
use voice_rag::{
    audio_channel, text_channel, Config, HealthCheck, HealthReport, IndexBuilder, LanceDbClient,
    QueryEngine, SchemaManager, Validator, VoiceApp,
};

#[derive(Parser)]
#[command(name = "voice_rag")]
#[command(version = "0.1.0")]
#[command(about = "RAG-backed realtime voice assistant using LanceDB", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the chunk index from the data directory
    Ingest {
        #[arg(long)]
        force: bool,

        #[arg(long, value_name = "NUM")]
        limit: Option<usize>,
    },

    /// Search indexed chunks by semantic similarity
    Search {
        /// Search query text
        query: String,

        #[arg(short, long, default_value_t = 5)]
        limit: usize,

        #[arg(short, long)]
        source: Option<String>,
    },

    /// Retrieve and synthesize one answer (the same path the voice tool uses)
    Ask {
        /// Question to answer from the knowledge base
        query: String,
    },

    Verify {
        #[arg(long)]
        create_schema: bool,
    },

    Stats,

    Reset {
        #[arg(long)]
        confirm: bool,
    },

    /// Run the voice application with a console host
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    voice_rag::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Voice RAG Assistant");
    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            Config::default_config()
        })
    };

    match cli.command {
        Commands::Ingest { force, limit } => {
            cmd_ingest(&config, force, limit).await?;
        }
        Commands::Search {
            query,
            limit,
            source,
        } => {
            cmd_search(&config, &query, limit, source.as_deref()).await?;
        }
        Commands::Ask { query } => {
            cmd_ask(&config, &query).await?;
        }
        Commands::Verify { create_schema } => {
            cmd_verify(&config, create_schema).await?;
        }
        Commands::Stats => {
            cmd_stats(&config).await?;
        }
        Commands::Reset { confirm } => {
            cmd_reset(&config, confirm).await?;
        }
        Commands::Serve => {
            cmd_serve(config).await?;
        }
    }

    Ok(())
}

async fn connect(config: &Config) -> Result<LanceDbClient> {
    let client = LanceDbClient::new(config.database.clone())
        .await
        .context("Failed to create LanceDB client")?;

    if !client.ping().await? {
        error!("Cannot connect to LanceDB");
        return Err(anyhow::anyhow!("Database connection failed"));
    }

    Ok(client)
}

async fn cmd_ingest(config: &Config, force: bool, limit: Option<usize>) -> Result<()> {
    info!("Starting ingestion pipeline");
    let start_time = Instant::now();

    Validator::validate_directory(&config.knowledge.data_dir)
        .context("Data directory check failed")?;

    let client = connect(config).await?;

    let schema_manager = SchemaManager::new(&client);
    if !schema_manager.verify_schema().await? {
        warn!("Database schema incomplete, initializing");
        schema_manager
            .initialize()
            .await
            .context("Failed to initialize schema")?;
    }

    let builder = IndexBuilder::new(config.clone());
    let stats = builder
        .build(&client, force, limit)
        .await
        .context("Index build failed")?;

    let elapsed = start_time.elapsed();
    info!("Ingestion complete in {:.2}s", elapsed.as_secs_f64());

    println!(
        "{}",
        format_success(&format!(
            "Indexed {} chunks from {} documents ({} batches failed)",
            stats.chunks_indexed, stats.documents_loaded, stats.batches_failed
        ))
    );

    Ok(())
}

async fn cmd_search(
    config: &Config,
    query: &str,
    limit: usize,
    source_filter: Option<&str>,
) -> Result<()> {
    info!("Searching for: {}", query);

    let client = connect(config).await?;
    let engine = QueryEngine::new(client, config.query.clone());

    let results = engine
        .retrieve(query, limit, source_filter)
        .await
        .context("Vector search failed")?;

    if results.is_empty() {
        println!("\nNo results found for query: \"{}\"\n", query);
        println!("Try:");
        println!("  - Using different search terms");
        println!("  - Removing the source filter");
        println!("  - Checking that documents have been ingested");
        return Ok(());
    }

    println!("\nSearch Results for: \"{}\"\n", query);
    println!("Found {} result(s)\n", results.len());
    println!("{}", "=".repeat(80));

    for (idx, result) in results.iter().enumerate() {
        println!(
            "\n{}. {} #{} (Score: {:.4})",
            idx + 1,
            result.relative_path,
            result.chunk_index,
            result.score
        );

        if let Some(distance) = result.distance {
            println!("   Distance: {:.4}", distance);
        }

        println!("   Preview:");
        let preview = Validator::truncate_text(&result.content, 300);
        for line in preview.lines().take(5) {
            println!("     {}", line);
        }
    }

    println!("\n{}", "=".repeat(80));
    info!("Search complete");

    Ok(())
}

async fn cmd_ask(config: &Config, query: &str) -> Result<()> {
    Validator::validate_content_not_empty(query).context("Empty query")?;

    let client = connect(config).await?;
    let engine = QueryEngine::new(client, config.query.clone());

    let answer = engine.query(query).await.context("Query failed")?;

    if answer.is_empty() {
        println!("{}", format_warning("No answer found in the knowledge base"));
        return Ok(());
    }

    println!("\n{}\n", answer.text);

    if answer.extractive {
        println!(
            "{}",
            format_warning("Extractive answer (no synthesis API key configured)")
        );
    }

    println!("Sources:");
    for source in &answer.sources {
        println!(
            "  - {} #{} (score {:.4})",
            source.relative_path, source.chunk_index, source.score
        );
    }

    Ok(())
}

async fn cmd_verify(config: &Config, create_schema: bool) -> Result<()> {
    info!("Verifying configuration and database");

    let mut checks = Vec::new();

    let start = Instant::now();
    match Validator::validate_directory(&config.knowledge.data_dir) {
        Ok(_) => checks.push(HealthCheck::healthy("data_dir", start.elapsed())),
        Err(e) => checks.push(HealthCheck::unhealthy(
            "data_dir",
            e.to_string(),
            start.elapsed(),
        )),
    }

    let start = Instant::now();
    let client = connect(config).await?;
    checks.push(HealthCheck::healthy("database", start.elapsed()));

    let start = Instant::now();
    let schema_manager = SchemaManager::new(&client);
    if schema_manager.verify_schema().await? {
        checks.push(HealthCheck::healthy("schema", start.elapsed()));
    } else if create_schema {
        info!("Creating schema");
        schema_manager
            .initialize()
            .await
            .context("Failed to create schema")?;
        checks.push(HealthCheck::healthy("schema", start.elapsed()));
        println!("{}", format_success("Schema created"));
    } else {
        checks.push(HealthCheck::degraded(
            "schema",
            "chunk table missing (run ingest or use --create-schema)".to_string(),
            start.elapsed(),
        ));
    }

    let start = Instant::now();
    match Validator::validate_ws_endpoint(&config.realtime.endpoint) {
        Ok(_) if config.realtime.api_key.is_some() => {
            checks.push(HealthCheck::healthy("realtime", start.elapsed()));
        }
        Ok(_) => checks.push(HealthCheck::degraded(
            "realtime",
            "no API key configured".to_string(),
            start.elapsed(),
        )),
        Err(e) => checks.push(HealthCheck::unhealthy(
            "realtime",
            e.to_string(),
            start.elapsed(),
        )),
    }

    let report = HealthReport::new(checks, env!("CARGO_PKG_VERSION").to_string());
    println!("\n{}", report.format());

    Ok(())
}

async fn cmd_stats(config: &Config) -> Result<()> {
    info!("Gathering statistics");

    let client = connect(config).await?;

    let chunk_count = client.get_chunk_count().await?;
    info!("Total chunks: {}", chunk_count);

    println!("Index statistics:");
    println!("  Chunks:     {}", chunk_count);
    println!("  Table:      {}", client.table_name());
    println!("  Data dir:   {}", config.knowledge.data_dir.display());
    println!("  Chunk size: {}", config.knowledge.chunk_size);
    println!("  Top-k:      {}", config.query.top_k);

    Ok(())
}

async fn cmd_reset(config: &Config, confirm: bool) -> Result<()> {
    if !confirm {
        error!("This will delete all data. Use --confirm to proceed");
        return Ok(());
    }

    warn!("Resetting database - all data will be lost");

    let client = connect(config).await?;

    let schema_manager = SchemaManager::new(&client);
    schema_manager
        .drop_all_tables()
        .await
        .context("Failed to drop tables")?;

    info!("All tables dropped");

    schema_manager
        .initialize()
        .await
        .context("Failed to recreate schema")?;

    println!("{}", format_success("Database reset complete"));

    Ok(())
}

/// Console host for the voice application: stdin lines feed the text input
/// stream, text output is printed as it streams, audio output is drained
/// (no playback device is assumed here).
async fn cmd_serve(config: Config) -> Result<()> {
    Validator::validate_ws_endpoint(&config.realtime.endpoint)
        .context("Invalid realtime endpoint")?;

    let stream_buffer = config.realtime.stream_buffer;
    let mut app = VoiceApp::new(config);

    println!("{}", format_step(1, 2, "Setting up voice application"));
    app.setup().await.context("Application setup failed")?;

    println!("{}", format_step(2, 2, "Starting realtime session"));
    let (audio_tx, audio_rx) = audio_channel(stream_buffer);
    let (text_tx, text_rx) = text_channel(stream_buffer);

    let (mut audio_out, mut text_out) = match app.run(audio_rx, text_rx).await {
        Ok(streams) => streams,
        Err(e) => {
            println!("{}", format_error("Could not start the realtime session"));
            return Err(e).context("Session start failed");
        }
    };

    let printer = tokio::spawn(async move {
        use std::io::Write;
        while let Some(delta) = text_out.recv().await {
            print!("{}", delta);
            let _ = std::io::stdout().flush();
        }
        println!();
    });

    let audio_drain = tokio::spawn(async move {
        let mut bytes = 0usize;
        while let Some(frame) = audio_out.recv().await {
            bytes += frame.len();
        }
        debug!("Drained {} bytes of audio output", bytes);
    });

    println!("Session running. Type a message and press enter, ctrl-c to stop.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        if text_tx.send(line).await.is_err() {
                            warn!("Session input closed");
                            break;
                        }
                    }
                    Ok(None) => {
                        info!("Input ended");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read input: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received");
                break;
            }
        }
    }

    drop(text_tx);
    drop(audio_tx);

    app.teardown().await.context("Teardown failed")?;

    let _ = printer.await;
    let _ = audio_drain.await;

    println!("{}", format_success("Session closed"));
    Ok(())
}
