use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use journey_core::domain::{ActorId, CacheError, LocationId, Point, RouteView};
use journey_core::impls::AtomicJourneyMetrics;
use journey_core::ports::JourneyMetrics;
use journey_core::{DeduplicationCache, Pipeline, PipelineConfig};

/// Replay character movement commands (JSON lines) through the journey pipeline.
#[derive(Debug, Parser)]
#[command(name = "journey", version)]
struct Args {
    /// Command file; reads stdin when omitted.
    input: Option<PathBuf>,

    #[arg(long, env = "JOURNEY_DATABASE_URL", default_value = journey_core::config::DEFAULT_DATABASE_URL)]
    database_url: String,

    #[arg(
        long,
        env = "JOURNEY_QUEUE_CAPACITY",
        default_value_t = journey_core::config::DEFAULT_QUEUE_CAPACITY,
        value_parser = journey_core::config::parse_queue_capacity
    )]
    queue_capacity: NonZeroUsize,

    #[arg(long, env = "JOURNEY_SHUTDOWN_TIMEOUT_SECS", default_value_t = 60)]
    shutdown_timeout_secs: u64,
}

/// One inbound request, keyed by command name with PascalCase fields.
#[derive(Debug, Deserialize)]
enum Command {
    StartJourney {
        #[serde(rename = "CharacterId")]
        character_id: String,
        #[serde(rename = "StartId")]
        start_id: u16,
        #[serde(rename = "DestinationId")]
        destination_id: u16,
    },
    Movement {
        #[serde(rename = "CharacterId")]
        character_id: String,
        #[serde(rename = "X")]
        x: u16,
        #[serde(rename = "Y")]
        y: u16,
    },
    ReachedDestination {
        #[serde(rename = "CharacterId")]
        character_id: String,
        #[serde(rename = "DestinationId")]
        destination_id: u16,
    },
}

#[derive(Debug, Serialize)]
struct JourneysResponse {
    journeys: Vec<RouteView>,
}

async fn apply(cache: &DeduplicationCache, command: Command) -> Result<(), CacheError> {
    match command {
        Command::StartJourney {
            character_id,
            start_id,
            destination_id,
        } => {
            cache
                .start_journey(
                    ActorId::from(character_id),
                    LocationId::new(start_id),
                    LocationId::new(destination_id),
                )
                .await;
            Ok(())
        }
        Command::Movement { character_id, x, y } => {
            cache
                .movement(&ActorId::from(character_id), Point::new(x, y))
                .await
        }
        Command::ReachedDestination {
            character_id,
            destination_id,
        } => {
            cache
                .reached_destination(
                    &ActorId::from(character_id),
                    LocationId::new(destination_id),
                )
                .await
        }
    }
}

/// 1 行 1 コマンドで読み、適用した件数を返す
async fn replay<R: AsyncBufRead + Unpin>(
    reader: R,
    cache: &DeduplicationCache,
    metrics: &dyn JourneyMetrics,
) -> Result<usize> {
    let mut lines = reader.lines();
    let mut applied = 0;
    let mut line_no = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command: Command = match serde_json::from_str(line) {
            Ok(command) => command,
            Err(err) => {
                warn!(line = line_no, error = %err, "skipping malformed command");
                continue;
            }
        };
        metrics.log_request();
        // NotFound は cache 側で warn 済み。処理は続ける
        if let Err(err) = apply(cache, command).await {
            debug!(line = line_no, error = %err, "command rejected");
        }
        applied += 1;
    }
    Ok(applied)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("journey_core=info".parse()?)
                .add_directive("journey_cli=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = PipelineConfig {
        database_url: args.database_url,
        queue_capacity: args.queue_capacity,
        shutdown_timeout: Duration::from_secs(args.shutdown_timeout_secs),
    };

    let metrics = Arc::new(AtomicJourneyMetrics::new());
    let pipeline = Pipeline::connect(&config, metrics.clone()).await?;
    let cache = pipeline.cache();

    let applied = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?;
            replay(BufReader::new(file), &cache, metrics.as_ref()).await?
        }
        None => replay(BufReader::new(tokio::io::stdin()), &cache, metrics.as_ref()).await?,
    };

    let response = JourneysResponse {
        journeys: cache.list_routes().await,
    };
    let snapshot = metrics.snapshot();
    info!(
        applied,
        requests = snapshot.requests,
        completed_journeys = snapshot.completed_journeys,
        "replay finished"
    );

    drop(cache);
    // 入力は読み終えたので、停止の前に積まれたイベントを書き切る
    pipeline.drain(config.shutdown_timeout).await;
    if !pipeline.shutdown().await {
        warn!("pipeline did not shut down cleanly");
    }

    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}
