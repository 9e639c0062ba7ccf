use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::game::GameServer;
use server::grid::BlockGrid;
use server::network::Server;
use server::store::{FileBlockStore, MemoryBlockStore};
use shared::World;
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8081")]
    port: u16,
    /// World width in pixels
    #[clap(long, default_value = "2250")]
    world_width: f64,
    /// World height in pixels
    #[clap(long, default_value = "1200")]
    world_height: f64,
    #[clap(long, default_value = "32")]
    sprite_width: f64,
    #[clap(long, default_value = "32")]
    sprite_height: f64,
    /// Grid cell width in pixels
    #[clap(long, default_value = "40")]
    cell_width: f64,
    /// Grid cell height in pixels
    #[clap(long, default_value = "40")]
    cell_height: f64,
    /// Distance between obstacle checks along a move
    #[clap(long, default_value = "20")]
    chunk_length: f64,
    /// Radius in cells cleared around a spawn point
    #[clap(long, default_value = "1")]
    spawn_clearance: i32,
    /// File that placed blocks are persisted to
    #[clap(short, long, default_value = "blocks.bin")]
    blocks_file: PathBuf,
    /// Keep blocks in memory only
    #[clap(long)]
    ephemeral: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: format!("{}:{}", self.host, self.port),
            world: World {
                width: self.world_width,
                height: self.world_height,
                sprite_width: self.sprite_width,
                sprite_height: self.sprite_height,
                cell_width: self.cell_width,
                cell_height: self.cell_height,
            },
            chunk_length: self.chunk_length,
            spawn_clearance: self.spawn_clearance,
            blocks_file: (!self.ephemeral).then_some(self.blocks_file),
        }
    }
}

/// Parses command-line arguments, loads the block grid and runs the server
/// until Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let config = Args::parse().into_config();
    config.validate()?;

    let (grid, store_writer) = match &config.blocks_file {
        Some(path) => {
            info!("Persisting blocks to {}", path.display());
            BlockGrid::load(FileBlockStore::new(path))?
        }
        None => {
            info!("Running with in-memory blocks only");
            BlockGrid::load(MemoryBlockStore::new())?
        }
    };

    let game = GameServer::new(&config, grid);
    let server = Server::bind(&config.bind_addr, game).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Received Ctrl+C, shutting down gracefully...");
        })
        .await?;

    // The grid was dropped with the server; wait for pending writes to land.
    if let Err(e) = store_writer.await {
        error!("Block store writer panicked: {}", e);
    }

    Ok(())
}
