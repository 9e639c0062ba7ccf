use clap::Parser;
use client::game::ClientWorld;
use client::input::MovementPlanner;
use client::network::Connection;
use log::{info, warn};
use rand::Rng;
use shared::ServerMessage;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server URL to connect to
    #[arg(short = 's', long, default_value = "ws://127.0.0.1:8081")]
    server: String,

    /// Number of movement requests to send before leaving
    #[arg(short = 'm', long, default_value = "50")]
    moves: u32,

    /// Minimum delay between movement requests in milliseconds
    #[arg(short = 'd', long, default_value = "100")]
    move_delay_ms: u64,

    /// Place a block after every N moves (0 disables)
    #[arg(short = 'b', long, default_value = "0")]
    block_every: u32,
}

enum Step {
    Message(Option<ServerMessage>),
    Tick,
}

/// Waits for the `init` snapshot, feeding every earlier message to the mirror.
async fn wait_for_init(
    connection: &mut Connection,
    world: &mut ClientWorld,
) -> client::network::Result<bool> {
    while !world.is_initialized() {
        match connection.next_message().await? {
            Some(message) => world.apply(message),
            None => return Ok(false),
        }
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let mut connection = Connection::connect(&args.server).await?;
    connection.join().await?;

    let mut world = ClientWorld::new();
    if !wait_for_init(&mut connection, &mut world).await? {
        warn!("Server closed the connection before sending init");
        return Ok(());
    }

    let settings = *world.world().ok_or("init carried no world")?;
    let mut planner = MovementPlanner::new(settings, Duration::from_millis(args.move_delay_ms));
    let mut rng = rand::thread_rng();

    let mut ticker = interval(Duration::from_millis(args.move_delay_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut moves_sent = 0;
    while moves_sent < args.moves {
        let step = tokio::select! {
            message = connection.next_message() => Step::Message(message?),
            _ = ticker.tick() => Step::Tick,
        };

        match step {
            Step::Message(Some(message)) => world.apply(message),
            Step::Message(None) => {
                warn!("Server closed the connection");
                return Ok(());
            }
            Step::Tick => {
                let from = match world.own_player() {
                    Some(player) => player.position(),
                    None => break,
                };
                let angle = rng.gen_range(0.0..360.0);
                if let Some(target) = planner.plan(from, angle, Instant::now()) {
                    connection.send_move(target.x, target.y).await?;
                    moves_sent += 1;

                    if args.block_every > 0 && moves_sent % args.block_every == 0 {
                        connection.place_obstacle().await?;
                    }
                }
            }
        }
    }

    if let Some(player) = world.own_player() {
        info!(
            "Finished {} moves at ({:.1}, {:.1}); {} players, {} blocks in view",
            moves_sent,
            player.x,
            player.y,
            world.player_count(),
            world.block_count()
        );
    }

    connection.close().await?;

    Ok(())
}
