//! Command-line front end: perft, divide, move listing and table discovery.
//!
//! Usage: cargo run --release -- perft --depth 5
//!        cargo run --release -- moves --fen "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1"
//!        cargo run --release -- suite --max-depth 5

use std::time::Instant;

use bitchess::board::START_FEN;
use bitchess::magic::{self, MagicConfig, MagicTables, Slider};
use bitchess::perft::{divide, perft, perft_parallel, start_position_leaves, PERFT_SUITE};
use bitchess::{Board, Status};
use chrono::Local;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use itertools::Itertools;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bitchess")]
#[command(about = "Bitboard move generator with magic sliding attacks")]
struct Args {
    /// Worker threads for parallel perft (0 = one per core)
    #[arg(long, default_value_t = 0, global = true)]
    threads: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count leaf positions at a fixed depth
    Perft {
        #[arg(long, default_value = START_FEN)]
        fen: String,

        #[arg(short, long, default_value_t = 4)]
        depth: u8,

        /// Run on the current thread only
        #[arg(long)]
        sequential: bool,
    },
    /// Leaf counts below every legal root move
    Divide {
        #[arg(long, default_value = START_FEN)]
        fen: String,

        #[arg(
            short,
            long,
            default_value_t = 3,
            value_parser = clap::value_parser!(u8).range(1..)
        )]
        depth: u8,
    },
    /// Show the board, its legal moves and its status
    Moves {
        #[arg(long, default_value = START_FEN)]
        fen: String,
    },
    /// Play coordinate moves (e.g. e2e4 e7e5) and print the result
    Play {
        #[arg(long, default_value = START_FEN)]
        fen: String,

        moves: Vec<String>,
    },
    /// Run the regression positions
    Suite {
        /// Skip cases deeper than this
        #[arg(long, default_value_t = 6)]
        max_depth: u8,
    },
    /// Search for magics from scratch and print them
    Magics {
        #[arg(long, default_value_t = MagicConfig::default().seed)]
        seed: u64,

        /// Give up on a square after this many candidates
        #[arg(long)]
        max_attempts: Option<u64>,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .wrap_err("failed to start the thread pool")?;

    if !matches!(args.command, Command::Magics { .. }) {
        let start = Instant::now();
        magic::init();
        info!(elapsed_ms = start.elapsed().as_millis() as u64, "attack tables ready");
    }

    match args.command {
        Command::Perft {
            fen,
            depth,
            sequential,
        } => run_perft(&fen, depth, sequential),
        Command::Divide { fen, depth } => run_divide(&fen, depth),
        Command::Moves { fen } => run_moves(&fen),
        Command::Play { fen, moves } => run_play(&fen, &moves),
        Command::Suite { max_depth } => run_suite(max_depth),
        Command::Magics { seed, max_attempts } => run_magics(seed, max_attempts),
    }
}

fn parse_board(fen: &str) -> Result<Board> {
    Board::from_fen(fen).wrap_err_with(|| format!("could not parse FEN '{}'", fen))
}

fn run_perft(fen: &str, depth: u8, sequential: bool) -> Result<()> {
    let board = parse_board(fen)?;
    println!("{} perft {} of {}", Local::now().format("%Y-%m-%d %H:%M:%S"), depth, fen);
    println!("{}", board);

    let start = Instant::now();
    let stats = if sequential {
        perft(&board, depth)?
    } else {
        perft_parallel(&board, depth)?
    };
    let elapsed = start.elapsed();

    println!("leaves:    {}", stats.leaves);
    if let Some(expected) = start_position_leaves(depth).filter(|_| fen == START_FEN) {
        println!("expected:  {}", expected);
    }
    println!("generated: {}", stats.generated);
    println!("legal:     {}", stats.legal);
    println!("accuracy:  {:.2}%", stats.accuracy() * 100.0);
    println!(
        "time:      {:.3}s ({:.0} nodes/s)",
        elapsed.as_secs_f64(),
        stats.leaves as f64 / elapsed.as_secs_f64().max(1e-9)
    );
    Ok(())
}

fn run_divide(fen: &str, depth: u8) -> Result<()> {
    let board = parse_board(fen)?;
    let split = divide(&board, depth)?;
    for (mv, leaves) in split.iter().sorted_by_key(|(mv, _)| mv.to_uci()) {
        println!("{}: {}", mv, leaves);
    }
    println!();
    println!("moves: {}", split.len());
    println!("leaves: {}", split.iter().map(|(_, n)| n).sum::<u64>());
    Ok(())
}

fn run_moves(fen: &str) -> Result<()> {
    let mut board = parse_board(fen)?;
    println!("{}", board);
    println!("{}", board.to_fen());

    let legal = board.legal_moves()?;
    println!("{} legal moves: {}", legal.len(), legal.iter().join(" "));
    match board.status()? {
        Some(Status::Checkmate(winner)) => println!("checkmate, {} wins", winner.to_human()),
        Some(Status::Stalemate) => println!("stalemate"),
        None if board.is_check() => println!("{} is in check", board.active_color().to_human()),
        None => println!("{} to move", board.active_color().to_human()),
    }
    Ok(())
}

fn run_play(fen: &str, moves: &[String]) -> Result<()> {
    let mut board = parse_board(fen)?;
    for text in moves {
        let mv = board
            .play(text)
            .wrap_err_with(|| format!("could not play '{}'", text))?;
        info!(%mv, "{}", mv.to_human());
    }
    println!("{}", board);
    println!("{}", board.to_fen());
    Ok(())
}

fn run_suite(max_depth: u8) -> Result<()> {
    let mut failures = Vec::new();
    for case in PERFT_SUITE.iter().filter(|case| case.depth <= max_depth) {
        let board = parse_board(case.fen)?;
        let start = Instant::now();
        let leaves = perft_parallel(&board, case.depth)?.leaves;
        let ok = leaves == case.leaves;
        println!(
            "{:<30} depth {} {:>10} {:>10} {:>7.3}s {}",
            case.name,
            case.depth,
            leaves,
            case.leaves,
            start.elapsed().as_secs_f64(),
            if ok { "ok" } else { "FAILED" }
        );
        if !ok {
            failures.push(case.name);
        }
    }
    if !failures.is_empty() {
        bail!("{} positions failed: {}", failures.len(), failures.iter().join(", "));
    }
    Ok(())
}

fn run_magics(seed: u64, max_attempts: Option<u64>) -> Result<()> {
    let start = Instant::now();
    let tables = MagicTables::generate(MagicConfig {
        seed,
        max_attempts,
        use_known_magics: false,
    })?;
    info!(
        elapsed_ms = start.elapsed().as_millis() as u64,
        squares = tables.searched_squares(),
        "magic search finished"
    );

    for slider in Slider::ALL {
        println!("{} magics:", slider.name());
        for row in &(0..64u8).chunks(4) {
            let line = row
                .map(|sq| format!("{:#018x}", tables.magic(slider, sq).magic))
                .join(", ");
            println!("    {},", line);
        }
    }
    Ok(())
}
