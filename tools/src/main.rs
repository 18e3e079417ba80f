//! winledger-bot: chat front end for the win ledger.
//!
//! Reads one JSON request per line on stdin and writes one JSON reply per
//! line on stdout. A chat gateway sits on the other side of the pipe.
//!
//! Usage:
//!   winledger-bot                  serve requests on stdin/stdout
//!   winledger-bot --db ledger.db   override DB_PATH
//!   winledger-bot --check          print standings and consistency report, then exit

use anyhow::Result;
use std::env;
use std::io::{self, BufRead, Write};
use winledger_core::{
    bot::{Bot, InboundMessage},
    config::BotConfig,
    policy::Caller,
};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    Message {
        caller_id: String,
        caller_name: String,
        text: String,
    },
    Ping,
    Quit,
}

#[derive(serde::Serialize)]
struct IpcReply {
    reply: Option<String>,
}

fn main() -> Result<()> {
    // A missing .env is normal in production.
    let _ = dotenvy::dotenv();
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let check_only = args.iter().any(|a| a == "--check");

    let mut config = BotConfig::from_env()?;
    if let Some(db) = arg_value(&args, "--db") {
        config.store.db_path = db.to_string();
    }
    if let Some(path) = arg_value(&args, "--schedule") {
        config.schedule_path = path.to_string();
    }

    let bot = Bot::from_config(&config)?;
    log::info!(
        "winledger-bot {} ready: {} admin(s), store {}",
        env!("CARGO_PKG_VERSION"),
        config.admin_ids.len(),
        config.store.db_path
    );

    if check_only {
        print_check(&bot)
    } else {
        run_ipc_loop(&bot)
    }
}

fn run_ipc_loop(bot: &Bot) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{err_json}")?;
                stdout.flush()?;
                continue;
            }
        };

        let reply = match request {
            IpcRequest::Quit => break,
            IpcRequest::Ping => IpcReply { reply: Some("pong".into()) },
            IpcRequest::Message { caller_id, caller_name, text } => {
                let msg = InboundMessage::new(Caller::new(caller_id, caller_name), text);
                IpcReply { reply: bot.handle(&msg) }
            }
        };
        writeln!(stdout, "{}", serde_json::to_string(&reply)?)?;
        stdout.flush()?;
    }
    log::info!("winledger-bot shutting down");
    Ok(())
}

fn print_check(bot: &Bot) -> Result<()> {
    let ledger = bot.ledger();
    let standings = ledger.get_leaderboard()?;
    let results = ledger.get_match_results()?;
    let history = ledger.get_history(None)?;

    println!("=== LEDGER SUMMARY ===");
    println!("  league date:    {}", bot.clock().today());
    println!("  actors:         {}", standings.len());
    println!("  history:        {}", history.len());
    println!("  match results:  {}", results.len());
    println!();
    for (rank, s) in standings.iter().enumerate() {
        println!("  {:>3}. {:<34} {}", rank + 1, s.actor, s.points);
    }

    let problems = ledger.verify_consistency()?;
    println!();
    if problems.is_empty() {
        println!("=== CONSISTENT ===");
        Ok(())
    } else {
        println!("=== {} INCONSISTENCY(IES) ===", problems.len());
        for p in &problems {
            println!("  {}", serde_json::to_string(p)?);
        }
        anyhow::bail!("ledger is inconsistent")
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}
