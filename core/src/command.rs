use crate::types::MatchNumber;
use std::fmt;

/// Every chat command the bot answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    // ── Everyone ──────────────────────────────────
    Win {
        actor: String,
        match_number: MatchNumber,
    },
    Leaderboard,
    Today,
    Stats {
        actor: String,
    },
    About,

    // ── Admin only ────────────────────────────────
    Undo,
    ClearPoints,
    AdminLog,
    Export,
}

impl BotCommand {
    /// Stable name, used for cooldown keys and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Win { .. }   => "win",
            Self::Leaderboard  => "d11",
            Self::Today        => "tdy",
            Self::Stats { .. } => "stats",
            Self::About        => "about",
            Self::Undo         => "undo",
            Self::ClearPoints  => "clearpoints",
            Self::AdminLog     => "adminlog",
            Self::Export       => "export",
        }
    }

    pub fn requires_admin(&self) -> bool {
        matches!(self, Self::Undo | Self::ClearPoints | Self::AdminLog | Self::Export)
    }
}

/// A recognised command with unusable arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    Usage(&'static str),
    BadMatchNumber(String),
}

impl CommandError {
    /// The command the malformed message was aimed at.
    pub fn command(&self) -> &'static str {
        match self {
            Self::Usage(usage) if *usage == STATS_USAGE => "stats",
            Self::Usage(_) | Self::BadMatchNumber(_) => "win",
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(usage) if *usage == WIN_USAGE => {
                write!(f, "Please specify both username and match number: `{usage}`")
            }
            Self::Usage(usage) => write!(f, "Usage: `{usage}`"),
            Self::BadMatchNumber(_) => write!(f, "Please provide a valid match number."),
        }
    }
}

const WIN_USAGE: &str = "!win <username> <match_number>";
const STATS_USAGE: &str = "!stats <username>";

/// Parse one chat message. `None` means the text is not a command.
pub fn parse(text: &str) -> Option<Result<BotCommand, CommandError>> {
    let mut words = text.split_whitespace();
    let head = words.next()?;
    let args: Vec<&str> = words.collect();

    let command = match head {
        "!win" => {
            let [actor, match_number, ..] = args.as_slice() else {
                return Some(Err(CommandError::Usage(WIN_USAGE)));
            };
            match match_number.parse::<MatchNumber>() {
                Ok(match_number) => BotCommand::Win {
                    actor: actor.to_string(),
                    match_number,
                },
                Err(_) => return Some(Err(CommandError::BadMatchNumber(match_number.to_string()))),
            }
        }
        "!stats" => match args.first() {
            Some(actor) => BotCommand::Stats { actor: actor.to_string() },
            None => return Some(Err(CommandError::Usage(STATS_USAGE))),
        },
        "!d11" => BotCommand::Leaderboard,
        "!tdy" => BotCommand::Today,
        "!about" => BotCommand::About,
        "!undo" => BotCommand::Undo,
        "!clearpoints" => BotCommand::ClearPoints,
        "!adminlog" => BotCommand::AdminLog,
        "!export" => BotCommand::Export,
        _ => return None,
    };
    Some(Ok(command))
}
