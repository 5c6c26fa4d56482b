use std::fmt;
use std::path::{Path, PathBuf};

use exam_core::time::DEFAULT_EXAM_SECONDS;
use services::auth_service::DEFAULT_API_URL;

pub const DEFAULT_DB_URL: &str = "sqlite:exam.sqlite3?mode=rwc";
pub const DEFAULT_RESULTS_LIMIT: u32 = 10;

#[derive(Debug)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidSeconds { raw: String },
    InvalidSeed { raw: String },
    InvalidLimit { raw: String },
    MissingFlag { command: Command, flag: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidSeconds { raw } => {
                write!(f, "invalid --seconds value: {raw} (must be > 0)")
            }
            ArgsError::InvalidSeed { raw } => write!(f, "invalid --seed value: {raw}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::MissingFlag { command, flag } => {
                write!(f, "{command} requires {flag}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Take,
    Import,
    Login,
    Logout,
    Register,
    Users,
    Results,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "take" => Some(Self::Take),
            "import" => Some(Self::Import),
            "login" => Some(Self::Login),
            "logout" => Some(Self::Logout),
            "register" => Some(Self::Register),
            "users" => Some(Self::Users),
            "results" => Some(Self::Results),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Command::Take => "take",
            Command::Import => "import",
            Command::Login => "login",
            Command::Logout => "logout",
            Command::Register => "register",
            Command::Users => "users",
            Command::Results => "results",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub db_url: String,
    pub api_url: String,
    pub questions: Option<PathBuf>,
    pub seconds: u32,
    pub seed: Option<u64>,
    pub candidate: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub limit: u32,
}

impl Args {
    /// Parse process arguments with environment fallbacks.
    pub fn parse() -> Result<Self, ArgsError> {
        Self::parse_from(std::env::args().skip(1), |key| std::env::var(key).ok())
    }

    pub fn parse_from(
        argv: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter().peekable();

        // `take` is the default when the first argument is a flag or missing.
        let command = match args.peek().map(String::as_str) {
            None => Command::Take,
            Some(first) if first.starts_with('-') => Command::Take,
            Some(first) => {
                let command = Command::from_arg(first)
                    .ok_or_else(|| ArgsError::UnknownCommand(first.to_owned()))?;
                args.next();
                command
            }
        };

        let mut parsed = Self {
            command,
            db_url: env("EXAM_DB_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DB_URL.into()),
            api_url: env("EXAM_API_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_URL.into()),
            questions: env("EXAM_QUESTIONS")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            seconds: match env("EXAM_SECONDS") {
                Some(raw) => parse_seconds(raw)?,
                None => DEFAULT_EXAM_SECONDS,
            },
            seed: None,
            candidate: None,
            username: None,
            password: None,
            limit: DEFAULT_RESULTS_LIMIT,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = value;
                }
                "--api-url" => parsed.api_url = require_value(&mut args, "--api-url")?,
                "--questions" => {
                    parsed.questions = Some(PathBuf::from(require_value(&mut args, "--questions")?));
                }
                "--seconds" => parsed.seconds = parse_seconds(require_value(&mut args, "--seconds")?)?,
                "--seed" => {
                    let value = require_value(&mut args, "--seed")?;
                    let seed = value
                        .trim()
                        .parse()
                        .map_err(|_| ArgsError::InvalidSeed { raw: value.clone() })?;
                    parsed.seed = Some(seed);
                }
                "--name" => parsed.candidate = Some(require_value(&mut args, "--name")?),
                "--username" | "-u" => parsed.username = Some(require_value(&mut args, "--username")?),
                "--password" | "-p" => parsed.password = Some(require_value(&mut args, "--password")?),
                "--limit" => {
                    let value = require_value(&mut args, "--limit")?;
                    parsed.limit = value
                        .trim()
                        .parse()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<(), ArgsError> {
        let missing = |flag| ArgsError::MissingFlag {
            command: self.command,
            flag,
        };
        match self.command {
            Command::Import if self.questions.is_none() => Err(missing("--questions")),
            Command::Login if self.username.is_none() => Err(missing("--username")),
            Command::Login if self.password.is_none() => Err(missing("--password")),
            _ => Ok(()),
        }
    }
}

fn parse_seconds(raw: String) -> Result<u32, ArgsError> {
    match raw.trim().parse::<u32>() {
        Ok(seconds) if seconds > 0 => Ok(seconds),
        _ => Err(ArgsError::InvalidSeconds { raw }),
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  exam [take]   [--name <candidate>] [--questions <file>] [--seconds <n>] [--seed <n>]");
    eprintln!("  exam import   --questions <file>");
    eprintln!("  exam login    --username <user> --password <pass>");
    eprintln!("  exam register [--username <user>]");
    eprintln!("  exam users");
    eprintln!("  exam results  [--limit <n>]");
    eprintln!("  exam logout");
    eprintln!();
    eprintln!("Common options:");
    eprintln!("  --db <sqlite_url>   (default: {DEFAULT_DB_URL})");
    eprintln!("  --api-url <url>     (default: {DEFAULT_API_URL})");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_API_URL, EXAM_QUESTIONS, EXAM_SECONDS, RUST_LOG");
    eprintln!("  A .env file in the working directory is loaded first.");
}

/// Turn a relative `sqlite:` URL into an absolute `sqlite://` one, keeping any
/// query string.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_owned();
    }

    let rest = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    if rest.starts_with("file:") {
        return trimmed.to_owned();
    }
    let (path_str, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    match query {
        Some(query) => format!("sqlite://{}?{query}", absolute.display()),
        None => format!("sqlite://{}", absolute.display()),
    }
}

/// Make sure the parent directory and the database file exist.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_owned(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| (*s).to_owned()).collect()
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_to_take_with_defaults() {
        let args = Args::parse_from(argv(&[]), no_env).unwrap();
        assert_eq!(args.command, Command::Take);
        assert_eq!(args.db_url, DEFAULT_DB_URL);
        assert_eq!(args.api_url, DEFAULT_API_URL);
        assert_eq!(args.seconds, 300);
        assert!(args.questions.is_none());
    }

    #[test]
    fn flags_override_environment() {
        let env = |key: &str| match key {
            "EXAM_SECONDS" => Some("120".to_owned()),
            "EXAM_DB_URL" => Some("sqlite::memory:".to_owned()),
            _ => None,
        };
        let args = Args::parse_from(argv(&["--seconds", "45", "--seed", "9"]), env).unwrap();
        assert_eq!(args.seconds, 45);
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.db_url, "sqlite::memory:");
    }

    #[test]
    fn rejects_zero_seconds_and_unknown_input() {
        assert!(matches!(
            Args::parse_from(argv(&["take", "--seconds", "0"]), no_env),
            Err(ArgsError::InvalidSeconds { .. })
        ));
        assert!(matches!(
            Args::parse_from(argv(&["frobnicate"]), no_env),
            Err(ArgsError::UnknownCommand(_))
        ));
        assert!(matches!(
            Args::parse_from(argv(&["results", "--verbose"]), no_env),
            Err(ArgsError::UnknownArg(_))
        ));
        assert!(matches!(
            Args::parse_from(argv(&["take", "--db"]), no_env),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
    }

    #[test]
    fn login_requires_credentials() {
        let err = Args::parse_from(argv(&["login", "-u", "asha"]), no_env).unwrap_err();
        assert_eq!(err.to_string(), "login requires --password");

        let args = Args::parse_from(argv(&["login", "-u", "asha", "-p", "pw"]), no_env).unwrap();
        assert_eq!(args.command, Command::Login);
        assert_eq!(args.username.as_deref(), Some("asha"));
    }

    #[test]
    fn normalizes_relative_sqlite_urls() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url("sqlite:file:memdb?mode=memory"),
            "sqlite:file:memdb?mode=memory"
        );

        let url = normalize_sqlite_url("sqlite:exam.sqlite3?mode=rwc");
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("/exam.sqlite3?mode=rwc"));
    }
}
