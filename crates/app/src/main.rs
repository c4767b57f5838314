use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use services::{AppServices, Clock, ConnectionMonitor, FetchError, LifecycleEvent, StudyError};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;
use vocab_core::QuizConfig;
use vocab_core::model::{OPTION_COUNT, StreakStatus};

mod words;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [quiz|flashcards|status|reset] [--db <sqlite_url>]");
    eprintln!("                      [--words <file>] [--endpoint <url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  command quiz, --db sqlite://yds.sqlite3, built-in word list");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  YDS_DB_URL, YDS_ENDPOINT, YDS_WORDS_PER_STREAK, ... (see QuizConfig)");
    eprintln!("  RUST_LOG (default: warn)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz,
    Flashcards,
    Status,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz),
            "flashcards" => Some(Self::Flashcards),
            "status" => Some(Self::Status),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    words: Option<PathBuf>,
    endpoint: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("YDS_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| "sqlite://yds.sqlite3".into(), normalize_sqlite_url);
        let mut words = None;
        let mut endpoint = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--words" => words = Some(PathBuf::from(require_value(args, "--words")?)),
                "--endpoint" => endpoint = Some(require_value(args, "--endpoint")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            words,
            endpoint,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
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

//
// ─── TERMINAL IO ───────────────────────────────────────────────────────────────
//

struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Next trimmed input line, `None` on end of input.
    async fn read(&mut self, prompt: &str) -> Result<Option<String>> {
        println!("{prompt}");
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_lowercase()))
    }
}

fn print_streak(status: &StreakStatus) {
    if status.just_completed {
        println!(
            "Daily {} goal reached! Streak: {} day(s).",
            status.mode.label(),
            status.streak
        );
    } else if status.completed {
        println!(
            "Today's {} goal is done. Streak: {} day(s).",
            status.mode.label(),
            status.streak
        );
    } else {
        println!(
            "{} progress: {}/{} ({} to go). Streak: {} day(s).",
            status.mode.label(),
            status.progress,
            status.total,
            status.remaining(),
            status.streak
        );
    }
}

/// Report a failed load; returns `false` when the learner wants to stop.
async fn report_failure(
    services: &AppServices,
    err: &FetchError,
    prompt: &mut Prompt,
) -> Result<bool> {
    let quality = services.connection().quality();
    println!("{}", err.user_message(quality));
    let answer = prompt.read("Press Enter to try again, or q to quit.").await?;
    Ok(!matches!(answer.as_deref(), None | Some("q")))
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn run_quiz(services: &AppServices, prompt: &mut Prompt) -> Result<()> {
    let mut flow = services.quiz_flow();
    flow.warm_up();

    loop {
        let question = match flow.next_question().await {
            Ok(question) => question.clone(),
            Err(StudyError::Debounced) => {
                tokio::time::sleep(services.config().debounce_delay).await;
                continue;
            }
            Err(StudyError::Fetch(err)) => {
                if report_failure(services, &err, prompt).await? {
                    continue;
                }
                break;
            }
            Err(err) => return Err(err.into()),
        };

        println!();
        println!("{}", question.sentence());
        for (idx, option) in question.options().iter().enumerate() {
            println!("  {}. {option}", idx + 1);
        }

        let selected = loop {
            let Some(input) = prompt.read("Your answer (1-5, q to quit):").await? else {
                return Ok(());
            };
            if input == "q" {
                return Ok(());
            }
            match input.parse::<usize>() {
                Ok(n) if (1..=OPTION_COUNT).contains(&n) => break n - 1,
                _ => println!("Please type a number from 1 to 5."),
            }
        };

        let answer = flow.answer(selected)?;
        if answer.outcome.is_correct {
            println!("Correct!");
        } else {
            println!(
                "Not quite. The answer is: {}",
                question.options()[answer.outcome.correct_index]
            );
        }
        let explanation = answer.outcome.explanation.as_deref().unwrap_or_default();
        if !explanation.is_empty() {
            println!("{explanation}");
        }
        let (correct, total) = flow.score();
        println!("Score: {correct} / {total}");
        print_streak(&answer.streak);
    }
    Ok(())
}

async fn run_flashcards(services: &AppServices, prompt: &mut Prompt) -> Result<()> {
    let mut flow = services.flashcard_flow();
    flow.warm_up();

    loop {
        let card = match flow.next_card().await {
            Ok(card) => card,
            Err(StudyError::Debounced) => {
                tokio::time::sleep(services.config().debounce_delay).await;
                continue;
            }
            Err(StudyError::Fetch(err)) => {
                if report_failure(services, &err, prompt).await? {
                    continue;
                }
                break;
            }
            Err(err) => return Err(err.into()),
        };

        println!();
        println!("== {} ==", card.word);
        if prompt.read("Press Enter to reveal.").await?.is_none() {
            return Ok(());
        }
        println!("{}", card.content.definition());
        println!("e.g. {}", card.content.example());

        let known = loop {
            let input = prompt
                .read("Did you know it? (k = know, d = don't know, q = quit)")
                .await?;
            match input.as_deref() {
                None | Some("q") => return Ok(()),
                Some("k") => break true,
                Some("d") => break false,
                Some(_) => println!("Please type k, d or q."),
            }
        };

        let status = flow.rate(known)?;
        let (known_count, total) = flow.score();
        println!("Known: {known_count} / {total}");
        print_streak(&status);
    }
    Ok(())
}

fn run_status(services: &AppServices) {
    let overview = services.streaks().overview();
    for status in [overview.quiz, overview.flashcard] {
        print_streak(&status);
    }
}

async fn run() -> Result<()> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Quiz,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Quiz,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            print_usage();
            anyhow::anyhow!("unknown subcommand: {first}")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).inspect_err(|_| print_usage())?;

    let mut config = QuizConfig::from_env()?;
    if let Some(endpoint) = parsed.endpoint {
        config = config.with_endpoint(endpoint);
    }
    let words = match &parsed.words {
        Some(path) => words::load_words(path)?,
        None => words::default_words(),
    };

    prepare_sqlite_file(&parsed.db_url)?;
    let services =
        AppServices::new_sqlite(&parsed.db_url, config, Clock::default_clock(), words).await?;

    let mut prompt = Prompt::new();
    let outcome = match cmd {
        Command::Quiz => run_quiz(&services, &mut prompt).await,
        Command::Flashcards => run_flashcards(&services, &mut prompt).await,
        Command::Status => {
            run_status(&services);
            Ok(())
        }
        Command::Reset => {
            services.streaks().reset().await;
            println!("Streaks reset.");
            Ok(())
        }
    };

    services.on_lifecycle(LifecycleEvent::Terminating).await;
    outcome
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err:#}");
        std::process::exit(2);
    }
}
