// cardsched - main.rs
// Command-line front end over the scheduling engine.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use cardsched::due::{build_session, SessionLimits};
use cardsched::stats::{accuracy_percent, mastery_level};
use cardsched::storage::{CardStore, ReviewLog, ReviewLogEntry};
use cardsched::{
    interval_description, suggest_grade_from_time, CardKey, CardRecord, Quality, Scheduler,
    SchedulerConfig, Sm2Scheduler, SystemClock,
};

const USAGE: &str = "Usage:
  cardsched schedule <card.json|new> <quality 0-3> [--response-ms N] [--config path]
  cardsched grade <response-ms> <correct|incorrect> [--config path]
  cardsched describe <interval-days>
  cardsched review <db> <user> <question-id> <quality 0-3> [--response-ms N] [--config path] [--log path]
  cardsched session <db> <user> [--config path]
  cardsched history <log> <user> [question-id]";

/// Positional arguments plus the `--flag value` options that follow them.
struct Args {
    positional: Vec<String>,
    config: Option<PathBuf>,
    response_ms: Option<u64>,
    log: Option<PathBuf>,
}

fn parse_args(raw: &[String]) -> Result<Args, String> {
    let mut args = Args {
        positional: Vec::new(),
        config: None,
        response_ms: None,
        log: None,
    };
    let mut iter = raw.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "--log" | "--response-ms" => {
                let value = iter
                    .next()
                    .ok_or_else(|| format!("{} requires a value", arg))?;
                match arg.as_str() {
                    "--config" => args.config = Some(PathBuf::from(value)),
                    "--log" => args.log = Some(PathBuf::from(value)),
                    _ => args.response_ms = Some(parse_number(value, "response time")?),
                }
            }
            _ => args.positional.push(arg.clone()),
        }
    }
    Ok(args)
}

fn parse_number<T: std::str::FromStr>(value: &str, what: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid {}: {:?}", what, value))
}

fn parse_quality(value: &str) -> Result<Quality, String> {
    let raw: i64 = parse_number(value, "quality")?;
    Quality::try_from(raw).map_err(|e| e.to_string())
}

fn load_config(path: Option<&Path>) -> Result<SchedulerConfig, String> {
    match path {
        Some(path) => SchedulerConfig::from_json_file(path).map_err(|e| e.to_string()),
        None => Ok(SchedulerConfig::default()),
    }
}

fn positional<'a>(args: &'a Args, index: usize, name: &str) -> Result<&'a str, String> {
    args.positional
        .get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing <{}>\n{}", name, USAGE))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn cmd_schedule(args: &Args) -> Result<(), String> {
    let config = load_config(args.config.as_deref())?;
    let card_arg = positional(args, 0, "card.json|new")?;
    let quality = parse_quality(positional(args, 1, "quality")?)?;

    let card = if card_arg == "new" {
        CardRecord::new(&config)
    } else {
        let contents = fs::read_to_string(card_arg).map_err(|e| format!("{}: {}", card_arg, e))?;
        serde_json::from_str(&contents).map_err(|e| format!("{}: {}", card_arg, e))?
    };

    let scheduler = Sm2Scheduler::new(config);
    let (card, result) = scheduler
        .schedule(&card, quality, args.response_ms, chrono::Utc::now())
        .map_err(|e| e.to_string())?;
    print_json(&serde_json::json!({ "card": card, "result": result }))
}

fn cmd_grade(args: &Args) -> Result<(), String> {
    let config = load_config(args.config.as_deref())?;
    let response_ms: u64 = parse_number(positional(args, 0, "response-ms")?, "response time")?;
    let was_correct = match positional(args, 1, "correct|incorrect")? {
        "correct" | "true" => true,
        "incorrect" | "false" => false,
        other => return Err(format!("expected correct or incorrect, got {:?}", other)),
    };
    let quality = suggest_grade_from_time(response_ms, was_correct, config.grading());
    println!("{:?} ({})", quality, i64::from(quality));
    Ok(())
}

fn parse_interval_days(value: &str) -> Result<f64, String> {
    let days: f64 = parse_number(value, "interval")?;
    if !days.is_finite() || days < 0.0 {
        return Err(format!("interval must be a non-negative number of days, got {:?}", value));
    }
    Ok(days)
}

fn cmd_describe(args: &Args) -> Result<(), String> {
    let days = parse_interval_days(positional(args, 0, "interval-days")?)?;
    println!("{}", interval_description(days));
    Ok(())
}

fn cmd_review(args: &Args) -> Result<(), String> {
    let config = load_config(args.config.as_deref())?;
    let db_path = positional(args, 0, "db")?;
    let user = positional(args, 1, "user")?;
    let question_id: i64 = parse_number(positional(args, 2, "question-id")?, "question id")?;
    let quality = parse_quality(positional(args, 3, "quality")?)?;

    let mut store = CardStore::open(Path::new(db_path)).map_err(|e| e.to_string())?;
    let scheduler = Sm2Scheduler::new(config);
    let key = CardKey::new(user, question_id);
    if !store.contains(&key).map_err(|e| e.to_string())? {
        log::info!("{} has no record yet; scheduling it as a new card", key);
    }
    let (card, result) = store
        .review(&key, &scheduler, quality, args.response_ms, &SystemClock)
        .map_err(|e| e.to_string())?;

    if let Some(log_path) = &args.log {
        let log = ReviewLog::new(log_path.clone()).map_err(|e| e.to_string())?;
        log.log_review(&key, &result).map_err(|e| e.to_string())?;
    }

    log::info!(
        "{} reviewed as {:?}; next review in {}",
        key,
        quality,
        interval_description(card.interval)
    );
    print_json(&serde_json::json!({
        "card": card,
        "result": result,
        "mastery": mastery_level(&card),
        "accuracy": accuracy_percent(&card),
    }))
}

fn cmd_session(args: &Args) -> Result<(), String> {
    let config = load_config(args.config.as_deref())?;
    let db_path = positional(args, 0, "db")?;
    let user = positional(args, 1, "user")?;

    let store = CardStore::open(Path::new(db_path)).map_err(|e| e.to_string())?;
    let cards = store.cards_for_user(user).map_err(|e| e.to_string())?;
    let session = build_session(
        &cards,
        chrono::Utc::now(),
        SessionLimits::from_config(&config),
        &mut rand::thread_rng(),
    );
    print_json(&session)
}

/// Log entries for one user, optionally narrowed to a single question, oldest first.
fn history_for(
    entries: Vec<ReviewLogEntry>,
    user: &str,
    question_id: Option<i64>,
) -> Vec<ReviewLogEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.key.user_id == user)
        .filter(|entry| question_id.map_or(true, |id| entry.key.question_id == id))
        .collect()
}

fn cmd_history(args: &Args) -> Result<(), String> {
    let log_path = positional(args, 0, "log")?;
    let user = positional(args, 1, "user")?;
    let question_id = match args.positional.get(2) {
        Some(value) => Some(parse_number::<i64>(value, "question id")?),
        None => None,
    };

    let log = ReviewLog::new(log_path).map_err(|e| e.to_string())?;
    let entries = log.read_all().map_err(|e| e.to_string())?;
    let history = history_for(entries, user, question_id);
    log::debug!("{} of the entries in {:?} match", history.len(), log.path());
    print_json(&history)
}

pub fn main() -> Result<(), String> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let raw: Vec<String> = env::args().skip(1).collect();
    let Some((command, rest)) = raw.split_first() else {
        eprintln!("{}", USAGE);
        return Err("no command given".to_string());
    };
    let args = parse_args(rest)?;

    match command.as_str() {
        "schedule" => cmd_schedule(&args),
        "grade" => cmd_grade(&args),
        "describe" => cmd_describe(&args),
        "review" => cmd_review(&args),
        "session" => cmd_session(&args),
        "history" => cmd_history(&args),
        other => {
            eprintln!("{}", USAGE);
            Err(format!("unknown command {:?}", other))
        }
    }
}
