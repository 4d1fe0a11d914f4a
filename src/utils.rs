use anyhow::Context;
use chrono::Duration;
use time::macros::format_description;
use tracing_subscriber::{fmt::time::LocalTime, EnvFilter};

use crate::args::{Args, Command};

/// Installs the stderr subscriber. `RUST_LOG` wins over `--verbose`.
pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn format_number(num: u64) -> String {
    let digits = num.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_optional(num: Option<u64>) -> String {
    num.map(format_number).unwrap_or_else(|| "unknown".to_string())
}

pub fn ttl_duration(hours: i64) -> anyhow::Result<Duration> {
    Duration::try_hours(hours).with_context(|| format!("--ttl-hours {} is too large", hours))
}

pub fn validate_args(args: &Args) -> anyhow::Result<()> {
    if args.ttl_hours <= 0 {
        anyhow::bail!("--ttl-hours must be greater than 0");
    }
    ttl_duration(args.ttl_hours)?;

    if let Command::Rank { top, workers, .. } = &args.command {
        if let Some(top) = top {
            if *top == 0 {
                anyhow::bail!("--top must be greater than 0");
            }
        }

        if let Some(workers) = workers {
            if *workers == 0 {
                anyhow::bail!("--workers must be greater than 0");
            }
        }
    }

    if let Command::Analyze { user1, user2 } = &args.command {
        let (user1, user2) = (user1.trim(), user2.trim());
        if user1.is_empty() || user2.is_empty() {
            anyhow::bail!("Both usernames must be provided");
        }
        if user1 == user2 {
            anyhow::bail!("Cannot compare a user with themselves");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn formats_thousands() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_optional(None), "unknown");
    }

    #[test]
    fn rejects_self_comparison_and_blank_names() {
        let args = Args::parse_from(["closeness", "analyze", "alice", " alice "]);
        assert!(validate_args(&args).is_err());

        let args = Args::parse_from(["closeness", "analyze", "alice", "  "]);
        assert!(validate_args(&args).is_err());

        let args = Args::parse_from(["closeness", "analyze", "alice", "bob"]);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn rejects_zero_counts() {
        let args = Args::parse_from(["closeness", "rank", "alice", "--top", "0"]);
        assert!(validate_args(&args).is_err());

        let args = Args::parse_from(["closeness", "rank", "alice", "--workers", "0"]);
        assert!(validate_args(&args).is_err());

        let args = Args::parse_from(["closeness", "--ttl-hours", "0", "clear-cache"]);
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn rejects_overflowing_ttl() {
        let args = Args::parse_from(["closeness", "--ttl-hours", "9000000000000", "clear-cache"]);
        assert!(validate_args(&args).is_err());
        assert!(ttl_duration(i64::MAX).is_err());
        assert_eq!(ttl_duration(24).unwrap(), Duration::hours(24));
    }
}
