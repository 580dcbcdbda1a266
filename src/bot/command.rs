use std::sync::OnceLock;

use regex::Regex;

use crate::reports::ReportPeriod;

/// A chat message after parsing; anything else is ignored without a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Menu,
    Status,
    Daily,
    Report(ReportPeriod),
    /// Report keyword with a missing or malformed period
    ReportUsage(ReportKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Monthly,
    Yearly,
}

impl ReportKind {
    pub fn usage(self) -> &'static str {
        match self {
            ReportKind::Monthly => "Format salah! Gunakan: !rekap MM/YYYY",
            ReportKind::Yearly => "Format salah! Gunakan: !tahun YYYY",
        }
    }
}

fn month_year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{4})$").unwrap())
}

fn year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}$").unwrap())
}

/// Normalize (trim, lower-case, optional leading `!`) and parse once
pub fn parse_command(text: &str) -> Option<Command> {
    let normalized = text.trim().to_lowercase();
    let normalized = normalized.strip_prefix('!').unwrap_or(&normalized);

    let mut parts = normalized.split_whitespace();
    let keyword = parts.next()?;
    let argument = parts.next();
    if parts.next().is_some() {
        return None;
    }

    match (keyword, argument) {
        ("menu", None) => Some(Command::Menu),
        ("status", None) => Some(Command::Status),
        ("harian", None) => Some(Command::Daily),
        ("rekap", arg) => Some(
            arg.and_then(parse_month_year)
                .map(Command::Report)
                .unwrap_or(Command::ReportUsage(ReportKind::Monthly)),
        ),
        ("tahun", arg) => Some(
            arg.and_then(parse_year)
                .map(Command::Report)
                .unwrap_or(Command::ReportUsage(ReportKind::Yearly)),
        ),
        _ => None,
    }
}

fn parse_month_year(argument: &str) -> Option<ReportPeriod> {
    let captures = month_year_pattern().captures(argument)?;
    let month: u32 = captures[1].parse().ok()?;
    let year: i32 = captures[2].parse().ok()?;
    if !(1..=12).contains(&month) || year == 0 {
        return None;
    }
    Some(ReportPeriod::Month { month, year })
}

fn parse_year(argument: &str) -> Option<ReportPeriod> {
    if !year_pattern().is_match(argument) {
        return None;
    }
    let year: i32 = argument.parse().ok()?;
    (year > 0).then_some(ReportPeriod::Year { year })
}
