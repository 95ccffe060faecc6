//! Date helper functions

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;

const PT_BR_MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

const PT_BR_MONTHS_SHORT: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Moment.js tokens, longest first within each family
const TOKENS: [(&str, &str); 19] = [
    ("YYYY", "%Y"),
    ("YY", "%y"),
    ("MMMM", "%B"),
    ("MMM", "%b"),
    ("MM", "%m"),
    ("M", "%-m"),
    ("DDDD", "%j"),
    ("DD", "%d"),
    ("D", "%-d"),
    ("dddd", "%A"),
    ("ddd", "%a"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("SSS", "%3f"),
    ("ZZ", "%z"),
    ("A", "%p"),
    ("a", "%P"),
];

/// Format a date using a Moment.js-compatible format string, in the given
/// IANA timezone, with month names in the site language
///
/// # Examples
/// ```ignore
/// format_date(&date, "DD MMM YYYY", "pt-BR", "America/Sao_Paulo") // -> "25 mar 2021"
/// ```
pub fn format_date(date: &DateTime<Utc>, format: &str, language: &str, timezone: &str) -> String {
    let tz: Tz = timezone.parse().unwrap_or(chrono_tz::UTC);
    let local = date.with_timezone(&tz);
    let chrono_format = moment_to_chrono_format(format, language, local.month0() as usize);
    local.format(&chrono_format).to_string()
}

/// Format a date for a `datetime` attribute
pub fn date_xml(date: &DateTime<Utc>) -> String {
    date.to_rfc3339()
}

/// Convert Moment.js format to chrono format. Month names are emitted as
/// literals for languages chrono does not know; `[...]` is copied verbatim.
fn moment_to_chrono_format(format: &str, language: &str, month0: usize) -> String {
    let portuguese = language.to_ascii_lowercase().starts_with("pt");
    let mut result = String::with_capacity(format.len() * 2);
    let mut rest = format;

    'outer: while !rest.is_empty() {
        if let Some((literal, tail)) = rest.strip_prefix('[').and_then(|r| r.split_once(']')) {
            result.push_str(&literal.replace('%', "%%"));
            rest = tail;
            continue;
        }

        for (token, spec) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                match (token, portuguese) {
                    ("MMMM", true) => result.push_str(PT_BR_MONTHS[month0 % 12]),
                    ("MMM", true) => result.push_str(PT_BR_MONTHS_SHORT[month0 % 12]),
                    _ => result.push_str(spec),
                }
                rest = tail;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                result.push_str("%%");
            } else {
                result.push(c);
            }
        }
        rest = chars.as_str();
    }

    result
}
