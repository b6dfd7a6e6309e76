//! `format` predicates.
//!
//! Formats annotate by default. These predicates only run when the caller (or a
//! format-assertion vocabulary) turns assertion on. Non-string instances always pass.
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

pub type FormatCheck = fn(&str) -> bool;

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([0-9]{2}):([0-9]{2}):([0-9]{2})(\.[0-9]+)?(z|([+-])([0-9]{2}):([0-9]{2}))$").unwrap()
});

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:[0-9]+W|(?:[0-9]+Y)?(?:[0-9]+M)?(?:[0-9]+D)?(?:T(?:[0-9]+H)?(?:[0-9]+M)?(?:[0-9]+S)?)?)$").unwrap()
});

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").unwrap()
});

static EMAIL_LOCAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*$").unwrap()
});

static LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").unwrap()
});

static URI_TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^{}]|\{[+#./;?&=,!@|]?[A-Za-z0-9_%.]+(:[1-9][0-9]{0,3}|\*)?(,[A-Za-z0-9_%.]+(:[1-9][0-9]{0,3}|\*)?)*\})*$").unwrap()
});

/// Built-in predicate for `name`, if the engine knows it.
pub fn builtin(name: &str) -> Option<FormatCheck> {
    let check: FormatCheck = match name {
        "date-time" => is_date_time,
        "date" => is_date,
        "time" => is_time,
        "duration" => is_duration,
        "email" => is_email,
        "idn-email" => is_idn_email,
        "hostname" => is_hostname,
        "idn-hostname" => is_idn_hostname,
        "ipv4" => is_ipv4,
        "ipv6" => is_ipv6,
        "uri" => is_uri,
        "uri-reference" => is_uri_reference,
        "iri" => is_iri,
        "iri-reference" => is_iri_reference,
        "uuid" => is_uuid,
        "uri-template" => is_uri_template,
        "json-pointer" => is_json_pointer,
        "relative-json-pointer" => is_relative_json_pointer,
        "regex" => is_regex,
        _ => return None,
    };
    Some(check)
}

// ---- dates and times ---- //

pub fn is_date(s: &str) -> bool {
    s.len() == 10 && s.is_ascii() && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

pub fn is_time(s: &str) -> bool {
    let Some(caps) = TIME_RE.captures(s) else { return false };
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i64>().ok());
    let (Some(h), Some(m), Some(sec)) = (num(1), num(2), num(3)) else { return false };
    if h > 23 || m > 59 || sec > 60 {
        return false;
    }
    let offset = match (caps.get(6), num(7), num(8)) {
        (Some(sign), Some(oh), Some(om)) => {
            if oh > 23 || om > 59 {
                return false;
            }
            let minutes = oh * 60 + om;
            if sign.as_str() == "-" { -minutes } else { minutes }
        }
        _ => 0,
    };
    if sec == 60 {
        // leap seconds only exist at 23:59:60 UTC
        let utc = (h * 60 + m - offset).rem_euclid(24 * 60);
        return utc == 23 * 60 + 59;
    }
    NaiveTime::from_hms_opt(h as u32, m as u32, sec as u32).is_some()
}

pub fn is_date_time(s: &str) -> bool {
    match s.find(['T', 't']) {
        Some(i) => is_date(&s[..i]) && is_time(&s[i + 1..]),
        None => false,
    }
}

pub fn is_duration(s: &str) -> bool {
    DURATION_RE.is_match(s) && !s.ends_with('T') && s != "P"
}

// ---- network ---- //

pub fn is_ipv4(s: &str) -> bool {
    Ipv4Addr::from_str(s).is_ok()
}

pub fn is_ipv6(s: &str) -> bool {
    Ipv6Addr::from_str(s).is_ok()
}

pub fn is_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    !s.is_empty() && s.len() <= 253 && s.split('.').all(|label| LABEL_RE.is_match(label))
}

pub fn is_idn_hostname(s: &str) -> bool {
    let s = s.strip_suffix('.').unwrap_or(s);
    !s.is_empty()
        && s.chars().count() <= 253
        && s.split(['.', '\u{3002}', '\u{FF0E}', '\u{FF61}']).all(|label| {
            let n = label.chars().count();
            (1..=63).contains(&n)
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| {
                    c == '-' || c.is_alphanumeric() || !c.is_ascii() && !c.is_whitespace()
                })
        })
}

pub fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.rsplit_once('@') else { return false };
    if !EMAIL_LOCAL_RE.is_match(local) && !is_quoted_local(local) {
        return false;
    }
    match domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        Some(literal) => match literal.strip_prefix("IPv6:") {
            Some(v6) => is_ipv6(v6),
            None => is_ipv4(literal),
        },
        None => is_hostname(domain),
    }
}

fn is_quoted_local(local: &str) -> bool {
    local.len() >= 2 && local.starts_with('"') && local.ends_with('"')
}

pub fn is_idn_email(s: &str) -> bool {
    let Some((local, domain)) = s.rsplit_once('@') else { return false };
    !local.is_empty() && !local.contains(char::is_whitespace) && is_idn_hostname(domain)
}

// ---- identifiers ---- //

pub fn is_uri(s: &str) -> bool {
    is_iri(s) && s.is_ascii()
}

pub fn is_iri(s: &str) -> bool {
    has_scheme(s) && is_iri_reference(s) && url::Url::parse(s).is_ok()
}

pub fn is_uri_reference(s: &str) -> bool {
    is_iri_reference(s) && s.is_ascii()
}

pub fn is_iri_reference(s: &str) -> bool {
    !s.chars().any(|c| {
        c.is_whitespace()
            || c.is_control()
            || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\')
    }) && valid_percent_escapes(s)
        && s.matches('#').count() <= 1
}

fn has_scheme(s: &str) -> bool {
    match s.find(':') {
        Some(i) if i > 0 => {
            let scheme = &s[..i];
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

fn valid_percent_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.iter().enumerate().all(|(i, b)| {
        *b != b'%'
            || bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit)
    })
}

pub fn is_uuid(s: &str) -> bool {
    UUID_RE.is_match(s)
}

pub fn is_uri_template(s: &str) -> bool {
    URI_TEMPLATE_RE.is_match(s)
}

pub fn is_json_pointer(s: &str) -> bool {
    crate::pointer::JsonPointer::parse(s).is_some()
}

pub fn is_relative_json_pointer(s: &str) -> bool {
    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || (digits > 1 && s.starts_with('0')) {
        return false;
    }
    let rest = &s[digits..];
    rest == "#" || is_json_pointer(rest)
}

/// Constructs the regex engine cannot run (look-around) are still valid ECMA-262.
pub fn is_regex(s: &str) -> bool {
    !matches!(
        crate::schema::node::translate_pattern(s),
        Err(crate::error::Error::Structure { .. })
    )
}

// ------------------------------- Tests ------------------------------------ //
