//! Display strings for numeric cells
//!
//! Only two renderings are needed: the General form for plain numbers and a
//! date/time renderer for cells whose style carries a date format.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

/// Format code of a built-in date/time `numFmtId`, if it is one
pub fn builtin_date_format(id: u32) -> Option<&'static str> {
    let code = match id {
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        27..=36 | 50..=58 => "yyyy-mm-dd",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mm:ss.0",
        _ => return None,
    };
    Some(code)
}

/// True when a custom format code renders a date or time
pub fn is_date_format_code(code: &str) -> bool {
    let section = first_section(code);
    let mut chars = section.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let mut inner = String::new();
                for b in chars.by_ref() {
                    if b == ']' {
                        break;
                    }
                    inner.push(b);
                }
                let inner = inner.to_ascii_lowercase();
                if !inner.is_empty() && inner.chars().all(|ch| matches!(ch, 'h' | 'm' | 's')) {
                    return true;
                }
            }
            'd' | 'D' | 'm' | 'M' | 'y' | 'Y' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}

fn first_section(code: &str) -> &str {
    let mut in_quotes = false;
    for (i, c) in code.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => return &code[..i],
            _ => {}
        }
    }
    code
}

/// Excel's General rendering of a number
pub fn format_general(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Convert a serial date number to a timestamp
pub fn serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if serial < 60.0 {
        // Serials before the phantom 1900-02-29 count from 1899-12-31
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::milliseconds(millis))
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    Year(usize),
    Month(usize),
    Minute(usize),
    Day(usize),
    Hour(usize),
    Second(usize),
    AmPm,
}

fn tokenize(code: &str) -> Vec<Token> {
    let chars: Vec<char> = first_section(code).chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let run_of = |i: usize, target: char| {
        chars[i..]
            .iter()
            .take_while(|c| c.eq_ignore_ascii_case(&target))
            .count()
    };

    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let literal: String = chars[i + 1..].iter().take_while(|&&q| q != '"').collect();
                i += literal.chars().count() + 2;
                tokens.push(Token::Literal(literal));
            }
            '\\' => {
                if let Some(next) = chars.get(i + 1) {
                    tokens.push(Token::Literal(next.to_string()));
                }
                i += 2;
            }
            '[' => {
                let inner: String = chars[i + 1..].iter().take_while(|&&b| b != ']').collect();
                i += inner.chars().count() + 2;
                let lower = inner.to_ascii_lowercase();
                if lower.starts_with('h') {
                    tokens.push(Token::Hour(lower.len()));
                } else if lower.starts_with('m') {
                    tokens.push(Token::Minute(lower.len()));
                } else if lower.starts_with('s') {
                    tokens.push(Token::Second(lower.len()));
                }
            }
            '_' | '*' => i += 2,
            _ if code_starts_with(&chars[i..], "AM/PM") => {
                tokens.push(Token::AmPm);
                i += 5;
            }
            _ if code_starts_with(&chars[i..], "A/P") => {
                tokens.push(Token::AmPm);
                i += 3;
            }
            'y' | 'Y' => {
                let n = run_of(i, 'y');
                tokens.push(Token::Year(n));
                i += n;
            }
            'm' | 'M' => {
                let n = run_of(i, 'm');
                tokens.push(Token::Month(n));
                i += n;
            }
            'd' | 'D' => {
                let n = run_of(i, 'd');
                tokens.push(Token::Day(n));
                i += n;
            }
            'h' | 'H' => {
                let n = run_of(i, 'h');
                tokens.push(Token::Hour(n));
                i += n;
            }
            's' | 'S' => {
                let n = run_of(i, 's');
                tokens.push(Token::Second(n));
                i += n;
            }
            '.' if chars.get(i + 1) == Some(&'0') => {
                // Fractional seconds are not rendered
                i += 1 + run_of(i + 1, '0');
            }
            _ => {
                tokens.push(Token::Literal(c.to_string()));
                i += 1;
            }
        }
    }

    // `m` directly after an hour or before a second means minutes
    let positions: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| !matches!(t, Token::Literal(_)))
        .map(|(i, _)| i)
        .collect();
    for (k, &pos) in positions.iter().enumerate() {
        if let Token::Month(n) = tokens[pos] {
            let after_hour = k > 0 && matches!(tokens[positions[k - 1]], Token::Hour(_));
            let before_second = positions
                .get(k + 1)
                .is_some_and(|&next| matches!(tokens[next], Token::Second(_)));
            if n <= 2 && (after_hour || before_second) {
                tokens[pos] = Token::Minute(n);
            }
        }
    }

    tokens
}

fn code_starts_with(chars: &[char], pattern: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    chars.len() >= pattern.len()
        && chars
            .iter()
            .zip(&pattern)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];
const WEEKDAYS: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// Render a serial date with an Excel date/time format code
pub fn format_date(serial: f64, code: &str, date1904: bool) -> Option<String> {
    let dt = serial_to_datetime(serial, date1904)?;
    let tokens = tokenize(code);
    let twelve_hour = tokens.contains(&Token::AmPm);
    let mut out = String::new();

    for token in &tokens {
        match token {
            Token::Literal(s) => out.push_str(s),
            Token::Year(n) if *n <= 2 => out.push_str(&format!("{:02}", dt.year() % 100)),
            Token::Year(_) => out.push_str(&format!("{:04}", dt.year())),
            Token::Month(1) => out.push_str(&dt.month().to_string()),
            Token::Month(2) => out.push_str(&format!("{:02}", dt.month())),
            Token::Month(3) => out.push_str(&MONTHS[dt.month0() as usize][..3]),
            Token::Month(4) => out.push_str(MONTHS[dt.month0() as usize]),
            Token::Month(_) => out.push_str(&MONTHS[dt.month0() as usize][..1]),
            Token::Day(1) => out.push_str(&dt.day().to_string()),
            Token::Day(2) => out.push_str(&format!("{:02}", dt.day())),
            Token::Day(3) => {
                out.push_str(&WEEKDAYS[dt.weekday().num_days_from_monday() as usize][..3])
            }
            Token::Day(_) => out.push_str(WEEKDAYS[dt.weekday().num_days_from_monday() as usize]),
            Token::Hour(n) => {
                let hour = if twelve_hour {
                    match dt.hour() % 12 {
                        0 => 12,
                        h => h,
                    }
                } else {
                    dt.hour()
                };
                if *n >= 2 {
                    out.push_str(&format!("{:02}", hour));
                } else {
                    out.push_str(&hour.to_string());
                }
            }
            Token::Minute(n) if *n >= 2 => out.push_str(&format!("{:02}", dt.minute())),
            Token::Minute(_) => out.push_str(&dt.minute().to_string()),
            Token::Second(n) if *n >= 2 => out.push_str(&format!("{:02}", dt.second())),
            Token::Second(_) => out.push_str(&dt.second().to_string()),
            Token::AmPm => out.push_str(if dt.hour() < 12 { "AM" } else { "PM" }),
        }
    }

    Some(out)
}
