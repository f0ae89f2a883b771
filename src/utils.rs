/// Utility functions
use chrono::NaiveDateTime;

/// Format a local date-time as `hh:mm`
pub fn hhmm(t: &NaiveDateTime) -> String {
    t.format("%H:%M").to_string()
}

/// Drop control characters and cap the length in chars
pub fn sanitize_text(s: &str, max_chars: usize) -> String {
    s.chars().filter(|c| !c.is_control()).take(max_chars).collect::<String>().trim().to_string()
}

/// Decode the handful of HTML entities the remote pages use
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&semi| semi <= 10).and_then(|semi| {
            let entity = &tail[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some(' '),
                "deg" => Some('°'),
                _ => entity
                    .strip_prefix('#')
                    .and_then(|n| match n.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => n.parse().ok(),
                    })
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Remove markup, decode entities and collapse whitespace
pub fn cell_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    collapse_whitespace(&decode_entities(&text))
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize an altitude/azimuth cell to `<digits>° (<dir>)`.
///
/// Only the first run of digits and a parenthesized direction survive; any
/// mis-encoded degree sign is dropped. Values without digits are returned as is.
pub fn degree_markup(value: &str) -> String {
    let digits: String = value
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let mut out = if digits.is_empty() {
        value.to_string()
    } else {
        format!("{digits}°")
    };
    if let (Some(open), Some(close)) = (value.find('('), value.rfind(')')) {
        if open < close {
            out.push(' ');
            out.push_str(&value[open..=close]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_hhmm() {
        let t = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap().and_hms_opt(6, 5, 59).unwrap();
        assert_eq!(hhmm(&t), "06:05");
    }

    #[test]
    fn test_sanitize_text_strips_controls_and_truncates() {
        assert_eq!(sanitize_text("Lampasas\u{0007} Park", 32), "Lampasas Park");
        assert_eq!(sanitize_text(&"x".repeat(40), 32).len(), 32);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("45&deg; &amp; 10&#176;"), "45° & 10°");
        assert_eq!(decode_entities("a&nbsp;b"), "a b");
        assert_eq!(decode_entities("AT&T"), "AT&T");
    }

    #[test]
    fn test_cell_text_strips_tags() {
        assert_eq!(cell_text("<td  class=\"x\"> <a href='#'>18 Oct</a>\n</td>"), "18 Oct");
        assert_eq!(cell_text("<b>Rises</b>"), "Rises");
    }

    #[test]
    fn test_degree_markup_plain() {
        assert_eq!(degree_markup("45°"), "45°");
    }

    #[test]
    fn test_degree_markup_mis_encoded_with_direction() {
        assert_eq!(degree_markup("358Â° (N)"), "358° (N)");
    }

    #[test]
    fn test_degree_markup_without_digits() {
        assert_eq!(degree_markup("-"), "-");
    }
}
