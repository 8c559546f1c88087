use crate::prelude::*;

pub fn now() -> DateTime {
  Utc::now().naive_utc()
}

/// Lowercase ASCII slug: runs of anything non-alphanumeric become one `-`.
pub fn slugify(title: &str) -> String {
  let mut slug = String::with_capacity(title.len());
  for ch in title.chars() {
    if ch.is_ascii_alphanumeric() {
      slug.push(ch.to_ascii_lowercase());
    } else if !slug.is_empty() && !slug.ends_with('-') {
      slug.push('-');
    }
  }

  while slug.ends_with('-') {
    slug.pop();
  }

  if slug.is_empty() { String::from("course") } else { slug }
}

pub fn format_price(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let cents = cents.unsigned_abs();
  format!("{sign}{}.{:02}", cents / 100, cents % 100)
}

/// Parses a decimal amount with at most two fractional digits into cents.
pub fn parse_price(raw: &str) -> Result<i64> {
  let invalid = || Error::Validation(format!("Invalid price `{raw}`"));
  let raw = raw.trim();

  let (negative, digits) = match raw.strip_prefix('-') {
    Some(rest) => (true, rest),
    None => (false, raw),
  };

  let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
  if whole.is_empty()
    || frac.len() > 2
    || !whole.bytes().all(|b| b.is_ascii_digit())
    || !frac.bytes().all(|b| b.is_ascii_digit())
  {
    return Err(invalid());
  }

  let whole: i64 = whole.parse().map_err(|_| invalid())?;
  let frac: i64 = match frac.len() {
    0 => 0,
    1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
    _ => frac.parse().map_err(|_| invalid())?,
  };

  let cents = whole
    .checked_mul(100)
    .and_then(|c| c.checked_add(frac))
    .ok_or_else(invalid)?;

  Ok(if negative { -cents } else { cents })
}

/// Rounded percentage, 0 when there is nothing to complete.
pub fn percentage(done: u64, total: u64) -> u32 {
  if total == 0 {
    return 0;
  }
  ((done as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_slugify() {
    assert_eq!(slugify("Intro"), "intro");
    assert_eq!(slugify("  Rust: The Hard Parts!  "), "rust-the-hard-parts");
    assert_eq!(slugify("???"), "course");
  }

  #[test]
  fn test_price_round_trip() {
    assert_eq!(parse_price("10.00").unwrap(), 1000);
    assert_eq!(parse_price("10.5").unwrap(), 1050);
    assert_eq!(parse_price("7").unwrap(), 700);
    assert_eq!(parse_price("-1").unwrap(), -100);
    assert!(parse_price("1.234").is_err());
    assert!(parse_price("abc").is_err());
    assert!(parse_price(".5").is_err());

    assert_eq!(format_price(1000), "10.00");
    assert_eq!(format_price(5), "0.05");
  }

  #[test]
  fn test_percentage() {
    assert_eq!(percentage(0, 0), 0);
    assert_eq!(percentage(1, 3), 33);
    assert_eq!(percentage(2, 3), 67);
    assert_eq!(percentage(3, 3), 100);
  }
}
