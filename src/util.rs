//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Keep at most `max` chars (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> &str {
  match s.char_indices().nth(max) {
    Some((idx, _)) => &s[..idx],
    None => s,
  }
}

/// Log-safe truncation for large strings.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  let head = truncate_chars(s, max);
  if head.len() == s.len() { s.to_string() } else { format!("{}… ({} bytes total)", head, s.len()) }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
  chrono::Utc::now().timestamp_millis()
}

/// Whether epoch milliseconds map to a calendar timestamp.
pub fn ms_fits_timestamp(ms: i64) -> bool {
  chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms).is_some()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_replaces_all_keys() {
    let out = fill_template("{a}-{b}-{a}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x-y-x");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    assert_eq!(truncate_chars("héllo", 2), "hé");
    assert_eq!(truncate_chars("hi", 10), "hi");
    assert!(trunc_for_log("abcdef", 3).starts_with("abc…"));
  }

  #[test]
  fn timestamp_range() {
    assert!(ms_fits_timestamp(0));
    assert!(ms_fits_timestamp(-1_000));
    assert!(!ms_fits_timestamp(i64::MAX));
  }
}
