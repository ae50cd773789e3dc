// SPDX-License-Identifier: Apache-2.0

use itertools::Itertools;

/// Name fragments that never count towards an interface prefix or suffix.
pub(crate) const DIRECTION_KEYWORDS: [&str; 3] = ["in", "out", "inout"];

/// Splits `code_name` around the first occurrence of `port_name` and returns
/// the remaining `(prefix, suffix)`. Fragments listed in `ignored` are
/// dropped. A non-empty prefix ends with `_`, a non-empty suffix starts with
/// one.
///
/// ```
/// # use chainstitch::get_prefix_suffix;
/// assert_eq!(
///     get_prefix_suffix("data", "sensor_data_in", &["in", "out", "inout"]),
///     ("sensor_".to_string(), String::new())
/// );
/// ```
pub fn get_prefix_suffix(port_name: &str, code_name: &str, ignored: &[&str]) -> (String, String) {
    let lower = code_name.to_ascii_lowercase();
    let (prefix, suffix) = match lower.find(&port_name.to_ascii_lowercase()) {
        Some(pos) => (&code_name[..pos], &code_name[pos + port_name.len()..]),
        None => ("", code_name),
    };
    let keep = |fragment: &&str| {
        !fragment.is_empty() && !ignored.iter().any(|k| k.eq_ignore_ascii_case(fragment))
    };
    let prefix = prefix
        .split('_')
        .filter(keep)
        .map(|f| format!("{f}_"))
        .join("");
    let suffix = suffix
        .split('_')
        .filter(keep)
        .map(|f| format!("_{f}"))
        .join("");
    (prefix, suffix)
}

/// Smallest power of two that is at least `value`; zero maps to one.
pub(crate) fn next_power_of_two(value: u32) -> u32 {
    value.max(1).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_suffix() {
        let ignored = &DIRECTION_KEYWORDS;
        assert_eq!(
            get_prefix_suffix("strobe", "in_strobe", ignored),
            (String::new(), String::new())
        );
        assert_eq!(
            get_prefix_suffix("data", "left_data_out", ignored),
            ("left_".to_string(), String::new())
        );
        assert_eq!(
            get_prefix_suffix("data", "data_a_b", ignored),
            (String::new(), "_a_b".to_string())
        );
        assert_eq!(
            get_prefix_suffix("slave_register_configuration", "slave_register_configuration", &[]),
            (String::new(), String::new())
        );
    }

    #[test]
    fn test_next_power_of_two() {
        assert_eq!(next_power_of_two(0), 1);
        assert_eq!(next_power_of_two(2), 2);
        assert_eq!(next_power_of_two(5), 8);
        assert_eq!(next_power_of_two(8), 8);
    }
}
