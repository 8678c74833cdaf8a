//! Variant label extraction for groups of near-duplicate strings.
//!
//! Adapters often collect several image file names for one sign code, e.g.
//! `"MUTCD R1-1 (small).svg"` and `"MUTCD R1-1 (large).svg"`. The part that
//! differs between them is the variant label (`"SMALL"`, `"LARGE"`), and the
//! label becomes the key in a record's `urls` map.
//!
//! # Algorithm
//!
//! 1. Walk forward over the first string until some input disagrees (or runs
//!    out). That index is `start`; it stays 0 if nothing disagrees.
//! 2. Walk backward the same way. The number of agreeing trailing characters
//!    is `end`; it stays 0 if nothing disagrees.
//! 3. Each input's label is the slice `[start, len - end)`, empty when
//!    `end == 0` or the bounds cross, with `(`, `)`, `_` trimmed from both
//!    ends, upper-cased.
//! 4. Labels map back to their input. Duplicate labels keep the last input.

use std::collections::BTreeMap;

use crate::record::strip_label_punctuation;

/// Map each input's distinguishing label to the input itself.
///
/// Never fails. A single input, or inputs with nothing in common at the
/// end, produce the empty label.
pub fn normalize_labels<S: AsRef<str>>(strings: &[S]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (label, original) in labelled(strings) {
        out.insert(label, original.to_string());
    }
    out
}

/// Number of inputs whose label was overwritten by a later input.
pub fn label_collisions<S: AsRef<str>>(strings: &[S]) -> usize {
    strings.len() - normalize_labels(strings).len()
}

fn labelled<S: AsRef<str>>(strings: &[S]) -> Vec<(String, &str)> {
    let Some(first) = strings.first() else {
        return Vec::new();
    };

    let chars: Vec<Vec<char>> = strings.iter().map(|s| s.as_ref().chars().collect()).collect();
    let first: Vec<char> = first.as_ref().chars().collect();

    let start = (0..first.len())
        .find(|&i| chars.iter().any(|c| c.get(i) != Some(&first[i])))
        .unwrap_or(0);

    let end = (1..=first.len())
        .find(|&offset| {
            let expected = first[first.len() - offset];
            chars
                .iter()
                .any(|c| c.len() < offset || c[c.len() - offset] != expected)
        })
        .map_or(0, |offset| offset - 1);

    strings
        .iter()
        .zip(&chars)
        .map(|(original, c)| {
            let stop = if end == 0 { 0 } else { c.len().saturating_sub(end) };
            let span: String = if start < stop {
                c[start..stop].iter().collect()
            } else {
                String::new()
            };
            (
                strip_label_punctuation(&span).to_uppercase(),
                original.as_ref(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_input() {
        let input: [&str; 0] = [];
        assert!(normalize_labels(&input).is_empty());
    }

    #[test]
    fn single_value() {
        assert_eq!(normalize_labels(&["abc"]), map(&[("", "abc")]));
    }

    #[test]
    fn nothing_in_common() {
        assert_eq!(normalize_labels(&["abc", "xyz"]), map(&[("", "xyz")]));
    }

    #[test]
    fn shared_prefix_and_suffix() {
        assert_eq!(
            normalize_labels(&["a_1_b", "a_2_b", "a_123_b", "a_123123123123_b", "a__b"]),
            map(&[
                ("", "a__b"),
                ("1", "a_1_b"),
                ("123", "a_123_b"),
                ("123123123123", "a_123123123123_b"),
                ("2", "a_2_b"),
            ])
        );
    }

    #[test]
    fn commons_file_names() {
        let urls = [
            "https://en.wikipedia.org/wiki/Special:FilePath/File:MUTCD_R1-1_(small).svg",
            "https://en.wikipedia.org/wiki/Special:FilePath/File:MUTCD_R1-1_(large).svg",
        ];
        assert_eq!(
            normalize_labels(&urls),
            map(&[("SMALL", urls[0]), ("LARGE", urls[1])])
        );
    }

    #[test]
    fn labels_are_uppercased() {
        let labels = normalize_labels(&["sign_a.svg", "sign_b.svg"]);
        assert_eq!(
            labels,
            map(&[("A", "sign_a.svg"), ("B", "sign_b.svg")])
        );
    }

    #[test]
    fn identical_inputs_collapse() {
        assert_eq!(normalize_labels(&["x.svg", "x.svg"]), map(&[("", "x.svg")]));
        assert_eq!(label_collisions(&["x.svg", "x.svg"]), 1);
    }

    #[test]
    fn shorter_later_input() {
        // "ab" runs out before "abc" disagrees; the backward scan sees "c" vs "b".
        assert_eq!(normalize_labels(&["abc", "ab"]), map(&[("", "ab")]));
    }

    #[test]
    fn non_ascii_input() {
        assert_eq!(
            normalize_labels(&["Zeichen_ü_1.svg", "Zeichen_ö_1.svg"]),
            map(&[("Ü", "Zeichen_ü_1.svg"), ("Ö", "Zeichen_ö_1.svg")])
        );
    }

    #[test]
    fn output_values_come_from_input() {
        let cases: [&[&str]; 7] = [
            &["r_1_x", "r_22_x", "q", "r__x", "r_1_x"],
            &["sign_a", "sign_bb", "sign_"],
            &["a_sign", "bb_sign", "_sign"],
            &["same.svg", "same.svg", "same.svg"],
            &["x", "xyz", "", "xy", "wxyz"],
            &["Zeichen_ü.svg", "Zeichen_ö_2.svg", "Z.svg"],
            &["only"],
        ];
        for input in cases {
            let out = normalize_labels(input);
            assert!(out.len() <= input.len(), "{input:?}");
            assert!(!out.is_empty(), "{input:?}");
            assert!(out.values().all(|v| input.contains(&v.as_str())), "{input:?}");
            assert_eq!(label_collisions(input), input.len() - out.len(), "{input:?}");
        }
    }

    #[test]
    fn no_collisions_for_distinct_labels() {
        assert_eq!(label_collisions(&["a_1_b", "a_2_b"]), 0);
    }
}
