//! `application/x-www-form-urlencoded` pairs, also used for query strings.

use url::form_urlencoded;

use crate::request::types::Params;

/// Split `a=1&b=2&a=3` into ordered parameters.
///
/// `+` decodes to a space. Pairs with an empty value are dropped.
pub fn parse_pairs(input: &str) -> Params {
    let mut params = Params::new();
    for (key, value) in form_urlencoded::parse(input.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        params.append(key.into_owned(), value.into_owned());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::types::FieldValue;
    use std::time::{Duration, Instant};

    #[test]
    fn test_parse_pairs() {
        let params = parse_pairs("name=Ada+Lovelace&tag=a&tag=b&city=S%C3%A3o");
        assert_eq!(params.get("name"), Some(&FieldValue::from("Ada Lovelace")));
        assert_eq!(params.get("tag"), Some(&FieldValue::from(vec!["a", "b"])));
        assert_eq!(params.get("city"), Some(&FieldValue::from("São")));
    }

    #[test]
    fn test_many_distinct_keys() {
        let input = (0..100_000)
            .map(|i| format!("k{i}=v"))
            .chain(std::iter::once("k0=w".to_string()))
            .collect::<Vec<_>>()
            .join("&");

        let start = Instant::now();
        let params = parse_pairs(&input);
        assert!(start.elapsed() < Duration::from_secs(5), "took {:?}", start.elapsed());

        assert_eq!(params.len(), 100_000);
        assert_eq!(params.get("k99999"), Some(&FieldValue::from("v")));
        assert_eq!(params.get("k0"), Some(&FieldValue::from(vec!["v", "w"])));
        assert_eq!(params.iter().nth(1).map(|(k, _)| k), Some("k1"));
    }

    #[test]
    fn test_blank_values_dropped() {
        let params = parse_pairs("a=&b=1&c");
        assert_eq!(params.len(), 1);
        assert_eq!(params.get("b"), Some(&FieldValue::from("1")));
    }
}
