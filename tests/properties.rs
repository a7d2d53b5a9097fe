use m3u8_scan::{parse_attribute_list, Attribute, AttributeList, Value};
use proptest::prelude::*;

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[^\"\r\n]{0,24}".prop_map(Value::string),
        "[A-Z][A-Z0-9-]{0,12}".prop_map(Value::enumerated),
        any::<i64>().prop_map(Value::integer),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::float),
        prop::collection::vec(any::<u8>(), 0..24).prop_map(Value::bytes),
        // A zero width renders as hex bytes.
        (1..=u64::MAX, any::<u64>()).prop_map(|(w, h)| Value::resolution(w, h)),
    ]
}

fn attribute_list() -> impl Strategy<Value = AttributeList> {
    prop::collection::vec(("[A-Z][A-Z0-9_-]{0,15}", value()), 1..8).prop_map(|attrs| {
        attrs
            .into_iter()
            .map(|(name, value)| Attribute::new(name, value))
            .collect()
    })
}

fn separator() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(","), Just(", "), Just(" ,"), Just("\t,\t"), Just("  ,  ")]
}

proptest! {
    #[test]
    fn value_render_parse_render_is_a_fixed_point(value in value()) {
        let text = format!("V={}", value);
        let parsed = parse_attribute_list(&text).unwrap();
        let reparsed = &parsed.get_first("V").unwrap().value;

        prop_assert_eq!(reparsed.kind(), value.kind());
        prop_assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn canonical_list_round_trips(list in attribute_list()) {
        let text = list.to_string();
        let parsed = parse_attribute_list(&text).unwrap();

        prop_assert_eq!(parsed.len(), list.len());
        prop_assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn separator_whitespace_normalizes_to_a_comma(
        list in attribute_list(),
        sep in separator(),
    ) {
        let spaced = list
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(sep);
        let parsed = parse_attribute_list(&spaced).unwrap();

        prop_assert_eq!(parsed.to_string(), list.to_string());
    }

    #[test]
    fn float_text_is_stable_after_one_pass(
        int in 0u32..100000,
        frac in 0u32..1000,
        trailing_zeros in 0usize..4,
    ) {
        let text = format!("F={}.{:03}{}", int, frac, "0".repeat(trailing_zeros));
        let first = parse_attribute_list(&text).unwrap().to_string();
        let second = parse_attribute_list(&first).unwrap().to_string();

        prop_assert_eq!(second, first);
    }
}
