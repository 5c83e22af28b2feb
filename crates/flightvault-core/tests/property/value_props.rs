//! FieldValue normalization: idempotent, symmetric, never merges distinct
//! magnitudes, and survives the JSON column format.

use proptest::prelude::*;

use flightvault_core::models::{FieldValue, Normalization};

fn value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        Just(FieldValue::Null),
        any::<bool>().prop_map(FieldValue::Bool),
        any::<i64>().prop_map(FieldValue::Int),
        (-1.0e9f64..1.0e9).prop_map(FieldValue::Float),
        any::<f64>().prop_map(FieldValue::Float),
        "[ a-zA-Z]{0,8}".prop_map(FieldValue::Text),
    ]
}

fn rules() -> impl Strategy<Value = Normalization> {
    (0u32..7, any::<bool>()).prop_map(|(float_precision, trim_strings)| Normalization {
        float_precision,
        trim_strings,
    })
}

proptest! {
    #[test]
    fn prop_normalizing_twice_changes_nothing(
        f in -1.0e8f64..1.0e8,
        text in "[ a-zA-Z]{0,8}",
        rules in rules(),
    ) {
        for v in [FieldValue::Float(f), FieldValue::Text(text.clone())] {
            let once = v.normalized(&rules);
            prop_assert_eq!(once.normalized(&rules), once);
        }
    }

    #[test]
    fn prop_equivalence_is_symmetric(a in value(), b in value(), rules in rules()) {
        prop_assert_eq!(a.equivalent(&b, &rules), b.equivalent(&a, &rules));
        prop_assert!(a.equivalent(&a, &rules));
    }

    #[test]
    fn prop_large_floats_stay_distinct(mantissa in 1.0f64..1.5, exponent in 16i32..300) {
        let a = mantissa * 10f64.powi(exponent);
        let b = a * 1.1;
        let rules = Normalization::default();
        prop_assert!(!FieldValue::Float(a).equivalent(&FieldValue::Float(b), &rules));
        prop_assert!(!FieldValue::Float(-a).equivalent(&FieldValue::Float(a), &rules));
    }

    #[test]
    fn prop_json_keeps_integral_and_non_finite_floats(
        v in prop_oneof![
            any::<i32>().prop_map(|i| i as f64),
            Just(f64::NAN),
            Just(f64::INFINITY),
            Just(f64::NEG_INFINITY),
        ],
    ) {
        let original = FieldValue::Float(v);
        let json = serde_json::to_string(&original).unwrap();
        let back: FieldValue = serde_json::from_str(&json).unwrap();
        prop_assert!(back.equivalent(&original, &Normalization::default()));
        prop_assert_eq!(back.type_name(), "float");
    }
}
