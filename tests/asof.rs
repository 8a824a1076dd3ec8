use series_engine::aggregation::{scan, Aggregator, AsOf, AsOfInput, AsOfMatch, AsOfMode};

fn quote_match(value: f64, id: i64) -> AsOfMatch {
    AsOfMatch { value, id }
}

#[test]
fn test_query_before_any_quote_has_no_match() {
    let mut asof = AsOf::new(AsOfMode::Typed);
    asof.accumulate(AsOfInput::query()).unwrap();
    assert_eq!(asof.finalize().unwrap(), None);
}

#[test]
fn test_latest_quote_carries_forward() {
    let mut asof = AsOf::default();
    let outputs = scan(
        &mut asof,
        vec![
            AsOfInput::quote(10.0, 7),
            AsOfInput::query(),
            AsOfInput::query(),
            AsOfInput::quote(11.5, 8),
            AsOfInput::query(),
        ],
    )
    .unwrap();

    assert_eq!(
        outputs,
        vec![quote_match(10.0, 7), quote_match(10.0, 7), quote_match(11.5, 8)]
    );
}

#[test]
fn test_quote_rows_emit_nothing() {
    let mut asof = AsOf::default();
    asof.accumulate(AsOfInput::quote(1.0, 1)).unwrap();
    assert!(asof.is_quote());
    assert_eq!(asof.finalize().unwrap(), None);
}

#[test]
fn test_quote_without_id_defaults_to_zero() {
    let mut asof = AsOf::default();
    asof.accumulate(AsOfInput {
        price: Some(5.0),
        id: None,
        is_quote: Some(true),
    })
    .unwrap();
    asof.accumulate(AsOfInput::query()).unwrap();

    assert_eq!(asof.finalize().unwrap(), Some(quote_match(5.0, 0)));
}

#[test]
fn test_quote_without_price_is_ignored() {
    let mut asof = AsOf::default();
    asof.accumulate(AsOfInput::quote(3.0, 1)).unwrap();
    asof.accumulate(AsOfInput {
        price: None,
        id: Some(2),
        is_quote: Some(true),
    })
    .unwrap();
    asof.accumulate(AsOfInput::query()).unwrap();

    assert_eq!(asof.finalize().unwrap(), Some(quote_match(3.0, 1)));
}

#[test]
fn test_separate_rows_classify_by_price_and_id() {
    let mut asof = AsOf::separate_rows();
    let rows = vec![
        AsOfInput {
            price: Some(3.0),
            id: Some(2),
            is_quote: None,
        },
        AsOfInput {
            price: Some(4.0),
            id: None,
            is_quote: None,
        },
        AsOfInput {
            price: None,
            id: Some(9),
            is_quote: Some(true),
        },
    ];
    let outputs = scan(&mut asof, rows).unwrap();

    assert_eq!(outputs, vec![quote_match(3.0, 2), quote_match(3.0, 2)]);
}

#[test]
fn test_combine_takes_right_quote_or_keeps_left() {
    let mut quoted = AsOf::default();
    quoted.accumulate(AsOfInput::quote(2.0, 1)).unwrap();
    let mut queried = AsOf::default();
    queried.accumulate(AsOfInput::query()).unwrap();
    let mut requoted = AsOf::default();
    requoted.accumulate(AsOfInput::quote(9.0, 4)).unwrap();

    let mut merged = quoted.clone().combine(queried.clone());
    assert_eq!(merged.finalize().unwrap(), Some(quote_match(2.0, 1)));

    let mut merged = quoted.clone().combine(AsOf::default());
    assert_eq!(merged.finalize().unwrap(), None);

    let mut merged = queried.combine(requoted);
    assert_eq!(merged.finalize().unwrap(), None);
    merged.accumulate(AsOfInput::query()).unwrap();
    assert_eq!(merged.finalize().unwrap(), Some(quote_match(9.0, 4)));
}
