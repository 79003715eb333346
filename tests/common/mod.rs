use std::sync::{Arc, Once};

use chrono::NaiveDate;
use folio::MarketData;
use ndarray::Array2;

static TRACING: Once = Once::new();

/// Install a test subscriber once; respects `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Strictly increasing daily date axis starting 2024-01-01.
pub fn trading_dates(len: usize) -> Vec<NaiveDate> {
    (0..len)
        .map(|i| NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64))
        .collect()
}

/// Deterministic three-asset universe (two risky assets plus CASH) with
/// smooth oscillating prices and a single zero-filled feature per asset.
pub fn synthetic_market(len: usize) -> Arc<MarketData> {
    let mut prices = Array2::zeros((len, 3));
    for i in 0..len {
        let x = i as f64;
        prices[[i, 0]] = 100.0 + (x * 0.31).sin() * 6.0 + x * 0.05;
        prices[[i, 1]] = 40.0 + (x * 0.17).cos() * 3.0;
        prices[[i, 2]] = 1.0;
    }
    let features = Array2::zeros((len, 3));
    MarketData::new(
        vec!["AAA".to_string(), "BBB".to_string(), "CASH".to_string()],
        trading_dates(len),
        prices,
        features,
        1,
    )
    .expect("synthetic market data is valid")
}
