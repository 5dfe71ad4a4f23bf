//! MACD (§4.2): `macd = ema(fast) - ema(slow)`, `signal = ema(macd, signal_period)`.

use super::ema::ema_of_series;
use super::sma::closes;
use crate::domain::Candle;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdLines {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
}

pub fn macd(candles: &[Candle], fast_period: usize, slow_period: usize, signal_period: usize) -> MacdLines {
    let values = closes(candles);
    let fast = ema_of_series(&values, fast_period);
    let slow = ema_of_series(&values, slow_period);

    let n = values.len();
    let mut macd_line = vec![f64::NAN; n];
    for i in 0..n {
        if !fast[i].is_nan() && !slow[i].is_nan() {
            macd_line[i] = fast[i] - slow[i];
        }
    }

    // ema_of_series seeds from the first `signal_period` entries of its input,
    // which for the NaN-prefixed macd_line would poison the seed. Compute the
    // signal line over the contiguous non-NaN suffix and re-pad with NaN.
    let first_valid = macd_line.iter().position(|v| !v.is_nan());
    let signal = match first_valid {
        Some(start) => {
            let tail = ema_of_series(&macd_line[start..], signal_period);
            let mut padded = vec![f64::NAN; start];
            padded.extend(tail);
            padded
        }
        None => vec![f64::NAN; n],
    };

    MacdLines { macd: macd_line, signal }
}
