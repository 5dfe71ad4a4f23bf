//! Indicator Engine (§4.2): moving averages, oscillators, and the
//! cross-event detection layer the Exit Plan Simulator's indicator-exit
//! step consumes.

pub mod ema;
pub mod ichimoku;
pub mod macd;
pub mod rsi;
pub mod signal;
pub mod sma;
pub mod volume;

pub use ichimoku::{ichimoku, IchimokuLines};
pub use macd::{macd, MacdLines};
pub use signal::IndicatorContext;
