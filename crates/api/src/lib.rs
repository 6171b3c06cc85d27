//! HTTP clients for external services.
//!
//! This crate provides clients for:
//! - GlueX router: executable swap quotes
//! - GlueX exchange rates: USD prices per token

mod gluex;
mod rates;

pub use gluex::{GlueXClient, SwapQuote, GLUEX_QUOTE_URL};
pub use rates::{scale_rate, GlueXRatesClient, GLUEX_RATES_URL, USD_QUOTE_TOKEN};
