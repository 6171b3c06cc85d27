//! GlueX router quote client.

use alloy::primitives::{Address, Bytes, U256};
use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default quote endpoint.
pub const GLUEX_QUOTE_URL: &str = "https://router.gluex.xyz/v1/quote";

/// Executable swap quote.
///
/// `revert` and `low_balance` are the router's own simulation verdicts;
/// a quote carrying either must not be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub input_token: Address,
    pub output_token: Address,
    #[serde(deserialize_with = "u256_lenient")]
    pub input_amount: U256,
    #[serde(deserialize_with = "u256_lenient")]
    pub output_amount: U256,
    #[serde(default, deserialize_with = "u256_lenient")]
    pub min_output_amount: U256,
    pub router: Address,
    pub calldata: Bytes,
    #[serde(default, deserialize_with = "u256_lenient")]
    pub value: U256,
    #[serde(default, rename = "isNativeTokenInput")]
    pub native_input: bool,
    #[serde(default)]
    pub revert: bool,
    #[serde(default)]
    pub low_balance: bool,
}

impl SwapQuote {
    /// Router simulation passed and the wallet covers the input.
    pub fn is_executable(&self) -> bool {
        !self.revert && !self.low_balance
    }

    /// Native value to attach to the router call.
    pub fn tx_value(&self) -> U256 {
        if self.native_input {
            self.value
        } else {
            U256::ZERO
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    result: Option<SwapQuote>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest<'a> {
    input_token: Address,
    output_token: Address,
    input_amount: String,
    user_address: Address,
    output_receiver: Address,
    #[serde(rename = "chainID")]
    chain_id: &'a str,
    #[serde(rename = "uniquePID")]
    unique_pid: &'a str,
    is_permit2: bool,
}

/// GlueX quote client.
#[derive(Clone)]
pub struct GlueXClient {
    client: reqwest::Client,
    quote_url: String,
    api_key: String,
    unique_pid: String,
    chain: String,
}

impl std::fmt::Debug for GlueXClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlueXClient")
            .field("quote_url", &self.quote_url)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

impl GlueXClient {
    pub fn new(
        quote_url: impl Into<String>,
        api_key: impl Into<String>,
        unique_pid: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building GlueX HTTP client")?;
        Ok(Self {
            client,
            quote_url: quote_url.into(),
            api_key: api_key.into(),
            unique_pid: unique_pid.into(),
            chain: "hyperevm".to_string(),
        })
    }

    /// Quote swapping `input_amount` of `input_token` for `output_token`, delivered to `user`.
    #[instrument(skip(self), fields(input = %input_token, output = %output_token))]
    pub async fn quote(
        &self,
        input_token: Address,
        output_token: Address,
        input_amount: U256,
        user: Address,
    ) -> Result<SwapQuote> {
        let request = QuoteRequest {
            input_token,
            output_token,
            input_amount: input_amount.to_string(),
            user_address: user,
            output_receiver: user,
            chain_id: &self.chain,
            unique_pid: &self.unique_pid,
            is_permit2: false,
        };

        let response = self
            .client
            .post(&self.quote_url)
            .header("x-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("GlueX quote request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("GlueX API error: {} - {}", status, body);
        }

        let body: QuoteResponse = response.json().await.context("decoding GlueX quote")?;
        let quote = parse_quote(body)?;
        debug!(
            amount_in = %quote.input_amount,
            amount_out = %quote.output_amount,
            min_out = %quote.min_output_amount,
            revert = quote.revert,
            low_balance = quote.low_balance,
            "Got swap quote"
        );
        Ok(quote)
    }
}

fn parse_quote(body: QuoteResponse) -> Result<SwapQuote> {
    match body.result {
        Some(quote) => Ok(quote),
        None => anyhow::bail!(
            "GlueX returned no route: {}",
            body.error.unwrap_or_else(|| "simulation failed".to_string())
        ),
    }
}

/// Accepts decimal strings, hex strings or JSON integers.
fn u256_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(u64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s.parse::<U256>().map_err(de::Error::custom),
        Raw::Int(n) => Ok(U256::from(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTE_FIXTURE: &str = r#"{
        "statusCode": 200,
        "result": {
            "inputToken": "0x5555555555555555555555555555555555555555",
            "outputToken": "0x5d3a1ff2b6bab83b63cd9ad0787074081a52ef34",
            "inputAmount": "1000000000000000000",
            "outputAmount": "38120000000000000000",
            "minOutputAmount": "37738800000000000000",
            "router": "0xe95f6eaeae1e4d650576af600b33d9f7e5f9f7fd",
            "calldata": "0xdeadbeef",
            "value": "0",
            "isNativeTokenInput": false,
            "revert": false,
            "lowBalance": false
        }
    }"#;

    #[test]
    fn test_parse_quote_fixture() {
        let body: QuoteResponse = serde_json::from_str(QUOTE_FIXTURE).unwrap();
        let quote = parse_quote(body).unwrap();

        assert_eq!(quote.input_amount, U256::from(1_000_000_000_000_000_000u128));
        assert_eq!(quote.min_output_amount, U256::from(37_738_800_000_000_000_000u128));
        assert_eq!(quote.calldata.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
        assert!(quote.is_executable());
        assert_eq!(quote.tx_value(), U256::ZERO);
    }

    #[test]
    fn test_flagged_quote_not_executable() {
        let json = QUOTE_FIXTURE.replace(r#""lowBalance": false"#, r#""lowBalance": true"#);
        let body: QuoteResponse = serde_json::from_str(&json).unwrap();
        assert!(!parse_quote(body).unwrap().is_executable());
    }

    #[test]
    fn test_missing_result_is_error() {
        let body: QuoteResponse = serde_json::from_str(r#"{"statusCode": 400, "error": "no route"}"#).unwrap();
        let err = parse_quote(body).unwrap_err();
        assert!(err.to_string().contains("no route"));
    }

    #[test]
    fn test_native_input_carries_value() {
        let json = QUOTE_FIXTURE
            .replace(r#""isNativeTokenInput": false"#, r#""isNativeTokenInput": true"#)
            .replace(r#""value": "0""#, r#""value": 1000"#);
        let body: QuoteResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parse_quote(body).unwrap().tx_value(), U256::from(1000u64));
    }

    #[test]
    fn test_request_shape() {
        let request = QuoteRequest {
            input_token: Address::repeat_byte(1),
            output_token: Address::repeat_byte(2),
            input_amount: "42".to_string(),
            user_address: Address::repeat_byte(3),
            output_receiver: Address::repeat_byte(3),
            chain_id: "hyperevm",
            unique_pid: "pid",
            is_permit2: false,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["chainID"], "hyperevm");
        assert_eq!(value["inputAmount"], "42");
        assert_eq!(value["isPermit2"], false);
        assert!(value.get("uniquePID").is_some());
    }
}
