//! Raydium Trade API clients
//!
//! Quotes and builds swaps through Raydium's public transaction API and
//! reads USD prices from its mint price endpoint.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use solana_volume_core::chain::ChainClient;
use solana_volume_core::pricing::{PriceMap, PriceOracle};
use solana_volume_core::swap::{PreparedSwap, SwapOrder, SwapProvider, SwapQuote};
use solana_volume_core::{VolumeError, VolumeResult};

pub const BASE_HOST: &str = "https://api-v3.raydium.io";
pub const SWAP_HOST: &str = "https://transaction-v1.raydium.io";

const PRIORITY_FEE_PATH: &str = "/main/auto-fee";
const MINT_PRICE_PATH: &str = "/mint/price";
const TX_VERSION: &str = "V0";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

fn http_client() -> VolumeResult<Client> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| VolumeError::Config(format!("cannot build HTTP client: {}", e)))
}

fn endpoint(host: &str, path: &str, params: &[(&str, String)]) -> VolumeResult<Url> {
    Url::parse_with_params(&format!("{}{}", host, path), params)
        .map_err(|e| VolumeError::Config(format!("bad Raydium URL {}{}: {}", host, path, e)))
}

/// 5xx and 429 are worth retrying; any other client error never succeeds
fn status_error(status: StatusCode, body: &str) -> VolumeError {
    let message = format!("Raydium HTTP {}: {}", status, body);
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        VolumeError::Transport(message)
    } else {
        VolumeError::SwapInvalid(message)
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> VolumeResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

/// `{ success, msg, data }` wrapper used by every Raydium endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self, what: &str) -> VolumeResult<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(VolumeError::SwapRejected(format!(
                "{}: {}",
                what,
                self.msg.unwrap_or_else(|| "no data".to_string())
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriorityFee {
    default: PriorityTiers,
}

#[derive(Debug, Deserialize)]
struct PriorityTiers {
    h: f64,
}

#[derive(Debug, Deserialize)]
struct TransactionPayload {
    transaction: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwapTransactionRequest<'a> {
    compute_unit_price_micro_lamports: String,
    swap_response: &'a serde_json::Value,
    tx_version: &'static str,
    wallet: String,
    wrap_sol: bool,
    unwrap_sol: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    input_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_account: Option<String>,
}

/// Pull the amounts out of a `compute/swap-base-in` response
fn quote_from_compute(compute: &serde_json::Value) -> VolumeResult<SwapQuote> {
    let data = &compute["data"];
    let amount = |field: &str| -> VolumeResult<u64> {
        match &data[field] {
            serde_json::Value::String(s) => s.parse().ok(),
            serde_json::Value::Number(n) => n.as_u64(),
            _ => None,
        }
        .ok_or_else(|| VolumeError::SwapInvalid(format!("quote is missing {}", field)))
    };

    Ok(SwapQuote {
        input_amount: amount("inputAmount")?,
        output_amount: amount("outputAmount")?,
        price_impact_pct: data["priceImpactPct"].as_f64(),
    })
}

fn decode_transactions(payloads: &[TransactionPayload]) -> VolumeResult<Vec<VersionedTransaction>> {
    payloads
        .iter()
        .map(|payload| {
            let bytes = BASE64_ENGINE
                .decode(&payload.transaction)
                .map_err(|e| VolumeError::Transaction(format!("bad base64 transaction: {}", e)))?;
            bincode::deserialize(&bytes)
                .map_err(|e| VolumeError::Transaction(format!("bad transaction bytes: {}", e)))
        })
        .collect()
}

/// Swap collaborator backed by Raydium's transaction API
pub struct RaydiumSwap {
    client: Client,
    chain: Arc<dyn ChainClient>,
    base_host: String,
    swap_host: String,
}

impl RaydiumSwap {
    pub fn new(chain: Arc<dyn ChainClient>) -> VolumeResult<Self> {
        Ok(Self {
            client: http_client()?,
            chain,
            base_host: BASE_HOST.to_string(),
            swap_host: SWAP_HOST.to_string(),
        })
    }

    async fn priority_fee(&self) -> VolumeResult<u64> {
        let url = endpoint(&self.base_host, PRIORITY_FEE_PATH, &[])?;
        let response = self.client.get(url).send().await?;
        let envelope: Envelope<PriorityFee> = read_json(response).await?;
        let fee = envelope.into_data("priority fee unavailable")?;
        Ok(fee.default.h.max(0.0).round() as u64)
    }

    async fn compute(&self, order: &SwapOrder) -> VolumeResult<serde_json::Value> {
        let url = endpoint(
            &self.swap_host,
            "/compute/swap-base-in",
            &[
                ("inputMint", order.input_mint.to_string()),
                ("outputMint", order.output_mint.to_string()),
                ("amount", order.amount_in.to_string()),
                ("slippageBps", order.slippage_bps.to_string()),
                ("txVersion", TX_VERSION.to_string()),
            ],
        )?;
        let response = self.client.get(url).send().await?;
        let compute: serde_json::Value = read_json(response).await?;

        if compute["success"].as_bool() != Some(true) {
            let msg = compute["msg"].as_str().unwrap_or("unknown");
            return Err(VolumeError::SwapRejected(format!("compute swap error {}", msg)));
        }
        Ok(compute)
    }

    /// Associated token account of `owner`, if it exists
    async fn token_account(&self, owner: &Pubkey, mint: &Pubkey) -> VolumeResult<Option<Pubkey>> {
        let address =
            spl_associated_token_account::get_associated_token_address(owner, mint);
        Ok(self
            .chain
            .account_exists(&address)
            .await?
            .then_some(address))
    }
}

#[async_trait]
impl SwapProvider for RaydiumSwap {
    fn name(&self) -> &'static str {
        "raydium"
    }

    async fn prepare(&self, owner: &Pubkey, order: &SwapOrder) -> VolumeResult<PreparedSwap> {
        let wrap_sol = order.is_input_native();
        let unwrap_sol = order.is_output_native();

        let input_account = if wrap_sol {
            None
        } else {
            match self.token_account(owner, &order.input_mint).await? {
                Some(account) => Some(account),
                None => {
                    return Err(VolumeError::InsufficientTokens(format!(
                        "{} has no {} account",
                        owner, order.input_mint
                    )))
                }
            }
        };
        let output_account = if unwrap_sol {
            None
        } else {
            self.token_account(owner, &order.output_mint).await?
        };

        let fee = self.priority_fee().await?;
        let compute = self.compute(order).await?;
        let quote = quote_from_compute(&compute)?;
        debug!(
            "Raydium quote {} -> {} (impact {:?}%), priority fee {} µL/CU",
            quote.input_amount, quote.output_amount, quote.price_impact_pct, fee
        );

        let request = SwapTransactionRequest {
            compute_unit_price_micro_lamports: fee.to_string(),
            swap_response: &compute,
            tx_version: TX_VERSION,
            wallet: owner.to_string(),
            wrap_sol,
            unwrap_sol,
            input_account: input_account.map(|a| a.to_string()),
            output_account: output_account.map(|a| a.to_string()),
        };

        let url = endpoint(&self.swap_host, "/transaction/swap-base-in", &[])?;
        let response = self.client.post(url).json(&request).send().await?;
        let envelope: Envelope<Vec<TransactionPayload>> = read_json(response).await?;
        let payloads = envelope.into_data("get swap transaction error")?;

        Ok(PreparedSwap {
            quote,
            transactions: decode_transactions(&payloads)?,
        })
    }
}

/// Price collaborator backed by Raydium's mint price endpoint
pub struct RaydiumPrice {
    client: Client,
    base_host: String,
}

impl RaydiumPrice {
    pub fn new() -> VolumeResult<Self> {
        Ok(Self {
            client: http_client()?,
            base_host: BASE_HOST.to_string(),
        })
    }
}

/// Accepts both `"1.23"` and `1.23`; unparsable entries are dropped
fn parse_prices(data: &serde_json::Map<String, serde_json::Value>) -> PriceMap {
    data.iter()
        .filter_map(|(mint, value)| {
            let mint = Pubkey::from_str(mint).ok()?;
            let price = match value {
                serde_json::Value::String(s) => Decimal::from_str(s).ok()?,
                serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok()?,
                _ => return None,
            };
            Some((mint, price))
        })
        .collect()
}

#[async_trait]
impl PriceOracle for RaydiumPrice {
    async fn prices(&self, mints: &[Pubkey]) -> VolumeResult<PriceMap> {
        let joined = mints
            .iter()
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let url = endpoint(&self.base_host, MINT_PRICE_PATH, &[("mints", joined)])?;

        let response = self.client.get(url).send().await?;
        let body: serde_json::Value = read_json(response).await.map_err(|e| match e {
            VolumeError::SwapRejected(msg) | VolumeError::SwapInvalid(msg) => {
                VolumeError::PriceFetch(msg)
            }
            other => other,
        })?;

        body["data"]
            .as_object()
            .map(parse_prices)
            .ok_or_else(|| VolumeError::PriceFetch("price response has no data".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use solana_sdk::hash::Hash;
    use solana_sdk::message::{v0, VersionedMessage};
    use solana_sdk::signature::{Keypair, Signature, Signer};
    use solana_sdk::system_instruction;

    #[test]
    fn test_quote_from_compute() {
        let compute = json!({
            "success": true,
            "data": {
                "inputAmount": "10000000",
                "outputAmount": 2500000,
                "priceImpactPct": 0.12
            }
        });

        let quote = quote_from_compute(&compute).unwrap();
        assert_eq!(quote.input_amount, 10_000_000);
        assert_eq!(quote.output_amount, 2_500_000);
        assert_eq!(quote.price_impact_pct, Some(0.12));

        let broken = json!({ "success": true, "data": {} });
        let err = quote_from_compute(&broken).unwrap_err();
        assert!(matches!(err, VolumeError::SwapInvalid(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_http_status_classes() {
        let bad_request = status_error(StatusCode::BAD_REQUEST, "INVALID_INPUT_MINT");
        assert!(matches!(bad_request, VolumeError::SwapInvalid(_)));
        assert!(!bad_request.is_retryable());

        let not_found = status_error(StatusCode::NOT_FOUND, "");
        assert!(!not_found.is_retryable());

        for status in [StatusCode::TOO_MANY_REQUESTS, StatusCode::BAD_GATEWAY] {
            let err = status_error(status, "busy");
            assert!(matches!(err, VolumeError::Transport(_)));
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_envelope_failure_is_rejection() {
        let envelope: Envelope<Vec<TransactionPayload>> =
            serde_json::from_value(json!({ "success": false, "msg": "REQ_SLIPPAGE_ERROR" }))
                .unwrap();
        let err = envelope.into_data("get swap transaction error").unwrap_err();
        assert!(err.to_string().contains("REQ_SLIPPAGE_ERROR"));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_decode_transactions() {
        let owner = Keypair::new();
        let ix = system_instruction::transfer(&owner.pubkey(), &Pubkey::new_unique(), 1);
        let message = v0::Message::try_compile(&owner.pubkey(), &[ix], &[], Hash::default()).unwrap();
        let unsigned = VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::V0(message),
        };
        let payload = TransactionPayload {
            transaction: BASE64_ENGINE.encode(bincode::serialize(&unsigned).unwrap()),
        };

        let decoded = decode_transactions(&[payload]).unwrap();
        assert_eq!(decoded, vec![unsigned]);

        let garbage = TransactionPayload {
            transaction: "not base64!".to_string(),
        };
        assert!(decode_transactions(&[garbage]).is_err());
    }

    #[test]
    fn test_parse_prices_accepts_strings_and_numbers() {
        let sol = "So11111111111111111111111111111111111111112";
        let ray = "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R";
        let data = json!({ sol: "151.25", ray: 2.5, "bogus": "1", "nullish": null });

        let prices = parse_prices(data.as_object().unwrap());
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[&Pubkey::from_str(sol).unwrap()], Decimal::new(15125, 2));
        assert_eq!(prices[&Pubkey::from_str(ray).unwrap()], Decimal::new(25, 1));
    }

    #[test]
    fn test_swap_request_shape() {
        let compute = json!({ "id": "abc" });
        let request = SwapTransactionRequest {
            compute_unit_price_micro_lamports: "25000".to_string(),
            swap_response: &compute,
            tx_version: TX_VERSION,
            wallet: "wallet".to_string(),
            wrap_sol: true,
            unwrap_sol: false,
            input_account: None,
            output_account: Some("ata".to_string()),
        };

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["computeUnitPriceMicroLamports"], "25000");
        assert_eq!(body["txVersion"], "V0");
        assert_eq!(body["wrapSol"], true);
        assert!(body.get("inputAccount").is_none());
        assert_eq!(body["outputAccount"], "ata");
    }
}
