use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use vela_domain::repositories::broker::{Broker, BrokerError};
use vela_domain::value_objects::account::AccountSnapshot;
use vela_domain::value_objects::order::{BrokerPosition, OrderAck, OrderRequest, TimeInForce};
use vela_domain::value_objects::side::Side;

pub const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets";
pub const LIVE_BASE_URL: &str = "https://api.alpaca.markets";

const KEY_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_HEADER: &str = "APCA-API-SECRET-KEY";

#[derive(Debug, Clone)]
pub struct RestBrokerConfig {
    pub base_url: String,
    pub key_id: String,
    pub secret_key: String,
    pub timeout_ms: u64,
    pub retries: u32,
}

/// Blocking client for an Alpaca-compatible trading API.
pub struct RestBroker {
    base_url: String,
    retries: u32,
    headers: HeaderMap,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct AccountWire {
    id: String,
    status: String,
    cash: String,
    buying_power: String,
    portfolio_value: String,
}

#[derive(Debug, Serialize)]
struct OrderWire<'a> {
    symbol: &'a str,
    qty: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
}

#[derive(Debug, Deserialize)]
struct OrderAckWire {
    id: String,
    symbol: String,
    qty: Option<String>,
    side: Side,
    status: String,
}

#[derive(Debug, Deserialize)]
struct PositionWire {
    symbol: String,
    qty: String,
    avg_entry_price: String,
}

impl RestBroker {
    pub fn new(config: RestBrokerConfig) -> Result<Self, String> {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            (KEY_HEADER, config.key_id.as_str()),
            (SECRET_HEADER, config.secret_key.as_str()),
        ] {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| format!("invalid header name: {name}"))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_| format!("invalid header value for {name}"))?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retries: config.retries,
            headers,
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends the request up to `retries + 1` times while the failure is
    /// retryable. Non-success responses come back as `BrokerError::Status`.
    fn send(
        &self,
        label: &'static str,
        retries: u32,
        build: impl Fn() -> RequestBuilder,
    ) -> Result<Response, BrokerError> {
        let start = Instant::now();
        let mut attempts = 0u32;
        let result = loop {
            attempts += 1;
            let outcome = match build().headers(self.headers.clone()).send() {
                Ok(resp)
                    if resp.status().is_success() || resp.status() == StatusCode::NOT_FOUND =>
                {
                    Ok(resp)
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let body = resp.text().unwrap_or_default();
                    Err(BrokerError::Status { status, body })
                }
                Err(err) => Err(BrokerError::Transport(format!("{label} request failed: {err}"))),
            };
            match outcome {
                Err(err) if err.is_retryable() && attempts <= retries => {
                    tracing::warn!(call = label, attempts, error = %err, "retrying broker call");
                    continue;
                }
                other => break other,
            }
        };

        let result_label = if result.is_ok() { "ok" } else { "err" };
        metrics::counter!(
            "vela.infra.broker.calls_total",
            "call" => label,
            "result" => result_label
        )
        .increment(1);
        metrics::histogram!("vela.infra.broker.call_ms", "call" => label)
            .record(start.elapsed().as_millis() as f64);
        result
    }
}

impl Broker for RestBroker {
    fn account(&self) -> Result<AccountSnapshot, BrokerError> {
        let endpoint = self.endpoint("/v2/account");
        let resp = self.send("account", self.retries, || self.client.get(&endpoint))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BrokerError::Status {
                status: 404,
                body: "account not found".to_string(),
            });
        }
        let wire: AccountWire = resp
            .json()
            .map_err(|err| BrokerError::Decode(format!("account: {err}")))?;
        Ok(AccountSnapshot {
            id: wire.id,
            active: wire.status.eq_ignore_ascii_case("ACTIVE"),
            cash: parse_decimal("cash", &wire.cash)?,
            buying_power: parse_decimal("buying_power", &wire.buying_power)?,
            portfolio_value: parse_decimal("portfolio_value", &wire.portfolio_value)?,
        })
    }

    // Orders are sent once: a 5xx may still have reached the book.
    fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck, BrokerError> {
        let endpoint = self.endpoint("/v2/orders");
        let body = OrderWire {
            symbol: &order.symbol,
            qty: order.quantity.to_string(),
            side: order.side.as_str(),
            order_type: "market",
            time_in_force: match order.time_in_force {
                TimeInForce::Day => "day",
                TimeInForce::Gtc => "gtc",
            },
        };
        let resp = match self.send("submit_order", 0, || self.client.post(&endpoint).json(&body)) {
            Err(BrokerError::Status { status, body }) if status == 403 || status == 422 => {
                return Err(BrokerError::Rejected(body));
            }
            other => other?,
        };
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BrokerError::Status {
                status: 404,
                body: "orders endpoint not found".to_string(),
            });
        }
        let wire: OrderAckWire = resp
            .json()
            .map_err(|err| BrokerError::Decode(format!("order: {err}")))?;
        let quantity = match wire.qty.as_deref() {
            Some(qty) => parse_decimal("qty", qty)?,
            None => order.quantity,
        };
        tracing::info!(
            order_id = %wire.id,
            symbol = %wire.symbol,
            side = %wire.side,
            status = %wire.status,
            "order accepted"
        );
        Ok(OrderAck {
            id: wire.id,
            symbol: wire.symbol,
            quantity,
            side: wire.side,
            status: wire.status,
        })
    }

    fn position(&self, symbol: &str) -> Result<Option<BrokerPosition>, BrokerError> {
        let endpoint = self.endpoint(&format!("/v2/positions/{symbol}"));
        let resp = self.send("position", self.retries, || self.client.get(&endpoint))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let wire: PositionWire = resp
            .json()
            .map_err(|err| BrokerError::Decode(format!("position: {err}")))?;
        Ok(Some(BrokerPosition {
            symbol: wire.symbol,
            quantity: parse_decimal("qty", &wire.qty)?,
            avg_entry_price: parse_decimal("avg_entry_price", &wire.avg_entry_price)?,
        }))
    }
}

fn parse_decimal(field: &str, value: &str) -> Result<f64, BrokerError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| BrokerError::Decode(format!("{field} is not a number: {value:?}")))
}
