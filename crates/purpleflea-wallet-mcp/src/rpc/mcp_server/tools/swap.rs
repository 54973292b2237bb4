//! Swap tools, authenticated with the agent's bearer key.
//!
//! `privacy_swap` is a two-step protocol: it executes leg 1 (source asset to XMR) and hands the
//! caller a description of leg 2, which the caller must later run through the plain `swap` tool.
//! Nothing here waits on, polls, or reconciles the two legs.

use serde_json::{json, Map, Value};

use super::schema::{Param, ToolArgs, ToolSpec};
use crate::api::{ApiRequest, Credential};
use crate::errors::ArgsError;

const QUOTE_PATH: &str = "/v1/swap/quote";
const EXECUTE_PATH: &str = "/v1/swap/execute";
const STATUS_PATH: &str = "/v1/swap/status";

const PRIVACY_CHAIN: &str = "monero";
const PRIVACY_TOKEN: &str = "XMR";
const DEFAULT_ADDRESS_NOTE: &str = "(agent's default address)";

const API_KEY: Param = Param::required_str("api_key", "Agent API key (Bearer token)");
const AMOUNT: Param = Param::required_str(
    "amount",
    "Amount in smallest unit (e.g. wei for ETH, satoshis for BTC, lamports for SOL)",
);
const FROM_CHAIN: Param = Param::required_str(
    "from_chain",
    "Source chain (ethereum, bsc, arbitrum, base, hyperevm, solana, bitcoin, monero)",
);
const TO_CHAIN: Param = Param::required_str(
    "to_chain",
    "Destination chain (ethereum, bsc, arbitrum, base, hyperevm, solana, bitcoin, monero)",
);
const FROM_TOKEN: Param = Param::required_str(
    "from_token",
    "Source token symbol or contract address (e.g. USDC, ETH, 0x...)",
);
const TO_TOKEN: Param = Param::required_str(
    "to_token",
    "Destination token symbol or contract address (e.g. BTC, XMR, SOL)",
);

pub const SWAP_QUOTE: ToolSpec = ToolSpec {
    name: "swap_quote",
    description: "Get a cross-chain swap quote via the Wagyu aggregator (Ethereum, Bitcoin, Solana, Monero, Base, Arbitrum, BSC, HyperEVM). Returns estimated output amount, USD values and execution time. Does not move funds.",
    params: &[API_KEY, FROM_CHAIN, TO_CHAIN, FROM_TOKEN, TO_TOKEN, AMOUNT],
    request: quote_request,
    reshape: None,
};

pub const SWAP: ToolSpec = ToolSpec {
    name: "swap",
    description: "Execute a cross-chain swap via the Wagyu aggregator. Creates a swap order and returns a deposit address to send funds to. Without to_address, funds arrive at the agent's own address on the target chain.",
    params: &[
        API_KEY,
        FROM_CHAIN,
        TO_CHAIN,
        FROM_TOKEN,
        TO_TOKEN,
        AMOUNT,
        Param::optional_str(
            "to_address",
            "Destination address (defaults to agent's address on the target chain)",
        ),
    ],
    request: |args| execute_request(args, false),
    reshape: None,
};

pub const PRIVACY_SWAP: ToolSpec = ToolSpec {
    name: "privacy_swap",
    description: "Privacy-routed swap via Monero (XMR). Executes leg 1 (source token to XMR) and returns instructions for leg 2 (XMR to the desired output), which must be run later with the 'swap' tool once leg 1 completes. Minimum swap: $25 USD for XMR legs.",
    params: &[
        API_KEY,
        Param::required_str(
            "from_chain",
            "Source chain (ethereum, bsc, arbitrum, base, hyperevm, solana, bitcoin)",
        ),
        Param::required_str("from_token", "Source token symbol or contract address"),
        Param::required_str("amount", "Amount in smallest unit"),
        Param::required_str(
            "to_chain",
            "Final destination chain (ethereum, bsc, arbitrum, base, hyperevm, solana, bitcoin)",
        ),
        Param::required_str("to_token", "Final destination token symbol or contract address"),
        Param::optional_str(
            "to_address",
            "Final destination address (defaults to agent's address on the target chain)",
        ),
    ],
    request: privacy_leg1_request,
    reshape: Some(privacy_summary),
};

pub const SWAP_STATUS: ToolSpec = ToolSpec {
    name: "swap_status",
    description: "Check the status of a swap order: pending, completed or failed, deposit details, and the output transaction hash once complete.",
    params: &[
        API_KEY,
        Param::required_str(
            "order_id",
            "Swap order ID returned from a swap or privacy_swap call",
        ),
    ],
    request: status_request,
    reshape: None,
};

pub const WITHDRAW: ToolSpec = ToolSpec {
    name: "withdraw",
    description: "Withdraw funds by swapping from the agent's wallet to an external address. Specify the source chain/token in the agent's wallet and the destination chain/token/address.",
    params: &[
        API_KEY,
        Param::required_str(
            "from_chain",
            "Source chain to withdraw from (ethereum, bsc, arbitrum, base, hyperevm, solana, bitcoin, monero)",
        ),
        Param::required_str("from_token", "Token to withdraw (e.g. USDC, ETH, BTC)"),
        Param::required_str("amount", "Amount in smallest unit"),
        Param::required_str("to_chain", "Destination chain"),
        Param::required_str("to_token", "Destination token"),
        Param::required_str("to_address", "External wallet address to receive funds"),
    ],
    request: |args| execute_request(args, true),
    reshape: None,
};

pub const TOOLS: &[ToolSpec] = &[SWAP_QUOTE, SWAP, PRIVACY_SWAP, SWAP_STATUS, WITHDRAW];

fn bearer(args: &ToolArgs) -> Result<Credential, ArgsError> {
    Ok(Credential::Bearer(args.required_str("api_key")?.to_owned()))
}

/// `{from_chain, to_chain, from_token, to_token, amount}` straight from the arguments.
fn route_body(args: &ToolArgs) -> Result<Map<String, Value>, ArgsError> {
    let mut body = Map::new();
    for key in ["from_chain", "to_chain", "from_token", "to_token", "amount"] {
        body.insert(key.into(), Value::from(args.required_str(key)?));
    }
    Ok(body)
}

fn quote_request(args: &ToolArgs) -> Result<ApiRequest, ArgsError> {
    Ok(ApiRequest::post(QUOTE_PATH)
        .json(Value::Object(route_body(args)?))
        .credential(bearer(args)?))
}

fn status_request(args: &ToolArgs) -> Result<ApiRequest, ArgsError> {
    Ok(ApiRequest::get(STATUS_PATH)
        .segment(args.required_str("order_id")?)
        .credential(bearer(args)?))
}

fn execute_request(args: &ToolArgs, to_address_required: bool) -> Result<ApiRequest, ArgsError> {
    let mut body = route_body(args)?;
    let to_address = if to_address_required {
        Some(args.required_str("to_address")?)
    } else {
        args.opt_str("to_address")
    };
    if let Some(addr) = to_address {
        body.insert("to_address".into(), Value::from(addr));
    }
    Ok(ApiRequest::post(EXECUTE_PATH)
        .json(Value::Object(body))
        .credential(bearer(args)?))
}

/// Leg 1 of a privacy swap: the caller's source asset into XMR on Monero.
fn privacy_leg1_request(args: &ToolArgs) -> Result<ApiRequest, ArgsError> {
    let body = json!({
      "from_chain": args.required_str("from_chain")?,
      "to_chain": PRIVACY_CHAIN,
      "from_token": args.required_str("from_token")?,
      "to_token": PRIVACY_TOKEN,
      "amount": args.required_str("amount")?,
    });
    Ok(ApiRequest::post(EXECUTE_PATH)
        .json(body)
        .credential(bearer(args)?))
}

fn leg1_field(leg1: &Value, key: &str) -> Value {
    leg1.get(key).cloned().unwrap_or(Value::Null)
}

/// Describe leg 1's outcome and spell out leg 2 for the caller. Leg 2 is never executed here.
fn privacy_summary(args: &ToolArgs, leg1: &Value) -> Result<Value, ArgsError> {
    let to_chain = args.required_str("to_chain")?;
    let to_token = args.required_str("to_token")?;
    Ok(json!({
      "privacy_swap": true,
      "leg1_to_xmr": {
        "order_id": leg1_field(leg1, "order_id"),
        "status": leg1_field(leg1, "status"),
        "deposit": leg1_field(leg1, "deposit"),
        "note": "Send funds to the deposit address. Once received, XMR will be sent to your Monero wallet.",
      },
      "leg2_from_xmr": {
        "instruction": format!(
            "Once leg 1 completes, execute a swap from {PRIVACY_CHAIN}/{PRIVACY_TOKEN} to {to_chain}/{to_token} using the 'swap' tool."
        ),
        "from_chain": PRIVACY_CHAIN,
        "from_token": PRIVACY_TOKEN,
        "to_chain": to_chain,
        "to_token": to_token,
        "to_address": args.opt_str("to_address").unwrap_or(DEFAULT_ADDRESS_NOTE),
      },
      "how_it_works": "Leg 1 converts your tokens to XMR. Monero's ring signatures and stealth addresses break the on-chain trail. Leg 2 converts XMR to your desired output. The two legs have no traceable link.",
    }))
}
