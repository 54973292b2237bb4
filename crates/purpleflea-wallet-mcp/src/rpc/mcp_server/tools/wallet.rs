//! Agent wallet tools. All of them authenticate with the service key.

use serde_json::{Map, Number, Value};

use super::schema::{Param, ToolArgs, ToolSpec};
use crate::api::{ApiRequest, Credential};
use crate::errors::ArgsError;

const CREATE_PATH: &str = "/v1/wallet/internal/create";
const BALANCE_PATH: &str = "/v1/wallet/internal/balance";
const ADDRESSES_PATH: &str = "/v1/wallet/internal/addresses";
const TRANSACTIONS_PATH: &str = "/v1/wallet/internal/transactions";

const AGENT_ID: Param = Param::required_str("agent_id", "Agent identifier");
const SERVICE_KEY: Param =
    Param::required_str("service_key", "Service API key for authentication");

pub const REGISTER: ToolSpec = ToolSpec {
    name: "register",
    description: "Register a new agent with Purple Flea Wallet. Creates a multi-chain wallet (Ethereum, Bitcoin, Solana, Monero, Base, Arbitrum, BSC, Tron, Zcash, Dogecoin, HyperEVM) and returns deposit addresses for every supported chain. Optionally pass the referral code of the agent who referred you; the referrer earns 10% commission on your swap fees.",
    params: &[
        Param::required_str("agent_id", "Unique identifier for the agent"),
        SERVICE_KEY,
        Param::optional_str(
            "referred_by",
            "Referral code of the agent who referred you (e.g. ref_xxxxxxxx)",
        ),
    ],
    // Same endpoint as create_wallet: the backend treats an existing agent as a no-op.
    request: create_request,
    reshape: None,
};

pub const CREATE_WALLET: ToolSpec = ToolSpec {
    name: "create_wallet",
    description: "Create a multi-chain wallet for an existing agent. Addresses are generated across all supported chains. If the wallet already exists, the existing addresses are returned unchanged.",
    params: &[
        Param::required_str("agent_id", "Agent identifier to create the wallet for"),
        SERVICE_KEY,
        Param::optional_str(
            "referred_by",
            "Referral code (ref_xxxxxxxx) to link this agent to a referrer",
        ),
    ],
    request: create_request,
    reshape: None,
};

pub const BALANCE: ToolSpec = ToolSpec {
    name: "balance",
    description: "Get the current USD balance for an agent: total, available (excluding reserved funds), reserved, and lifetime deposit/withdrawal totals.",
    params: &[AGENT_ID, SERVICE_KEY],
    request: |args| agent_request(BALANCE_PATH, args),
    reshape: None,
};

pub const DEPOSIT_ADDRESS: ToolSpec = ToolSpec {
    name: "deposit_address",
    description: "Get deposit addresses for an agent across all supported chains. EVM chains (Ethereum, BSC, Arbitrum, Base, HyperEVM) share the same address.",
    params: &[AGENT_ID, SERVICE_KEY],
    request: |args| agent_request(ADDRESSES_PATH, args),
    reshape: None,
};

pub const TRANSACTIONS: ToolSpec = ToolSpec {
    name: "transactions",
    description: "Get transaction history for an agent: deposits, charges, credits, swaps, referral commissions and reservations, with timestamps and balances.",
    params: &[
        AGENT_ID,
        SERVICE_KEY,
        Param::number_or(
            "limit",
            50,
            "Number of transactions to return (default 50)",
        ),
    ],
    request: transactions_request,
    reshape: None,
};

pub const TOOLS: &[ToolSpec] = &[REGISTER, CREATE_WALLET, BALANCE, DEPOSIT_ADDRESS, TRANSACTIONS];

fn service_key(args: &ToolArgs) -> Result<Credential, ArgsError> {
    Ok(Credential::Service(
        args.required_str("service_key")?.to_owned(),
    ))
}

fn create_request(args: &ToolArgs) -> Result<ApiRequest, ArgsError> {
    let mut body = Map::new();
    body.insert(
        "agent_id".into(),
        Value::from(args.required_str("agent_id")?),
    );
    if let Some(code) = args.opt_str("referred_by") {
        body.insert("referred_by".into(), Value::from(code));
    }
    Ok(ApiRequest::post(CREATE_PATH)
        .json(Value::Object(body))
        .credential(service_key(args)?))
}

fn agent_request(path: &'static str, args: &ToolArgs) -> Result<ApiRequest, ArgsError> {
    Ok(ApiRequest::get(path)
        .segment(args.required_str("agent_id")?)
        .credential(service_key(args)?))
}

/// Query text for a numeric argument. Whole numbers render without a fractional part, so a
/// client sending `10.0` still asks for `limit=10`.
fn number_text(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 {
                return format!("{f:.0}");
            }
        }
    }
    n.to_string()
}

fn transactions_request(args: &ToolArgs) -> Result<ApiRequest, ArgsError> {
    let limit = number_text(args.number("limit")?);
    Ok(agent_request(TRANSACTIONS_PATH, args)?.query("limit", limit))
}
