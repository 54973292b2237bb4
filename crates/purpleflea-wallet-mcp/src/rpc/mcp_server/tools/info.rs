use super::schema::{Param, ToolSpec};
use crate::api::{ApiRequest, Credential};

pub const REFERRAL_STATS: ToolSpec = ToolSpec {
    name: "referral_stats",
    description: "Get referral statistics for the authenticated agent: referral code, share link, total referral earnings, number of referred agents and a per-agent breakdown. Referrers earn 10% commission on swap fees generated by agents they refer.",
    params: &[Param::required_str("api_key", "Agent API key (Bearer token)")],
    request: |args| {
        let key = args.required_str("api_key")?.to_owned();
        Ok(ApiRequest::get("/v1/referral/stats").credential(Credential::Bearer(key)))
    },
    reshape: None,
};

pub const SUPPORTED_CHAINS: ToolSpec = ToolSpec {
    name: "supported_chains",
    description: "List all supported chains, swap pairs and minimum swap amounts. No authentication required.",
    params: &[],
    request: |_| Ok(ApiRequest::get("/v1/swap/chains")),
    reshape: None,
};

pub const GOSSIP: ToolSpec = ToolSpec {
    name: "gossip",
    description: "Get Purple Flea Wallet gossip: live agent count, referral program details and passive income opportunities. No authentication required.",
    params: &[],
    request: |_| Ok(ApiRequest::get("/v1/gossip")),
    reshape: None,
};

pub const TOOLS: &[ToolSpec] = &[REFERRAL_STATS, SUPPORTED_CHAINS, GOSSIP];
