//! Token calldata decoder.
//!
//! Identifies and decodes PYUSD contract calls from raw transaction input
//! bytes using a fixed selector table, with no ABI schema involved.
//! Decoding
//! runs over a bounds-checked 32-byte word reader, so foreign or truncated
//! calldata can never panic; it degrades to "Unknown" or to a recognized
//! name with absent parameters.
//!
//! Supported Function Selectors:
//!     0xa9059cbb — transfer(address,uint256)
//!     0x23b872dd — transferFrom(address,address,uint256)
//!     0x095ea7b3 — approve(address,uint256)
//!     0x40c10f19 — mint(address,uint256)
//!     0x42966c68 — burn(uint256)
//!     0x8da5cb5b — owner()
//!     0x70a08231 — balanceOf(address)
//!     0xdd62ed3e — allowance(address,address)

use alloy::primitives::{hex, Address, U256};
use std::collections::BTreeMap;
use tracing::trace;

use super::types::{DecodedCall, ParamValue, RawTransaction};

#[derive(Debug, Clone, Copy)]
enum ParamKind {
    Address,
    Amount,
}

struct FunctionAbi {
    selector: [u8; 4],
    name: &'static str,
    params: &'static [(&'static str, ParamKind)],
}

const TOKEN_FUNCTIONS: &[FunctionAbi] = &[
    FunctionAbi {
        selector: [0xa9, 0x05, 0x9c, 0xbb],
        name: "transfer",
        params: &[("to", ParamKind::Address), ("amount", ParamKind::Amount)],
    },
    FunctionAbi {
        selector: [0x23, 0xb8, 0x72, 0xdd],
        name: "transferFrom",
        params: &[
            ("from", ParamKind::Address),
            ("to", ParamKind::Address),
            ("amount", ParamKind::Amount),
        ],
    },
    FunctionAbi {
        selector: [0x09, 0x5e, 0xa7, 0xb3],
        name: "approve",
        params: &[("spender", ParamKind::Address), ("amount", ParamKind::Amount)],
    },
    FunctionAbi {
        selector: [0x40, 0xc1, 0x0f, 0x19],
        name: "mint",
        params: &[("to", ParamKind::Address), ("amount", ParamKind::Amount)],
    },
    FunctionAbi {
        selector: [0x42, 0x96, 0x6c, 0x68],
        name: "burn",
        params: &[("amount", ParamKind::Amount)],
    },
    FunctionAbi {
        selector: [0x8d, 0xa5, 0xcb, 0x5b],
        name: "owner",
        params: &[],
    },
    FunctionAbi {
        selector: [0x70, 0xa0, 0x82, 0x31],
        name: "balanceOf",
        params: &[("owner", ParamKind::Address)],
    },
    FunctionAbi {
        selector: [0xdd, 0x62, 0xed, 0x3e],
        name: "allowance",
        params: &[("owner", ParamKind::Address), ("spender", ParamKind::Address)],
    },
];

/// Reads 32-byte ABI words at fixed indices, refusing out-of-bounds slots.
struct WordReader<'a> {
    data: &'a [u8],
}

impl<'a> WordReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn word(&self, index: usize) -> Option<&'a [u8]> {
        let start = index * 32;
        self.data.get(start..start + 32)
    }

    /// Address = last 20 bytes of the 32-byte slot.
    fn address(&self, index: usize) -> Option<Address> {
        self.word(index).map(|w| Address::from_slice(&w[12..]))
    }

    fn amount(&self, index: usize) -> Option<U256> {
        self.word(index).map(U256::from_be_slice)
    }
}

/// True when the transaction targets the token contract or carries one of
/// the known selectors (covers proxied calls where `to` differs).
pub fn is_token_transaction(tx: &RawTransaction, token_contract: Address) -> bool {
    if tx.recipient() == Some(token_contract) {
        return true;
    }
    lookup(tx.input_data()).is_some()
}

/// Decode input hex into a named call. Never fails: unrecognized selectors
/// yield "Unknown", truncated parameter blocks yield absent params.
pub fn decode_calldata(input: &str) -> DecodedCall {
    let bytes = parse_input(input);
    if bytes.len() < 4 {
        return DecodedCall::unknown(selector_hex(&bytes));
    }

    let selector = [bytes[0], bytes[1], bytes[2], bytes[3]];
    let Some(abi) = TOKEN_FUNCTIONS.iter().find(|f| f.selector == selector) else {
        trace!("unknown selector {}", selector_hex(&bytes));
        return DecodedCall::unknown(selector_hex(&bytes));
    };

    DecodedCall {
        name: abi.name.to_string(),
        selector: selector_hex(&bytes),
        params: decode_params(abi, &bytes[4..]),
    }
}

fn decode_params(abi: &FunctionAbi, data: &[u8]) -> Option<BTreeMap<String, ParamValue>> {
    if abi.params.is_empty() {
        return None;
    }
    if data.len() < abi.params.len() * 32 {
        trace!("calldata too short for {}", abi.name);
        return None;
    }

    let reader = WordReader::new(data);
    let mut params = BTreeMap::new();
    for (index, (name, kind)) in abi.params.iter().enumerate() {
        let value = match kind {
            ParamKind::Address => reader.address(index).map(ParamValue::Address),
            ParamKind::Amount => reader.amount(index).map(ParamValue::Amount),
        }?;
        params.insert(name.to_string(), value);
    }
    Some(params)
}

fn lookup(input: &str) -> Option<&'static FunctionAbi> {
    let bytes = parse_input(input);
    if bytes.len() < 4 {
        return None;
    }
    let selector = [bytes[0], bytes[1], bytes[2], bytes[3]];
    TOKEN_FUNCTIONS.iter().find(|f| f.selector == selector)
}

fn parse_input(input: &str) -> Vec<u8> {
    hex::decode(input.strip_prefix("0x").unwrap_or(input)).unwrap_or_default()
}

/// The 4-byte selector as a hex string for display and logging.
fn selector_hex(bytes: &[u8]) -> String {
    if bytes.len() < 4 {
        return "0x????".to_string();
    }
    format!(
        "0x{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}
