#![no_std]

//! Wire types shared by the name-service contracts and any router that relays
//! between them.

#[cfg(test)]
extern crate std;

use soroban_sdk::xdr::{FromXdr, ToXdr};
use soroban_sdk::{contracttype, Address, Bytes, BytesN, Env, String};

/// Account that stands for "no owner". Lookups of unknown names resolve to it.
pub const ZERO_ACCOUNT_STR: &str = "GAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAWHF";
pub const MAX_NAME_LEN: u32 = 256;

/// Replication payload carried in `OutboundMessage::data`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NameRecord {
    pub name: String,
    pub owner: Address,
}

/// Message handed to a router's `ccip_send`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutboundMessage {
    pub receiver: Address,
    pub data: Bytes,
    pub gas_limit: u64,
}

/// Message a router delivers to a receiver's `ccip_receive`. `sender` and
/// `source_chain_selector` are attested by the router.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InboundMessage {
    pub message_id: BytesN<32>,
    pub source_chain_selector: u64,
    pub sender: Address,
    pub data: Bytes,
}

impl NameRecord {
    pub fn encode(&self, env: &Env) -> Bytes {
        self.clone().to_xdr(env)
    }

    /// Returns `None` when `data` is valid XDR of some other shape.
    pub fn decode(env: &Env, data: &Bytes) -> Option<Self> {
        Self::from_xdr(env, data).ok()
    }
}

pub fn zero_account(env: &Env) -> Address {
    Address::from_str(env, ZERO_ACCOUNT_STR)
}

pub fn is_zero_account(env: &Env, address: &Address) -> bool {
    *address == zero_account(env)
}

pub fn valid_name(name: &String) -> bool {
    let len = name.len();
    len > 0 && len <= MAX_NAME_LEN
}
