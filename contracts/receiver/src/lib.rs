#![no_std]

#[cfg(test)]
extern crate std;

use messages::{InboundMessage, NameRecord};
use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, panic_with_error, Address,
    BytesN, Env, IntoVal, String, Symbol,
};

#[derive(Clone)]
#[contractevent(topics = ["message_received"])]
pub struct EvtMessageReceived {
    #[topic]
    pub message_id: BytesN<32>,
    pub source_chain_selector: u64,
    pub name: String,
    pub owner: Address,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[contracterror]
#[repr(u32)]
pub enum ReceiverError {
    NotInitialized = 301,
    InvalidRouter = 302,
    UntrustedSource = 303,
    UntrustedSender = 304,
    InvalidPayload = 305,
}

/// The only origin this receiver accepts updates from.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrustAnchor {
    pub source_chain_selector: u64,
    pub sender: Address,
}

#[derive(Clone)]
#[contracttype]
enum DataKey {
    Router,
    Lookup,
    Anchor,
}

fn read_router(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::Router)
        .unwrap_or_else(|| panic_with_error!(env, ReceiverError::NotInitialized))
}

fn read_lookup(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::Lookup)
        .unwrap_or_else(|| panic_with_error!(env, ReceiverError::NotInitialized))
}

fn read_anchor(env: &Env) -> TrustAnchor {
    env.storage()
        .persistent()
        .get(&DataKey::Anchor)
        .unwrap_or_else(|| panic_with_error!(env, ReceiverError::NotInitialized))
}

fn ensure_trusted(env: &Env, message: &InboundMessage) {
    let anchor = read_anchor(env);
    if message.source_chain_selector != anchor.source_chain_selector {
        panic_with_error!(env, ReceiverError::UntrustedSource);
    }
    if message.sender != anchor.sender {
        panic_with_error!(env, ReceiverError::UntrustedSender);
    }
}

fn set_record(env: &Env, lookup: &Address, name: &String, owner: &Address) {
    env.invoke_contract::<()>(
        lookup,
        &Symbol::new(env, "set_record"),
        (env.current_contract_address(), name, owner).into_val(env),
    );
}

/// Destination-side controller: applies replicated records delivered by the
/// router into the local lookup table.
#[contract]
pub struct Receiver;

#[contractimpl]
impl Receiver {
    /// Runs once, as part of deployment. The trust anchor cannot be changed
    /// afterwards.
    pub fn __constructor(
        env: Env,
        router: Address,
        lookup: Address,
        source_chain_selector: u64,
        sender: Address,
    ) {
        let storage = env.storage().persistent();
        storage.set(&DataKey::Router, &router);
        storage.set(&DataKey::Lookup, &lookup);
        storage.set(
            &DataKey::Anchor,
            &TrustAnchor {
                source_chain_selector,
                sender,
            },
        );
    }

    /// Delivery entry point. Only the configured router can authorize as
    /// `router`; redelivery of the same message leaves the table unchanged.
    pub fn ccip_receive(env: Env, router: Address, message: InboundMessage) {
        router.require_auth();
        if router != read_router(&env) {
            panic_with_error!(&env, ReceiverError::InvalidRouter);
        }
        ensure_trusted(&env, &message);

        let record = NameRecord::decode(&env, &message.data)
            .unwrap_or_else(|| panic_with_error!(&env, ReceiverError::InvalidPayload));
        set_record(&env, &read_lookup(&env), &record.name, &record.owner);

        EvtMessageReceived {
            message_id: message.message_id,
            source_chain_selector: message.source_chain_selector,
            name: record.name,
            owner: record.owner,
        }
        .publish(&env);
    }

    pub fn trust_anchor(env: Env) -> TrustAnchor {
        read_anchor(&env)
    }

    pub fn router(env: Env) -> Address {
        read_router(&env)
    }

    pub fn lookup(env: Env) -> Address {
        read_lookup(&env)
    }
}
