#![no_std]

//! Same-process router for local testing. `ccip_send` delivers to the
//! receiver before it returns and every quote is zero, so nothing here models
//! latency, reordering, partial delivery or a fee market.

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod e2e;

use messages::{InboundMessage, OutboundMessage};
use soroban_sdk::xdr::ToXdr;
use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, panic_with_error, Address,
    Bytes, BytesN, Env, IntoVal, Symbol,
};

/// Selector the simulator reports for the single chain it routes on.
pub const CHAIN_SELECTOR: u64 = 16_015_286_601_757_825_753;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum SimulatorError {
    UnsupportedDestination = 401,
    FeeTooLow = 402,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SimulatorConfig {
    pub source_router: Address,
    pub destination_router: Address,
    pub chain_selector: u64,
}

#[derive(Clone)]
#[contractevent(topics = ["message_routed"])]
pub struct EvtMessageRouted {
    #[topic]
    pub message_id: BytesN<32>,
    pub destination_chain_selector: u64,
    pub sender: Address,
    pub receiver: Address,
}

#[derive(Clone)]
#[contracttype]
enum DataKey {
    Sequence,
}

fn read_sequence(env: &Env) -> u64 {
    env.storage()
        .persistent()
        .get(&DataKey::Sequence)
        .unwrap_or(0)
}

fn ensure_supported(env: &Env, chain_selector: u64) {
    if chain_selector != CHAIN_SELECTOR {
        panic_with_error!(env, SimulatorError::UnsupportedDestination);
    }
}

fn message_id(
    env: &Env,
    sequence: u64,
    destination_chain_selector: u64,
    sender: &Address,
    message: &OutboundMessage,
) -> BytesN<32> {
    let mut data = Bytes::from_array(env, &sequence.to_be_bytes());
    data.extend_from_array(&destination_chain_selector.to_be_bytes());
    data.append(&sender.clone().to_xdr(env));
    data.append(&message.data);
    env.crypto().sha256(&data).to_bytes()
}

mod receiver_api {
    use super::*;

    pub fn ccip_receive(env: &Env, receiver: &Address, message: &InboundMessage) {
        env.invoke_contract::<()>(
            receiver,
            &Symbol::new(env, "ccip_receive"),
            (env.current_contract_address(), message.clone()).into_val(env),
        );
    }
}

#[contract]
pub struct LocalSimulator;

#[contractimpl]
impl LocalSimulator {
    /// Router addresses and chain selector to wire senders and receivers to.
    /// Both routers are this contract.
    pub fn configuration(env: Env) -> SimulatorConfig {
        let router = env.current_contract_address();
        SimulatorConfig {
            source_router: router.clone(),
            destination_router: router,
            chain_selector: CHAIN_SELECTOR,
        }
    }

    pub fn is_chain_supported(_env: Env, chain_selector: u64) -> bool {
        chain_selector == CHAIN_SELECTOR
    }

    pub fn get_fee(env: Env, destination_chain_selector: u64, _message: OutboundMessage) -> i128 {
        ensure_supported(&env, destination_chain_selector);
        0
    }

    /// Route `message` and deliver it to `message.receiver` synchronously. A
    /// failing receiver fails the send.
    pub fn ccip_send(
        env: Env,
        sender: Address,
        destination_chain_selector: u64,
        message: OutboundMessage,
        fee_paid: i128,
    ) -> BytesN<32> {
        sender.require_auth();
        let fee = Self::get_fee(env.clone(), destination_chain_selector, message.clone());
        if fee_paid < fee {
            panic_with_error!(&env, SimulatorError::FeeTooLow);
        }

        let sequence = read_sequence(&env);
        let id = message_id(&env, sequence, destination_chain_selector, &sender, &message);
        env.storage()
            .persistent()
            .set(&DataKey::Sequence, &(sequence + 1));

        let inbound = InboundMessage {
            message_id: id.clone(),
            source_chain_selector: CHAIN_SELECTOR,
            sender: sender.clone(),
            data: message.data,
        };
        receiver_api::ccip_receive(&env, &message.receiver, &inbound);

        EvtMessageRouted {
            message_id: id.clone(),
            destination_chain_selector,
            sender,
            receiver: message.receiver,
        }
        .publish(&env);
        id
    }

    /// Number of messages routed so far.
    pub fn sequence(env: Env) -> u64 {
        read_sequence(&env)
    }
}
