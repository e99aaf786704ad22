#![no_std]

#[cfg(test)]
extern crate std;

use messages::{is_zero_account, valid_name, NameRecord, OutboundMessage};
use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, panic_with_error,
    token::TokenClient, xdr::ScErrorType, Address, BytesN, Env, Error, IntoVal, String, Symbol,
    Vec,
};

/// Reported when a router call aborted without a contract error.
const UNKNOWN_FAILURE: u32 = 0;

#[derive(Clone)]
#[contracttype]
enum DataKey {
    Owner,
    PendingOwner,
    Router,
    Lookup,
    FeeToken,
    Chain(u64),
    Selectors,
}

/// Admission record for one destination chain.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainEntry {
    pub enabled: bool,
    pub receiver: Address,
    pub gas_limit: u64,
}

/// Outcome of one replication attempt.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Dispatch {
    Sent(BytesN<32>),
    /// Carries the quoted fee that the remaining allowance could not cover.
    InsufficientFee(i128),
    /// Carries the contract error code the send failed with. Each contract in
    /// this workspace owns a range (lookup 1xx, register 2xx, receiver 3xx,
    /// simulator 4xx) so the code names its origin. 0 means the call aborted
    /// without a contract error.
    Rejected(u32),
    /// The router quoted a negative fee.
    InvalidQuote(i128),
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Replication {
    pub chain_selector: u64,
    pub dispatch: Dispatch,
}

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum RegisterError {
    NotInitialized = 201,
    NotOwner = 202,
    InvalidReceiver = 203,
    InvalidName = 204,
    InvalidFee = 205,
    UnknownChain = 206,
    NoPendingOwner = 207,
    NotPendingOwner = 208,
}

#[derive(Clone)]
#[contractevent(topics = ["chain_enabled"])]
pub struct EvtChainEnabled {
    #[topic]
    pub chain_selector: u64,
    pub receiver: Address,
    pub gas_limit: u64,
}

#[derive(Clone)]
#[contractevent(topics = ["chain_disabled"])]
pub struct EvtChainDisabled {
    #[topic]
    pub chain_selector: u64,
}

#[derive(Clone)]
#[contractevent(topics = ["name_registered"])]
pub struct EvtNameRegistered {
    #[topic]
    pub name: String,
    pub owner: Address,
}

#[derive(Clone)]
#[contractevent(topics = ["message_sent"])]
pub struct EvtMessageSent {
    #[topic]
    pub chain_selector: u64,
    pub message_id: BytesN<32>,
    pub fee: i128,
}

#[derive(Clone)]
#[contractevent(topics = ["replication_failed"])]
pub struct EvtReplicationFailed {
    #[topic]
    pub chain_selector: u64,
    pub reason: Dispatch,
}

#[derive(Clone)]
#[contractevent(topics = ["ownership_transfer_requested"])]
pub struct EvtOwnershipTransferRequested {
    #[topic]
    pub from: Address,
    pub to: Address,
}

#[derive(Clone)]
#[contractevent(topics = ["ownership_transferred"])]
pub struct EvtOwnershipTransferred {
    #[topic]
    pub from: Address,
    pub to: Address,
}

fn read_owner(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::Owner)
        .unwrap_or_else(|| panic_with_error!(env, RegisterError::NotInitialized))
}

fn read_router(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::Router)
        .unwrap_or_else(|| panic_with_error!(env, RegisterError::NotInitialized))
}

fn read_lookup(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::Lookup)
        .unwrap_or_else(|| panic_with_error!(env, RegisterError::NotInitialized))
}

fn read_fee_token(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::FeeToken)
        .unwrap_or_else(|| panic_with_error!(env, RegisterError::NotInitialized))
}

fn read_chain(env: &Env, chain_selector: u64) -> Option<ChainEntry> {
    env.storage()
        .persistent()
        .get(&DataKey::Chain(chain_selector))
}

fn write_chain(env: &Env, chain_selector: u64, entry: &ChainEntry) {
    env.storage()
        .persistent()
        .set(&DataKey::Chain(chain_selector), entry);
}

fn read_selectors(env: &Env) -> Vec<u64> {
    env.storage()
        .persistent()
        .get(&DataKey::Selectors)
        .unwrap_or_else(|| Vec::new(env))
}

fn ensure_owner(env: &Env, caller: &Address) {
    if read_owner(env) != *caller {
        panic_with_error!(env, RegisterError::NotOwner);
    }
}

mod lookup_api {
    use super::*;

    pub fn set_record(
        env: &Env,
        lookup: &Address,
        writer: &Address,
        name: &String,
        owner: &Address,
    ) {
        env.invoke_contract::<()>(
            lookup,
            &Symbol::new(env, "set_record"),
            (writer, name, owner).into_val(env),
        );
    }
}

/// Calls into whichever router was wired at deployment. Failures come back as
/// an error code so one destination cannot abort the others.
mod router_api {
    use super::*;

    fn code(err: Error) -> u32 {
        if err.is_type(ScErrorType::Contract) {
            err.get_code()
        } else {
            UNKNOWN_FAILURE
        }
    }

    pub fn get_fee(
        env: &Env,
        router: &Address,
        chain_selector: u64,
        message: &OutboundMessage,
    ) -> Result<i128, u32> {
        let args = (chain_selector, message.clone()).into_val(env);
        match env.try_invoke_contract::<i128, Error>(router, &Symbol::new(env, "get_fee"), args) {
            Ok(Ok(fee)) => Ok(fee),
            Err(Ok(err)) => Err(code(err)),
            _ => Err(UNKNOWN_FAILURE),
        }
    }

    pub fn ccip_send(
        env: &Env,
        router: &Address,
        sender: &Address,
        chain_selector: u64,
        message: &OutboundMessage,
        fee_paid: i128,
    ) -> Result<BytesN<32>, u32> {
        let args = (sender.clone(), chain_selector, message.clone(), fee_paid).into_val(env);
        match env.try_invoke_contract::<BytesN<32>, Error>(
            router,
            &Symbol::new(env, "ccip_send"),
            args,
        ) {
            Ok(Ok(message_id)) => Ok(message_id),
            Err(Ok(err)) => Err(code(err)),
            _ => Err(UNKNOWN_FAILURE),
        }
    }
}

/// Quote, collect the fee from `payer`, then send. The fee is held by this
/// contract while the router runs; it goes to the router if the send is
/// accepted and back to `payer` otherwise. Only a successful send consumes
/// allowance.
fn dispatch(
    env: &Env,
    router: &Address,
    token: &TokenClient,
    payer: &Address,
    chain_selector: u64,
    message: &OutboundMessage,
    remaining: &mut i128,
) -> Dispatch {
    let fee = match router_api::get_fee(env, router, chain_selector, message) {
        Ok(fee) => fee,
        Err(code) => return Dispatch::Rejected(code),
    };
    if fee < 0 {
        return Dispatch::InvalidQuote(fee);
    }
    if fee > *remaining || (fee > 0 && token.balance(payer) < fee) {
        return Dispatch::InsufficientFee(fee);
    }

    let this = env.current_contract_address();
    if fee > 0 {
        token.transfer(payer, &this, &fee);
    }
    match router_api::ccip_send(env, router, &this, chain_selector, message, fee) {
        Ok(message_id) => {
            if fee > 0 {
                token.transfer(&this, router, &fee);
            }
            *remaining -= fee;
            EvtMessageSent {
                chain_selector,
                message_id: message_id.clone(),
                fee,
            }
            .publish(env);
            Dispatch::Sent(message_id)
        }
        Err(code) => {
            if fee > 0 {
                token.transfer(&this, payer, &fee);
            }
            Dispatch::Rejected(code)
        }
    }
}

/// Source-side controller: records names locally and replicates them to every
/// enabled destination chain.
#[contract]
pub struct Register;

#[contractimpl]
impl Register {
    /// Runs once, as part of deployment. Replication fees are paid in
    /// `fee_token`.
    pub fn __constructor(
        env: Env,
        owner: Address,
        router: Address,
        lookup: Address,
        fee_token: Address,
    ) {
        let storage = env.storage().persistent();
        storage.set(&DataKey::Owner, &owner);
        storage.set(&DataKey::Router, &router);
        storage.set(&DataKey::Lookup, &lookup);
        storage.set(&DataKey::FeeToken, &fee_token);
    }

    /// Insert or replace the entry for `chain_selector` and mark it enabled.
    pub fn enable_chain(
        env: Env,
        caller: Address,
        chain_selector: u64,
        receiver: Address,
        gas_limit: u64,
    ) {
        caller.require_auth();
        ensure_owner(&env, &caller);
        if is_zero_account(&env, &receiver) {
            panic_with_error!(&env, RegisterError::InvalidReceiver);
        }

        if read_chain(&env, chain_selector).is_none() {
            let mut selectors = read_selectors(&env);
            selectors.push_back(chain_selector);
            env.storage()
                .persistent()
                .set(&DataKey::Selectors, &selectors);
        }
        let entry = ChainEntry {
            enabled: true,
            receiver: receiver.clone(),
            gas_limit,
        };
        write_chain(&env, chain_selector, &entry);

        EvtChainEnabled {
            chain_selector,
            receiver,
            gas_limit,
        }
        .publish(&env);
    }

    pub fn disable_chain(env: Env, caller: Address, chain_selector: u64) {
        caller.require_auth();
        ensure_owner(&env, &caller);
        let mut entry = read_chain(&env, chain_selector)
            .unwrap_or_else(|| panic_with_error!(&env, RegisterError::UnknownChain));
        entry.enabled = false;
        write_chain(&env, chain_selector, &entry);

        EvtChainDisabled { chain_selector }.publish(&env);
    }

    /// Record `caller` as the owner of `name` locally, then replicate to each
    /// enabled chain. Each send is paid from `caller`'s fee token balance, up
    /// to `fee_allowance` in total. The local write stands whatever happens to
    /// the sends; the returned list says which destinations were reached.
    pub fn register(
        env: Env,
        caller: Address,
        name: String,
        fee_allowance: i128,
    ) -> Vec<Replication> {
        caller.require_auth();
        if !valid_name(&name) {
            panic_with_error!(&env, RegisterError::InvalidName);
        }
        if fee_allowance < 0 {
            panic_with_error!(&env, RegisterError::InvalidFee);
        }
        let lookup = read_lookup(&env);
        let router = read_router(&env);
        let token = TokenClient::new(&env, &read_fee_token(&env));

        let writer = env.current_contract_address();
        lookup_api::set_record(&env, &lookup, &writer, &name, &caller);
        EvtNameRegistered {
            name: name.clone(),
            owner: caller.clone(),
        }
        .publish(&env);

        let data = NameRecord {
            name,
            owner: caller.clone(),
        }
        .encode(&env);
        let mut remaining = fee_allowance;
        let mut replications = Vec::new(&env);

        for chain_selector in read_selectors(&env).iter() {
            let entry = match read_chain(&env, chain_selector) {
                Some(entry) if entry.enabled => entry,
                _ => continue,
            };
            let message = OutboundMessage {
                receiver: entry.receiver,
                data: data.clone(),
                gas_limit: entry.gas_limit,
            };

            let outcome = dispatch(
                &env,
                &router,
                &token,
                &caller,
                chain_selector,
                &message,
                &mut remaining,
            );
            if !matches!(outcome, Dispatch::Sent(_)) {
                EvtReplicationFailed {
                    chain_selector,
                    reason: outcome.clone(),
                }
                .publish(&env);
            }
            replications.push_back(Replication {
                chain_selector,
                dispatch: outcome,
            });
        }

        replications
    }

    /// Start a two-step ownership handover.
    pub fn transfer_ownership(env: Env, caller: Address, new_owner: Address) {
        caller.require_auth();
        ensure_owner(&env, &caller);
        env.storage()
            .persistent()
            .set(&DataKey::PendingOwner, &new_owner);
        EvtOwnershipTransferRequested {
            from: caller,
            to: new_owner,
        }
        .publish(&env);
    }

    pub fn accept_ownership(env: Env, new_owner: Address) {
        new_owner.require_auth();
        let storage = env.storage().persistent();
        let pending: Address = storage
            .get(&DataKey::PendingOwner)
            .unwrap_or_else(|| panic_with_error!(&env, RegisterError::NoPendingOwner));
        if pending != new_owner {
            panic_with_error!(&env, RegisterError::NotPendingOwner);
        }
        let previous = read_owner(&env);
        storage.set(&DataKey::Owner, &new_owner);
        storage.remove(&DataKey::PendingOwner);
        EvtOwnershipTransferred {
            from: previous,
            to: new_owner,
        }
        .publish(&env);
    }

    pub fn owner(env: Env) -> Address {
        read_owner(&env)
    }

    pub fn chain(env: Env, chain_selector: u64) -> Option<ChainEntry> {
        read_chain(&env, chain_selector)
    }

    /// Every selector ever enabled, in first-enable order.
    pub fn chains(env: Env) -> Vec<u64> {
        read_selectors(&env)
    }

    pub fn router(env: Env) -> Address {
        read_router(&env)
    }

    pub fn lookup(env: Env) -> Address {
        read_lookup(&env)
    }

    pub fn fee_token(env: Env) -> Address {
        read_fee_token(&env)
    }
}
