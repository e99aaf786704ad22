#![no_std]

#[cfg(test)]
extern crate std;

use messages::{is_zero_account, valid_name, zero_account};
use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, panic_with_error, Address,
    Env, String,
};

#[derive(Clone)]
#[contractevent(topics = ["writer_bound"])]
pub struct EvtWriterBound {
    pub writer: Address,
}

#[derive(Clone)]
#[contractevent(topics = ["record_set"])]
pub struct EvtRecordSet {
    #[topic]
    pub name: String,
    pub owner: Address,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[contracterror]
#[repr(u32)]
pub enum LookupError {
    NotInitialized = 101,
    NotAdmin = 102,
    AlreadyBound = 103,
    Unauthorized = 104,
    InvalidName = 105,
    InvalidOwner = 106,
}

#[derive(Clone)]
#[contracttype]
enum DataKey {
    Admin,
    Writer,
    Record(String),
}

/// Per-chain name table. Exactly one writer, bound once by the admin, may
/// set records; anyone may read them.
#[contract]
pub struct Lookup;

fn read_admin(env: &Env) -> Address {
    env.storage()
        .persistent()
        .get(&DataKey::Admin)
        .unwrap_or_else(|| panic_with_error!(env, LookupError::NotInitialized))
}

fn read_writer(env: &Env) -> Option<Address> {
    env.storage().persistent().get(&DataKey::Writer)
}

fn read_record(env: &Env, name: &String) -> Option<Address> {
    env.storage()
        .persistent()
        .get(&DataKey::Record(name.clone()))
}

#[contractimpl]
impl Lookup {
    /// Runs once, as part of deployment.
    pub fn __constructor(env: Env, admin: Address) {
        env.storage().persistent().set(&DataKey::Admin, &admin);
    }

    /// Bind the single address allowed to call `set_record`. Can only happen once.
    pub fn bind_writer(env: Env, admin: Address, writer: Address) {
        admin.require_auth();
        if read_admin(&env) != admin {
            panic_with_error!(&env, LookupError::NotAdmin);
        }
        if read_writer(&env).is_some() {
            panic_with_error!(&env, LookupError::AlreadyBound);
        }
        env.storage().persistent().set(&DataKey::Writer, &writer);
        EvtWriterBound { writer }.publish(&env);
    }

    pub fn set_record(env: Env, caller: Address, name: String, owner: Address) {
        caller.require_auth();
        match read_writer(&env) {
            Some(writer) if writer == caller => {}
            _ => panic_with_error!(&env, LookupError::Unauthorized),
        }
        if !valid_name(&name) {
            panic_with_error!(&env, LookupError::InvalidName);
        }
        if is_zero_account(&env, &owner) {
            panic_with_error!(&env, LookupError::InvalidOwner);
        }

        env.storage()
            .persistent()
            .set(&DataKey::Record(name.clone()), &owner);
        EvtRecordSet { name, owner }.publish(&env);
    }

    /// Owner of `name`, or the zero account if it was never set.
    pub fn lookup(env: Env, name: String) -> Address {
        read_record(&env, &name).unwrap_or_else(|| zero_account(&env))
    }

    pub fn writer(env: Env) -> Option<Address> {
        read_writer(&env)
    }

    pub fn admin(env: Env) -> Address {
        read_admin(&env)
    }
}
