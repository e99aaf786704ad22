//! Full relay: a register on the source side, a receiver on the destination
//! side, each with its own lookup table, joined by the simulator.

use super::{LocalSimulator, LocalSimulatorClient, CHAIN_SELECTOR};
use lookup::{Lookup, LookupArgs, LookupClient};
use messages::{zero_account, InboundMessage, NameRecord};
use receiver::{Receiver, ReceiverArgs, ReceiverClient, ReceiverError};
use register::{Dispatch, Register, RegisterArgs, RegisterClient};
use soroban_sdk::{
    testutils::{Address as _, MockAuth, MockAuthInvoke},
    Address, BytesN, Env, Error, IntoVal, String,
};

const GAS_LIMIT: u64 = 500_000;

struct Deployment {
    env: Env,
    admin: Address,
    simulator_id: Address,
    register_id: Address,
    receiver_id: Address,
    source_lookup_id: Address,
    destination_lookup_id: Address,
}

impl Deployment {
    fn register(&self) -> RegisterClient<'_> {
        RegisterClient::new(&self.env, &self.register_id)
    }

    fn source_lookup(&self) -> LookupClient<'_> {
        LookupClient::new(&self.env, &self.source_lookup_id)
    }

    fn destination_lookup(&self) -> LookupClient<'_> {
        LookupClient::new(&self.env, &self.destination_lookup_id)
    }

    fn name(&self, text: &str) -> String {
        String::from_str(&self.env, text)
    }
}

/// Receiver trust anchor overrides. `None` fields fall back to the deployed
/// register on the simulator's chain.
#[derive(Default)]
struct Anchor {
    source_chain_selector: Option<u64>,
    sender: Option<Address>,
}

/// Deploys and wires every contract.
fn deploy_with(env: Env, anchor: Anchor) -> Deployment {
    let simulator_id = env.register(LocalSimulator, ());
    let config = LocalSimulatorClient::new(&env, &simulator_id).configuration();
    let admin = Address::generate(&env);
    let fee_token = env
        .register_stellar_asset_contract_v2(Address::generate(&env))
        .address();

    let source_lookup_id = env.register(Lookup, LookupArgs::__constructor(&admin));
    let register_id = env.register(
        Register,
        RegisterArgs::__constructor(
            &admin,
            &config.source_router,
            &source_lookup_id,
            &fee_token,
        ),
    );

    let destination_lookup_id = env.register(Lookup, LookupArgs::__constructor(&admin));
    let anchor_chain = anchor
        .source_chain_selector
        .unwrap_or(config.chain_selector);
    let anchor_sender = anchor.sender.unwrap_or_else(|| register_id.clone());
    let receiver_id = env.register(
        Receiver,
        ReceiverArgs::__constructor(
            &config.destination_router,
            &destination_lookup_id,
            &anchor_chain,
            &anchor_sender,
        ),
    );

    let deployment = Deployment {
        env,
        admin,
        simulator_id,
        register_id,
        receiver_id,
        source_lookup_id,
        destination_lookup_id,
    };
    deployment.env.mock_all_auths();
    deployment.register().enable_chain(
        &deployment.admin,
        &config.chain_selector,
        &deployment.receiver_id,
        &GAS_LIMIT,
    );
    deployment
        .source_lookup()
        .bind_writer(&deployment.admin, &deployment.register_id);
    deployment
        .destination_lookup()
        .bind_writer(&deployment.admin, &deployment.receiver_id);
    deployment
}

fn deploy() -> Deployment {
    deploy_with(Env::default(), Anchor::default())
}

#[test]
fn alice_resolves_on_both_chains() {
    let d = deploy();
    let alice = Address::generate(&d.env);
    let name = d.name("alice.ccns");

    let replications = d.register().register(&alice, &name, &0);

    assert_eq!(d.source_lookup().lookup(&name), alice);
    assert_eq!(d.destination_lookup().lookup(&name), alice);
    assert_eq!(replications.len(), 1);
    let replication = replications.get(0).unwrap();
    assert_eq!(replication.chain_selector, CHAIN_SELECTOR);
    assert!(matches!(replication.dispatch, Dispatch::Sent(_)));
    assert_eq!(LocalSimulatorClient::new(&d.env, &d.simulator_id).sequence(), 1);
}

#[test]
fn later_registration_overwrites_owner_everywhere() {
    let d = deploy();
    let alice = Address::generate(&d.env);
    let bob = Address::generate(&d.env);
    let name = d.name("alice.ccns");

    d.register().register(&alice, &name, &0);
    d.register().register(&bob, &name, &0);

    assert_eq!(d.source_lookup().lookup(&name), bob);
    assert_eq!(d.destination_lookup().lookup(&name), bob);
}

#[test]
fn unregistered_name_resolves_to_zero_on_both_chains() {
    let d = deploy();
    let alice = Address::generate(&d.env);
    d.register().register(&alice, &d.name("alice.ccns"), &0);

    let unknown = d.name("nobody.ccns");
    assert_eq!(d.source_lookup().lookup(&unknown), zero_account(&d.env));
    assert_eq!(d.destination_lookup().lookup(&unknown), zero_account(&d.env));
}

#[test]
fn disabled_chain_receives_nothing() {
    let d = deploy();
    let alice = Address::generate(&d.env);
    let name = d.name("alice.ccns");

    d.register().disable_chain(&d.admin, &CHAIN_SELECTOR);
    let replications = d.register().register(&alice, &name, &0);

    assert_eq!(replications.len(), 0);
    assert_eq!(d.source_lookup().lookup(&name), alice);
    assert_eq!(d.destination_lookup().lookup(&name), zero_account(&d.env));
    assert_eq!(LocalSimulatorClient::new(&d.env, &d.simulator_id).sequence(), 0);
}

#[test]
fn untrusted_register_is_rejected_but_local_write_stands() {
    let env = Env::default();
    let someone_else = Address::generate(&env);
    let anchor = Anchor {
        sender: Some(someone_else),
        ..Anchor::default()
    };
    let d = deploy_with(env, anchor);
    let alice = Address::generate(&d.env);
    let name = d.name("alice.ccns");

    let replications = d.register().register(&alice, &name, &0);

    assert_eq!(
        replications.get(0).unwrap().dispatch,
        Dispatch::Rejected(ReceiverError::UntrustedSender as u32)
    );
    assert_eq!(d.source_lookup().lookup(&name), alice);
    assert_eq!(d.destination_lookup().lookup(&name), zero_account(&d.env));
    assert_eq!(LocalSimulatorClient::new(&d.env, &d.simulator_id).sequence(), 0);
}

#[test]
fn receiver_anchored_to_another_chain_rejects_source() {
    let anchor = Anchor {
        source_chain_selector: Some(CHAIN_SELECTOR + 1),
        ..Anchor::default()
    };
    let d = deploy_with(Env::default(), anchor);
    let alice = Address::generate(&d.env);
    let name = d.name("alice.ccns");

    let replications = d.register().register(&alice, &name, &0);

    assert_eq!(
        replications.get(0).unwrap().dispatch,
        Dispatch::Rejected(ReceiverError::UntrustedSource as u32)
    );
    assert_eq!(d.source_lookup().lookup(&name), alice);
    assert_eq!(d.destination_lookup().lookup(&name), zero_account(&d.env));
}

#[test]
fn receiver_ignores_direct_calls_that_bypass_router() {
    let d = deploy();
    let mallory = Address::generate(&d.env);
    let name = d.name("alice.ccns");
    let forged = InboundMessage {
        message_id: BytesN::from_array(&d.env, &[9u8; 32]),
        source_chain_selector: CHAIN_SELECTOR,
        sender: d.register_id.clone(),
        data: NameRecord {
            name: name.clone(),
            owner: mallory.clone(),
        }
        .encode(&d.env),
    };

    let receiver = ReceiverClient::new(&d.env, &d.receiver_id);
    let attempt = receiver.try_ccip_receive(&mallory, &forged);
    assert_eq!(attempt, Err(Ok(Error::from(ReceiverError::InvalidRouter))));
    assert_eq!(d.destination_lookup().lookup(&name), zero_account(&d.env));
}

#[test]
fn only_register_can_write_source_table() {
    let d = deploy();
    let mallory = Address::generate(&d.env);
    let name = d.name("alice.ccns");

    let attempt = d.source_lookup().try_set_record(&mallory, &name, &mallory);
    assert!(attempt.is_err());
    assert_eq!(d.source_lookup().lookup(&name), zero_account(&d.env));
}

#[test]
fn relay_needs_only_the_registrants_signature() {
    let d = deploy();
    let alice = Address::generate(&d.env);
    let name = d.name("alice.ccns");

    // Every nested call is made by the contract being authorized, so alice's
    // entry for the root invocation is the only one supplied.
    d.register()
        .mock_auths(&[MockAuth {
            address: &alice,
            invoke: &MockAuthInvoke {
                contract: &d.register_id,
                fn_name: "register",
                args: (&alice, &name, &0i128).into_val(&d.env),
                sub_invokes: &[],
            },
        }])
        .register(&alice, &name, &0);

    assert_eq!(d.source_lookup().lookup(&name), alice);
    assert_eq!(d.destination_lookup().lookup(&name), alice);
}
