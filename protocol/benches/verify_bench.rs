// Verification hot-path benchmarks.
//
// Every participant runs these on every proposal it sees: the contract, the
// canonical encoding behind the transaction id, and the signature set check.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use accord_protocol::contract;
use accord_protocol::crypto::PartyKeypair;
use accord_protocol::identity::Party;
use accord_protocol::state::{CarState, LedgerState, StateData};
use accord_protocol::transaction::{
    codec, Command, CommandKind, SignedTransaction, TransactionBuilder, TransactionProposal,
};

fn fixture() -> (Vec<PartyKeypair>, TransactionProposal) {
    let keys: Vec<PartyKeypair> = (1..=4u8).map(|i| PartyKeypair::from_seed(&[i; 32])).collect();
    let party = |i: usize, name: &str| Party::new(name, keys[i].public_key());
    let car = CarState {
        owning_bank: party(0, "O=Bank,L=London,C=GB"),
        holding_dealer: party(1, "O=Dealer,L=Busan,C=KR"),
        manufacturer: party(2, "O=Maker,L=Ulsan,C=KR"),
        vin: "KMHD841CBLU123456".into(),
        license_plate_number: "ABC1234".into(),
        make: "Hanul".into(),
        model: "Aurora".into(),
        dealership_location: "Busan".into(),
    };
    let output = LedgerState::issue(StateData::Car(car), None);
    let command = Command::for_parties(CommandKind::Issue, output.participants());
    let proposal = TransactionBuilder::new()
        .notary(party(3, "O=Notary,L=Zurich,C=CH"))
        .add_output_state(output)
        .add_command(command)
        .build()
        .expect("fixture builds");
    (keys, proposal)
}

fn bench_contract_verify(c: &mut Criterion) {
    let (_, proposal) = fixture();
    c.bench_function("contract/verify_issue", |b| {
        b.iter(|| contract::verify(&proposal));
    });
}

fn bench_transaction_id(c: &mut Criterion) {
    let (_, proposal) = fixture();
    let mut group = c.benchmark_group("transaction/id");
    group.throughput(Throughput::Bytes(proposal.canonical_bytes().len() as u64));
    group.bench_function("canonical_bytes", |b| b.iter(|| proposal.canonical_bytes()));
    group.bench_function("double_sha256", |b| b.iter(|| proposal.id()));
    group.finish();
}

fn bench_signature_set(c: &mut Criterion) {
    let (keys, proposal) = fixture();
    let mut group = c.benchmark_group("transaction/verify_required_signatures");

    for signers in [1usize, 2, 3] {
        let mut signed = SignedTransaction::new(proposal.clone());
        let payload = proposal.canonical_bytes();
        for kp in keys.iter().take(signers) {
            signed
                .add_signature(kp.public_key(), kp.sign(&payload))
                .expect("required signer");
        }
        group.bench_with_input(BenchmarkId::from_parameter(signers), &signed, |b, tx| {
            b.iter(|| tx.verify_required_signatures().is_ok());
        });
    }
    group.finish();
}

fn bench_wire_codec(c: &mut Criterion) {
    let (keys, proposal) = fixture();
    let signed = SignedTransaction::sign_with(proposal, &keys[0]);
    let frame = codec::encode(&signed).expect("encodes");

    c.bench_function("codec/encode_signed", |b| b.iter(|| codec::encode(&signed)));
    c.bench_function("codec/decode_signed", |b| {
        b.iter(|| codec::decode::<SignedTransaction>(&frame))
    });
}

criterion_group!(
    benches,
    bench_contract_verify,
    bench_transaction_id,
    bench_signature_set,
    bench_wire_codec,
);
criterion_main!(benches);
