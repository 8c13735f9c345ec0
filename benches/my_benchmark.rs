use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::{rngs::StdRng, SeedableRng};

use comprxn::compartment::{Compartment, Extent};
use comprxn::connection::Connection;
use comprxn::gillespie::{build_processes, Engine};
use comprxn::model::Model;
use comprxn::reaction::Reaction;
use comprxn::species::Species;
use comprxn::state::State;
use comprxn::units::Quantity;

const SEED: u64 = 0x123456789abcdef;

fn birth_death_network() -> (Vec<comprxn::gillespie::Process>, Vec<i64>) {
    let mut model = Model::new();
    let mut main = Compartment::new("main", Extent::Linear { x: (0.0, 1.0) }, None);
    let birth = Reaction::new(
        "birth",
        vec![],
        vec![],
        vec![Species::new("A")],
        vec![1],
        Quantity::rate_per_second(50.0, 0),
        Quantity::rate_per_second(0.0, 1),
    )
    .unwrap();
    let death = Reaction::new(
        "death",
        vec![Species::new("A")],
        vec![1],
        vec![],
        vec![],
        Quantity::rate_per_second(1.0, 1),
        Quantity::rate_per_second(0.0, 0),
    )
    .unwrap();
    main.add_reaction(birth).unwrap();
    main.add_reaction(death).unwrap();
    main.connect("other", Connection::isotropic_scalar("A", 0.1), false);

    let mut other = Compartment::new("other", Extent::Linear { x: (1.0, 2.0) }, None);
    other.connect("main", Connection::isotropic_scalar("A", 0.1), false);

    model.add_compartment(main).unwrap();
    model.add_compartment(other).unwrap();
    let flat = model.flatten().unwrap();
    let state = State::from_flat_model(&flat);
    let processes = build_processes(&flat, &state).unwrap();
    (processes, vec![0; state.size()])
}

fn criterion_benchmark(c: &mut Criterion) {
    let (processes, initial_state) = birth_death_network();

    c.bench_function("gillespie birth-death, 100 time units", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(black_box(SEED));
            let mut engine = Engine::new(processes.clone(), initial_state.clone());
            engine.advance(black_box(100.0), &mut rng);
        })
    });
}

criterion_group! {
    name = benches; config = Criterion::default().sample_size(20); targets = criterion_benchmark
}
criterion_main!(benches);
