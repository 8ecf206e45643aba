use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use hhgap_core::{NeuronConfig, StatusUpdate, TraubNeuron};

fn spiking_neuron(i_e: f64) -> TraubNeuron {
    let mut neuron = TraubNeuron::new(NeuronConfig::default()).expect("bench neuron");
    let bias = StatusUpdate::new().with("I_e", i_e).expect("bias update");
    neuron.set_status(&bias).expect("bias applied");
    neuron
}

fn bench_authoritative(c: &mut Criterion) {
    let mut group = c.benchmark_group("slice_update");
    // 10 ms of model time per iteration
    let slices = 10u64;

    for &i_e in &[0.0, 1500.0] {
        group.throughput(Throughput::Elements(slices * 10));
        group.bench_with_input(BenchmarkId::new("update", i_e as u64), &i_e, |b, &i_e| {
            b.iter_batched(
                || spiking_neuron(i_e),
                |mut neuron| {
                    for s in 0..slices {
                        neuron.update(s * 10, 0, 10).unwrap();
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_relaxation_round(c: &mut Criterion) {
    let mut group = c.benchmark_group("wfr_round");
    let mut neuron = spiking_neuron(1500.0);
    group.bench_function("tentative", |b| {
        b.iter(|| neuron.wfr_update(0, 0, 10).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_authoritative, bench_relaxation_round);
criterion_main!(benches);
