// benches/bench_timing_policy.rs
use adaptive_signal::control_system::{ControllerConfig, TimingPolicy};
use adaptive_signal::shared_data::{Approach, EmergencyRequest, QueueSnapshot};
use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, Criterion, PlotConfiguration,
};
use std::time::Duration;

fn bench_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("timing_policy_decide");

    group.sample_size(100);
    group.measurement_time(Duration::from_secs(5));
    group.warm_up_time(Duration::from_secs(2));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    let timings = ControllerConfig::default()
        .validate()
        .expect("default config is valid");
    let policy = TimingPolicy::new(&timings);

    // Queue depths per approach.
    for &depth in [0u32, 10, 1_000].iter() {
        let queues = QueueSnapshot::new(depth, depth / 2, depth, depth * 2);
        group.bench_function(format!("baseline_{}", depth), |b| {
            b.iter(|| black_box(policy.decide(black_box(&queues), None)));
        });
        let request = Some(EmergencyRequest::new(Approach::East));
        group.bench_function(format!("emergency_{}", depth), |b| {
            b.iter(|| black_box(policy.decide(black_box(&queues), black_box(request))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decide);
criterion_main!(benches);
