use criterion::{black_box, criterion_group, criterion_main, Criterion};
use release_trigger::models::{
    Cause, JobInfo, LeftItem, QueueItem, QueueItemId, RunReference, ScheduleAttachment,
};
use release_trigger::orchestration::Continuation;
use release_trigger::registry::{CorrelationRegistry, CorrelationToken};

fn queue_item(token: CorrelationToken) -> QueueItem {
    QueueItem {
        id: QueueItemId(1),
        task: JobInfo::project("deploy"),
        cause: Cause::upstream(RunReference::new("pipeline", 1)),
        attachments: vec![
            ScheduleAttachment::ReleaseMarker,
            ScheduleAttachment::Correlation { token },
        ],
        queued_at: chrono::Utc::now(),
    }
}

fn benchmark_register_claim(c: &mut Criterion) {
    let registry = CorrelationRegistry::new();
    c.bench_function("register_then_claim", |b| {
        b.iter(|| {
            let (continuation, _handle) = Continuation::channel("deploy");
            let token = CorrelationToken::new();
            registry.register(token, continuation);
            black_box(registry.claim(&LeftItem::cancelled(queue_item(token))))
        })
    });
}

fn benchmark_lookup_with_outstanding(c: &mut Criterion) {
    let registry = CorrelationRegistry::new();
    let mut handles = Vec::new();
    for _ in 0..10_000 {
        let (continuation, handle) = Continuation::channel("deploy");
        registry.register(CorrelationToken::new(), continuation);
        handles.push(handle);
    }
    let unrelated = LeftItem::started(queue_item(CorrelationToken::new()));

    c.bench_function("lookup_miss_10k_outstanding", |b| {
        b.iter(|| black_box(registry.lookup(&unrelated)))
    });
}

criterion_group!(benches, benchmark_register_claim, benchmark_lookup_with_outstanding);
criterion_main!(benches);
