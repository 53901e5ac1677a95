use criterion::{black_box, criterion_group, criterion_main, Criterion};
use jobcheck::{ClassificationService, RawInput, TextNormalizer, TrainingRecord};
use tokio_util::sync::CancellationToken;

const REAL_POSTING: &str = "Senior software engineer to join our platform team. You will design \
    and review services, mentor junior developers and work with product managers. Competitive \
    salary, dental insurance, pension and a learning budget.";

const FAKE_POSTING: &str = "URGENT!!! Earn $5000 weekly from home, no experience needed. Pay a \
    small registration fee upfront and receive guaranteed payments by wire transfer. Contact us \
    on WhatsApp at www.easy-cash.example today!";

fn setup_benchmark_service() -> ClassificationService {
    let service = ClassificationService::builder().build().unwrap();
    let mut records = Vec::new();
    for i in 0..200 {
        records.push(TrainingRecord::new(format!("{} Position {}", REAL_POSTING, i), 0));
        if i % 4 == 0 {
            records.push(TrainingRecord::new(format!("{} Offer {}", FAKE_POSTING, i), 1));
        }
    }
    service.retrain(&records, &CancellationToken::new()).unwrap();
    service
}

fn bench_normalization(c: &mut Criterion) {
    let normalizer = TextNormalizer::new();
    let mut group = c.benchmark_group("Normalization");

    // Configure sampling
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    group.bench_function("short_text", |b| b.iter(|| normalizer.normalize(black_box("Great Job!! Visit http://x.com NOW"))));
    group.bench_function("posting", |b| b.iter(|| normalizer.normalize(black_box(FAKE_POSTING))));

    let long = [REAL_POSTING; 20].join("\n\n");
    group.bench_function("long_text", |b| b.iter(|| normalizer.normalize(black_box(&long))));

    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let service = setup_benchmark_service();
    let mut group = c.benchmark_group("Classification");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    let real = RawInput::text(REAL_POSTING);
    let fake = RawInput::text(FAKE_POSTING);
    let short = RawInput::text("short");

    group.bench_function("real_posting", |b| b.iter(|| service.classify(black_box(&real)).unwrap()));
    group.bench_function("fake_posting", |b| b.iter(|| service.classify(black_box(&fake)).unwrap()));
    group.bench_function("short_input", |b| b.iter(|| service.classify(black_box(&short)).unwrap()));

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("Training");
    group.sample_size(10);

    group.bench_function("retrain_250_records", |b| b.iter(setup_benchmark_service));

    group.finish();
}

criterion_group!(benches, bench_normalization, bench_classification, bench_training);
criterion_main!(benches);
