//! Criterion benchmarks for the planning stages.
//!
//! Uses synthetic portfolios drawn from a seeded RNG so runs are comparable.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use u_capital::config::CityProfile;
use u_capital::equity::EquityConfig;
use u_capital::governance::{GovernanceAllocator, GovernanceConfig};
use u_capital::ledger::{shared, ResourceLedger, ResourceType};
use u_capital::scheduling::{SchedulerConfig, SchedulingEngine, SchedulingJob, SchedulingRequest};
use u_capital::scoring::{
    BenefitNormalizer, CandidateRequest, CrewRequirement, IssueSignal, MandateTier,
    NormalizerConfig, SafetyTier, Scorer, ScoringConfig,
};

const CREWS: [&str; 4] = ["water_crew", "electrical_crew", "construction_crew", "general_crew"];

// ===========================================================================
// Synthetic inputs
// ===========================================================================

fn requests(n: usize, seed: u64) -> Vec<CandidateRequest> {
    let mut rng = StdRng::seed_from_u64(seed);
    let safety = [SafetyTier::None, SafetyTier::Moderate, SafetyTier::Severe, SafetyTier::Critical];
    let mandate = [MandateTier::None, MandateTier::Advisory, MandateTier::Required, MandateTier::CourtOrdered];
    (0..n as u64)
        .map(|id| {
            let signal = IssueSignal {
                issue_id: id,
                district_id: Some(rng.random_range(1..=6)),
                population_affected: rng.random_range(100..200_000),
                complaint_count: rng.random_range(0..500),
                safety_tier: safety[rng.random_range(0..4)],
                mandate_tier: mandate[rng.random_range(0..4)],
                estimated_cost: rng.random_range(200_000.0..15_000_000.0),
                urgency_days: rng.random_range(0..180),
            };
            CandidateRequest::new(
                id + 1,
                format!("project {id}"),
                signal,
                rng.random_range(0.3..1.0),
                CrewRequirement {
                    resource_type: ResourceType::new(CREWS[rng.random_range(0..4)]),
                    crew_size: rng.random_range(1..=2),
                    duration_weeks: rng.random_range(1..=4),
                },
            )
        })
        .collect()
}

fn jobs(n: usize, types: usize, seed: u64) -> Vec<SchedulingJob> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n as u64)
        .map(|id| SchedulingJob {
            project_id: id + 1,
            decision_id: id + 1,
            resource_type: ResourceType::new(CREWS[rng.random_range(0..types)]),
            crew_size: rng.random_range(1..=2),
            duration_weeks: rng.random_range(1..=3),
            deadline_week: rng.random_range(2..=12),
            priority_rank: id as u32 + 1,
            urgency_score: rng.random_range(0.1..1.0),
            requires_confirmation: rng.random_bool(0.2),
        })
        .collect()
}

fn city_ledger() -> ResourceLedger {
    CityProfile::default().seed_ledger(ResourceLedger::new(), 2025, 12)
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");
    let city = CityProfile::default();
    let scorer = Scorer::new(
        ScoringConfig::default(),
        BenefitNormalizer::from_city(&city, &NormalizerConfig::default()),
    );
    let now = Utc.with_ymd_and_hms(2025, 4, 7, 9, 0, 0).unwrap();

    for n in [50, 500] {
        let batch = requests(n, 42);
        group.bench_with_input(BenchmarkId::from_parameter(n), &batch, |b, batch| {
            b.iter(|| black_box(scorer.score_batch(batch, now)));
        });
    }
    group.finish();
}

fn bench_governance(c: &mut Criterion) {
    let mut group = c.benchmark_group("governance");
    let city = CityProfile::default();
    let scorer = Scorer::new(
        ScoringConfig::default(),
        BenefitNormalizer::from_city(&city, &NormalizerConfig::default()),
    );
    let now = Utc.with_ymd_and_hms(2025, 4, 7, 9, 0, 0).unwrap();
    let allocator = GovernanceAllocator::new(
        GovernanceConfig::default(),
        EquityConfig::default(),
        city.quarterly_budget,
    );

    for n in [50, 500] {
        let candidates = scorer.score_batch(&requests(n, 7), now).candidates;
        group.bench_with_input(BenchmarkId::from_parameter(n), &candidates, |b, cands| {
            b.iter(|| black_box(allocator.allocate(cands, &[], now)));
        });
    }
    group.finish();
}

fn bench_scheduling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scheduling");
    group.sample_size(10);
    let engine = SchedulingEngine::new(SchedulerConfig::default().with_exact_time_limit_ms(200));

    // greedy, greedy-with-repair and exact territory respectively
    for (n, types) in [(8, 2), (18, 3), (25, 4)] {
        let request = SchedulingRequest::new(2025, jobs(n, types, 11));
        group.bench_with_input(BenchmarkId::from_parameter(n), &request, |b, req| {
            b.iter(|| {
                let ledger = shared(city_ledger());
                black_box(engine.run(req, &ledger).ok())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scoring, bench_governance, bench_scheduling);
criterion_main!(benches);
