use std::sync::Arc;

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fluentq::{Builder, Executor, Result, Row, Value};

struct NoopExecutor;

#[async_trait]
impl Executor for NoopExecutor {
    async fn query(&self, _sql: &str, _args: &[Value]) -> Result<Vec<Row>> {
        Ok(Vec::new())
    }

    async fn execute(&self, _sql: &str, _args: &[Value]) -> Result<u64> {
        Ok(0)
    }

    async fn begin(&self) -> Result<()> {
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        Ok(())
    }

    async fn savepoint(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn release_savepoint(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn rollback_to_savepoint(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

/// Build a query with `n` equality conditions and an `n`-value IN list.
fn build_query(db: &Builder, n: usize) -> Builder {
    let mut q = db.table("events").select(&["id", "kind", "payload"]);
    for i in 0..n {
        q = q.where_cmp(format!("col{i}"), ">", i as i64);
    }
    q.where_in("kind", (0..n as i64).collect::<Vec<_>>())
        .order_by_desc("created_at")
        .limit(50)
}

fn bench_compile(c: &mut Criterion) {
    let db = Builder::new(Arc::new(NoopExecutor) as Arc<dyn Executor>);
    let mut group = c.benchmark_group("builder/compile");

    for n in [1, 5, 10, 50] {
        let q = build_query(&db, n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &q, |b, q| {
            b.iter(|| black_box(q.compile().unwrap()));
        });
    }

    group.finish();
}

fn bench_build_and_compile(c: &mut Criterion) {
    let db = Builder::new(Arc::new(NoopExecutor) as Arc<dyn Executor>);
    let mut group = c.benchmark_group("builder/build_and_compile");

    for n in [1, 5, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| {
                let q = build_query(&db, n);
                black_box(q.compile().unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_compile, bench_build_and_compile);
criterion_main!(benches);
