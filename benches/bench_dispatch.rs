use criterion::{criterion_group, criterion_main, Criterion};

use tagflow::{Context, Predicate, Work, Workflow};
use tokio_util::sync::CancellationToken;

fn build_linear_workflow(steps: usize) -> Workflow {
    let mut builder = Workflow::builder("linear");
    for i in 0..steps {
        builder = builder.step(
            &format!("step {}", i),
            Work::sync(|ctx| {
                ctx.set("last", "ok");
                Ok(())
            }),
        );
    }
    builder.exit(0).build().unwrap()
}

fn build_counting_loop(iterations: i64) -> Workflow {
    Workflow::builder("loop")
        .step_tagged(
            "inc",
            "increment",
            Work::sync(|ctx| {
                let n = ctx.get_integer("count").unwrap_or(0);
                ctx.set("count", n + 1);
                Ok(())
            }),
        )
        .fork(
            "done?",
            Predicate::sync(move |ctx| ctx.get_integer("count").unwrap_or(0) >= iterations),
            |f| f.on_true(|b| b.exit(0)).on_false(|b| b.jump_to("inc")),
        )
        .build()
        .unwrap()
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("dispatch/linear");
    for nodes in [2usize, 10, 50] {
        let workflow = build_linear_workflow(nodes);
        group.bench_function(format!("{}_nodes", nodes), |b| {
            b.to_async(&rt).iter(|| async {
                let mut ctx = Context::new();
                workflow
                    .run(&mut ctx, &CancellationToken::new())
                    .await
                    .unwrap()
            });
        });
    }
    group.finish();

    let mut group = c.benchmark_group("dispatch/loop");
    for iterations in [10i64, 100] {
        let workflow = build_counting_loop(iterations);
        group.bench_function(format!("{}_iterations", iterations), |b| {
            b.to_async(&rt).iter(|| async {
                let mut ctx = Context::new();
                workflow
                    .run(&mut ctx, &CancellationToken::new())
                    .await
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
