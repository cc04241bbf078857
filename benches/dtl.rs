use cophy::libs::recon::diameter::pdv;
use cophy::libs::recon::{reconcile, CostParams, Instance};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn random_newick<R: Rng>(rng: &mut R, n: usize, leaf: &str, internal: &str) -> String {
    let mut parts: Vec<String> = (1..=n).map(|i| format!("{}{}", leaf, i)).collect();
    let mut k = 0;
    while parts.len() > 1 {
        let a = parts.swap_remove(rng.gen_range(0..parts.len()));
        let b = parts.swap_remove(rng.gen_range(0..parts.len()));
        parts.push(format!("({},{}){}{}", a, b, internal, k));
        k += 1;
    }
    format!("{};", parts[0])
}

fn instance(n_host: usize, n_parasite: usize) -> Instance {
    let mut rng = SmallRng::seed_from_u64(11);
    let mut text = format!(
        "{}\n{}\n",
        random_newick(&mut rng, n_host, "h", "m"),
        random_newick(&mut rng, n_parasite, "p", "q")
    );
    for i in 1..=n_parasite {
        text.push_str(&format!("p{}:h{}\n", i, rng.gen_range(1..=n_host)));
    }
    Instance::parse(&text).unwrap()
}

fn bench_reconcile(c: &mut Criterion) {
    let costs = CostParams::default();
    for (nh, np) in [(16, 16), (64, 64)] {
        let inst = instance(nh, np);
        c.bench_function(&format!("reconcile_{}x{}", nh, np), |b| {
            b.iter(|| reconcile(black_box(&inst), &costs).unwrap())
        });
    }
}

fn bench_pdv(c: &mut Criterion) {
    let inst = instance(16, 16);
    let rec = reconcile(&inst, &CostParams::new(1.0, 1.0, 1.0).unwrap()).unwrap();
    c.bench_function("pdv_16x16", |b| {
        b.iter(|| pdv(black_box(&inst), &rec.graph, false).unwrap())
    });
}

criterion_group!(benches, bench_reconcile, bench_pdv);
criterion_main!(benches);
