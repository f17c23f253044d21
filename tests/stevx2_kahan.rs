use tessel::{
    testing::{run_stevx2, StevxParams},
    utils::bit_length,
};

#[test]
fn kahan_order_1000() {
    let params = StevxParams::<f64>::default();
    assert!(params.m == 1000);

    let outcome = run_stevx2(&params).unwrap();
    assert!(outcome.count >= 1);
    assert!(outcome.success);

    let bound = (2 * bit_length(params.m)) as f64 * f64::EPSILON;
    assert!(bound == 20.0 * f64::EPSILON);
    assert!(outcome.error <= bound);
}

#[test]
#[cfg(feature = "rayon")]
fn kahan_parallel_bisection() {
    let params = StevxParams {
        m: 400,
        parallelism: tessel::Parallelism::Rayon(0),
        ..StevxParams::<f64>::default()
    };
    let outcome = run_stevx2(&params).unwrap();
    assert!(outcome.success);
}
