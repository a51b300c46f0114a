use light_models::tensor::functional::*;
use light_models::tensor::*;
use light_models::{Error, Result};
use rand::prelude::*;

const EPS: f64 = 1e-6;
const TOLERANCE: f64 = 1e-5;

fn random_tensor(rng: &mut StdRng, shape: Vec<usize>) -> RcTensor<f64> {
    let count = shape.iter().product::<usize>();
    RcTensor::new((0..count).map(|_| rng.gen_range(-1.0..1.0)).collect(), shape)
}

/// Compares the gradient of every input against central differences of `f`.
fn check_gradients<F>(f: F, inputs: Vec<RcTensor<f64>>)
where
    F: Fn(&[RcTensor<f64>]) -> Result<RcTensor<f64>>,
{
    let loss = f(&inputs).unwrap();
    let refs: Vec<&RcTensor<f64>> = inputs.iter().collect();
    let analytic = gradients(&loss, &refs).unwrap();

    for (which, input) in inputs.iter().enumerate() {
        let shape = input.shape().clone();
        let bumped = |i: usize, delta: f64| {
            let mut array = input.as_slice().to_vec();
            array[i] += delta;
            let mut shifted = inputs.clone();
            shifted[which] = RcTensor::new(array, shape.clone());
            f(&shifted).unwrap().as_scalar().unwrap()
        };
        for i in 0..input.count() {
            let numeric = (bumped(i, EPS) - bumped(i, -EPS)) / (2.0 * EPS);
            let exact = analytic[which].as_slice()[i];
            assert!(
                (numeric - exact).abs() <= TOLERANCE * (1.0 + numeric.abs()),
                "input {which}, element {i}: numeric {numeric}, analytic {exact}"
            );
        }
    }
}

#[test]
fn test_new_with_filler() {
    let tensor = RcTensor::new_with_filler(vec![4], 4.0);
    assert_eq!(tensor.shape(), &vec![4]);
    assert_eq!(tensor.get(&[0]).unwrap(), &4.0);
}

#[test]
fn test_get_2x2x2() {
    let matrix = RcTensor::new((0..8).map(|v| v as f64).collect(), vec![2, 2, 2]);
    assert_eq!(*matrix.get(&[0, 0, 0]).unwrap(), 0.0);
    assert_eq!(*matrix.get(&[0, 1, 0]).unwrap(), 2.0);
    assert_eq!(*matrix.get(&[1, 1, 1]).unwrap(), 7.0);
    assert!(matrix.get(&[2, 0, 0]).is_err());
}

#[test]
fn test_try_new_rejects_bad_length() {
    assert!(RcTensor::try_new(vec![1.0, 2.0, 3.0], vec![2, 2]).is_err());
}

#[test]
fn test_as_scalar() {
    assert_eq!(as_scalar(&RcTensor::from([[2.5]])).unwrap(), 2.5);
    assert!(matches!(
        as_scalar(&RcTensor::from([1.0, 2.0])),
        Err(Error::NotScalar { .. })
    ));
}

#[test]
fn test_dot_product_gradient() {
    let mut rng = StdRng::seed_from_u64(1);
    let target = random_tensor(&mut rng, vec![3, 1]);
    let inputs = vec![
        random_tensor(&mut rng, vec![3, 4]),
        random_tensor(&mut rng, vec![1, 4]),
    ];
    check_gradients(
        |t| square_loss(&dot_product(&t[0], &t[1])?, &target),
        inputs,
    );
}

#[test]
fn test_linear_gradient() {
    let mut rng = StdRng::seed_from_u64(2);
    let target = random_tensor(&mut rng, vec![3, 2]);
    let inputs = vec![
        random_tensor(&mut rng, vec![3, 4]),
        random_tensor(&mut rng, vec![4, 2]),
    ];
    check_gradients(|t| square_loss(&linear(&t[0], &t[1])?, &target), inputs);
}

#[test]
fn test_add_bias_gradient() {
    let mut rng = StdRng::seed_from_u64(3);
    let target = random_tensor(&mut rng, vec![4, 3]);
    let inputs = vec![
        random_tensor(&mut rng, vec![4, 3]),
        random_tensor(&mut rng, vec![1, 3]),
    ];
    check_gradients(|t| square_loss(&add_bias(&t[0], &t[1])?, &target), inputs);
}

#[test]
fn test_add_gradient() {
    let mut rng = StdRng::seed_from_u64(4);
    let target = random_tensor(&mut rng, vec![2, 3]);
    let inputs = vec![
        random_tensor(&mut rng, vec![2, 3]),
        random_tensor(&mut rng, vec![2, 3]),
    ];
    check_gradients(|t| square_loss(&add(&t[0], &t[1])?, &target), inputs);
}

#[test]
fn test_relu_gradient() {
    // kept away from the kink at 0
    let x = RcTensor::from([[-0.8, 0.3, 1.2], [0.5, -0.2, -1.5]]);
    let target = RcTensor::from([[0.1, 0.1, 0.1], [0.1, 0.1, 0.1]]);
    check_gradients(|t| square_loss(&relu(&t[0])?, &target), vec![x]);
}

#[test]
fn test_square_loss_gradient() {
    let mut rng = StdRng::seed_from_u64(5);
    let inputs = vec![
        random_tensor(&mut rng, vec![5, 1]),
        random_tensor(&mut rng, vec![5, 1]),
    ];
    check_gradients(|t| square_loss(&t[0], &t[1]), inputs);
}

#[test]
fn test_softmax_loss_gradient() {
    let mut rng = StdRng::seed_from_u64(6);
    let logits = random_tensor(&mut rng, vec![3, 4]);
    let labels = RcTensor::from([
        [0.0, 1.0, 0.0, 0.0],
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);
    check_gradients(|t| softmax_loss(&t[0], &labels), vec![logits]);
}

#[test]
fn test_two_layer_chain_gradient() {
    let mut rng = StdRng::seed_from_u64(7);
    let x = random_tensor(&mut rng, vec![2, 3]);
    let labels = RcTensor::from([[1.0, 0.0], [0.0, 1.0]]);
    let inputs = vec![
        random_tensor(&mut rng, vec![3, 5]),
        random_tensor(&mut rng, vec![1, 5]),
        random_tensor(&mut rng, vec![5, 2]),
    ];
    check_gradients(
        |t| {
            let hidden = relu(&add_bias(&linear(&x, &t[0])?, &t[1])?)?;
            softmax_loss(&linear(&hidden, &t[2])?, &labels)
        },
        inputs,
    );
}

#[test]
fn test_recurrent_reuse_gradient() {
    // the same weight applied at two steps
    let mut rng = StdRng::seed_from_u64(8);
    let x0 = random_tensor(&mut rng, vec![2, 3]);
    let x1 = random_tensor(&mut rng, vec![2, 3]);
    let target = random_tensor(&mut rng, vec![2, 3]);
    let inputs = vec![
        random_tensor(&mut rng, vec![3, 3]),
        random_tensor(&mut rng, vec![3, 3]),
    ];
    check_gradients(
        |t| {
            let h = linear(&x0, &t[0])?;
            let h = add(&linear(&x1, &t[0])?, &linear(&h, &t[1])?)?;
            square_loss(&h, &target)
        },
        inputs,
    );
}

#[test]
fn test_update_in_place() {
    let mut w = RcTensor::from([[1.0, 2.0]]);
    w.update(&RcTensor::from([[1.0, 1.0]]), -0.5).unwrap();
    assert_eq!(w, RcTensor::from([[0.5, 1.5]]));
    assert!(matches!(
        w.update(&RcTensor::from([[1.0]]), 1.0),
        Err(Error::ShapeMismatch { op: "update", .. })
    ));
}

#[test]
fn test_display() {
    let tensor = RcTensor::from([[1.0, 2.0]]);
    assert!(!format!("{tensor}").is_empty());
}
