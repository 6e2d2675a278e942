use dilation_primer::rng::Generator;
use dilation_primer::tensors::{Ten32, Tensor, WithGrad};
use dilation_primer::{tensor, Error};

#[test]
fn test_tensor_creation() {
    let t = Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(t.shape, vec![2, 2]);
    assert_eq!(t.data, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(t.ndim(), 2);
    assert_eq!(t.numel(), 4);
}

#[test]
fn test_tensor_macro() {
    let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
    assert_eq!(t.shape, vec![2, 2]);
    assert_eq!(t.data, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_tensor_shape_mismatch_panics() {
    let result = std::panic::catch_unwind(|| {
        Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0]);
    });
    assert!(result.is_err());
}

#[test]
fn test_try_new_reports_mismatch() {
    let err = Tensor::try_new(vec![2, 2], vec![1.0f32; 3]).unwrap_err();
    assert!(matches!(err, Error::ShapeData { len: 3, .. }));
}

#[test]
fn test_reshape_keeps_data() {
    let t = Ten32::new(vec![1, 2, 3], (0..6).map(|v| v as f32).collect());
    let r = t.clone().reshape(vec![3, 2]).unwrap();
    assert_eq!(r.shape, vec![3, 2]);
    assert_eq!(r.data, t.data);
    assert!(t.reshape(vec![4]).is_err());
}

#[test]
fn test_with_grad_zeroed_and_accumulates() {
    let mut w = WithGrad::new(Ten32::new(vec![2], vec![1.0, 2.0]));
    assert_eq!(w.grad.data, vec![0.0, 0.0]);
    w.accumulate(&Ten32::new(vec![2], vec![0.5, 1.0]));
    w.accumulate(&Ten32::new(vec![2], vec![0.5, 1.0]));
    assert_eq!(w.grad.data, vec![1.0, 2.0]);
    w.zero_grad();
    assert_eq!(w.grad.data, vec![0.0, 0.0]);
}

#[test]
fn test_display_nested() {
    let t = Ten32::new(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(
        t.to_string(),
        "tensor([[1.0000, 2.0000],\n        [3.0000, 4.0000]])"
    );
    let s = Ten32::new(Vec::<usize>::new(), vec![0.5]);
    assert_eq!(s.to_string(), "tensor(0.5000)");
}

#[test]
fn test_randint_is_seeded_and_in_range() {
    let a = Generator::manual_seed(42).randint(0, 5, [2, 5, 5]).unwrap();
    let b = Generator::manual_seed(42).randint(0, 5, [2, 5, 5]).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.shape, vec![2, 5, 5]);
    assert!(a.data.iter().all(|&v| (0.0..5.0).contains(&v) && v.fract() == 0.0));

    let c = Generator::manual_seed(7).randint(0, 5, [2, 5, 5]).unwrap();
    assert_ne!(a, c);
}

#[test]
fn test_uniform_bounds() {
    let mut rng = Generator::manual_seed(1);
    assert_eq!(rng.initial_seed(), 1);
    let t = rng.uniform(-0.25, 0.25, [64]).unwrap();
    assert!(t.data.iter().all(|&v| (-0.25..0.25).contains(&v)));
}

#[test]
fn test_empty_range_is_an_error() {
    let mut rng = Generator::manual_seed(0);
    assert!(matches!(rng.randint(3, 3, [1]), Err(Error::EmptyRange { .. })));
    assert!(matches!(rng.uniform(1.0, -1.0, [1]), Err(Error::EmptyRange { .. })));
}

#[test]
fn test_non_finite_range_is_an_error() {
    let mut rng = Generator::manual_seed(0);
    let err = rng.uniform(f32::MIN, f32::MAX, [1]).unwrap_err();
    assert!(matches!(err, Error::EmptyRange { .. }));
    assert!(err.to_string().contains("not finite"));
    assert!(rng.uniform(0.0, f32::INFINITY, [1]).is_err());
    assert!(rng.uniform(f32::NAN, 1.0, [1]).is_err());
}
