use approx::assert_relative_eq;
use dilation_primer::backend::{get_backend, set_backend, Backend};
use dilation_primer::nn::{Conv2d, Conv2dConfig};
use dilation_primer::ops::{conv_output_size, dispatch, ConvGeometry, ConvParams};
use dilation_primer::rng::Generator;
use dilation_primer::tensors::{Ten32, WithGrad};
use dilation_primer::Error;

/// A single 5×5 plane holding 0, 1, ..., 24.
fn ramp() -> Ten32 {
    Ten32::new(vec![1, 1, 5, 5], (0..25).map(|v| v as f32).collect())
}

fn ones_kernel() -> Ten32 {
    Ten32::new(vec![1, 1, 3, 3], vec![1.0; 9])
}

fn params(stride: usize, padding: usize, dilation: usize) -> ConvParams {
    ConvParams {
        stride: (stride, stride),
        padding: (padding, padding),
        dilation: (dilation, dilation),
    }
}

#[test]
fn test_output_size_formula() {
    assert_eq!(conv_output_size(5, 3, 1, 0, 1), Some(3));
    assert_eq!(conv_output_size(5, 3, 1, 0, 2), Some(1));
    assert_eq!(conv_output_size(5, 3, 1, 0, 3), None);
    assert_eq!(conv_output_size(5, 3, 2, 0, 1), Some(2));
    assert_eq!(conv_output_size(5, 3, 1, 1, 1), Some(5));
    assert_eq!(conv_output_size(7, 3, 2, 1, 2), Some(3));
    assert_eq!(conv_output_size(5, 3, 0, 0, 1), None);
}

#[test]
fn test_output_size_overflow_is_none() {
    assert_eq!(conv_output_size(5, 3, 1, 0, usize::MAX), None);
    assert_eq!(conv_output_size(5, 3, 1, usize::MAX, 1), None);
    assert_eq!(conv_output_size(usize::MAX, 3, 1, 1, 1), None);
    assert_eq!(conv_output_size(usize::MAX, 1, usize::MAX, 0, 1), Some(1));
}

#[test]
fn test_huge_dilation_is_an_error() {
    let mut rng = Generator::manual_seed(0);
    let conv = Conv2d::new(Conv2dConfig::new(2, 1, 3).dilation(usize::MAX), &mut rng).unwrap();
    let x = Ten32::zeros(vec![2, 5, 5]);

    let result = std::panic::catch_unwind(|| conv.forward(&x));
    assert!(matches!(
        result,
        Ok(Err(Error::KernelTooLarge { extent: usize::MAX, input: 5, .. }))
    ));

    assert!(matches!(
        dispatch::conv2d_forward(&ramp(), &ones_kernel(), None, params(1, usize::MAX, 1)),
        Err(Error::KernelTooLarge { extent: 3, input: usize::MAX, .. })
    ));
}

#[test]
fn test_conv_dilation_one() {
    let out = dispatch::conv2d_forward(&ramp(), &ones_kernel(), None, params(1, 0, 1)).unwrap();
    assert_eq!(out.shape, vec![1, 1, 3, 3]);
    assert_eq!(out.data, vec![54.0, 63.0, 72.0, 99.0, 108.0, 117.0, 144.0, 153.0, 162.0]);
}

#[test]
fn test_conv_dilation_two() {
    let out = dispatch::conv2d_forward(&ramp(), &ones_kernel(), None, params(1, 0, 2)).unwrap();
    assert_eq!(out.shape, vec![1, 1, 1, 1]);
    assert_eq!(out.data, vec![108.0]);
}

#[test]
fn test_conv_stride_and_padding() {
    let strided = dispatch::conv2d_forward(&ramp(), &ones_kernel(), None, params(2, 0, 1)).unwrap();
    assert_eq!(strided.data, vec![54.0, 72.0, 144.0, 162.0]);

    let padded = dispatch::conv2d_forward(&ramp(), &ones_kernel(), None, params(1, 1, 1)).unwrap();
    assert_eq!(padded.shape, vec![1, 1, 5, 5]);
    assert_eq!(padded.data[0], 12.0);
    assert_eq!(padded.data[12], 108.0);
}

#[test]
fn test_conv_bias_and_channels() {
    // two input channels, the second scaled by 10; two filters
    let mut data: Vec<f32> = (0..25).map(|v| v as f32).collect();
    data.extend((0..25).map(|v| v as f32 * 10.0));
    let input = Ten32::new(vec![1, 2, 5, 5], data);

    let mut kernel = vec![1.0; 9];
    kernel.extend([0.0; 9]);
    kernel.extend([0.0; 9]);
    kernel.extend([1.0; 9]);
    let weight = Ten32::new(vec![2, 2, 3, 3], kernel);
    let bias = Ten32::new(vec![2], vec![0.5, -1.0]);

    let out = dispatch::conv2d_forward(&input, &weight, Some(&bias), params(1, 0, 2)).unwrap();
    assert_eq!(out.shape, vec![1, 2, 1, 1]);
    assert_eq!(out.data, vec![108.5, 1079.0]);
}

#[test]
fn test_conv_backward_dilated() {
    let x = WithGrad::new(ramp());
    let w = WithGrad::new(ones_kernel());
    let b = WithGrad::new(Ten32::new(vec![1], vec![0.0]));

    let (out, back) = dispatch::conv2d(&x, &w, Some(&b), params(1, 0, 2)).unwrap();
    let grads = back(&Ten32::new(out.shape.clone(), vec![1.0]));

    assert_eq!(
        grads.weight.data,
        vec![0.0, 2.0, 4.0, 10.0, 12.0, 14.0, 20.0, 22.0, 24.0]
    );
    let taps = [0, 2, 4, 10, 12, 14, 20, 22, 24];
    for (i, &g) in grads.input.data.iter().enumerate() {
        let expected = if taps.contains(&i) { 1.0 } else { 0.0 };
        assert_eq!(g, expected, "grad_input[{i}]");
    }
    assert_eq!(grads.bias.unwrap().data, vec![1.0]);
}

#[test]
fn test_backends_agree() {
    let mut rng = Generator::manual_seed(3);
    let x = WithGrad::new(rng.uniform(-1.0, 1.0, [2, 3, 7, 6]).unwrap());
    let w = WithGrad::new(rng.uniform(-1.0, 1.0, [4, 3, 3, 2]).unwrap());
    let b = WithGrad::new(rng.uniform(-1.0, 1.0, [4]).unwrap());
    let p = ConvParams {
        stride: (2, 1),
        padding: (1, 2),
        dilation: (2, 1),
    };

    let run = |backend| {
        set_backend(backend);
        let (out, back) = dispatch::conv2d(&x, &w, Some(&b), p).unwrap();
        let grads = back(&Ten32::full(out.shape.clone(), 1.0));
        set_backend(Backend::Cpu);
        (out, grads)
    };
    let (cpu_out, cpu_grads) = run(Backend::Cpu);
    let (ref_out, ref_grads) = run(Backend::Reference);
    assert_eq!(get_backend(), Backend::Cpu);

    assert_eq!(cpu_out.shape, ref_out.shape);
    assert_eq!(cpu_out.data, ref_out.data);
    for (a, e) in [
        (&cpu_grads.input, &ref_grads.input),
        (&cpu_grads.weight, &ref_grads.weight),
    ] {
        assert_eq!(a.shape, e.shape);
        for (x, y) in a.data.iter().zip(&e.data) {
            assert_relative_eq!(*x, *y, epsilon = 1e-4, max_relative = 1e-4);
        }
    }
    let (cb, rb) = (cpu_grads.bias.unwrap(), ref_grads.bias.unwrap());
    for (x, y) in cb.data.iter().zip(&rb.data) {
        assert_relative_eq!(*x, *y, epsilon = 1e-4);
    }
}

#[test]
fn test_shape_errors() {
    let bad_rank = Ten32::new(vec![5, 5], vec![0.0; 25]);
    assert!(matches!(
        dispatch::conv2d_forward(&bad_rank, &ones_kernel(), None, params(1, 0, 1)),
        Err(Error::Rank { .. })
    ));

    let two_channels = Ten32::new(vec![1, 2, 5, 5], vec![0.0; 50]);
    assert!(matches!(
        dispatch::conv2d_forward(&two_channels, &ones_kernel(), None, params(1, 0, 1)),
        Err(Error::ChannelMismatch { expected: 1, actual: 2 })
    ));

    assert!(matches!(
        dispatch::conv2d_forward(&ramp(), &ones_kernel(), None, params(1, 0, 3)),
        Err(Error::KernelTooLarge { extent: 7, input: 5, .. })
    ));

    let wrong_bias = Ten32::new(vec![2], vec![0.0; 2]);
    assert!(matches!(
        dispatch::conv2d_forward(&ramp(), &ones_kernel(), Some(&wrong_bias), params(1, 0, 1)),
        Err(Error::ParameterShape { name: "bias", .. })
    ));

    assert!(matches!(
        ConvGeometry::resolve(&[1, 1, 5, 5], &[1, 1, 3, 3], None, params(0, 0, 1)),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn test_conv2d_layer_shapes() {
    let mut rng = Generator::manual_seed(42);
    let x = rng.randint(0, 5, [2, 5, 5]).unwrap();

    let conv = Conv2d::new(Conv2dConfig::new(2, 2, 3), &mut rng).unwrap();
    assert_eq!(conv.weight().value.shape, vec![2, 2, 3, 3]);
    assert_eq!(conv.bias().unwrap().value.shape, vec![2]);
    assert_eq!(conv.forward(&x).unwrap().shape, vec![2, 3, 3]);
    assert_eq!(conv.output_shape(&[2, 5, 5]).unwrap(), vec![2, 3, 3]);

    let dilated = Conv2d::new(Conv2dConfig::new(2, 1, 3).dilation(2), &mut rng).unwrap();
    assert_eq!(dilated.forward(&x).unwrap().shape, vec![1, 1, 1]);

    let batched = Ten32::new(vec![3, 2, 5, 5], vec![1.0; 150]);
    assert_eq!(dilated.forward(&batched).unwrap().shape, vec![3, 1, 1, 1]);
    assert_eq!(dilated.output_shape(&[3, 2, 5, 5]).unwrap(), vec![3, 1, 1, 1]);
}

#[test]
fn test_conv2d_init_bound() {
    let mut rng = Generator::manual_seed(0);
    let conv = Conv2d::new(Conv2dConfig::new(2, 4, 3), &mut rng).unwrap();
    let bound = 1.0 / (18.0f32).sqrt();
    assert!(conv.weight().value.data.iter().all(|v| v.abs() <= bound));
    assert!(conv.bias().unwrap().value.data.iter().all(|v| v.abs() <= bound));

    let again = Conv2d::new(Conv2dConfig::new(2, 4, 3), &mut Generator::manual_seed(0)).unwrap();
    assert_eq!(conv.weight().value, again.weight().value);
}

#[test]
fn test_conv2d_rejects_invalid_config() {
    let mut rng = Generator::manual_seed(0);
    assert!(matches!(
        Conv2d::new(Conv2dConfig::new(0, 1, 3), &mut rng),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        Conv2d::new(Conv2dConfig::new(1, 1, 3).dilation(0), &mut rng),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        Conv2d::from_parts(Conv2dConfig::new(1, 1, 3), ones_kernel(), None),
        Err(Error::ParameterShape { name: "bias", .. })
    ));
    assert!(matches!(
        Conv2d::from_parts(Conv2dConfig::new(2, 1, 3).bias(false), ones_kernel(), None),
        Err(Error::ParameterShape { name: "weight", .. })
    ));
}

#[test]
fn test_conv2d_accumulate_unbatched() {
    let config = Conv2dConfig::new(1, 1, 3).dilation(2);
    let mut conv = Conv2d::from_parts(config, ones_kernel(), Some(Ten32::new(vec![1], vec![0.25]))).unwrap();

    let x = WithGrad::new(Ten32::new(vec![1, 5, 5], (0..25).map(|v| v as f32).collect()));
    let (out, back) = conv.forward_with_grad(&x).unwrap();
    assert_eq!(out.shape, vec![1, 1, 1]);
    assert_eq!(out.data, vec![108.25]);

    let grads = back(&Ten32::new(vec![1, 1, 1], vec![2.0]));
    assert_eq!(grads.input.shape, vec![1, 5, 5]);
    conv.accumulate(&grads);
    conv.accumulate(&grads);
    assert_eq!(conv.weight().grad.data[4], 48.0);
    assert_eq!(conv.bias().unwrap().grad.data, vec![4.0]);

    conv.zero_grad();
    assert!(conv.weight().grad.data.iter().all(|&g| g == 0.0));
}

#[test]
fn test_backend_names() {
    assert_eq!("cpu".parse::<Backend>(), Ok(Backend::Cpu));
    assert_eq!(" Reference ".parse::<Backend>(), Ok(Backend::Reference));
    assert_eq!("ref".parse::<Backend>(), Ok(Backend::Reference));
    assert!("cuda".parse::<Backend>().is_err());
    assert_eq!(Backend::default(), Backend::Cpu);
}

#[test]
fn test_backend_from_env_value() {
    assert_eq!(Backend::from_env_value(None), Backend::Cpu);
    assert_eq!(Backend::from_env_value(Some("REFERENCE")), Backend::Reference);
    assert_eq!(Backend::from_env_value(Some(" cpu\n")), Backend::Cpu);
    assert_eq!(Backend::from_env_value(Some("bogus")), Backend::Cpu);
    assert_eq!(Backend::from_env_value(Some("")), Backend::Cpu);
}
