// Gradient Tests — backward() correctness on the CPU backend
//
// Each test builds a small graph, reduces to a scalar, and checks the
// gradients against hand-derived values.

#[cfg(test)]
mod tests {
    use aural_core::dtype::DType;
    use aural_cpu::{CpuDevice, CpuTensor};

    type T = CpuTensor;

    fn cpu() -> CpuDevice {
        CpuDevice::new()
    }

    fn assert_approx_vec(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len(), "length mismatch");
        for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
            assert!((a - e).abs() < tol, "index {i}: {a} != {e} (tol={tol})");
        }
    }

    fn tensor(data: &[f64], shape: impl Into<aural_core::Shape>) -> T {
        T::from_f64_slice(data, shape, DType::F64, &cpu()).unwrap()
    }

    #[test]
    fn test_backward_requires_scalar() {
        let x = tensor(&[1.0, 2.0], (2,));
        assert!(x.backward().is_err());
    }

    #[test]
    fn test_add_grad() {
        let x = tensor(&[1.0, 2.0], (2,));
        let y = tensor(&[3.0, 4.0], (2,));
        let z = x.add(&y).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(&grads.get(&x).unwrap().to_f64_vec().unwrap(), &[1.0, 1.0], 1e-10);
        assert_approx_vec(&grads.get(&y).unwrap().to_f64_vec().unwrap(), &[1.0, 1.0], 1e-10);
    }

    #[test]
    fn test_sub_grad() {
        let x = tensor(&[5.0, 6.0], (2,));
        let y = tensor(&[1.0, 2.0], (2,));
        let z = x.sub(&y).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(&grads.get(&y).unwrap().to_f64_vec().unwrap(), &[-1.0, -1.0], 1e-10);
    }

    #[test]
    fn test_mul_grad() {
        let x = tensor(&[2.0, 3.0], (2,));
        let y = tensor(&[5.0, 7.0], (2,));
        let z = x.mul(&y).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(&grads.get(&x).unwrap().to_f64_vec().unwrap(), &[5.0, 7.0], 1e-10);
        assert_approx_vec(&grads.get(&y).unwrap().to_f64_vec().unwrap(), &[2.0, 3.0], 1e-10);
    }

    #[test]
    fn test_div_grad() {
        let x = tensor(&[4.0, 9.0], (2,));
        let y = tensor(&[2.0, 3.0], (2,));
        let z = x.div(&y).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[0.5, 1.0 / 3.0],
            1e-10,
        );
        assert_approx_vec(&grads.get(&y).unwrap().to_f64_vec().unwrap(), &[-1.0, -1.0], 1e-10);
    }

    #[test]
    fn test_same_input_twice_accumulates() {
        let x = tensor(&[3.0, 4.0], (2,));
        let z = x.mul(&x).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(&grads.get(&x).unwrap().to_f64_vec().unwrap(), &[6.0, 8.0], 1e-10);
    }

    #[test]
    fn test_broadcast_add_grad_sums_over_expanded_dim() {
        let x = tensor(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], (2, 3));
        let bias = tensor(&[10.0, 20.0, 30.0], (1, 3));
        let z = x.add(&bias).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        let gb = grads.get(&bias).unwrap();
        assert_eq!(gb.dims(), &[1, 3]);
        assert_approx_vec(&gb.to_f64_vec().unwrap(), &[2.0, 2.0, 2.0], 1e-10);
    }

    #[test]
    fn test_broadcast_mul_grad() {
        let x = tensor(&[1.0, 2.0, 3.0, 4.0], (2, 2));
        let scale = tensor(&[10.0, 100.0], (2, 1));
        let z = x.mul(&scale).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[10.0, 10.0, 100.0, 100.0],
            1e-10,
        );
        assert_approx_vec(
            &grads.get(&scale).unwrap().to_f64_vec().unwrap(),
            &[3.0, 7.0],
            1e-10,
        );
    }

    #[test]
    fn test_neg_grad() {
        let x = tensor(&[1.0, -2.0], (2,));
        let z = x.neg().unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(&grads.get(&x).unwrap().to_f64_vec().unwrap(), &[-1.0, -1.0], 1e-10);
    }

    #[test]
    fn test_abs_grad_is_sign() {
        let x = tensor(&[-2.0, 0.0, 3.0], (3,));
        let z = x.abs().unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[-1.0, 0.0, 1.0],
            1e-10,
        );
    }

    #[test]
    fn test_exp_grad() {
        let x = tensor(&[0.0, 1.0], (2,));
        let z = x.exp().unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[1.0, std::f64::consts::E],
            1e-10,
        );
    }

    #[test]
    fn test_log_grad() {
        let x = tensor(&[2.0, 4.0], (2,));
        let z = x.log().unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(&grads.get(&x).unwrap().to_f64_vec().unwrap(), &[0.5, 0.25], 1e-10);
    }

    #[test]
    fn test_sqrt_grad() {
        let x = tensor(&[4.0, 16.0], (2,));
        let z = x.sqrt().unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(&grads.get(&x).unwrap().to_f64_vec().unwrap(), &[0.25, 0.125], 1e-10);
    }

    #[test]
    fn test_square_grad() {
        let x = tensor(&[3.0, -5.0], (2,));
        let z = x.square().unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(&grads.get(&x).unwrap().to_f64_vec().unwrap(), &[6.0, -10.0], 1e-10);
    }

    #[test]
    fn test_relu_grad_masks_negatives() {
        let x = tensor(&[-1.0, 0.0, 2.0], (3,));
        let z = x.relu().unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[0.0, 0.0, 1.0],
            1e-10,
        );
    }

    #[test]
    fn test_sigmoid_grad_at_zero() {
        let x = tensor(&[0.0], (1,));
        let z = x.sigmoid().unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(&grads.get(&x).unwrap().to_f64_vec().unwrap(), &[0.25], 1e-10);
    }

    #[test]
    fn test_tanh_grad() {
        let x = tensor(&[0.0, 1.0], (2,));
        let z = x.tanh().unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        let t1 = 1.0f64.tanh();
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[1.0, 1.0 - t1 * t1],
            1e-10,
        );
    }

    #[test]
    fn test_affine_grad() {
        let x = tensor(&[1.0, 2.0], (2,));
        let z = x.affine(3.0, 7.0).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(&grads.get(&x).unwrap().to_f64_vec().unwrap(), &[3.0, 3.0], 1e-10);
    }

    #[test]
    fn test_mean_all_grad() {
        let x = tensor(&[1.0, 2.0, 3.0, 4.0], (4,));
        let z = x.mean_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(&grads.get(&x).unwrap().to_f64_vec().unwrap(), &[0.25; 4], 1e-10);
    }

    #[test]
    fn test_sum_dim_grad_expands() {
        let x = tensor(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], (2, 3));
        let w = tensor(&[1.0, 10.0], (2,));
        let z = x.sum(1, false).unwrap().mul(&w).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[1.0, 1.0, 1.0, 10.0, 10.0, 10.0],
            1e-10,
        );
    }

    #[test]
    fn test_mean_dim_grad() {
        let x = tensor(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], (2, 3));
        let z = x.mean(1, false).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[1.0 / 3.0; 6],
            1e-10,
        );
    }

    #[test]
    fn test_max_grad_splits_ties() {
        let x = tensor(&[1.0, 3.0, 3.0], (1, 3));
        let z = x.max(1, false).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[0.0, 0.5, 0.5],
            1e-10,
        );
    }

    #[test]
    fn test_matmul_grad() {
        let a = tensor(&[1.0, 2.0, 3.0, 4.0], (2, 2));
        let b = tensor(&[5.0, 6.0, 7.0, 8.0], (2, 2));
        let z = a.matmul(&b).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(
            &grads.get(&a).unwrap().to_f64_vec().unwrap(),
            &[11.0, 15.0, 11.0, 15.0],
            1e-10,
        );
        assert_approx_vec(
            &grads.get(&b).unwrap().to_f64_vec().unwrap(),
            &[4.0, 4.0, 6.0, 6.0],
            1e-10,
        );
    }

    #[test]
    fn test_narrow_grad_scatters() {
        let x = tensor(&[1.0, 2.0, 3.0], (1, 3));
        let z = x.narrow(1, 1, 2).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[0.0, 1.0, 1.0],
            1e-10,
        );
    }

    #[test]
    fn test_cat_grad_slices_apart() {
        let a = tensor(&[1.0, 2.0], (1, 2));
        let b = tensor(&[3.0, 4.0], (1, 2));
        let w = tensor(&[1.0, 2.0, 3.0, 4.0], (1, 4));
        let c = T::cat(&[a.clone(), b.clone()], 1).unwrap();
        let z = c.mul(&w).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(&grads.get(&a).unwrap().to_f64_vec().unwrap(), &[1.0, 2.0], 1e-10);
        assert_approx_vec(&grads.get(&b).unwrap().to_f64_vec().unwrap(), &[3.0, 4.0], 1e-10);
    }

    #[test]
    fn test_transpose_grad() {
        let x = tensor(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], (2, 3));
        let w = tensor(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], (3, 2));
        let z = x.t().unwrap().mul(&w).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        // dz/dx is w transposed back to x's orientation.
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[1.0, 3.0, 5.0, 2.0, 4.0, 6.0],
            1e-10,
        );
    }

    #[test]
    fn test_reshape_grad() {
        let x = tensor(&[1.0, 2.0, 3.0, 4.0], (2, 2));
        let w = tensor(&[1.0, 2.0, 3.0, 4.0], (4,));
        let z = x.reshape((4,)).unwrap().mul(&w).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        let gx = grads.get(&x).unwrap();
        assert_eq!(gx.dims(), &[2, 2]);
        assert_approx_vec(&gx.to_f64_vec().unwrap(), &[1.0, 2.0, 3.0, 4.0], 1e-10);
    }

    #[test]
    fn test_where_cond_grad_routes_by_mask() {
        let mask_src = tensor(&[1.0, 0.0, 1.0], (3,));
        let mask = mask_src.gt(&tensor(&[0.0, 0.0, 0.0], (3,))).unwrap();
        let a = tensor(&[1.0, 1.0, 1.0], (3,));
        let b = tensor(&[2.0, 2.0, 2.0], (3,));
        let z = T::where_cond(&mask, &a, &b).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(
            &grads.get(&a).unwrap().to_f64_vec().unwrap(),
            &[1.0, 0.0, 1.0],
            1e-10,
        );
        assert_approx_vec(
            &grads.get(&b).unwrap().to_f64_vec().unwrap(),
            &[0.0, 1.0, 0.0],
            1e-10,
        );
    }

    #[test]
    fn test_detach_blocks_gradient() {
        let x = tensor(&[2.0, 3.0], (2,));
        let z = x.square().unwrap().detach().sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert!(grads.get(&x).is_none());
    }

    #[test]
    fn test_softmax_grad() {
        let x = tensor(&[0.0, 0.0], (1, 2));
        let w = tensor(&[1.0, 0.0], (1, 2));
        let z = x.softmax(1).unwrap().mul(&w).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        // s = [0.5, 0.5]; d s_0 / d x_j = s_0 (delta_0j - s_j)
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[0.25, -0.25],
            1e-10,
        );
    }

    #[test]
    fn test_log_softmax_grad() {
        let x = tensor(&[0.0, 0.0], (1, 2));
        let w = tensor(&[1.0, 0.0], (1, 2));
        let z = x.log_softmax(1).unwrap().mul(&w).unwrap().sum_all().unwrap();
        let grads = z.backward().unwrap();
        // d log s_0 / d x_j = delta_0j - s_j
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[0.5, -0.5],
            1e-10,
        );
    }

    #[test]
    fn test_chain_through_views() {
        // Split, transform, and re-join, the way a recurrence consumes
        // one timestep at a time.
        let x = tensor(&[1.0, 2.0, 3.0, 4.0], (1, 2, 2));
        let t0 = x.narrow(1, 0, 1).unwrap().reshape((1, 2)).unwrap();
        let t1 = x.narrow(1, 1, 1).unwrap().reshape((1, 2)).unwrap();
        let h0 = t0.affine(2.0, 0.0).unwrap().reshape((1, 1, 2)).unwrap();
        let h1 = t1.affine(3.0, 0.0).unwrap().reshape((1, 1, 2)).unwrap();
        let joined = T::cat(&[h0, h1], 1).unwrap();
        let z = joined.sum_all().unwrap();
        let grads = z.backward().unwrap();
        assert_approx_vec(
            &grads.get(&x).unwrap().to_f64_vec().unwrap(),
            &[2.0, 2.0, 3.0, 3.0],
            1e-10,
        );
    }
}
