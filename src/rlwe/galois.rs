//! Galois automorphisms for RLWE
//!
//! Galois automorphisms τ_g: R → R are ring automorphisms defined by
//! τ_g(X) = X^g for odd g ∈ Z_{2n}^*.
//!
//! For R = Z[X]/(X^n + 1), the Galois group is isomorphic to Z_{n/2} × Z_2,
//! generated by 3 and 2n - 1. Under the slot layout of
//! [`BatchEncoder`](super::BatchEncoder), τ_{3^r} rotates both halves of the
//! slot vector left by r.

/// Galois element 3^steps mod 2n for a left rotation by `steps` slots
pub fn rotation_element(steps: usize, ring_dim: usize) -> usize {
    debug_assert!(ring_dim.is_power_of_two(), "n must be a power of 2");
    let two_n = 2 * ring_dim;
    let mut g = 1usize;
    let mut base = 3 % two_n;
    let mut e = steps;
    while e > 0 {
        if e & 1 == 1 {
            g = g * base % two_n;
        }
        base = base * base % two_n;
        e >>= 1;
    }
    g
}

/// Compute the order of g in (Z/2nZ)^*
pub fn automorphism_order(g: usize, ring_dim: usize) -> usize {
    let two_n = 2 * ring_dim;
    let mut val = g % two_n;
    let mut order = 1;
    while val != 1 {
        val = val * g % two_n;
        order += 1;
        assert!(order <= two_n, "g={} is not in (Z/{}Z)^*", g, two_n);
    }
    order
}
